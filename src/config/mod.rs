use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::models::OwnerId;
use crate::provider::heygen;
use crate::scripts::{self, openai};
use crate::video::{PollSettings, VideoDefaults};

/// Env var overriding `video.api_key`
pub const VIDEO_API_KEY_ENV: &str = "HEYGEN_API_KEY";

/// Env var overriding `scripts.api_key`
pub const SCRIPT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Video generation provider
    pub video: VideoConfig,

    /// Job polling cadence
    #[serde(default)]
    pub polling: PollingConfig,

    /// Script generation provider
    pub scripts: ScriptsConfig,

    /// Record storage
    #[serde(default)]
    pub store: StoreConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Provider API base URL
    pub base_url: String,

    /// API key, prefer the environment variable
    pub api_key: Option<String>,

    pub default_avatar_id: String,

    pub default_voice_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Pause before the first status check
    pub initial_delay_secs: u64,

    /// Pause between status checks
    pub interval_secs: u64,

    /// Status checks before giving up
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptsConfig {
    pub base_url: String,

    pub api_key: Option<String>,

    /// Chat model used for script generation
    pub model: String,

    /// Variations requested when `-n` is not given
    pub default_variations: u8,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory for stored records (platform data dir if not set)
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Owner id used when `--user` is not given
    pub user_id: Option<String>,

    /// Videos per gallery page
    pub page_size: usize,

    /// Default output format
    pub default_output_format: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        let settings = PollSettings::default();
        Self {
            initial_delay_secs: settings.initial_delay.as_secs(),
            interval_secs: settings.interval.as_secs(),
            max_attempts: settings.max_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = VideoDefaults::default();
        Self {
            video: VideoConfig {
                base_url: heygen::DEFAULT_BASE_URL.to_string(),
                api_key: None,
                default_avatar_id: defaults.avatar_id,
                default_voice_id: defaults.voice_id,
            },
            polling: PollingConfig::default(),
            scripts: ScriptsConfig {
                base_url: openai::DEFAULT_BASE_URL.to_string(),
                api_key: None,
                model: openai::DEFAULT_MODEL.to_string(),
                default_variations: scripts::MIN_VARIATIONS,
            },
            store: StoreConfig::default(),
            app: AppConfig {
                user_id: None,
                page_size: 12,
                default_output_format: "text".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            if let Err(e) = config.save().await {
                tracing::warn!("Could not write default config: {:#}", e);
            }
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("scriptreel").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_base_url("video.base_url", &self.video.base_url)?;
        validate_base_url("scripts.base_url", &self.scripts.base_url)?;

        if self.video.default_avatar_id.trim().is_empty() || self.video.default_voice_id.trim().is_empty() {
            anyhow::bail!("Default avatar and voice ids must be configured");
        }

        if self.polling.max_attempts == 0 {
            anyhow::bail!("polling.max_attempts must be at least 1");
        }

        if !(scripts::MIN_VARIATIONS..=scripts::MAX_VARIATIONS).contains(&self.scripts.default_variations) {
            anyhow::bail!(
                "scripts.default_variations must be between {} and {}",
                scripts::MIN_VARIATIONS,
                scripts::MAX_VARIATIONS
            );
        }

        if self.app.page_size == 0 {
            anyhow::bail!("app.page_size must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Video API: {}", self.video.base_url);
        println!("  Video API Key: {}", key_status(self.video_api_key()));
        println!("  Default Avatar: {}", self.video.default_avatar_id);
        println!("  Default Voice: {}", self.video.default_voice_id);
        println!(
            "  Polling: first check after {}s, then every {}s, up to {} checks",
            self.polling.initial_delay_secs, self.polling.interval_secs, self.polling.max_attempts
        );
        println!("  Script API: {}", self.scripts.base_url);
        println!("  Script API Key: {}", key_status(self.script_api_key()));
        println!("  Script Model: {}", self.scripts.model);
        match self.data_dir() {
            Ok(dir) => println!("  Data Directory: {}", dir.display()),
            Err(_) => println!("  Data Directory: (unavailable)"),
        }
        if let Some(user) = &self.app.user_id {
            println!("  User: {}", user);
        }
        println!("  Page Size: {}", self.app.page_size);
        println!("  Default Format: {}", self.app.default_output_format);
    }

    /// Video provider API key, environment first
    pub fn video_api_key(&self) -> Option<String> {
        env_or(VIDEO_API_KEY_ENV, self.video.api_key.as_deref())
    }

    /// Script provider API key, environment first
    pub fn script_api_key(&self) -> Option<String> {
        env_or(SCRIPT_API_KEY_ENV, self.scripts.api_key.as_deref())
    }

    pub fn video_defaults(&self) -> VideoDefaults {
        VideoDefaults {
            avatar_id: self.video.default_avatar_id.clone(),
            voice_id: self.video.default_voice_id.clone(),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            initial_delay: Duration::from_secs(self.polling.initial_delay_secs),
            interval: Duration::from_secs(self.polling.interval_secs),
            max_attempts: self.polling.max_attempts,
        }
    }

    /// Directory holding stored records
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.store.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("scriptreel"))
    }

    /// Resolve the acting user: explicit id first, then the config file
    pub fn owner(&self, explicit: Option<&str>) -> Result<OwnerId> {
        explicit
            .or(self.app.user_id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(OwnerId::new)
            .context("No user id given. Pass --user, set SCRIPTREEL_USER or app.user_id in the config file")
    }
}

fn validate_base_url(field: &str, value: &str) -> Result<()> {
    let parsed = Url::parse(value).with_context(|| format!("Invalid URL for {}: {}", field, value))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("{} must use HTTP or HTTPS protocol", field);
    }
    Ok(())
}

fn env_or(var: &str, fallback: Option<&str>) -> Option<String> {
    first_non_blank(std::env::var(var).ok(), fallback)
}

/// First value that is not blank, environment before config file
fn first_non_blank(env_value: Option<String>, fallback: Option<&str>) -> Option<String> {
    env_value
        .filter(|key| !key.trim().is_empty())
        .or_else(|| fallback.map(str::to_string).filter(|key| !key.trim().is_empty()))
}

fn key_status(key: Option<String>) -> &'static str {
    if key.is_some() {
        "set"
    } else {
        "not set"
    }
}
