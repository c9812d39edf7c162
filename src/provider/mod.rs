use async_trait::async_trait;
use serde::Serialize;

pub mod heygen;

pub use heygen::HeyGenClient;

use crate::ReelError;

/// Output resolution requested for every video
pub const VIDEO_WIDTH: u32 = 1280;
pub const VIDEO_HEIGHT: u32 = 720;

/// Body of a video creation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateVideoRequest {
    pub video_inputs: Vec<VideoInput>,
    pub dimension: Dimension,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInput {
    pub character: Character,
    pub voice: Voice,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Character {
    #[serde(rename = "type")]
    pub kind: String,
    pub avatar_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Voice {
    #[serde(rename = "type")]
    pub kind: String,
    pub input_text: String,
    pub voice_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl CreateVideoRequest {
    /// Single-scene avatar video narrating `input_text`
    pub fn avatar(
        input_text: impl Into<String>,
        avatar_id: impl Into<String>,
        voice_id: impl Into<String>,
        title: Option<String>,
    ) -> Self {
        Self {
            video_inputs: vec![VideoInput {
                character: Character {
                    kind: "avatar".to_string(),
                    avatar_id: avatar_id.into(),
                },
                voice: Voice {
                    kind: "text".to_string(),
                    input_text: input_text.into(),
                    voice_id: voice_id.into(),
                },
            }],
            dimension: Dimension {
                width: VIDEO_WIDTH,
                height: VIDEO_HEIGHT,
            },
            title,
        }
    }

    /// Narration text carried by the request
    pub fn input_text(&self) -> Option<&str> {
        self.video_inputs.first().map(|input| input.voice.input_text.as_str())
    }
}

/// Render status reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any value outside the documented set, kept for diagnostics
    Unrecognized(String),
}

impl ProviderStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("pending") => ProviderStatus::Pending,
            Some("processing") => ProviderStatus::Processing,
            Some("completed") => ProviderStatus::Completed,
            Some("failed") => ProviderStatus::Failed,
            Some(other) => ProviderStatus::Unrecognized(other.to_string()),
            None => ProviderStatus::Unrecognized("<missing>".to_string()),
        }
    }
}

/// One status check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub status: ProviderStatus,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn processing() -> Self {
        Self::with_status(ProviderStatus::Processing)
    }

    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            video_url: None,
            thumbnail_url: None,
            error: None,
        }
    }
}

/// Trait for the third-party service that renders avatar videos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoProvider: Send + Sync {
    /// Whether a credential is available. Checked before any request is made.
    fn is_configured(&self) -> bool;

    /// Start a render job and return the provider-assigned job id
    async fn create_video(&self, request: &CreateVideoRequest) -> Result<String, ReelError>;

    /// Query the current state of a render job
    async fn video_status(&self, job_id: &str) -> Result<StatusReport, ReelError>;

    /// Name of the provider for logs
    fn provider_name(&self) -> &'static str;
}
