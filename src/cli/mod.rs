use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(
    name = "scriptreel",
    about = "Scriptreel - Generate narration scripts and turn them into avatar videos",
    version,
    long_about = "A CLI tool that writes short video narration scripts with an LLM, cleans them for text-to-speech, renders them as talking-avatar videos through HeyGen and keeps a per-user gallery of the results."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// User id owning generated scripts and videos
    #[arg(short, long, global = true, env = "SCRIPTREEL_USER", value_name = "ID")]
    pub user: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate script variations for a topic
    Scripts {
        /// What the video should be about
        #[arg(value_name = "TOPIC")]
        topic: String,

        /// Number of variations (3-5)
        #[arg(short = 'n', long = "variations", value_name = "N")]
        variations: Option<u8>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Do not store the generated set
        #[arg(long)]
        no_save: bool,
    },

    /// Render a script as an avatar video and wait for it
    Video {
        #[command(flatten)]
        source: ScriptSource,

        /// Variation number within the stored set
        #[arg(long, value_name = "N", requires = "set")]
        variant: Option<u32>,

        /// Avatar id (configured default if not specified)
        #[arg(long, value_name = "ID")]
        avatar: Option<String>,

        /// Voice id (configured default if not specified)
        #[arg(long, value_name = "ID")]
        voice: Option<String>,

        /// Video title
        #[arg(long)]
        title: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Browse and manage generated videos
    Videos {
        #[command(subcommand)]
        action: VideosAction,
    },

    /// Browse stored script sets
    Sets {
        #[command(subcommand)]
        action: SetsAction,
    },

    /// Clean a script for text-to-speech and print the result
    Sanitize {
        /// Script text
        #[arg(value_name = "TEXT", required_unless_present = "file")]
        text: Option<String>,

        /// Read the script from a file
        #[arg(long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Show or create the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Where the script for a video comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ScriptSource {
    /// Script text
    #[arg(long)]
    pub text: Option<String>,

    /// Read the script from a file
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Stored script set id (use with --variant)
    #[arg(long = "set", value_name = "ID", requires = "variant")]
    pub set: Option<String>,
}

#[derive(Subcommand)]
pub enum VideosAction {
    /// List your videos, newest first
    List {
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Delete one of your videos
    Delete {
        /// Video record id
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Subcommand)]
pub enum SetsAction {
    /// List your script sets, newest first
    List {
        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show every variation of a script set
    Show {
        /// Script set id
        #[arg(value_name = "ID")]
        id: String,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl OutputFormat {
    /// Parse a configured default, falling back to text
    pub fn from_config(value: &str) -> Self {
        <Self as ValueEnum>::from_str(value, true).unwrap_or(OutputFormat::Text)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_video_from_stored_variant() {
        let cli = Cli::try_parse_from([
            "scriptreel", "--user", "alice", "video", "--set", "abc", "--variant", "2",
        ])
        .unwrap();

        assert_eq!(cli.user.as_deref(), Some("alice"));
        match cli.command {
            Commands::Video { source, variant, .. } => {
                assert_eq!(source.set.as_deref(), Some("abc"));
                assert_eq!(variant, Some(2));
            }
            _ => panic!("expected video command"),
        }
    }

    #[test]
    fn test_video_requires_one_source() {
        assert!(Cli::try_parse_from(["scriptreel", "video"]).is_err());
        assert!(Cli::try_parse_from(["scriptreel", "video", "--text", "a", "--file", "b.txt"]).is_err());
        assert!(Cli::try_parse_from(["scriptreel", "video", "--set", "abc"]).is_err());
    }

    #[test]
    fn test_output_format_from_config() {
        assert_eq!(OutputFormat::from_config("json"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_config("srt"), OutputFormat::Text);
    }
}
