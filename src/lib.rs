//! Scriptreel - A Rust CLI tool for turning topics into narrated avatar videos
//!
//! This library generates video narration scripts with an LLM, cleans them for
//! text-to-speech, submits them to a video generation provider, tracks the
//! asynchronous render job and stores finished videos per user.

pub mod cli;
pub mod config;
pub mod models;
pub mod output;
pub mod provider;
pub mod sanitize;
pub mod scripts;
pub mod store;
pub mod utils;
pub mod video;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use models::{GeneratedVideo, OwnerId, Script, ScriptSet};
pub use provider::{HeyGenClient, VideoProvider};
pub use sanitize::sanitize;
pub use store::{FileStore, MemoryStore, RecordStore};
pub use video::{LifecycleEvent, RunOutcome, VideoJob, VideoLifecycle, VideoRequest};

/// Result type used by the application layer
pub type Result<T> = anyhow::Result<T>;

/// Error types surfaced by the video lifecycle and its collaborators
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReelError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{message}")]
    Provider {
        /// HTTP status returned by the provider, `None` for transport failures
        status_code: Option<u16>,
        message: String,
        raw_body: Option<String>,
    },

    #[error("{0}")]
    Timeout(String),

    #[error("Failed to save record: {0}")]
    Persistence(String),

    #[error("A video is already being generated for this script")]
    AlreadyInProgress,
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Provider error without an HTTP response (connect failure, bad JSON, ...)
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Provider {
            status_code: None,
            message: msg.into(),
            raw_body: None,
        }
    }
}

impl From<reqwest::Error> for ReelError {
    fn from(err: reqwest::Error) -> Self {
        Self::Provider {
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            raw_body: None,
        }
    }
}
