use std::sync::Arc;

use super::VideoRequest;
use crate::provider::{CreateVideoRequest, VideoProvider};
use crate::sanitize::sanitize;
use crate::ReelError;

pub const DEFAULT_AVATAR_ID: &str = "32dbf2775e394a51a96c75e5aadeeb86";
pub const DEFAULT_VOICE_ID: &str = "bf6c84a338974305a21c51edcaa77ec0";

/// Avatar and voice used when a request does not name one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDefaults {
    pub avatar_id: String,
    pub voice_id: String,
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            avatar_id: DEFAULT_AVATAR_ID.to_string(),
            voice_id: DEFAULT_VOICE_ID.to_string(),
        }
    }
}

/// Builds provider requests from raw scripts and starts render jobs
pub struct VideoSubmitter {
    provider: Arc<dyn VideoProvider>,
    defaults: VideoDefaults,
}

impl VideoSubmitter {
    pub fn new(provider: Arc<dyn VideoProvider>, defaults: VideoDefaults) -> Self {
        Self { provider, defaults }
    }

    /// Build the provider request for a script, applying defaults
    pub fn build_request(&self, request: &VideoRequest) -> CreateVideoRequest {
        CreateVideoRequest::avatar(
            sanitize(&request.script),
            non_blank(&request.avatar_id).unwrap_or_else(|| self.defaults.avatar_id.clone()),
            non_blank(&request.voice_id).unwrap_or_else(|| self.defaults.voice_id.clone()),
            non_blank(&request.title),
        )
    }

    /// Submit a script for rendering and return the provider job id.
    ///
    /// Input and credentials are checked before any request goes out.
    pub async fn submit(&self, request: &VideoRequest) -> Result<String, ReelError> {
        if request.script.trim().is_empty() {
            return Err(ReelError::validation("Script is required"));
        }

        if !self.provider.is_configured() {
            return Err(ReelError::configuration(format!(
                "{} API key not configured",
                self.provider.provider_name()
            )));
        }

        let provider_request = self.build_request(request);
        tracing::info!(
            provider = self.provider.provider_name(),
            characters = provider_request.input_text().map(str::len).unwrap_or(0),
            "Submitting video job"
        );

        let job_id = self.provider.create_video(&provider_request).await?;
        tracing::info!(job_id = %job_id, "Video job accepted");

        Ok(job_id)
    }
}

/// Blank strings count as not supplied
fn non_blank(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}
