use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::provider::{ProviderStatus, VideoProvider};

/// Message reported when the provider is still rendering after the last check
pub const TIMEOUT_MESSAGE: &str =
    "Video generation is taking longer than expected. Please check back later.";

/// Source of delays between status checks
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Scheduler backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Timing of the status polling protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before the first check so the provider can register the job
    pub initial_delay: Duration,

    /// Fixed wait between checks
    pub interval: Duration,

    /// Maximum number of status checks
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            interval: Duration::from_secs(5),
            max_attempts: 60,
        }
    }
}

/// Terminal result of a render job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Completed {
        video_url: String,
        thumbnail_url: Option<String>,
    },
    Failed {
        message: String,
    },
    TimedOut {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Terminal(Terminal),
    /// Stopped by the caller; no terminal state was reached
    Cancelled,
}

/// Polls the provider until a job reaches a terminal state
pub struct JobPoller {
    provider: Arc<dyn VideoProvider>,
    scheduler: Arc<dyn Scheduler>,
    settings: PollSettings,
}

impl JobPoller {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        scheduler: Arc<dyn Scheduler>,
        settings: PollSettings,
    ) -> Self {
        Self {
            provider,
            scheduler,
            settings,
        }
    }

    /// Wait for job completion.
    ///
    /// In-progress answers are retried up to `max_attempts` checks. Any request
    /// error ends the job as failed right away.
    pub async fn wait_for_completion(&self, job_id: &str, cancel: &CancellationToken) -> PollOutcome {
        if !self.pause(self.settings.initial_delay, cancel).await {
            return PollOutcome::Cancelled;
        }

        let mut check_count = 0;

        loop {
            check_count += 1;

            let result = self.provider.video_status(job_id).await;

            if cancel.is_cancelled() {
                tracing::debug!(job_id, check_count, "Discarding status check after cancellation");
                return PollOutcome::Cancelled;
            }

            let report = match result {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!(job_id, check_count, error = %e, "Status check failed");
                    return PollOutcome::Terminal(Terminal::Failed {
                        message: e.to_string(),
                    });
                }
            };

            tracing::debug!(job_id, check_count, status = ?report.status, "Status check");

            let terminal = match report.status {
                ProviderStatus::Pending | ProviderStatus::Processing => {
                    if check_count >= self.settings.max_attempts {
                        tracing::warn!(job_id, check_count, "Video job timed out");
                        return PollOutcome::Terminal(Terminal::TimedOut {
                            message: TIMEOUT_MESSAGE.to_string(),
                        });
                    }

                    if !self.pause(self.settings.interval, cancel).await {
                        return PollOutcome::Cancelled;
                    }
                    continue;
                }
                ProviderStatus::Completed => match report.video_url {
                    Some(video_url) => Terminal::Completed {
                        video_url,
                        thumbnail_url: report.thumbnail_url,
                    },
                    None => Terminal::Failed {
                        message: format!(
                            "{} reported the video as completed without a video URL",
                            self.provider.provider_name()
                        ),
                    },
                },
                ProviderStatus::Failed => Terminal::Failed {
                    message: report
                        .error
                        .unwrap_or_else(|| "Video generation failed".to_string()),
                },
                ProviderStatus::Unrecognized(status) => Terminal::Failed {
                    message: format!(
                        "Unrecognized video status from {}: {}",
                        self.provider.provider_name(),
                        status
                    ),
                },
            };

            tracing::info!(job_id, check_count, "Video job finished");
            return PollOutcome::Terminal(terminal);
        }
    }

    /// Sleep unless cancelled. Returns `false` when polling must stop.
    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = self.scheduler.sleep(duration) => true,
        }
    }
}
