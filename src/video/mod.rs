use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::models::OwnerId;
use crate::provider::{HeyGenClient, VideoProvider};
use crate::sanitize::sanitize;
use crate::store::RecordStore;
use crate::ReelError;

pub mod poller;
pub mod reconciler;
pub mod submitter;

pub use poller::{JobPoller, PollOutcome, PollSettings, Scheduler, Terminal, TokioScheduler};
pub use reconciler::Reconciler;
pub use submitter::{VideoDefaults, VideoSubmitter};

/// A request to turn a script into a video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRequest {
    /// Raw script, markers included
    pub script: String,
    pub avatar_id: Option<String>,
    pub voice_id: Option<String>,
    pub title: Option<String>,
}

impl VideoRequest {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            avatar_id: None,
            voice_id: None,
            title: None,
        }
    }
}

/// Lifecycle state of a video job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobState {
    Submitting,
    Polling,
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

impl JobState {
    pub fn label(&self) -> &'static str {
        match self {
            JobState::Submitting => "submitting",
            JobState::Polling => "polling",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
            JobState::TimedOut { .. } => "timed_out",
        }
    }
}

impl From<Terminal> for JobState {
    fn from(terminal: Terminal) -> Self {
        match terminal {
            Terminal::Completed {
                video_url,
                thumbnail_url,
            } => JobState::Completed {
                video_url,
                thumbnail_url,
            },
            Terminal::Failed { message } => JobState::Failed { message },
            Terminal::TimedOut { message } => JobState::TimedOut { message },
        }
    }
}

/// One video generation attempt, owned by a single lifecycle run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoJob {
    job_id: Option<String>,
    pub source_script: String,
    pub cleaned_script: String,
    pub avatar_id: Option<String>,
    pub voice_id: Option<String>,
    pub title: Option<String>,
    #[serde(flatten)]
    state: JobState,
    pub submitted_at: DateTime<Utc>,
}

impl VideoJob {
    pub fn new(request: &VideoRequest) -> Self {
        Self {
            job_id: None,
            source_script: request.script.clone(),
            cleaned_script: sanitize(&request.script),
            avatar_id: request.avatar_id.clone(),
            voice_id: request.voice_id.clone(),
            title: request.title.clone(),
            state: JobState::Submitting,
            submitted_at: Utc::now(),
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn video_url(&self) -> Option<&str> {
        match &self.state {
            JobState::Completed { video_url, .. } => Some(video_url),
            _ => None,
        }
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        match &self.state {
            JobState::Completed { thumbnail_url, .. } => thumbnail_url.as_deref(),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { message } | JobState::TimedOut { message } => Some(message),
            _ => None,
        }
    }

    /// Typed error for an unsuccessful terminal state
    pub fn failure(&self) -> Option<ReelError> {
        match &self.state {
            JobState::Failed { message } => Some(ReelError::Provider {
                status_code: None,
                message: message.clone(),
                raw_body: None,
            }),
            JobState::TimedOut { message } => Some(ReelError::Timeout(message.clone())),
            _ => None,
        }
    }

    /// Submitting -> Polling. The job id is assigned here and never changes.
    pub(crate) fn begin_polling(&mut self, job_id: String) {
        if self.job_id.is_some() {
            tracing::warn!(job_id = ?self.job_id, "Ignoring second job id assignment");
            return;
        }
        self.job_id = Some(job_id);
        self.state = JobState::Polling;
    }

    pub(crate) fn finish(&mut self, terminal: Terminal) {
        self.state = terminal.into();
    }
}

/// Observable progress of a lifecycle run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StateChanged {
        job_id: Option<String>,
        state: JobState,
    },
    /// Submission was refused before a job existed
    Rejected { message: String },
    Saved { record_id: String },
    /// The video is ready but its record could not be stored
    PersistenceFailed { message: String },
    Cancelled { job_id: String },
}

/// Final state of a run that reached a terminal job state
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job: VideoJob,
    pub record_id: Option<String>,
    pub persistence_error: Option<ReelError>,
}

impl JobReport {
    pub fn failure(&self) -> Option<ReelError> {
        self.job.failure()
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Finished(JobReport),
    Cancelled { job_id: String },
}

/// Drives one video job from submission to a stored record.
///
/// A lifecycle instance runs at most one job at a time. Retrying means calling
/// [`VideoLifecycle::run`] again, which resubmits and gets a new job id.
pub struct VideoLifecycle {
    submitter: VideoSubmitter,
    poller: JobPoller,
    reconciler: Reconciler,
    active: AtomicBool,
    events: broadcast::Sender<LifecycleEvent>,
}

/// Clears the active flag when a run ends, however it ends
struct ActiveGuard<'a>(&'a AtomicBool);

impl<'a> ActiveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ReelError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ActiveGuard(flag))
            .map_err(|_| ReelError::AlreadyInProgress)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl VideoLifecycle {
    pub fn new(
        provider: Arc<dyn VideoProvider>,
        store: Arc<dyn RecordStore>,
        scheduler: Arc<dyn Scheduler>,
        defaults: VideoDefaults,
        settings: PollSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            submitter: VideoSubmitter::new(provider.clone(), defaults),
            poller: JobPoller::new(provider, scheduler, settings),
            reconciler: Reconciler::new(store),
            active: AtomicBool::new(false),
            events,
        }
    }

    /// Lifecycle talking to HeyGen with tokio timers, as configured
    pub fn from_config(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        let provider = HeyGenClient::new(config.video.base_url.clone(), config.video_api_key());
        Self::new(
            Arc::new(provider),
            store,
            Arc::new(TokioScheduler),
            config.video_defaults(),
            config.poll_settings(),
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn emit(&self, event: LifecycleEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_state(&self, job: &VideoJob) {
        self.emit(LifecycleEvent::StateChanged {
            job_id: job.job_id().map(str::to_string),
            state: job.state().clone(),
        });
    }

    /// Run one job to completion for `owner`.
    ///
    /// Submission problems come back as errors. Once a job id exists the run
    /// ends in a [`RunOutcome`], with provider failures and timeouts carried in
    /// the job state.
    pub async fn run(
        &self,
        request: VideoRequest,
        owner: &OwnerId,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, ReelError> {
        let _guard = ActiveGuard::acquire(&self.active)?;

        let mut job = VideoJob::new(&request);
        self.emit_state(&job);

        let job_id = match self.submitter.submit(&request).await {
            Ok(job_id) => job_id,
            Err(e) => {
                self.emit(LifecycleEvent::Rejected {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        job.begin_polling(job_id.clone());
        self.emit_state(&job);

        match self.poller.wait_for_completion(&job_id, &cancel).await {
            PollOutcome::Cancelled => {
                tracing::info!(job_id = %job_id, "Video job cancelled");
                self.emit(LifecycleEvent::Cancelled {
                    job_id: job_id.clone(),
                });
                return Ok(RunOutcome::Cancelled { job_id });
            }
            PollOutcome::Terminal(terminal) => job.finish(terminal),
        }
        self.emit_state(&job);

        let (record_id, persistence_error) = match self.reconciler.reconcile(&job, owner).await {
            Ok(record_id) => (record_id, None),
            Err(e) => (None, Some(e)),
        };

        if let Some(record_id) = &record_id {
            self.emit(LifecycleEvent::Saved {
                record_id: record_id.clone(),
            });
        }
        if let Some(e) = &persistence_error {
            self.emit(LifecycleEvent::PersistenceFailed {
                message: e.to_string(),
            });
        }

        Ok(RunOutcome::Finished(JobReport {
            job,
            record_id,
            persistence_error,
        }))
    }
}
