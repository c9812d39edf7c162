use chrono::Utc;
use std::sync::Arc;

use super::{JobState, VideoJob};
use crate::models::{NewGeneratedVideo, OwnerId};
use crate::store::RecordStore;
use crate::ReelError;

/// Turns terminal jobs into durable video records
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Persist a completed job for `owner` and return the new record id.
    ///
    /// Failed and timed out jobs are never stored and yield `Ok(None)`. A store
    /// failure is reported as `ReelError::Persistence`; the job keeps its video URL.
    pub async fn reconcile(&self, job: &VideoJob, owner: &OwnerId) -> Result<Option<String>, ReelError> {
        let (video_url, thumbnail_url) = match job.state() {
            JobState::Completed {
                video_url,
                thumbnail_url,
            } => (video_url.clone(), thumbnail_url.clone()),
            JobState::Failed { .. } | JobState::TimedOut { .. } => {
                tracing::debug!(job_id = ?job.job_id(), "Nothing to persist for unsuccessful job");
                return Ok(None);
            }
            JobState::Submitting | JobState::Polling => {
                return Err(ReelError::validation("Cannot reconcile a job that is still running"));
            }
        };

        let job_id = job
            .job_id()
            .ok_or_else(|| ReelError::validation("Completed job has no job id"))?;

        let record = NewGeneratedVideo {
            owner_id: owner.clone(),
            job_id: job_id.to_string(),
            video_url,
            thumbnail_url,
            original_script: job.source_script.clone(),
            cleaned_script: job.cleaned_script.clone(),
            title: job.title.clone(),
            created_at: job.submitted_at,
            completed_at: Utc::now(),
        };

        match self.store.create_video(record).await {
            Ok(record_id) => {
                tracing::info!(job_id, record_id = %record_id, "Saved video record");
                Ok(Some(record_id))
            }
            Err(e) => {
                tracing::warn!(job_id, error = %e, "Video was generated but could not be saved");
                Err(ReelError::Persistence(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{GeneratedVideo, NewScriptSet, ScriptSet};
    use crate::store::{MemoryStore, StoreError};
    use crate::video::poller::Terminal;
    use crate::video::VideoRequest;
    use async_trait::async_trait;

    /// Store whose writes always fail
    pub(crate) struct BrokenStore;

    #[async_trait]
    impl RecordStore for BrokenStore {
        async fn create_video(&self, _video: NewGeneratedVideo) -> Result<String, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn create_script_set(&self, _set: NewScriptSet) -> Result<String, StoreError> {
            Err(StoreError::Unavailable("disk full".to_string()))
        }

        async fn get_video(&self, id: &str) -> Result<GeneratedVideo, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        async fn list_videos(&self, _owner: &OwnerId) -> Result<Vec<GeneratedVideo>, StoreError> {
            Ok(Vec::new())
        }

        async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        async fn get_script_set(&self, id: &str) -> Result<ScriptSet, StoreError> {
            Err(StoreError::NotFound(id.to_string()))
        }

        async fn list_script_sets(&self, _owner: &OwnerId) -> Result<Vec<ScriptSet>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn finished_job(terminal: Terminal) -> VideoJob {
        let mut job = VideoJob::new(&VideoRequest {
            script: "[HOOK] Hello!!".to_string(),
            avatar_id: None,
            voice_id: None,
            title: Some("Script 1 - Video".to_string()),
        });
        job.begin_polling("job-9".to_string());
        job.finish(terminal);
        job
    }

    #[tokio::test]
    async fn test_completed_job_is_persisted_once() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(store.clone());
        let owner = OwnerId::new("user-1");
        let job = finished_job(Terminal::Completed {
            video_url: "https://cdn.example.com/v.mp4".to_string(),
            thumbnail_url: None,
        });

        let record_id = reconciler.reconcile(&job, &owner).await.unwrap().unwrap();

        let videos = store.list_videos(&owner).await.unwrap();
        assert_eq!(videos.len(), 1);
        let video = &videos[0];
        assert_eq!(video.id, record_id);
        assert_eq!(video.job_id, "job-9");
        assert_eq!(video.video_url, "https://cdn.example.com/v.mp4");
        assert_eq!(video.original_script, "[HOOK] Hello!!");
        assert_eq!(video.cleaned_script, "Hello!");
        assert_eq!(video.title.as_deref(), Some("Script 1 - Video"));
        assert_eq!(video.status, crate::models::StoredVideoStatus::Completed);
        assert!(video.completed_at >= video.created_at);
    }

    #[tokio::test]
    async fn test_failed_and_timed_out_jobs_are_not_persisted() {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Reconciler::new(store.clone());
        let owner = OwnerId::new("user-1");

        for terminal in [
            Terminal::Failed { message: "boom".to_string() },
            Terminal::TimedOut { message: "slow".to_string() },
        ] {
            let job = finished_job(terminal);
            assert_eq!(reconciler.reconcile(&job, &owner).await.unwrap(), None);
        }

        assert!(store.list_videos(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_persistence_error() {
        let reconciler = Reconciler::new(Arc::new(BrokenStore));
        let job = finished_job(Terminal::Completed {
            video_url: "https://cdn.example.com/v.mp4".to_string(),
            thumbnail_url: None,
        });

        let err = reconciler.reconcile(&job, &OwnerId::new("u")).await.unwrap_err();
        assert!(matches!(err, ReelError::Persistence(_)));
        assert_eq!(job.video_url(), Some("https://cdn.example.com/v.mp4"));
    }

    #[tokio::test]
    async fn test_running_job_cannot_be_reconciled() {
        let reconciler = Reconciler::new(Arc::new(MemoryStore::new()));
        let job = VideoJob::new(&VideoRequest {
            script: "Hi".to_string(),
            avatar_id: None,
            voice_id: None,
            title: None,
        });

        let err = reconciler.reconcile(&job, &OwnerId::new("u")).await.unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));
    }
}
