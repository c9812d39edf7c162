use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

pub mod file;

pub use file::FileStore;

use crate::models::{GeneratedVideo, NewGeneratedVideo, NewScriptSet, OwnerId, ScriptSet};

/// Collection holding finished videos
pub const VIDEOS_COLLECTION: &str = "videos";

/// Collection holding generated script sets
pub const SCRIPTS_COLLECTION: &str = "scripts";

/// Errors raised by record stores
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record id: {0}")]
    InvalidId(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable document store keyed by owner
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a finished video and return its new record id
    async fn create_video(&self, video: NewGeneratedVideo) -> Result<String, StoreError>;

    /// Persist a script set and return its new record id
    async fn create_script_set(&self, set: NewScriptSet) -> Result<String, StoreError>;

    async fn get_video(&self, id: &str) -> Result<GeneratedVideo, StoreError>;

    /// Videos belonging to `owner`, newest first
    async fn list_videos(&self, owner: &OwnerId) -> Result<Vec<GeneratedVideo>, StoreError>;

    async fn delete_video(&self, id: &str) -> Result<(), StoreError>;

    async fn get_script_set(&self, id: &str) -> Result<ScriptSet, StoreError>;

    /// Script sets belonging to `owner`, newest first
    async fn list_script_sets(&self, owner: &OwnerId) -> Result<Vec<ScriptSet>, StoreError>;
}

/// Generate a fresh record id
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// In-process store, useful for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    videos: Mutex<HashMap<String, GeneratedVideo>>,
    script_sets: Mutex<HashMap<String, ScriptSet>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error<T>(_: T) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_video(&self, video: NewGeneratedVideo) -> Result<String, StoreError> {
        let id = new_record_id();
        self.videos
            .lock()
            .map_err(lock_error)?
            .insert(id.clone(), video.into_record(id.clone()));
        Ok(id)
    }

    async fn create_script_set(&self, set: NewScriptSet) -> Result<String, StoreError> {
        let id = new_record_id();
        self.script_sets
            .lock()
            .map_err(lock_error)?
            .insert(id.clone(), set.into_record(id.clone(), Utc::now()));
        Ok(id)
    }

    async fn get_video(&self, id: &str) -> Result<GeneratedVideo, StoreError> {
        self.videos
            .lock()
            .map_err(lock_error)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_videos(&self, owner: &OwnerId) -> Result<Vec<GeneratedVideo>, StoreError> {
        let mut videos: Vec<_> = self
            .videos
            .lock()
            .map_err(lock_error)?
            .values()
            .filter(|video| &video.owner_id == owner)
            .cloned()
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
        self.videos
            .lock()
            .map_err(lock_error)?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_script_set(&self, id: &str) -> Result<ScriptSet, StoreError> {
        self.script_sets
            .lock()
            .map_err(lock_error)?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_script_sets(&self, owner: &OwnerId) -> Result<Vec<ScriptSet>, StoreError> {
        let mut sets: Vec<_> = self
            .script_sets
            .lock()
            .map_err(lock_error)?
            .values()
            .filter(|set| &set.owner_id == owner)
            .cloned()
            .collect();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }
}
