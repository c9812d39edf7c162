use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;

use super::{new_record_id, RecordStore, StoreError, SCRIPTS_COLLECTION, VIDEOS_COLLECTION};
use crate::models::{GeneratedVideo, NewGeneratedVideo, NewScriptSet, OwnerId, ScriptSet};

/// Document store keeping one JSON file per record.
///
/// Layout: `<root>/videos/<id>.json` and `<root>/scripts/<id>.json`.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join(collection)
    }

    fn document_path(&self, collection: &str, id: &str) -> Result<PathBuf, StoreError> {
        let valid = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.collection_dir(collection).join(format!("{}.json", id)))
    }

    fn write_document<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> Result<(), StoreError> {
        fs_err::create_dir_all(self.collection_dir(collection))?;
        let path = self.document_path(collection, id)?;
        let content = serde_json::to_string_pretty(doc)?;
        fs_err::write(&path, content)?;
        tracing::debug!("Wrote record {}", path.display());
        Ok(())
    }

    fn read_document<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T, StoreError> {
        let path = self.document_path(collection, id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let content = fs_err::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn read_collection<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>, StoreError> {
        let dir = self.collection_dir(collection);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::new();
        for entry in fs_err::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let content = fs_err::read_to_string(&path)?;
            match serde_json::from_str(&content) {
                Ok(doc) => documents.push(doc),
                Err(e) => tracing::warn!("Skipping unreadable record {}: {}", path.display(), e),
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn create_video(&self, video: NewGeneratedVideo) -> Result<String, StoreError> {
        let id = new_record_id();
        let record = video.into_record(id.clone());
        self.write_document(VIDEOS_COLLECTION, &id, &record)?;
        Ok(id)
    }

    async fn create_script_set(&self, set: NewScriptSet) -> Result<String, StoreError> {
        let id = new_record_id();
        let record = set.into_record(id.clone(), Utc::now());
        self.write_document(SCRIPTS_COLLECTION, &id, &record)?;
        Ok(id)
    }

    async fn get_video(&self, id: &str) -> Result<GeneratedVideo, StoreError> {
        self.read_document(VIDEOS_COLLECTION, id)
    }

    async fn list_videos(&self, owner: &OwnerId) -> Result<Vec<GeneratedVideo>, StoreError> {
        let mut videos: Vec<GeneratedVideo> = self
            .read_collection::<GeneratedVideo>(VIDEOS_COLLECTION)?
            .into_iter()
            .filter(|video| &video.owner_id == owner)
            .collect();
        videos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(videos)
    }

    async fn delete_video(&self, id: &str) -> Result<(), StoreError> {
        let path = self.document_path(VIDEOS_COLLECTION, id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        fs_err::remove_file(&path)?;
        Ok(())
    }

    async fn get_script_set(&self, id: &str) -> Result<ScriptSet, StoreError> {
        self.read_document(SCRIPTS_COLLECTION, id)
    }

    async fn list_script_sets(&self, owner: &OwnerId) -> Result<Vec<ScriptSet>, StoreError> {
        let mut sets: Vec<ScriptSet> = self
            .read_collection::<ScriptSet>(SCRIPTS_COLLECTION)?
            .into_iter()
            .filter(|set| &set.owner_id == owner)
            .collect();
        sets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sets)
    }
}
