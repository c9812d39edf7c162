use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of the authenticated user owning stored records
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One generated script variation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Variation ordinal, unique within a generation batch
    pub id: u32,

    /// Raw script text, possibly annotated with section markers
    pub content: String,
}

/// Script variations generated for one topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptSet {
    /// Record id assigned by the store
    pub id: String,

    #[serde(rename = "userId")]
    pub owner_id: OwnerId,

    pub topic: String,

    pub scripts: Vec<Script>,

    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ScriptSet {
    /// Find a variation by its ordinal
    pub fn variant(&self, id: u32) -> Option<&Script> {
        self.scripts.iter().find(|script| script.id == id)
    }
}

/// Fields of a script set before the store assigns an id
#[derive(Debug, Clone)]
pub struct NewScriptSet {
    pub owner_id: OwnerId,
    pub topic: String,
    pub scripts: Vec<Script>,
}

/// Status stored with a video record. Only completed videos are ever persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoredVideoStatus {
    Completed,
}

/// A finished video persisted for its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVideo {
    /// Record id assigned by the store
    pub id: String,

    #[serde(rename = "userId")]
    pub owner_id: OwnerId,

    /// Provider job identifier
    #[serde(rename = "videoId")]
    pub job_id: String,

    pub video_url: String,

    pub thumbnail_url: Option<String>,

    pub original_script: String,

    pub cleaned_script: String,

    pub title: Option<String>,

    pub status: StoredVideoStatus,

    pub created_at: DateTime<Utc>,

    pub completed_at: DateTime<Utc>,
}

/// Fields of a video record before the store assigns an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewGeneratedVideo {
    pub owner_id: OwnerId,
    pub job_id: String,
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub original_script: String,
    pub cleaned_script: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl NewGeneratedVideo {
    pub fn into_record(self, id: String) -> GeneratedVideo {
        GeneratedVideo {
            id,
            owner_id: self.owner_id,
            job_id: self.job_id,
            video_url: self.video_url,
            thumbnail_url: self.thumbnail_url,
            original_script: self.original_script,
            cleaned_script: self.cleaned_script,
            title: self.title,
            status: StoredVideoStatus::Completed,
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

impl NewScriptSet {
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> ScriptSet {
        ScriptSet {
            id,
            owner_id: self.owner_id,
            topic: self.topic,
            scripts: self.scripts,
            created_at,
        }
    }
}
