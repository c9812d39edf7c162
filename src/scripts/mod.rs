//! Script generation: asks an LLM for narration script variations on a topic
//! and stores the resulting set for the user.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod openai;

pub use openai::OpenAiScriptGenerator;

use crate::models::{NewScriptSet, OwnerId, Script};
use crate::store::RecordStore;
use crate::ReelError;

/// Allowed number of variations per request
pub const MIN_VARIATIONS: u8 = 3;
pub const MAX_VARIATIONS: u8 = 5;

/// Trait for services that write narration scripts
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    /// Generate `num_variations` scripts for `topic`, numbered from 1
    async fn generate(&self, topic: &str, num_variations: u8) -> Result<Vec<Script>, ReelError>;

    fn generator_name(&self) -> &'static str;
}

/// Wire shape of a script batch, as returned by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptBatchPayload {
    pub scripts: Vec<ScriptPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptPayload {
    Numbered { id: Option<u32>, content: String },
    Plain(String),
}

impl ScriptPayload {
    fn into_content(self) -> String {
        match self {
            ScriptPayload::Numbered { content, .. } => content,
            ScriptPayload::Plain(content) => content,
        }
    }
}

/// Validate a generation request before contacting the provider
pub fn validate_request(topic: &str, num_variations: u8) -> Result<(), ReelError> {
    if topic.trim().is_empty() {
        return Err(ReelError::validation("Topic is required"));
    }
    if !(MIN_VARIATIONS..=MAX_VARIATIONS).contains(&num_variations) {
        return Err(ReelError::validation(format!(
            "Number of variations must be between {} and {}, got {}",
            MIN_VARIATIONS, MAX_VARIATIONS, num_variations
        )));
    }
    Ok(())
}

/// Normalize model output: drop blank scripts, keep at most `limit`, renumber 1..n
pub fn normalize_scripts(payload: ScriptBatchPayload, limit: u8) -> Vec<Script> {
    payload
        .scripts
        .into_iter()
        .map(ScriptPayload::into_content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .take(limit as usize)
        .zip(1u32..)
        .map(|(content, id)| Script { id, content })
        .collect()
}

/// Result of generating and storing a script set
#[derive(Debug, Clone)]
pub struct ScriptBatch {
    pub topic: String,
    pub scripts: Vec<Script>,
    /// Id of the stored set, if saving succeeded
    pub record_id: Option<String>,
    pub persistence_error: Option<ReelError>,
}

/// Generate scripts for `topic` and save them for `owner`.
///
/// Saving is best effort: a store failure is reported in the batch but the
/// generated scripts are still returned.
pub async fn generate_script_set(
    generator: &dyn ScriptGenerator,
    store: Option<&dyn RecordStore>,
    owner: &OwnerId,
    topic: &str,
    num_variations: u8,
) -> Result<ScriptBatch, ReelError> {
    validate_request(topic, num_variations)?;

    let topic = topic.trim().to_string();
    tracing::info!(
        generator = generator.generator_name(),
        num_variations,
        "Generating scripts for topic: {}",
        topic
    );

    let scripts = generator.generate(&topic, num_variations).await?;
    if scripts.is_empty() {
        return Err(ReelError::transport(format!(
            "{} returned no scripts",
            generator.generator_name()
        )));
    }

    let mut batch = ScriptBatch {
        topic: topic.clone(),
        scripts,
        record_id: None,
        persistence_error: None,
    };

    if let Some(store) = store {
        let set = NewScriptSet {
            owner_id: owner.clone(),
            topic,
            scripts: batch.scripts.clone(),
        };
        match store.create_script_set(set).await {
            Ok(id) => {
                tracing::info!(record_id = %id, "Saved script set");
                batch.record_id = Some(id);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save script set");
                batch.persistence_error = Some(ReelError::Persistence(e.to_string()));
            }
        }
    }

    Ok(batch)
}
