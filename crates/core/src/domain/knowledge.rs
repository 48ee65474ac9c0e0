use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::query::{Crop, Topic};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KnowledgeKey {
    pub crop: Crop,
    pub topic: Topic,
    pub growth_stage: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub crop: Crop,
    pub topic: Topic,
    /// `None` marks the stage-independent default entry for a (crop, topic) pair.
    pub growth_stage: Option<String>,
    pub advice_text: String,
}

impl KnowledgeEntry {
    pub fn new(crop: Crop, topic: Topic, advice_text: impl Into<String>) -> Self {
        Self { crop, topic, growth_stage: None, advice_text: advice_text.into() }
    }

    pub fn with_stage(mut self, growth_stage: impl Into<String>) -> Self {
        self.growth_stage = Some(normalize_stage(&growth_stage.into()));
        self
    }

    pub fn key(&self) -> KnowledgeKey {
        KnowledgeKey {
            crop: self.crop,
            topic: self.topic,
            growth_stage: self.growth_stage.as_deref().map(normalize_stage),
        }
    }
}

pub fn normalize_stage(stage: &str) -> String {
    stage.trim().to_lowercase()
}

impl fmt::Display for KnowledgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.crop, self.topic, self.growth_stage.as_deref().unwrap_or("*"))
    }
}
