use std::collections::BTreeMap;

use crate::domain::knowledge::{normalize_stage, KnowledgeEntry, KnowledgeKey};
use crate::domain::query::{Crop, Topic};
use crate::errors::KnowledgeLoadError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KnowledgeLookup<'a> {
    Found(&'a KnowledgeEntry),
    /// Normal "try another source" signal, not an error.
    NotFound,
}

impl<'a> KnowledgeLookup<'a> {
    pub fn entry(self) -> Option<&'a KnowledgeEntry> {
        match self {
            Self::Found(entry) => Some(entry),
            Self::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

pub trait KnowledgeStore: Send + Sync {
    /// Returns the stage-independent entry for `(crop, topic)`.
    fn lookup(&self, crop: Crop, topic: Topic) -> KnowledgeLookup<'_>;

    /// Prefers the entry for `growth_stage`, falling back to the stage-independent one.
    fn lookup_stage(&self, crop: Crop, topic: Topic, growth_stage: &str) -> KnowledgeLookup<'_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Immutable snapshot of the knowledge table, built once at startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryKnowledgeStore {
    entries: BTreeMap<KnowledgeKey, KnowledgeEntry>,
}

impl InMemoryKnowledgeStore {
    pub fn from_entries(
        entries: impl IntoIterator<Item = KnowledgeEntry>,
    ) -> Result<Self, KnowledgeLoadError> {
        let mut indexed = BTreeMap::new();
        for mut entry in entries {
            entry.growth_stage = entry
                .growth_stage
                .as_deref()
                .map(normalize_stage)
                .filter(|stage| !stage.is_empty());
            let key = entry.key();

            if !entry.crop.is_known() || entry.topic == Topic::Other {
                return Err(KnowledgeLoadError::UnroutableKey(key));
            }
            if entry.advice_text.trim().is_empty() {
                return Err(KnowledgeLoadError::EmptyAdvice(key));
            }
            if indexed.contains_key(&key) {
                return Err(KnowledgeLoadError::DuplicateKey(key));
            }
            indexed.insert(key, entry);
        }
        Ok(Self { entries: indexed })
    }

    pub fn entries(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.values()
    }

    fn get(&self, crop: Crop, topic: Topic, growth_stage: Option<String>) -> KnowledgeLookup<'_> {
        match self.entries.get(&KnowledgeKey { crop, topic, growth_stage }) {
            Some(entry) => KnowledgeLookup::Found(entry),
            None => KnowledgeLookup::NotFound,
        }
    }
}

impl KnowledgeStore for InMemoryKnowledgeStore {
    fn lookup(&self, crop: Crop, topic: Topic) -> KnowledgeLookup<'_> {
        if !crop.is_known() || topic == Topic::Other {
            return KnowledgeLookup::NotFound;
        }
        self.get(crop, topic, None)
    }

    fn lookup_stage(&self, crop: Crop, topic: Topic, growth_stage: &str) -> KnowledgeLookup<'_> {
        if !crop.is_known() || topic == Topic::Other {
            return KnowledgeLookup::NotFound;
        }
        let stage = normalize_stage(growth_stage);
        if stage.is_empty() {
            return self.get(crop, topic, None);
        }
        match self.get(crop, topic, Some(stage)) {
            KnowledgeLookup::NotFound => self.get(crop, topic, None),
            found => found,
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
