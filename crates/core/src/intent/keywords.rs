//! Bilingual keyword tables for crop, topic, and growth stage matching.
//!
//! Tables are plain data: built once from [`KeywordTable::bilingual_default`]
//! or read from a TOML file at startup, then shared read-only.
//!
//! A keyword only matches at the start of a word, so `भाव` (rate) does not
//! fire inside `प्रभाव` (effect). Stems such as `irrigat` still match any
//! word they begin; keywords marked whole-word must match the entire word.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::knowledge::normalize_stage;
use crate::domain::query::{Crop, Topic};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyword {
    text: String,
    whole_word: bool,
}

impl Keyword {
    /// Matches any word starting with `text`.
    pub fn stem(text: &str) -> Self {
        Self { text: normalize_message(text), whole_word: false }
    }

    /// Matches only a complete word (or word sequence) equal to `text`.
    pub fn word(text: &str) -> Self {
        Self { text: normalize_message(text), whole_word: true }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_whole_word(&self) -> bool {
        self.whole_word
    }

    /// `message` must already be normalized with [`normalize_message`].
    pub fn matches(&self, message: &str) -> bool {
        if self.text.is_empty() {
            return false;
        }
        message.match_indices(self.text.as_str()).any(|(start, found)| {
            let starts_word = message[..start].is_empty() || message[..start].ends_with(' ');
            let end = start + found.len();
            let ends_word = message[end..].is_empty() || message[end..].starts_with(' ');
            starts_word && (!self.whole_word || ends_word)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordTable {
    crops: Vec<(Keyword, Crop)>,
    topics: Vec<(Keyword, Topic)>,
    stages: Vec<(Keyword, String)>,
}

#[derive(Debug, Error)]
pub enum KeywordTableError {
    #[error("could not read keyword file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse keyword file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("keyword table entry `{keyword}` maps to `{target}`, which is not a routable value")]
    UnroutableTarget { keyword: String, target: String },
    #[error("keyword table has no {0} keywords")]
    Empty(&'static str),
}

const CROP_KEYWORDS: &[(&str, Crop)] = &[
    ("wheat", Crop::Wheat),
    ("गेहूं", Crop::Wheat),
    ("गेहूँ", Crop::Wheat),
    ("गेंहू", Crop::Wheat),
    ("gehun", Crop::Wheat),
    ("gehoon", Crop::Wheat),
    ("gehu", Crop::Wheat),
    ("mustard", Crop::Mustard),
    ("सरसों", Crop::Mustard),
    ("सरसो", Crop::Mustard),
    ("sarson", Crop::Mustard),
    ("sarso", Crop::Mustard),
    ("rapeseed", Crop::Mustard),
];

const TOPIC_KEYWORDS: &[(&str, Topic)] = &[
    ("irrigat", Topic::Irrigation),
    ("watering", Topic::Irrigation),
    ("सिंचाई", Topic::Irrigation),
    ("पानी", Topic::Irrigation),
    ("sinchai", Topic::Irrigation),
    ("paani", Topic::Irrigation),
    ("pest", Topic::Pest),
    ("insect", Topic::Pest),
    ("disease", Topic::Pest),
    ("aphid", Topic::Pest),
    ("कीड़", Topic::Pest),
    ("कीट", Topic::Pest),
    ("रोग", Topic::Pest),
    ("बीमारी", Topic::Pest),
    ("माहू", Topic::Pest),
    ("keeda", Topic::Pest),
    ("fertili", Topic::Fertilizer),
    ("urea", Topic::Fertilizer),
    ("manure", Topic::Fertilizer),
    ("खाद", Topic::Fertilizer),
    ("उर्वरक", Topic::Fertilizer),
    ("यूरिया", Topic::Fertilizer),
    ("khaad", Topic::Fertilizer),
    ("khad", Topic::Fertilizer),
    ("weather", Topic::Weather),
    ("forecast", Topic::Weather),
    ("rainfall", Topic::Weather),
    ("temperature", Topic::Weather),
    ("मौसम", Topic::Weather),
    ("बारिश", Topic::Weather),
    ("वर्षा", Topic::Weather),
    ("तापमान", Topic::Weather),
    ("mausam", Topic::Weather),
    ("barish", Topic::Weather),
    ("price", Topic::Price),
    ("mandi", Topic::Price),
    ("market", Topic::Price),
    ("भाव", Topic::Price),
    ("दाम", Topic::Price),
    ("कीमत", Topic::Price),
    ("मंडी", Topic::Price),
    ("bhav", Topic::Price),
    ("daam", Topic::Price),
];

/// Stage labels match the `growth_stage` values of the curated knowledge rows.
const STAGE_KEYWORDS: &[(&str, &str)] = &[
    ("crown root", "crown root initiation"),
    ("cri", "crown root initiation"),
    ("शिखर जड़", "crown root initiation"),
    ("shikhar jad", "crown root initiation"),
    ("flower", "flowering"),
    ("bloom", "flowering"),
    ("फूल", "flowering"),
    ("phool", "flowering"),
    ("pod", "pod formation"),
    ("फली", "pod formation"),
    ("फलिय", "pod formation"),
    ("phali", "pod formation"),
];

// Short keywords that also begin unrelated words: khada, दामाद, podcast.
const WHOLE_WORD_KEYWORDS: &[&str] = &["भाव", "bhav", "दाम", "daam", "khad", "cri", "pod"];

fn default_keyword(text: &str) -> Keyword {
    if WHOLE_WORD_KEYWORDS.contains(&text) {
        Keyword::word(text)
    } else {
        Keyword::stem(text)
    }
}

impl KeywordTable {
    pub fn new(
        crops: Vec<(Keyword, Crop)>,
        topics: Vec<(Keyword, Topic)>,
        stages: Vec<(Keyword, String)>,
    ) -> Self {
        Self {
            crops: crops.into_iter().filter(|(keyword, _)| !keyword.text.is_empty()).collect(),
            topics: topics.into_iter().filter(|(keyword, _)| !keyword.text.is_empty()).collect(),
            stages: stages
                .into_iter()
                .map(|(keyword, stage)| (keyword, normalize_stage(&stage)))
                .filter(|(keyword, stage)| !keyword.text.is_empty() && !stage.is_empty())
                .collect(),
        }
    }

    /// Hindi, English, and romanized Hindi keywords for the Jaipur rabi crops.
    pub fn bilingual_default() -> Self {
        Self::new(
            CROP_KEYWORDS.iter().map(|(keyword, crop)| (default_keyword(keyword), *crop)).collect(),
            TOPIC_KEYWORDS
                .iter()
                .map(|(keyword, topic)| (default_keyword(keyword), *topic))
                .collect(),
            STAGE_KEYWORDS
                .iter()
                .map(|(keyword, stage)| (default_keyword(keyword), stage.to_string()))
                .collect(),
        )
    }

    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, KeywordTableError> {
        let file: KeywordFile = toml::from_str(raw)
            .map_err(|source| KeywordTableError::ParseFile { path: path.to_path_buf(), source })?;

        let mut crops = Vec::with_capacity(file.crops.len());
        for entry in file.crops {
            match Crop::parse(&entry.crop) {
                Some(crop) if crop.is_known() => {
                    crops.push((file_keyword(&entry.keyword, entry.whole_word), crop))
                }
                _ => {
                    return Err(KeywordTableError::UnroutableTarget {
                        keyword: entry.keyword,
                        target: entry.crop,
                    })
                }
            }
        }

        let mut topics = Vec::with_capacity(file.topics.len());
        for entry in file.topics {
            match Topic::parse(&entry.topic) {
                Some(topic) if topic != Topic::Other => {
                    topics.push((file_keyword(&entry.keyword, entry.whole_word), topic))
                }
                _ => {
                    return Err(KeywordTableError::UnroutableTarget {
                        keyword: entry.keyword,
                        target: entry.topic,
                    })
                }
            }
        }

        let stages = file
            .stages
            .into_iter()
            .map(|entry| (file_keyword(&entry.keyword, entry.whole_word), entry.stage))
            .collect();

        let table = Self::new(crops, topics, stages);
        if table.crops.is_empty() {
            return Err(KeywordTableError::Empty("crop"));
        }
        if table.topics.is_empty() {
            return Err(KeywordTableError::Empty("topic"));
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, KeywordTableError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| KeywordTableError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw, path)
    }

    /// Falls back to the built-in table when no path is configured.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, KeywordTableError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::bilingual_default()),
        }
    }

    pub fn crops(&self) -> &[(Keyword, Crop)] {
        &self.crops
    }

    pub fn topics(&self) -> &[(Keyword, Topic)] {
        &self.topics
    }

    pub fn stages(&self) -> &[(Keyword, String)] {
        &self.stages
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::bilingual_default()
    }
}

fn file_keyword(text: &str, whole_word: bool) -> Keyword {
    if whole_word {
        Keyword::word(text)
    } else {
        Keyword::stem(text)
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_punctuation() || matches!(c, '।' | '॥' | '“' | '”' | '‘' | '’')
}

/// Lowercases and collapses punctuation and whitespace runs to single spaces.
pub fn normalize_message(raw: &str) -> String {
    raw.to_lowercase().split(is_separator).filter(|word| !word.is_empty()).collect::<Vec<_>>().join(" ")
}

#[derive(Debug, Deserialize)]
struct KeywordFile {
    #[serde(default)]
    crops: Vec<CropKeyword>,
    #[serde(default)]
    topics: Vec<TopicKeyword>,
    #[serde(default)]
    stages: Vec<StageKeyword>,
}

#[derive(Debug, Deserialize)]
struct CropKeyword {
    keyword: String,
    crop: String,
    #[serde(default)]
    whole_word: bool,
}

#[derive(Debug, Deserialize)]
struct TopicKeyword {
    keyword: String,
    topic: String,
    #[serde(default)]
    whole_word: bool,
}

#[derive(Debug, Deserialize)]
struct StageKeyword {
    keyword: String,
    stage: String,
    #[serde(default)]
    whole_word: bool,
}
