use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Crop {
    Wheat,
    Mustard,
    Unknown,
}

impl Crop {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wheat => "wheat",
            Self::Mustard => "mustard",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wheat" => Some(Self::Wheat),
            "mustard" => Some(Self::Mustard),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    pub fn hindi_name(&self) -> &'static str {
        match self {
            Self::Wheat => "गेहूं",
            Self::Mustard => "सरसों",
            Self::Unknown => "फसल",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject of a farmer's question.
///
/// Variant order is the tie-break precedence used when one message matches
/// keywords of several topics: earlier variants win.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Irrigation,
    Pest,
    Fertilizer,
    Weather,
    Price,
    Other,
}

impl Topic {
    pub const PRECEDENCE: [Topic; 6] = [
        Topic::Irrigation,
        Topic::Pest,
        Topic::Fertilizer,
        Topic::Weather,
        Topic::Price,
        Topic::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Irrigation => "irrigation",
            Self::Pest => "pest",
            Self::Fertilizer => "fertilizer",
            Self::Weather => "weather",
            Self::Price => "price",
            Self::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "irrigation" => Some(Self::Irrigation),
            "pest" => Some(Self::Pest),
            "fertilizer" => Some(Self::Fertilizer),
            "weather" => Some(Self::Weather),
            "price" => Some(Self::Price),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn hindi_label(&self) -> &'static str {
        match self {
            Self::Irrigation => "सिंचाई",
            Self::Pest => "कीट एवं रोग प्रबंधन",
            Self::Fertilizer => "खाद एवं उर्वरक",
            Self::Weather => "मौसम",
            Self::Price => "मंडी भाव",
            Self::Other => "सामान्य",
        }
    }

    /// Topics answered from the static knowledge store.
    pub fn is_agronomic(&self) -> bool {
        matches!(self, Self::Irrigation | Self::Pest | Self::Fertilizer)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub raw_text: String,
    pub crop: Crop,
    pub topic: Topic,
    /// Growth stage named in the question, used to prefer stage-specific advice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_stage: Option<String>,
    pub location: String,
}

impl Query {
    pub fn new(
        raw_text: impl Into<String>,
        crop: Crop,
        topic: Topic,
        location: impl Into<String>,
    ) -> Self {
        Self { raw_text: raw_text.into(), crop, topic, growth_stage: None, location: location.into() }
    }

    pub fn with_stage(mut self, growth_stage: impl Into<String>) -> Self {
        self.growth_stage = Some(growth_stage.into());
        self
    }
}
