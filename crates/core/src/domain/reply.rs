use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOrigin {
    Knowledge,
    Weather,
    Price,
    Generative,
    StaticFallback,
}

impl ReplyOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Knowledge => "knowledge",
            Self::Weather => "weather",
            Self::Price => "price",
            Self::Generative => "generative",
            Self::StaticFallback => "static_fallback",
        }
    }
}

impl fmt::Display for ReplyOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    /// Pipeline branch that produced the text. Never rendered to the farmer.
    pub origin: ReplyOrigin,
}

impl Reply {
    pub fn new(text: impl Into<String>, origin: ReplyOrigin) -> Self {
        Self { text: text.into(), origin }
    }
}
