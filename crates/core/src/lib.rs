pub mod compose;
pub mod config;
pub mod domain;
pub mod errors;
pub mod intent;
pub mod knowledge;
pub mod market;
pub mod pipeline;
pub mod providers;

pub use domain::knowledge::{KnowledgeEntry, KnowledgeKey};
pub use domain::price::{ObservedPrice, PriceQuote, PriceSourceTier};
pub use domain::query::{Crop, Query, Topic};
pub use domain::reply::{Reply, ReplyOrigin};
pub use domain::weather::WeatherSnapshot;
pub use errors::{
    ApplicationError, GenerativeUnavailable, InterfaceError, KnowledgeLoadError, PriceUnavailable,
    ProviderError, WeatherUnavailable,
};
pub use intent::{IntentExtractor, KeywordIntentExtractor, KeywordTable};
pub use knowledge::{InMemoryKnowledgeStore, KnowledgeLookup, KnowledgeStore};
pub use market::TieredMarketPriceProvider;
pub use pipeline::{Orchestrator, PipelineRun, PipelineSettings};
pub use providers::{GenerativeFallback, MarketPriceProvider, PriceSource, WeatherProvider};
