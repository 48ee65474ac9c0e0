//! Rule-based intent extraction.
//!
//! The orchestrator only sees the [`IntentExtractor`] trait, so the keyword
//! matcher here can later be swapped for a statistical classifier.

pub mod keywords;

use std::sync::Arc;

use crate::domain::query::{Crop, Query, Topic};

pub use keywords::{normalize_message, Keyword, KeywordTable, KeywordTableError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intent {
    pub crop: Crop,
    pub topic: Topic,
    pub growth_stage: Option<String>,
    pub matched_keywords: Vec<String>,
}

pub trait IntentExtractor: Send + Sync {
    /// Never fails: unmatched text yields `Crop::Unknown` / `Topic::Other`.
    fn classify(&self, raw_text: &str) -> Intent;

    fn extract(&self, raw_text: &str, location: &str) -> Query {
        let intent = self.classify(raw_text);
        let query = Query::new(raw_text, intent.crop, intent.topic, location);
        match intent.growth_stage {
            Some(stage) => query.with_stage(stage),
            None => query,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct KeywordIntentExtractor {
    table: Arc<KeywordTable>,
}

impl KeywordIntentExtractor {
    pub fn new(table: KeywordTable) -> Self {
        Self { table: Arc::new(table) }
    }

    pub fn shared(table: Arc<KeywordTable>) -> Self {
        Self { table }
    }
}

impl IntentExtractor for KeywordIntentExtractor {
    fn classify(&self, raw_text: &str) -> Intent {
        let normalized = normalize_message(raw_text);
        let mut matched_keywords = Vec::new();

        let crop = match self.table.crops().iter().find(|(keyword, _)| keyword.matches(&normalized))
        {
            Some((keyword, crop)) => {
                matched_keywords.push(keyword.text().to_owned());
                *crop
            }
            None => Crop::Unknown,
        };

        let mut topic = Topic::Other;
        for (keyword, candidate) in self.table.topics() {
            if keyword.matches(&normalized) {
                matched_keywords.push(keyword.text().to_owned());
                topic = topic.min(*candidate);
            }
        }

        let growth_stage =
            match self.table.stages().iter().find(|(keyword, _)| keyword.matches(&normalized)) {
                Some((keyword, stage)) => {
                    matched_keywords.push(keyword.text().to_owned());
                    Some(stage.clone())
                }
                None => None,
            };

        Intent { crop, topic, growth_stage, matched_keywords }
    }
}

#[cfg(test)]
mod tests {
    use super::{IntentExtractor, KeywordIntentExtractor, KeywordTable};
    use crate::domain::query::{Crop, Topic};

    fn extractor() -> KeywordIntentExtractor {
        KeywordIntentExtractor::new(KeywordTable::bilingual_default())
    }

    #[test]
    fn hindi_mustard_irrigation_question_is_classified() {
        let query = extractor().extract("सरसों के लिए सिंचाई?", "Jaipur, Rajasthan");

        assert_eq!(query.crop, Crop::Mustard);
        assert_eq!(query.topic, Topic::Irrigation);
        assert_eq!(query.growth_stage, None);
        assert_eq!(query.location, "Jaipur, Rajasthan");
        assert_eq!(query.raw_text, "सरसों के लिए सिंचाई?");
    }

    #[test]
    fn english_matching_ignores_case() {
        let intent = extractor().classify("When should I apply UREA to my WHEAT?");

        assert_eq!(intent.crop, Crop::Wheat);
        assert_eq!(intent.topic, Topic::Fertilizer);
        assert!(intent.matched_keywords.contains(&"urea".to_string()));
    }

    #[test]
    fn romanized_hindi_is_recognized() {
        let intent = extractor().classify("gehun ka mandi bhav kya hai");

        assert_eq!(intent.crop, Crop::Wheat);
        assert_eq!(intent.topic, Topic::Price);
    }

    #[test]
    fn effect_is_not_mistaken_for_market_rate() {
        let intent = extractor().classify("गेहूं पर पाले का प्रभाव");
        assert_eq!(intent.crop, Crop::Wheat);
        assert_eq!(intent.topic, Topic::Other);
        assert!(!intent.matched_keywords.contains(&"भाव".to_string()));

        let romanized = extractor().classify("gehun par pale ka prabhav");
        assert_eq!(romanized.topic, Topic::Other);

        assert_eq!(extractor().classify("सरसों का भाव क्या है?").topic, Topic::Price);
    }

    #[test]
    fn standing_crop_is_not_mistaken_for_fertilizer() {
        let intent = extractor().classify("khadi fasal gehun");
        assert_eq!(intent.topic, Topic::Other);

        assert_eq!(extractor().classify("gehun ke liye khad").topic, Topic::Fertilizer);
    }

    #[test]
    fn irrigation_beats_price_when_both_match() {
        let english = extractor().classify("wheat irrigation schedule and mandi price");
        assert_eq!(english.topic, Topic::Irrigation);

        let reversed = extractor().classify("सरसों का भाव और सिंचाई");
        assert_eq!(reversed.topic, Topic::Irrigation);
    }

    #[test]
    fn full_precedence_chain_is_fixed() {
        let extractor = extractor();
        assert_eq!(extractor.classify("pest and fertilizer").topic, Topic::Pest);
        assert_eq!(extractor.classify("fertilizer before the weather turns").topic, Topic::Fertilizer);
        assert_eq!(extractor.classify("weather and market price").topic, Topic::Weather);
        assert_eq!(extractor.classify("mandi price").topic, Topic::Price);
    }

    #[test]
    fn first_crop_keyword_in_table_order_wins() {
        let intent = extractor().classify("mustard after wheat rotation");
        assert_eq!(intent.crop, Crop::Wheat);
    }

    #[test]
    fn growth_stage_is_carried_into_the_query() {
        let flowering = extractor().extract("सरसों में फूल आने पर सिंचाई?", "Jaipur");
        assert_eq!(flowering.crop, Crop::Mustard);
        assert_eq!(flowering.topic, Topic::Irrigation);
        assert_eq!(flowering.growth_stage.as_deref(), Some("flowering"));

        let pods = extractor().classify("mustard irrigation at pod stage");
        assert_eq!(pods.growth_stage.as_deref(), Some("pod formation"));

        let crown_root = extractor().classify("wheat CRI irrigation");
        assert_eq!(crown_root.growth_stage.as_deref(), Some("crown root initiation"));
    }

    #[test]
    fn gibberish_falls_back_to_unknown_and_other() {
        let intent = extractor().classify("asdf qwerty zzz 123");

        assert_eq!(intent.crop, Crop::Unknown);
        assert_eq!(intent.topic, Topic::Other);
        assert_eq!(intent.growth_stage, None);
        assert!(intent.matched_keywords.is_empty());
    }

    #[test]
    fn empty_input_is_classified_without_failing() {
        let query = extractor().extract("", "Jaipur");
        assert_eq!((query.crop, query.topic), (Crop::Unknown, Topic::Other));
    }

    #[test]
    fn topic_without_crop_keeps_unknown_crop() {
        let intent = extractor().classify("कल मौसम कैसा रहेगा?");
        assert_eq!(intent.crop, Crop::Unknown);
        assert_eq!(intent.topic, Topic::Weather);
    }
}
