use sarthi_core::domain::knowledge::KnowledgeEntry;
use sarthi_core::domain::query::{Crop, Topic};

use crate::connection::DbPool;
use crate::repositories::{KnowledgeRepository, RepositoryError, SqlKnowledgeRepository};

pub const SEED_SOURCE: &str = "curated:jaipur-rabi";

/// Curated Jaipur rabi advice for wheat and mustard.
const SEED_ENTRIES: &[SeedEntry] = &[
    SeedEntry {
        crop: Crop::Wheat,
        topic: Topic::Irrigation,
        growth_stage: None,
        advice_text: "पहली सिंचाई बुवाई के 20-25 दिन बाद करें, फिर वर्षा के अनुसार हर 20-25 दिन पर सिंचाई करें।",
    },
    SeedEntry {
        crop: Crop::Wheat,
        topic: Topic::Irrigation,
        growth_stage: Some("crown root initiation"),
        advice_text: "शिखर जड़ अवस्था (बुवाई के 20-25 दिन बाद) गेहूं की सबसे महत्वपूर्ण सिंचाई है, इसे न छोड़ें।",
    },
    SeedEntry {
        crop: Crop::Wheat,
        topic: Topic::Fertilizer,
        growth_stage: None,
        advice_text: "मिट्टी जांच के अनुसार प्रति हेक्टेयर 120 किग्रा नाइट्रोजन, 60 किग्रा फॉस्फोरस और 40 किग्रा पोटाश किस्तों में दें।",
    },
    SeedEntry {
        crop: Crop::Wheat,
        topic: Topic::Pest,
        growth_stage: None,
        advice_text: "माहू (चैंपा) और रतुआ मुख्य खतरे हैं। माहू के लिए इमिडाक्लोप्रिड 17.8% एसएल का 1 मिली/लीटर पानी में घोलकर छिड़काव करें।",
    },
    SeedEntry {
        crop: Crop::Mustard,
        topic: Topic::Irrigation,
        growth_stage: None,
        advice_text: "पहली सिंचाई बुवाई के 25-30 दिन बाद करें। फूल आने और फली बनने की अवस्था में सिंचाई सबसे ज़रूरी है।",
    },
    SeedEntry {
        crop: Crop::Mustard,
        topic: Topic::Irrigation,
        growth_stage: Some("flowering"),
        advice_text: "फूल आने की अवस्था सरसों के लिए नाज़ुक है, मिट्टी सूखी हो तो सिंचाई करें ताकि फलियां अच्छी बनें।",
    },
    SeedEntry {
        crop: Crop::Mustard,
        topic: Topic::Irrigation,
        growth_stage: Some("pod formation"),
        advice_text: "फली बनने की अवस्था सरसों की अंतिम ज़रूरी सिंचाई है, हल्की सिंचाई से दाने अच्छे भरते हैं।",
    },
    SeedEntry {
        crop: Crop::Mustard,
        topic: Topic::Fertilizer,
        growth_stage: None,
        advice_text: "मिट्टी जांच के अनुसार प्रति हेक्टेयर 60 किग्रा नाइट्रोजन, 40 किग्रा फॉस्फोरस और 20 किग्रा पोटाश किस्तों में दें।",
    },
    SeedEntry {
        crop: Crop::Mustard,
        topic: Topic::Pest,
        growth_stage: None,
        advice_text: "माहू, अल्टरनेरिया झुलसा और सफ़ेद लट पर नज़र रखें। सफ़ेद लट के लिए बुवाई से पहले फोरेट 10जी दाने 10 किग्रा/हेक्टेयर की दर से प्रयोग करें।",
    },
];

#[derive(Debug, Clone, Copy)]
struct SeedEntry {
    crop: Crop,
    topic: Topic,
    growth_stage: Option<&'static str>,
    advice_text: &'static str,
}

impl SeedEntry {
    fn to_entry(self) -> KnowledgeEntry {
        let entry = KnowledgeEntry::new(self.crop, self.topic, self.advice_text);
        match self.growth_stage {
            Some(stage) => entry.with_stage(stage),
            None => entry,
        }
    }

    fn label(&self) -> String {
        self.to_entry().key().to_string()
    }
}

/// Deterministic knowledge fixtures replacing the one-off ETL script.
pub struct KnowledgeSeedDataset;

impl KnowledgeSeedDataset {
    pub fn entries() -> Vec<KnowledgeEntry> {
        SEED_ENTRIES.iter().map(|seed| seed.to_entry()).collect()
    }

    /// Upserts every curated entry. Safe to run repeatedly.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let repo = SqlKnowledgeRepository::new(pool.clone());
        let mut seeded = Vec::with_capacity(SEED_ENTRIES.len());
        for seed in SEED_ENTRIES {
            repo.upsert(&seed.to_entry(), SEED_SOURCE).await?;
            seeded.push(seed.label());
        }
        Ok(SeedResult { entries_seeded: seeded })
    }

    /// Checks that every curated entry is present with its curated text.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let stored = SqlKnowledgeRepository::new(pool.clone()).load_all().await?;

        let checks = SEED_ENTRIES
            .iter()
            .map(|seed| {
                let expected = seed.to_entry();
                let present = stored.iter().any(|entry| {
                    entry.key() == expected.key() && entry.advice_text == expected.advice_text
                });
                (seed.label(), present)
            })
            .collect::<Vec<_>>();

        Ok(VerificationResult { all_present: checks.iter().all(|(_, ok)| *ok), checks })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM knowledge_entry WHERE source = ?1")
            .bind(SEED_SOURCE)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub entries_seeded: Vec<String>,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
