use sarthi_core::domain::query::{Crop, Topic};
use sarthi_core::knowledge::KnowledgeStore;
use sarthi_db::{
    connect_with_settings, migrations, KnowledgeRepository, KnowledgeSeedDataset,
    SqlKnowledgeRepository,
};

type SeedTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

#[tokio::test]
async fn seeded_file_database_survives_reopen() -> SeedTestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let url = format!("sqlite://{}", dir.path().join("sarthi.db").display());

    {
        let pool = connect_with_settings(&url, 1, 30).await.map_err(|err| err.to_string())?;
        migrations::run_pending(&pool).await.map_err(|err| err.to_string())?;
        KnowledgeSeedDataset::load(&pool).await.map_err(|err| err.to_string())?;
        pool.close().await;
    }

    let pool = connect_with_settings(&url, 1, 30).await.map_err(|err| err.to_string())?;
    let verification = KnowledgeSeedDataset::verify(&pool).await.map_err(|err| err.to_string())?;
    require!(verification.all_present, "seed rows missing after reopen: {:?}", verification.checks);

    let repo = SqlKnowledgeRepository::new(pool.clone());
    let count = repo.count().await.map_err(|err| err.to_string())?;
    require!(count as usize == KnowledgeSeedDataset::entries().len());

    let store = repo.load_store().await.map_err(|err| err.to_string())?;
    let flowering = store
        .lookup_stage(Crop::Mustard, Topic::Irrigation, "Flowering")
        .entry()
        .ok_or_else(|| "flowering advice should exist".to_string())?;
    require!(flowering.growth_stage.as_deref() == Some("flowering"));

    let wildcard = store
        .lookup(Crop::Mustard, Topic::Irrigation)
        .entry()
        .ok_or_else(|| "mustard irrigation advice should exist".to_string())?;
    require!(wildcard.advice_text.contains("25-30 दिन"));

    pool.close().await;
    Ok(())
}

#[tokio::test]
async fn every_seeded_key_is_reachable_from_the_pipeline_snapshot() -> SeedTestResult {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.map_err(|err| err.to_string())?;
    migrations::run_pending(&pool).await.map_err(|err| err.to_string())?;
    KnowledgeSeedDataset::load(&pool).await.map_err(|err| err.to_string())?;

    let store =
        SqlKnowledgeRepository::new(pool.clone()).load_store().await.map_err(|err| err.to_string())?;

    for entry in KnowledgeSeedDataset::entries() {
        let found = match entry.growth_stage.as_deref() {
            Some(stage) => store.lookup_stage(entry.crop, entry.topic, stage).entry(),
            None => store.lookup(entry.crop, entry.topic).entry(),
        };
        require!(found == Some(&entry), "seeded entry {} not served back", entry.key());
    }

    pool.close().await;
    Ok(())
}
