use std::env;
use std::sync::Arc;

use prospect_data_api::collector::DataCollector;
use prospect_data_api::db::Database;
use prospect_data_api::db_storage::ProspectCacheStorage;
use prospect_data_api::models::{DataQuality, ProspectInput};
use prospect_data_api::prospect_cache::ProspectCacheStore;
use serde_json::json;

/// Postgres smoke test for the prospect cache table.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn prospect_cache_postgres_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = ProspectCacheStorage::new(db.pool.clone());
    storage.ensure_schema().await?;
    let storage: Arc<dyn ProspectCacheStore> = Arc::new(storage);
    let collector = DataCollector::new(storage.clone());

    // Unique name so repeated runs never hit an existing row.
    let prospect = ProspectInput::new(format!(
        "Smoke Test {}",
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
    .with_state("IL");

    let first = collector.collect_prospect_data(&prospect, false).await?;
    assert!(!first.from_cache);

    let second = collector.collect_prospect_data(&prospect, false).await?;
    assert!(second.from_cache);

    for tool in ["sec_insider_search", "fec_contributions", "county_assessor"] {
        assert!(
            collector
                .update_prospect_tool_result(&prospect, tool, json!({"tool": tool}), None)
                .await?
        );
    }

    let stored = storage
        .get(&first.record.cache_key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("record missing after write"))?;
    assert_eq!(stored.data_quality, DataQuality::Complete);

    let recent = storage.list_recent(5).await?;
    assert!(recent.iter().any(|r| r.cache_key == stored.cache_key));
    Ok(())
}
