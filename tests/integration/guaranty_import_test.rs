//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 保修批量导入集成测试

#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{memory_db, setup_logging, workbook_bytes, MemoryCache};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use shopsync::config::GuarantyConfig;
use shopsync::database::entity::guaranty;
use shopsync::guaranty::{GuarantyError, GuarantyRow, GuarantyService};
use shopsync::storage::{FileStorage, ObjectFileStorage};
use std::sync::Arc;

fn service(
    db: sea_orm::DatabaseConnection,
    storage: Arc<ObjectFileStorage>,
    config: GuarantyConfig,
) -> (GuarantyService, Arc<MemoryCache>) {
    let cache = Arc::new(MemoryCache::default());
    (
        GuarantyService::new(db, cache.clone(), storage, config),
        cache,
    )
}

fn rows(n: usize) -> Vec<GuarantyRow> {
    (0..n)
        .map(|i| GuarantyRow {
            product_serial_number: format!("SN-{:05}", i),
            guaranty_serial: format!("GW-{:05}", i),
            product_name: "Widget".to_string(),
            guaranty_days: 180,
            produced_at: "2024-03-01".to_string(),
        })
        .collect()
}

#[tokio::test]
async fn test_scenario_row_is_imported_with_marker_stripped() {
    setup_logging();
    let db = memory_db().await;
    let storage = Arc::new(ObjectFileStorage::in_memory());
    let (service, _) = service(db.clone(), storage.clone(), GuarantyConfig::default());

    let bytes = workbook_bytes(&[("SN-100", "GW-500", "Widget", 365, "2024-01-01 10:00 ق.ظ")]);
    storage.put("scenario.xlsx", Bytes::from(bytes)).await.unwrap();

    let report = service.import_object("scenario.xlsx").await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.batches, 1);

    let row = guaranty::Entity::find()
        .filter(guaranty::Column::GuarantySerial.eq("GW-500"))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.product_serial_number, "SN-100");
    assert_eq!(row.product_name, "Widget");
    assert_eq!(row.guaranty_days, 365);
    assert_eq!(row.produced_at, "2024-01-01 10:00");
}

#[tokio::test]
async fn test_importing_same_file_twice() {
    let db = memory_db().await;
    let storage = Arc::new(ObjectFileStorage::in_memory());
    let (service, _) = service(db.clone(), storage, GuarantyConfig::default());

    let bytes = workbook_bytes(&[
        ("SN-1", "GW-1", "Widget", 30, "2024-01-01 08:00 ق.ظ"),
        ("SN-2", "GW-2", "Gadget", 60, "2024-01-02 09:15 ب.ظ"),
    ]);

    let first = service.import_bytes(&bytes).await.unwrap();
    assert_eq!(first.inserted, 2);

    let before = guaranty::Entity::find().all(&db).await.unwrap();
    let second = service.import_bytes(&bytes).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.skipped, 2);
    assert_eq!(second.failed_batches, 0);

    let after = guaranty::Entity::find().all(&db).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_batch_boundaries() {
    let db = memory_db().await;
    let (service, _) = service(
        db.clone(),
        Arc::new(ObjectFileStorage::in_memory()),
        GuarantyConfig::default(),
    );

    let report = service.insert_rows(rows(501)).await;
    assert_eq!(report.batches, 2);
    assert_eq!(report.inserted, 501);
    assert_eq!(guaranty::Entity::find().count(&db).await.unwrap(), 501);
}

#[tokio::test]
async fn test_small_batches_with_partial_duplicates() {
    let db = memory_db().await;
    let (service, _) = service(
        db.clone(),
        Arc::new(ObjectFileStorage::in_memory()),
        GuarantyConfig {
            batch_size: 2,
            ..GuarantyConfig::default()
        },
    );

    service.insert_rows(rows(3)).await;
    let report = service.insert_rows(rows(5)).await;
    assert_eq!(report.batches, 3);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped, 3);
    assert_eq!(guaranty::Entity::find().count(&db).await.unwrap(), 5);
}

#[tokio::test]
async fn test_rejected_rows_do_not_block_valid_rows() {
    let db = memory_db().await;
    let (service, _) = service(
        db.clone(),
        Arc::new(ObjectFileStorage::in_memory()),
        GuarantyConfig::default(),
    );

    let bytes = workbook_bytes(&[
        ("SN-1", "GW-1", "Widget", 30, "2024-01-01"),
        ("SN-2", "GW-2", "Widget", -5, "2024-01-01"),
        ("SN-3", "GW-3", "Widget", 30, "2024-01-01"),
    ]);
    let report = service.import_bytes(&bytes).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.rejected, 1);
}

#[tokio::test]
async fn test_stage_import_and_lookup_cache() {
    let db = memory_db().await;
    let storage = Arc::new(ObjectFileStorage::in_memory());
    let (service, cache) = service(db, storage.clone(), GuarantyConfig::default());

    let bytes = Bytes::from(workbook_bytes(&[("SN-7", "GW-7", "Widget", 7, "2024-07-07")]));
    let name = service.stage_import("batch.ODS", bytes.clone()).await.unwrap();
    assert!(name.ends_with(".ODS"));
    assert_eq!(storage.get(&name).await.unwrap(), bytes);
    assert_eq!(cache.keys(), vec![format!("file:{}", name)]);

    assert!(matches!(
        service.stage_import("batch.pdf", bytes).await,
        Err(GuarantyError::UnsupportedFile(_))
    ));

    service.import_object(&name).await.unwrap();
    let found = service.lookup("GW-7").await.unwrap();
    assert_eq!(found.guaranty_days, 7);
    assert_eq!(cache.ttl_of("guaranty:GW-7"), Some(3600));
}
