//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 写后管道集成测试
//! 前半部分用内存缓存直接驱动分发器，后半部分需要本地Redis，不可用时跳过

#[path = "../common/mod.rs"]
mod common;

use bytes::Bytes;
use common::{
    eventually, is_redis_available, memory_db, setup_logging, test_config, workbook_bytes,
    MemoryCache,
};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use shopsync::cart::{CartService, CartUpdate, QuantityAction};
use shopsync::config::{CartConfig, GuarantyConfig};
use shopsync::database::{self, entity::guaranty};
use shopsync::guaranty::GuarantyService;
use shopsync::storage::ObjectFileStorage;
use shopsync::sync::DispatchOutcome;
use shopsync::{EventDispatcher, ServiceManager};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn cart_update(product_id: Option<i32>, quantity: u32, price: &str) -> CartUpdate {
    CartUpdate {
        product_id,
        total_quantity_action: QuantityAction::Increment,
        total_quantity: quantity,
        total_price: Decimal::from_str(price).unwrap(),
    }
}

/// 过期键的频道名
fn channel(key: &str) -> String {
    format!("__keyspace@0__:{}", key)
}

#[tokio::test]
async fn test_staged_cart_commits_on_expiry_event() {
    setup_logging();
    let db = memory_db().await;
    let cache = Arc::new(MemoryCache::default());
    let storage = Arc::new(ObjectFileStorage::in_memory());
    let cart = CartService::new(db.clone(), cache.clone(), CartConfig::default(), 512);
    let guaranties = GuarantyService::new(db, cache.clone(), storage, GuarantyConfig::default());
    let dispatcher = EventDispatcher::new(cart.clone(), guaranties, 0);

    cart.create_cart(7).await.unwrap();
    cart.update_cart(7, cart_update(Some(4), 1, "9.99"))
        .await
        .unwrap();
    cart.update_cart(7, cart_update(Some(5), 3, "29.99"))
        .await
        .unwrap();

    // 新的暂存键替换了旧键
    let staged = cache.keys();
    assert_eq!(
        staged,
        vec![r#"cart:user_id:7:{"user_id":"7","total_quantity":3,"total_price":"29.99"}"#]
    );
    assert_eq!(cache.ttl_of(&staged[0]), Some(300));

    // 关联行同步写入，汇总值未提交
    let snapshot = cart.get_cart(7).await.unwrap();
    assert_eq!(snapshot.product_ids, vec![4, 5]);
    assert_eq!(snapshot.cart.total_quantity, None);

    let outcome = dispatcher.handle_message(&channel(&staged[0]), "expired").await;
    assert_eq!(outcome, DispatchOutcome::CartCommitted);

    let committed = cart.get_cart(7).await.unwrap().cart;
    assert_eq!(committed.total_quantity, Some(3));
    assert_eq!(
        committed.total_price.map(|p| p.round_dp(2)),
        Some(Decimal::new(2999, 2))
    );
}

#[tokio::test]
async fn test_staged_file_imports_on_expiry_event() {
    setup_logging();
    let db = memory_db().await;
    let cache = Arc::new(MemoryCache::default());
    let storage = Arc::new(ObjectFileStorage::in_memory());
    let cart = CartService::new(db.clone(), cache.clone(), CartConfig::default(), 512);
    let guaranties = GuarantyService::new(
        db.clone(),
        cache.clone(),
        storage,
        GuarantyConfig::default(),
    );
    let dispatcher = EventDispatcher::new(cart, guaranties.clone(), 0);

    let bytes = workbook_bytes(&[("SN-100", "GW-500", "Widget", 365, "2024-01-01 10:00 ق.ظ")]);
    let name = guaranties
        .stage_import("guaranties.xlsx", Bytes::from(bytes))
        .await
        .unwrap();
    let marker = format!("file:{}", name);
    assert_eq!(cache.ttl_of(&marker), Some(1));

    // set 事件不触发导入
    assert_eq!(
        dispatcher.handle_message(&channel(&marker), "set").await,
        DispatchOutcome::Ignored
    );
    assert_eq!(guaranty::Entity::find().count(&db).await.unwrap(), 0);

    let outcome = dispatcher.handle_message(&channel(&marker), "expired").await;
    assert!(matches!(outcome, DispatchOutcome::GuarantyImported(r) if r.inserted == 1));

    let found = guaranties.lookup("GW-500").await.unwrap();
    assert_eq!(found.produced_at, "2024-01-01 10:00");
    assert_eq!(found.guaranty_days, 365);
}

#[tokio::test]
async fn test_cart_scenario_with_redis() {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过测试: Redis不可用");
        return;
    }

    let manager = ServiceManager::init(test_config()).await.unwrap();
    database::migrate(manager.db()).await.unwrap();
    assert_eq!(
        Ok(manager.keyspace_db()),
        manager.config().redis.keyspace_db()
    );

    let user_id = 700_000 + (std::process::id() % 100_000) as i32;
    manager.cart().create_cart(user_id).await.unwrap();

    let shutdown = CancellationToken::new();
    let handle = manager.listener().spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;

    manager
        .cart()
        .update_cart(user_id, cart_update(Some(11), 3, "29.99"))
        .await
        .unwrap();
    assert_eq!(
        manager.cart().get_cart(user_id).await.unwrap().product_ids,
        vec![11]
    );

    let cart = manager.cart().clone();
    let committed = eventually(Duration::from_secs(10), || {
        let cart = cart.clone();
        async move {
            cart.get_cart(user_id)
                .await
                .map(|s| s.cart.total_quantity == Some(3))
                .unwrap_or(false)
        }
    })
    .await;
    assert!(committed, "cart totals were not committed after expiry");

    let row = manager.cart().get_cart(user_id).await.unwrap().cart;
    assert_eq!(
        row.total_price.map(|p| p.round_dp(2)),
        Some(Decimal::new(2999, 2))
    );

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_guaranty_upload_with_redis() {
    setup_logging();
    if !is_redis_available().await {
        println!("跳过测试: Redis不可用");
        return;
    }

    let manager = ServiceManager::init(test_config()).await.unwrap();
    database::migrate(manager.db()).await.unwrap();

    let shutdown = CancellationToken::new();
    let handle = manager.listener().spawn(shutdown.clone());
    tokio::time::sleep(Duration::from_millis(300)).await;

    let bytes = Bytes::from(workbook_bytes(&[(
        "SN-100",
        "GW-500",
        "Widget",
        365,
        "2024-01-01 10:00 ق.ظ",
    )]));

    for _ in 0..2 {
        manager
            .guaranty()
            .stage_import("guaranties.xlsx", bytes.clone())
            .await
            .unwrap();
    }

    let db = manager.db().clone();
    let imported = eventually(Duration::from_secs(10), || {
        let db = db.clone();
        async move { guaranty::Entity::find().count(&db).await.unwrap_or(0) > 0 }
    })
    .await;
    assert!(imported, "guaranty rows were not imported after marker expiry");

    // 给第二个标记留出过期时间，重复导入不会新增行
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(guaranty::Entity::find().count(&db).await.unwrap(), 1);

    let found = manager.guaranty().lookup("GW-500").await.unwrap();
    assert_eq!(found.produced_at, "2024-01-01 10:00");

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}
