//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和设置。

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use rust_xlsxwriter::Workbook;
use sea_orm::DatabaseConnection;
use secrecy::SecretString;
use shopsync::backend::CacheBackend;
use shopsync::config::{Config, DatabaseConfig, StorageBackend};
use shopsync::database;
use std::sync::Once;
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_span_events(FmtSpan::CLOSE)
            .with_env_filter(EnvFilter::new("debug"))
            .try_init()
            .ok();
    });
}

pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// 检查Redis是否可用
pub async fn is_redis_available() -> bool {
    let Ok(client) = redis::Client::open(redis_url()) else {
        return false;
    };
    let connect = tokio::time::timeout(
        Duration::from_secs(2),
        client.get_multiplexed_async_connection(),
    )
    .await;
    let Ok(Ok(mut conn)) = connect else {
        return false;
    };
    let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
    pong.is_ok()
}

/// 内存SQLite、内存对象存储、本地Redis
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.database = DatabaseConfig {
        url: SecretString::new("sqlite::memory:".into()),
        ..DatabaseConfig::default()
    };
    config.redis.connection_string = SecretString::new(redis_url().into());
    config.storage.backend = StorageBackend::Memory;
    config.cart.ttl_secs = 1;
    config
}

pub async fn memory_db() -> DatabaseConnection {
    let db = database::connect(&test_config().database)
        .await
        .expect("sqlite connect");
    database::migrate(&db).await.expect("migrate");
    db
}

/// 不处理过期的内存缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, (String, u64)>,
}

impl MemoryCache {
    pub fn ttl_of(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|e| e.1)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn set_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> shopsync::Result<()> {
        self.entries
            .insert(key.to_string(), (value.to_string(), ttl_secs));
        Ok(())
    }

    async fn get(&self, key: &str) -> shopsync::Result<Option<String>> {
        Ok(self.entries.get(key).map(|e| e.0.clone()))
    }

    async fn keys_matching(&self, pattern: &str) -> shopsync::Result<Vec<String>> {
        // 测试只用到尾部通配符
        let prefix = pattern.trim_end_matches('*');
        Ok(self
            .entries
            .iter()
            .filter(|e| e.key().starts_with(prefix))
            .map(|e| e.key().clone())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> shopsync::Result<u64> {
        Ok(keys
            .iter()
            .filter(|k| self.entries.remove(k.as_str()).is_some())
            .count() as u64)
    }
}

/// 生成带表头的保修表格
pub fn workbook_bytes(rows: &[(&str, &str, &str, i32, &str)]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header = ["serial", "guaranty", "name", "days", "produced"];
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title).unwrap();
    }
    for (i, (serial, guaranty, name, days, produced)) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        sheet.write_string(r, 0, *serial).unwrap();
        sheet.write_string(r, 1, *guaranty).unwrap();
        sheet.write_string(r, 2, *name).unwrap();
        sheet.write_number(r, 3, *days).unwrap();
        sheet.write_string(r, 4, *produced).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

/// 轮询直到条件成立或超时
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}
