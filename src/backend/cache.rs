//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了暂存键与查询缓存所用的键值缓存接口及其Redis实现。

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::{debug, instrument};

/// SCAN 每次迭代的建议返回数量
const SCAN_COUNT: usize = 200;

/// 键值缓存接口
///
/// 生产者通过它写入带TTL的暂存键，查询服务通过它做读穿缓存
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// 写入键值并设置过期时间（秒）
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// 读取键值
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// 列出匹配 glob 模式的所有键
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>>;

    /// 删除键，返回实际删除的数量
    async fn delete(&self, keys: &[String]) -> Result<u64>;
}

/// 基于Redis的缓存实现
#[derive(Clone)]
pub struct RedisCacheBackend {
    manager: ConnectionManager,
    command_timeout_ms: u64,
}

impl std::fmt::Debug for RedisCacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheBackend")
            .field("command_timeout_ms", &self.command_timeout_ms)
            .finish()
    }
}

impl RedisCacheBackend {
    pub fn new(manager: ConnectionManager, command_timeout_ms: u64) -> Self {
        Self {
            manager,
            command_timeout_ms,
        }
    }

    async fn with_timeout<T, F>(&self, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(Duration::from_millis(self.command_timeout_ms), fut).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(SyncError::Timeout(format!(
                "Redis {} timed out after {}ms",
                op, self.command_timeout_ms
            ))),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    #[instrument(skip(self, value), level = "debug")]
    async fn set_with_ttl(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.manager.clone();
        self.with_timeout("SET", async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        self.with_timeout("GET", async move {
            redis::cmd("GET")
                .arg(key)
                .query_async(&mut conn)
                .await
        })
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let scan = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_COUNT)
                .to_owned();
            let (next, batch): (u64, Vec<String>) = self
                .with_timeout("SCAN", scan.query_async(&mut conn))
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        debug!("SCAN {} matched {} keys", pattern, keys.len());
        Ok(keys)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.manager.clone();
        self.with_timeout("DEL", async move {
            redis::cmd("DEL")
                .arg(keys)
                .query_async(&mut conn)
                .await
        })
        .await
    }
}
