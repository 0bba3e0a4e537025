//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis提供者接口和默认实现。

use crate::{
    config::RedisConfig,
    error::{Result, SyncError},
};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use tokio::time::{timeout, Duration};

/// Redis连接提供者
///
/// 返回的 `Client` 用于创建订阅连接，`ConnectionManager` 用于普通命令
#[async_trait]
pub trait RedisProvider: Send + Sync {
    async fn get_client(&self, config: &RedisConfig) -> Result<(Client, ConnectionManager)>;
}

pub struct DefaultRedisProvider;

#[async_trait]
impl RedisProvider for DefaultRedisProvider {
    async fn get_client(&self, config: &RedisConfig) -> Result<(Client, ConnectionManager)> {
        let connection_string = config.connection_string.expose_secret();
        let client = Client::open(connection_string)?;

        let manager = match timeout(
            Duration::from_millis(config.connection_timeout_ms),
            client.get_connection_manager(),
        )
        .await
        {
            Ok(res) => res?,
            Err(_) => {
                return Err(SyncError::Timeout(format!(
                    "Redis connection timed out after {}ms",
                    config.connection_timeout_ms
                )));
            }
        };
        Ok((client, manager))
    }
}
