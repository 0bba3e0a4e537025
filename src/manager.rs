//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了服务管理器，负责初始化数据库、Redis、对象存储和各领域服务。

use crate::backend::{CacheBackend, DefaultRedisProvider, RedisCacheBackend, RedisProvider};
use crate::cart::CartService;
use crate::config::Config;
use crate::database;
use crate::error::{Result, SyncError};
use crate::guaranty::GuarantyService;
use crate::storage::{FileStorage, ObjectFileStorage};
use crate::sync::{EventDispatcher, WriteBehindListener};
use redis::aio::ConnectionManager;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::{info, instrument};

/// 服务管理器
///
/// 持有进程内共享的连接和服务实例，HTTP边界与监听器都从这里取用
#[derive(Clone)]
pub struct ServiceManager {
    config: Config,
    db: DatabaseConnection,
    redis_client: redis::Client,
    redis_manager: ConnectionManager,
    keyspace_db: i64,
    cart: CartService,
    guaranty: GuarantyService,
}

impl ServiceManager {
    /// 初始化服务管理器
    ///
    /// # 参数
    ///
    /// * `config` - 服务配置
    ///
    /// # 返回值
    ///
    /// 配置不合法或任一外部依赖无法连接时返回错误
    #[instrument(skip(config), level = "info")]
    pub async fn init(config: Config) -> Result<Self> {
        config.validate().map_err(SyncError::ConfigError)?;

        let db = database::connect(&config.database).await?;
        let (redis_client, redis_manager) = DefaultRedisProvider.get_client(&config.redis).await?;
        // 暂存键经由该客户端写入，监听器订阅同一个库
        let keyspace_db = redis_client.get_connection_info().redis.db;
        let storage: Arc<dyn FileStorage> =
            Arc::new(ObjectFileStorage::from_config(&config.storage)?);
        let cache: Arc<dyn CacheBackend> = Arc::new(RedisCacheBackend::new(
            redis_manager.clone(),
            config.redis.command_timeout_ms,
        ));

        let cart = CartService::new(
            db.clone(),
            cache.clone(),
            config.cart.clone(),
            config.redis.max_key_length,
        );
        let guaranty = GuarantyService::new(db.clone(), cache, storage, config.guaranty.clone());

        info!(
            "ServiceManager initialized (storage backend {:?}, redis db {})",
            config.storage.backend, keyspace_db
        );
        Ok(Self {
            config,
            db,
            redis_client,
            redis_manager,
            keyspace_db,
            cart,
            guaranty,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 键空间通知所在的数据库编号
    pub fn keyspace_db(&self) -> i64 {
        self.keyspace_db
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn cart(&self) -> &CartService {
        &self.cart
    }

    pub fn guaranty(&self) -> &GuarantyService {
        &self.guaranty
    }

    /// 创建写后监听器，调用方负责运行
    pub fn listener(&self) -> WriteBehindListener {
        let dispatcher =
            EventDispatcher::new(self.cart.clone(), self.guaranty.clone(), self.keyspace_db);
        WriteBehindListener::new(
            self.redis_client.clone(),
            self.redis_manager.clone(),
            dispatcher,
            self.config.listener.clone(),
            self.keyspace_db,
        )
    }

    /// 关闭数据库连接池
    pub async fn shutdown(self) -> Result<()> {
        self.db
            .close()
            .await
            .map_err(|e| SyncError::ShutdownError(e.to_string()))?;
        info!("ServiceManager shut down");
        Ok(())
    }
}
