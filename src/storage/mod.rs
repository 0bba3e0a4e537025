//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 对象存储模块
//!
//! 上传的表格文件按生成的唯一名称存放在对象存储中，监听器在标记键过期后按同名取回。

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use secrecy::ExposeSecret;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

/// 对象存储错误
#[derive(Error, Debug)]
pub enum StorageError {
    /// 对象不存在
    #[error("Object not found: {0}")]
    NotFound(String),

    /// 后端操作失败
    #[error("Object storage error: {0}")]
    Backend(String),

    /// 存储配置错误
    #[error("Storage configuration error: {0}")]
    Config(String),
}

impl From<object_store::Error> for StorageError {
    fn from(e: object_store::Error) -> Self {
        match e {
            object_store::Error::NotFound { path, .. } => StorageError::NotFound(path),
            other => StorageError::Backend(other.to_string()),
        }
    }
}

/// 文件存储接口
///
/// 只暴露导入流程需要的 put/get/delete
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StorageError>;

    /// 返回对象的完整内容
    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// 基于 `object_store` 的文件存储实现
#[derive(Clone)]
pub struct ObjectFileStorage {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for ObjectFileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectFileStorage({})", self.store)
    }
}

impl ObjectFileStorage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// 进程内存存储，重启后数据丢失
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }

    /// 根据配置创建文件存储
    ///
    /// # 参数
    ///
    /// * `config` - 对象存储配置
    ///
    /// # 返回值
    ///
    /// 返回文件存储实例，配置不完整时返回 `StorageError::Config`
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        match config.backend {
            StorageBackend::S3 => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&config.bucket)
                    .with_region(&config.region)
                    .with_allow_http(config.allow_http);
                if let Some(endpoint) = &config.endpoint {
                    builder = builder.with_endpoint(endpoint);
                }
                if let Some(access_key) = &config.access_key {
                    builder = builder.with_access_key_id(access_key.expose_secret());
                }
                if let Some(secret_key) = &config.secret_key {
                    builder = builder.with_secret_access_key(secret_key.expose_secret());
                }
                let store = builder
                    .build()
                    .map_err(|e| StorageError::Config(e.to_string()))?;
                Ok(Self::new(Arc::new(store)))
            }
            StorageBackend::Local => {
                let root = config.root.as_ref().ok_or_else(|| {
                    StorageError::Config("storage.root is required".to_string())
                })?;
                std::fs::create_dir_all(root).map_err(|e| {
                    StorageError::Config(format!("Failed to create {}: {}", root.display(), e))
                })?;
                let store = LocalFileSystem::new_with_prefix(root)
                    .map_err(|e| StorageError::Config(e.to_string()))?;
                Ok(Self::new(Arc::new(store)))
            }
            StorageBackend::Memory => Ok(Self::in_memory()),
        }
    }
}

#[async_trait]
impl FileStorage for ObjectFileStorage {
    #[instrument(skip(self, body), level = "debug", fields(size = body.len()))]
    async fn put(&self, key: &str, body: Bytes) -> Result<(), StorageError> {
        self.store
            .put(&ObjectPath::from(key), PutPayload::from(body))
            .await?;
        debug!("Stored object {}", key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let result = self.store.get(&ObjectPath::from(key)).await?;
        Ok(result.bytes().await?)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.store.delete(&ObjectPath::from(key)).await?;
        Ok(())
    }
}
