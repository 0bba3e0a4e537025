//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了基础设施层的错误类型。领域错误见 `cart::error` 与 `guaranty::error`。

use crate::storage::StorageError;
use thiserror::Error;

/// 基础设施错误类型枚举
///
/// 覆盖Redis、数据库、对象存储、配置等外部协作方产生的错误
#[derive(Error, Debug)]
pub enum SyncError {
    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sea-ORM数据库错误
    #[error("Sea-ORM error: {0}")]
    SeaOrmError(#[from] sea_orm::DbErr),

    /// 数据库连接错误
    #[error("Database connection error: {0}")]
    DatabaseError(String),

    /// Redis错误
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    /// 对象存储错误
    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    /// IO错误
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// 超时错误
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// 关闭错误
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}

/// 基础设施操作结果类型别名
pub type Result<T> = std::result::Result<T, SyncError>;
