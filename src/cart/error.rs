//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了购物车暂存与提交的错误类型。

use crate::error::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CartError {
    /// 用户没有购物车
    #[error("Cart not found for user {0}")]
    CartNotFound(String),

    /// 负载无法解析或数值非法
    #[error("Invalid cart payload: {0}")]
    InvalidPayload(String),

    /// 暂存键超过长度限制
    #[error("Staging key is {len} bytes, limit is {max}")]
    KeyTooLong { len: usize, max: usize },

    /// 用户已经有购物车
    #[error("Cart already exists for user {0}")]
    CartAlreadyExists(i32),

    #[error(transparent)]
    Infrastructure(#[from] SyncError),
}

impl From<sea_orm::DbErr> for CartError {
    fn from(e: sea_orm::DbErr) -> Self {
        CartError::Infrastructure(SyncError::from(e))
    }
}
