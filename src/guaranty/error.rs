//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了保修导入与查询的错误类型。

use crate::error::SyncError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GuarantyError {
    /// 保修序列号不存在
    #[error("Guaranty not found: {0}")]
    NotFound(String),

    /// 不支持的文件类型
    #[error("Unsupported file: {0}")]
    UnsupportedFile(String),

    /// 请求中没有文件或文件为空
    #[error("No file was uploaded")]
    MissingFile,

    /// 表格无法解析
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Infrastructure(#[from] SyncError),
}

impl From<sea_orm::DbErr> for GuarantyError {
    fn from(e: sea_orm::DbErr) -> Self {
        GuarantyError::Infrastructure(SyncError::from(e))
    }
}

impl From<calamine::Error> for GuarantyError {
    fn from(e: calamine::Error) -> Self {
        GuarantyError::Spreadsheet(e.to_string())
    }
}
