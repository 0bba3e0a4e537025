//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 保修记录的批量导入与查询模块
//!
//! 管理员上传的表格先存入对象存储，再写入 `file:{name}` 标记键（TTL 1秒）。
//! 标记键过期后监听器取回文件，解析后分批插入，重复的保修序列号直接跳过。

use crate::database::entity::guaranty;
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub mod error;
pub mod excel;
pub mod service;

pub use error::GuarantyError;
pub use excel::{parse_workbook, ParsedSheet, RejectedRow};
pub use service::GuarantyService;

/// 导入标记键前缀
pub const FILE_KEY_PREFIX: &str = "file:";

/// 查询缓存键前缀
pub const LOOKUP_KEY_PREFIX: &str = "guaranty:";

pub const MAX_PRODUCT_SERIAL_LEN: usize = 150;
pub const MAX_GUARANTY_SERIAL_LEN: usize = 200;
pub const MAX_PRODUCT_NAME_LEN: usize = 200;
pub const MAX_PRODUCED_AT_LEN: usize = 100;

/// 生产日期中需要去除的上午/下午标记
const MERIDIEM_MARKERS: [&str; 2] = [" ق.ظ", " ب.ظ"];

/// 表格中的一行保修数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuarantyRow {
    pub product_serial_number: String,
    pub guaranty_serial: String,
    pub product_name: String,
    pub guaranty_days: i32,
    pub produced_at: String,
}

impl GuarantyRow {
    pub(crate) fn into_active_model(self, created_at: DateTime<Utc>) -> guaranty::ActiveModel {
        guaranty::ActiveModel {
            product_serial_number: Set(self.product_serial_number),
            guaranty_serial: Set(self.guaranty_serial),
            product_name: Set(self.product_name),
            guaranty_days: Set(self.guaranty_days),
            produced_at: Set(self.produced_at),
            created_at: Set(created_at),
            ..Default::default()
        }
    }
}

/// 对外返回的保修记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guaranty {
    pub id: i32,
    pub product_serial_number: String,
    pub guaranty_serial: String,
    pub product_name: String,
    pub guaranty_days: i32,
    pub produced_at: String,
    pub created_at: DateTime<Utc>,
}

impl From<guaranty::Model> for Guaranty {
    fn from(model: guaranty::Model) -> Self {
        Self {
            id: model.id,
            product_serial_number: model.product_serial_number,
            guaranty_serial: model.guaranty_serial,
            product_name: model.product_name,
            guaranty_days: model.guaranty_days,
            produced_at: model.produced_at,
            created_at: model.created_at,
        }
    }
}

/// 一次导入的结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// 已提交的批次（事务）数
    pub batches: usize,
    /// 回滚并跳过的批次数
    pub failed_batches: usize,
    pub inserted: u64,
    /// 因保修序列号重复而跳过的行数
    pub skipped: u64,
    /// 解析阶段被拒绝的行数
    pub rejected: usize,
}

/// 去除生产日期中的上午/下午标记
pub fn strip_meridiem(value: &str) -> String {
    MERIDIEM_MARKERS
        .iter()
        .fold(value.to_string(), |acc, marker| acc.replace(marker, ""))
        .trim()
        .to_string()
}

/// 为上传文件生成唯一名称，保留原扩展名及其大小写
pub fn unique_upload_name(original: &str, allowed: &[String]) -> Result<String, GuarantyError> {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| GuarantyError::UnsupportedFile(original.to_string()))?;

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(ext)) {
        return Err(GuarantyError::UnsupportedFile(original.to_string()));
    }
    Ok(format!("{}.{}", Uuid::new_v4(), ext))
}

pub fn marker_key(name: &str) -> String {
    format!("{}{}", FILE_KEY_PREFIX, name)
}

pub fn lookup_cache_key(guaranty_serial: &str) -> String {
    format!("{}{}", LOOKUP_KEY_PREFIX, guaranty_serial)
}
