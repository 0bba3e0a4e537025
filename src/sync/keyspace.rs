//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块负责键空间通知频道的命名与解析。
//!
//! 模式订阅时频道名为 `__keyspace@{db}__:{key}`，消息内容为事件名（如 `expired`）。

use crate::cart::CART_KEY_PREFIX;
use crate::guaranty::FILE_KEY_PREFIX;

/// 键过期事件名
pub const EXPIRED_EVENT: &str = "expired";

/// 监听的暂存键前缀
const WATCHED_PREFIXES: [&str; 2] = ["cart:", FILE_KEY_PREFIX];

/// 已过期的暂存键分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedKey<'a> {
    /// 购物车暂存键，保留完整键名
    Cart(&'a str),
    /// 导入标记键，只保留文件名
    GuarantyFile(&'a str),
    Unknown(&'a str),
}

pub fn keyspace_prefix(db: i64) -> String {
    format!("__keyspace@{}__:", db)
}

/// 需要模式订阅的频道
pub fn subscription_patterns(db: i64) -> Vec<String> {
    let prefix = keyspace_prefix(db);
    WATCHED_PREFIXES
        .iter()
        .map(|p| format!("{}{}*", prefix, p))
        .collect()
}

/// 从频道名还原键名，其他数据库的频道返回 `None`
pub fn key_from_channel(channel: &str, db: i64) -> Option<&str> {
    channel
        .strip_prefix(keyspace_prefix(db).as_str())
        .filter(|key| !key.is_empty())
}

pub fn classify(key: &str) -> StagedKey<'_> {
    if key.starts_with(CART_KEY_PREFIX) {
        StagedKey::Cart(key)
    } else if let Some(name) = key.strip_prefix(FILE_KEY_PREFIX).filter(|n| !n.is_empty()) {
        StagedKey::GuarantyFile(name)
    } else {
        StagedKey::Unknown(key)
    }
}
