//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 购物车暂存模块
//!
//! 购物车汇总值以紧凑JSON的形式写进暂存键的**键名**：
//!
//! ```text
//! cart:user_id:{user_id}:{"user_id":"7","total_quantity":3,"total_price":"29.99"}
//! ```
//!
//! 键空间过期通知只携带键名，值在通知到达时已经不存在，所以键名就是负载的传输通道。

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub mod error;
pub mod service;

pub use error::CartError;
pub use service::{CartService, CartSnapshot};

/// 购物车暂存键前缀
pub const CART_KEY_PREFIX: &str = "cart:user_id:";

/// 暂存键的值，没有实际含义
pub const STAGED_MARKER_VALUE: &str = "1";

/// 数量变化方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantityAction {
    Increment,
    Decrement,
}

impl QuantityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityAction::Increment => "increment",
            QuantityAction::Decrement => "decrement",
        }
    }
}

/// 客户端提交的购物车变更
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartUpdate {
    /// 为空时只更新数量和总价
    #[serde(default)]
    pub product_id: Option<i32>,
    pub total_quantity_action: QuantityAction,
    pub total_quantity: u32,
    pub total_price: Decimal,
}

/// 暂存的购物车汇总值
///
/// 字段顺序决定了键名中的JSON顺序，不能调整
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedCartDelta {
    pub user_id: String,
    #[serde(deserialize_with = "quantity_from_int_or_str")]
    pub total_quantity: u32,
    #[serde(with = "rust_decimal::serde::str")]
    pub total_price: Decimal,
}

fn quantity_from_int_or_str<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Int(u32),
        Str(String),
    }

    match Quantity::deserialize(deserializer)? {
        Quantity::Int(v) => Ok(v),
        Quantity::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl StagedCartDelta {
    pub fn new(user_id: i32, total_quantity: u32, total_price: Decimal) -> Self {
        Self {
            user_id: user_id.to_string(),
            total_quantity,
            total_price,
        }
    }

    /// 生成暂存键名
    pub fn staging_key(&self) -> Result<String, CartError> {
        let payload = serde_json::to_string(self)
            .map_err(|e| CartError::InvalidPayload(e.to_string()))?;
        Ok(format!("{}{}:{}", CART_KEY_PREFIX, self.user_id, payload))
    }

    /// 从过期的暂存键名中还原汇总值
    ///
    /// 键名中的用户ID必须与JSON中的 `user_id` 一致
    pub fn from_staging_key(key: &str) -> Result<Self, CartError> {
        let rest = key.strip_prefix(CART_KEY_PREFIX).ok_or_else(|| {
            CartError::InvalidPayload(format!("not a cart staging key: {}", key))
        })?;
        let (user_id, payload) = rest.split_once(':').ok_or_else(|| {
            CartError::InvalidPayload(format!("missing payload in key: {}", key))
        })?;

        let delta: StagedCartDelta = serde_json::from_str(payload)
            .map_err(|e| CartError::InvalidPayload(format!("{}: {}", e, payload)))?;

        if delta.user_id != user_id {
            return Err(CartError::InvalidPayload(format!(
                "user id mismatch: key={}, payload={}",
                user_id, delta.user_id
            )));
        }
        Ok(delta)
    }

    /// 数值形式的用户ID
    pub fn numeric_user_id(&self) -> Result<i32, CartError> {
        self.user_id
            .parse()
            .map_err(|_| CartError::InvalidPayload(format!("invalid user id: {}", self.user_id)))
    }
}

/// 匹配某个用户所有未过期暂存键的模式
pub fn pending_keys_pattern(user_id: i32) -> String {
    format!("{}{}:*", CART_KEY_PREFIX, user_id)
}
