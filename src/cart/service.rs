//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块实现了购物车的暂存（请求侧）与提交（监听器侧）。

use super::{pending_keys_pattern, CartError, CartUpdate, StagedCartDelta, STAGED_MARKER_VALUE};
use crate::backend::CacheBackend;
use crate::config::CartConfig;
use crate::database::entity::{cart, cart_product};
use crate::database::{PRICE_PRECISION, PRICE_SCALE};
use crate::metrics::GLOBAL_METRICS;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 购物车及其商品列表
#[derive(Debug, Clone, PartialEq)]
pub struct CartSnapshot {
    pub cart: cart::Model,
    pub product_ids: Vec<i32>,
}

/// 购物车服务
///
/// 请求侧只写关联表和暂存键，汇总值由监听器在暂存键过期后写入
#[derive(Clone)]
pub struct CartService {
    db: DatabaseConnection,
    cache: Arc<dyn CacheBackend>,
    config: CartConfig,
    max_key_length: usize,
}

impl std::fmt::Debug for CartService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartService")
            .field("config", &self.config)
            .field("max_key_length", &self.max_key_length)
            .finish()
    }
}

impl CartService {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn CacheBackend>,
        config: CartConfig,
        max_key_length: usize,
    ) -> Self {
        Self {
            db,
            cache,
            config,
            max_key_length,
        }
    }

    /// 为新激活的用户创建空购物车
    #[instrument(skip(self), level = "info")]
    pub async fn create_cart(&self, user_id: i32) -> Result<cart::Model, CartError> {
        if self.find_cart(user_id).await?.is_some() {
            return Err(CartError::CartAlreadyExists(user_id));
        }

        let now = Utc::now();
        let model = cart::ActiveModel {
            user_id: Set(user_id),
            total_quantity: Set(None),
            total_price: Set(None),
            created_at: Set(now),
            modified_at: Set(now),
            ..Default::default()
        };

        match model.insert(&self.db).await {
            Ok(created) => {
                info!("Created cart {} for user {}", created.id, user_id);
                Ok(created)
            }
            Err(e) => match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    Err(CartError::CartAlreadyExists(user_id))
                }
                _ => Err(e.into()),
            },
        }
    }

    /// 暂存购物车变更
    ///
    /// # 参数
    ///
    /// * `user_id` - 已认证的用户ID
    /// * `update` - 客户端提交的变更，数量和总价为变更后的结果值
    ///
    /// # 返回值
    ///
    /// 返回已写入暂存键的汇总值。返回时关联表已经写入，汇总值尚未提交。
    #[instrument(skip(self, update), level = "info", fields(action = ?update.total_quantity_action))]
    pub async fn update_cart(
        &self,
        user_id: i32,
        update: CartUpdate,
    ) -> Result<StagedCartDelta, CartError> {
        validate_totals(&update)?;

        let delta = StagedCartDelta::new(user_id, update.total_quantity, update.total_price);
        let key = delta.staging_key()?;
        if key.len() > self.max_key_length {
            return Err(CartError::KeyTooLong {
                len: key.len(),
                max: self.max_key_length,
            });
        }

        let cart = self
            .find_cart(user_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(user_id.to_string()))?;

        if let Some(product_id) = update.product_id {
            self.link_product(cart.id, product_id).await?;
        }

        if self.config.supersede_pending {
            let pending = self.cache.keys_matching(&pending_keys_pattern(user_id)).await?;
            if !pending.is_empty() {
                let removed = self.cache.delete(&pending).await?;
                debug!("Superseded {} pending staged keys for user {}", removed, user_id);
                GLOBAL_METRICS.add("superseded_keys", "cart", removed);
            }
        }

        self.cache
            .set_with_ttl(&key, STAGED_MARKER_VALUE, self.config.ttl_secs)
            .await?;

        GLOBAL_METRICS.incr("staged_keys", update.total_quantity_action.as_str());
        debug!("Staged {} with ttl {}s", key, self.config.ttl_secs);
        Ok(delta)
    }

    /// 将过期的暂存值写入购物车汇总行
    ///
    /// 覆盖写入，不做累加
    #[instrument(skip(self), level = "info", fields(user_id = %delta.user_id))]
    pub async fn commit_staged(&self, delta: &StagedCartDelta) -> Result<(), CartError> {
        let user_id = delta.numeric_user_id()?;
        let quantity = i32::try_from(delta.total_quantity).map_err(|_| {
            CartError::InvalidPayload(format!("quantity out of range: {}", delta.total_quantity))
        })?;

        let result = cart::Entity::update_many()
            .col_expr(cart::Column::TotalQuantity, Expr::value(quantity))
            .col_expr(cart::Column::TotalPrice, Expr::value(delta.total_price))
            .col_expr(cart::Column::ModifiedAt, Expr::value(Utc::now()))
            .filter(cart::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!("No cart row for user {}, staged totals dropped", user_id);
            return Err(CartError::CartNotFound(delta.user_id.clone()));
        }
        info!(
            "Committed cart totals for user {}: quantity={}, price={}",
            user_id, quantity, delta.total_price
        );
        Ok(())
    }

    /// 读取购物车及关联商品
    #[instrument(skip(self), level = "debug")]
    pub async fn get_cart(&self, user_id: i32) -> Result<CartSnapshot, CartError> {
        let cart = self
            .find_cart(user_id)
            .await?
            .ok_or_else(|| CartError::CartNotFound(user_id.to_string()))?;
        let mut product_ids: Vec<i32> = cart
            .find_related(cart_product::Entity)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.product_id)
            .collect();
        product_ids.sort_unstable();
        Ok(CartSnapshot { cart, product_ids })
    }

    async fn find_cart(&self, user_id: i32) -> Result<Option<cart::Model>, DbErr> {
        cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(&self.db)
            .await
    }

    /// 在单独的事务中写入关联行，已存在时忽略
    async fn link_product(&self, cart_id: i32, product_id: i32) -> Result<(), CartError> {
        let txn = self.db.begin().await?;
        let row = cart_product::ActiveModel {
            cart_id: Set(cart_id),
            product_id: Set(product_id),
        };
        let inserted = cart_product::Entity::insert(row)
            .on_conflict(
                OnConflict::columns([cart_product::Column::CartId, cart_product::Column::ProductId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;
        match inserted {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }
        txn.commit().await?;
        Ok(())
    }
}

/// 暂存前检查汇总值能否写入购物车行，避免提交时才被丢弃
fn validate_totals(update: &CartUpdate) -> Result<(), CartError> {
    if update.total_price < Decimal::ZERO {
        return Err(CartError::InvalidPayload(format!(
            "total price must not be negative: {}",
            update.total_price
        )));
    }
    if i32::try_from(update.total_quantity).is_err() {
        return Err(CartError::InvalidPayload(format!(
            "quantity out of range: {}",
            update.total_quantity
        )));
    }
    let limit = Decimal::from(10u64.pow(PRICE_PRECISION - PRICE_SCALE));
    if update.total_price.trunc() >= limit {
        return Err(CartError::InvalidPayload(format!(
            "total price out of range: {}",
            update.total_price
        )));
    }
    Ok(())
}
