//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了写后监听器。
//!
//! 监听器订阅暂存键的键空间通知，在键过期时执行对应的持久化写入。
//! 事件逐条按到达顺序处理，同一购物车的写入因此是串行的。
//! 监听器离线期间过期的键不会被补发。

use super::keyspace::{classify, key_from_channel, subscription_patterns, StagedKey, EXPIRED_EVENT};
use crate::cart::{CartError, CartService, StagedCartDelta};
use crate::config::ListenerConfig;
use crate::error::Result;
use crate::guaranty::{GuarantyService, ImportReport};
use crate::metrics::GLOBAL_METRICS;
use futures::stream::StreamExt;
use redis::aio::ConnectionManager;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// 单个事件的处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 非过期事件或不关心的键
    Ignored,
    CartCommitted,
    GuarantyImported(ImportReport),
    /// 负载不合法或目标行不存在，事件被丢弃
    Dropped,
    /// 基础设施错误，本次写入失败
    Failed,
}

impl DispatchOutcome {
    fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Ignored => "ignored",
            DispatchOutcome::CartCommitted => "cart_committed",
            DispatchOutcome::GuarantyImported(_) => "guaranty_imported",
            DispatchOutcome::Dropped => "dropped",
            DispatchOutcome::Failed => "failed",
        }
    }
}

/// 事件分发器
///
/// 所有可恢复的错误都在这里记录并吞掉，调用方只拿到处理结果
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    cart: CartService,
    guaranty: GuarantyService,
    db_index: i64,
}

impl EventDispatcher {
    pub fn new(cart: CartService, guaranty: GuarantyService, db_index: i64) -> Self {
        Self {
            cart,
            guaranty,
            db_index,
        }
    }

    /// 处理一条键空间通知
    ///
    /// # 参数
    ///
    /// * `channel` - 通知频道名，包含键名
    /// * `event` - 消息内容，即事件名
    pub async fn handle_message(&self, channel: &str, event: &str) -> DispatchOutcome {
        let Some(key) = key_from_channel(channel, self.db_index) else {
            debug!("Ignoring message on foreign channel {}", channel);
            return DispatchOutcome::Ignored;
        };
        if event != EXPIRED_EVENT {
            debug!("Ignoring {} event for {}", event, key);
            return DispatchOutcome::Ignored;
        }

        let outcome = self.dispatch_expired(key).await;
        GLOBAL_METRICS.incr("listener_outcomes", outcome.label());
        outcome
    }

    /// 按键名前缀分发一个已过期的暂存键
    #[instrument(skip(self), level = "debug")]
    pub async fn dispatch_expired(&self, key: &str) -> DispatchOutcome {
        match classify(key) {
            StagedKey::Cart(key) => {
                GLOBAL_METRICS.incr("listener_events", "cart");
                self.commit_cart(key).await
            }
            StagedKey::GuarantyFile(name) => {
                GLOBAL_METRICS.incr("listener_events", "file");
                self.import_guaranties(name).await
            }
            StagedKey::Unknown(key) => {
                debug!("Ignoring unknown staged key {}", key);
                DispatchOutcome::Ignored
            }
        }
    }

    async fn commit_cart(&self, key: &str) -> DispatchOutcome {
        let delta = match StagedCartDelta::from_staging_key(key) {
            Ok(delta) => delta,
            Err(e) => {
                warn!("Dropping malformed cart key {}: {}", key, e);
                return DispatchOutcome::Dropped;
            }
        };

        match self.cart.commit_staged(&delta).await {
            Ok(()) => DispatchOutcome::CartCommitted,
            Err(e @ (CartError::CartNotFound(_) | CartError::InvalidPayload(_))) => {
                warn!("Dropping staged totals for user {}: {}", delta.user_id, e);
                DispatchOutcome::Dropped
            }
            Err(e) => {
                error!("Failed to commit cart for user {}: {}", delta.user_id, e);
                DispatchOutcome::Failed
            }
        }
    }

    async fn import_guaranties(&self, name: &str) -> DispatchOutcome {
        match self.guaranty.import_object(name).await {
            Ok(report) => DispatchOutcome::GuarantyImported(report),
            Err(e) => {
                error!("Guaranty import of {} failed: {}", name, e);
                DispatchOutcome::Failed
            }
        }
    }
}

/// 写后监听器
pub struct WriteBehindListener {
    /// 用于创建订阅连接
    client: redis::Client,
    /// 用于执行 CONFIG SET
    manager: ConnectionManager,
    dispatcher: EventDispatcher,
    config: ListenerConfig,
    db_index: i64,
}

impl WriteBehindListener {
    pub fn new(
        client: redis::Client,
        manager: ConnectionManager,
        dispatcher: EventDispatcher,
        config: ListenerConfig,
        db_index: i64,
    ) -> Self {
        Self {
            client,
            manager,
            dispatcher,
            config,
            db_index,
        }
    }

    /// 开启键空间过期通知
    ///
    /// 托管Redis可能禁用 CONFIG 命令，此时需要在服务端预先配置
    #[instrument(skip(self), level = "info")]
    pub async fn enable_notifications(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = redis::cmd("CONFIG")
            .arg("SET")
            .arg("notify-keyspace-events")
            .arg(&self.config.notify_flags)
            .query_async(&mut conn)
            .await?;
        info!("notify-keyspace-events set to {}", self.config.notify_flags);
        Ok(())
    }

    /// 运行事件循环，直到订阅关闭或收到取消信号
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        if self.config.enable_notifications {
            if let Err(e) = self.enable_notifications().await {
                warn!("Could not enable keyspace notifications: {}", e);
            }
        }

        let mut pubsub = self.client.get_async_pubsub().await?;
        for pattern in subscription_patterns(self.db_index) {
            pubsub.psubscribe(&pattern).await?;
            info!("Subscribed to {}", pattern);
        }

        let mut stream = pubsub.on_message();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Write-behind listener shutting down");
                    break;
                }
                msg = stream.next() => {
                    let Some(msg) = msg else {
                        warn!("Keyspace subscription closed");
                        break;
                    };
                    let event: String = match msg.get_payload() {
                        Ok(event) => event,
                        Err(e) => {
                            warn!("Unreadable notification on {}: {}", msg.get_channel_name(), e);
                            continue;
                        }
                    };
                    self.dispatcher
                        .handle_message(msg.get_channel_name(), &event)
                        .await;
                }
            }
        }
        Ok(())
    }

    /// 在后台任务中运行监听器
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let result = self.run(shutdown).await;
            if let Err(e) = &result {
                error!("Write-behind listener stopped: {}", e);
            }
            result
        })
    }
}
