//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了长期运行的命令：HTTP服务和写后监听器。

use crate::cli::ServeArgs;
use crate::config::Config;
use crate::http::{self, AppState};
use crate::manager::ServiceManager;
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 收到 Ctrl-C 时取消令牌
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received");
        token.cancel();
    });
}

pub async fn execute_serve(config: Config, args: &ServeArgs) -> Result<()> {
    let http_config = config.http.clone();
    let manager = ServiceManager::init(config).await?;
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let listener = args
        .with_listener
        .then(|| manager.listener().spawn(shutdown.clone()));

    let state = AppState {
        cart: manager.cart().clone(),
        guaranty: manager.guaranty().clone(),
    };
    let served = http::serve(state, &http_config, shutdown.clone()).await;
    shutdown.cancel();

    if let Some(handle) = listener {
        handle.await??;
    }
    manager.shutdown().await?;
    served?;
    Ok(())
}

pub async fn execute_listen(config: Config) -> Result<()> {
    let manager = ServiceManager::init(config).await?;
    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    manager.listener().run(shutdown).await?;
    manager.shutdown().await?;
    Ok(())
}
