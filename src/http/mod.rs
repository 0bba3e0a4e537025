//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了HTTP边界：两个暂存入口和保修查询。
//!
//! 处理函数只负责提取参数和映射错误，不等待延迟写入的结果。

use crate::cart::CartService;
use crate::config::HttpConfig;
use crate::error::Result;
use crate::guaranty::GuarantyService;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod error;
pub mod routes;

pub use error::ApiError;

/// 处理函数共享的状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub cart: CartService,
    pub guaranty: GuarantyService,
}

/// 构建路由
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/cart", put(routes::update_cart))
        .route("/admin/guaranties", post(routes::upload_guaranties))
        .route("/guaranties/{serial}", get(routes::get_guaranty))
        .route("/metrics", get(routes::metrics))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 启动HTTP服务，直到收到取消信号
pub async fn serve(state: AppState, config: &HttpConfig, shutdown: CancellationToken) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state, config.max_upload_bytes))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("HTTP server stopped");
    Ok(())
}
