//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了服务的日志和链路追踪初始化。

use crate::config::TelemetryConfig;
use opentelemetry::global;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::TracerProvider as SdkTracerProvider;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// 初始化日志与 OpenTelemetry Tracing
///
/// 此函数应该在进程启动时调用一次。`RUST_LOG` 优先于配置中的过滤表达式。
/// 重复调用不会报错，后续调用的 subscriber 会被忽略。
pub fn init_tracing(config: &TelemetryConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_str()));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if config.enable_opentelemetry {
        // 未配置 exporter 时 provider 不导出任何 span，只保留上下文传播
        let provider = SdkTracerProvider::builder().build();
        global::set_tracer_provider(provider.clone());

        let tracer = provider.tracer(config.service_name.clone());
        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

        let subscriber = Registry::default()
            .with(filter)
            .with(fmt_layer)
            .with(telemetry);
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = Registry::default().with(filter).with(fmt_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// 刷新并关闭全局 TracerProvider，进程退出前调用
pub fn shutdown() {
    global::shutdown_tracer_provider();
}
