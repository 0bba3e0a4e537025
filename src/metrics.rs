//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了暂存与监听流程的指标收集功能。

use dashmap::DashMap;
use lazy_static::lazy_static;

/// 指标收集器
///
/// 以 "name:label" 为键累计计数
#[derive(Debug, Default)]
pub struct Metrics {
    counters: DashMap<String, u64>,
}

lazy_static! {
    /// 全局指标实例
    pub static ref GLOBAL_METRICS: Metrics = Metrics::default();
}

impl Metrics {
    /// 计数加一
    ///
    /// # 参数
    ///
    /// * `name` - 指标名称（如 listener_events）
    /// * `label` - 指标标签（如 cart/file）
    pub fn incr(&self, name: &str, label: &str) {
        self.add(name, label, 1);
    }

    /// 计数增加指定值
    pub fn add(&self, name: &str, label: &str, value: u64) {
        *self
            .counters
            .entry(format!("{}:{}", name, label))
            .or_insert(0) += value;
    }

    /// 读取当前计数，不存在时为0
    pub fn get(&self, name: &str, label: &str) -> u64 {
        self.counters
            .get(&format!("{}:{}", name, label))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// 清空所有计数
    pub fn reset(&self) {
        self.counters.clear();
    }
}

/// 获取指标字符串
///
/// 将所有指标格式化为 Prometheus 文本格式，按名称排序
pub fn get_metrics_string() -> String {
    let mut lines: Vec<String> = GLOBAL_METRICS
        .counters
        .iter()
        .filter_map(|entry| {
            let (name, label) = entry.key().split_once(':')?;
            Some(format!(
                "shopsync_{}_total{{kind=\"{}\"}} {}",
                name,
                label,
                entry.value()
            ))
        })
        .collect();
    lines.sort();

    let mut output = lines.join("\n");
    if !output.is_empty() {
        output.push('\n');
    }
    output
}
