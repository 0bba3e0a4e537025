//! shopsync - 电商后台的写后同步管道
//!
//! 购物车汇总值和保修表格导入先暂存为带TTL的Redis键，
//! 监听器在收到键过期通知后执行持久化写入。

pub mod backend;
pub mod cart;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod guaranty;
pub mod http;
pub mod manager;
pub mod metrics;
pub mod storage;
pub mod sync;
pub mod telemetry;

#[cfg(test)]
mod test_support;

// Re-export commonly used items
pub use cart::{CartService, StagedCartDelta};
pub use config::Config;
pub use error::{Result, SyncError};
pub use guaranty::{GuarantyService, ImportReport};
pub use manager::ServiceManager;
pub use sync::{EventDispatcher, WriteBehindListener};

/// shopsync 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
