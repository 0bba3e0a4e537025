//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了暂存键过期后的同步机制，包括键空间通知解析和写后监听器。

pub mod keyspace;
pub mod listener;

pub use listener::{DispatchOutcome, EventDispatcher, WriteBehindListener};
