//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了Redis连接提供者和键值缓存后端。

pub mod cache;
pub mod redis_provider;

pub use cache::{CacheBackend, RedisCacheBackend};
pub use redis_provider::{DefaultRedisProvider, RedisProvider};
