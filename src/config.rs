//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了服务的配置结构和解析逻辑。

use crate::error::{Result, SyncError};
use redis::IntoConnectionInfo;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: u32 = 1;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "shopsync.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub config_version: Option<u32>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub storage: StorageConfig,
    pub cart: CartConfig,
    pub guaranty: GuarantyConfig,
    pub listener: ListenerConfig,
    pub http: HttpConfig,
    pub telemetry: TelemetryConfig,
}

/// 关系数据库配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 连接字符串（postgres://、mysql:// 或 sqlite:）
    pub url: SecretString,
    /// 最大连接数
    pub max_connections: u32,
    /// 最小连接数
    pub min_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
    /// 是否输出SQL日志
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::new("postgres://postgres@localhost:5432/shop".to_string().into()),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 5,
            sqlx_logging: false,
        }
    }
}

/// Redis配置
///
/// 同时用于暂存键的写入和键空间通知的订阅
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RedisConfig {
    /// 连接字符串
    pub connection_string: SecretString,
    /// 连接超时时间（毫秒）
    pub connection_timeout_ms: u64,
    /// 命令执行超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// 数据库编号，决定键空间频道 `__keyspace@{db}__`
    ///
    /// 实际编号以连接字符串为准，这里填写时必须与之一致
    pub db: Option<i64>,
    /// 暂存键的最大长度（字节）
    pub max_key_length: usize,
}

impl RedisConfig {
    /// 暂存键所在的数据库编号
    ///
    /// 暂存键写在连接字符串选中的库里，监听器必须订阅同一个库的键空间频道
    pub fn keyspace_db(&self) -> std::result::Result<i64, String> {
        let info = self
            .connection_string
            .expose_secret()
            .into_connection_info()
            .map_err(|e| format!("redis.connection_string is invalid: {}", e))?;
        let selected = info.redis.db;
        match self.db {
            Some(db) if db != selected => Err(format!(
                "redis.db ({}) does not match the database selected by connection_string ({})",
                db, selected
            )),
            _ => Ok(selected),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::new("redis://localhost:6379".to_string().into()),
            connection_timeout_ms: 5000,
            command_timeout_ms: 3000,
            db: None,
            max_key_length: 512,
        }
    }
}

/// 对象存储后端类型
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3兼容存储
    #[default]
    S3,
    /// 本地文件系统
    Local,
    /// 进程内存（仅用于开发和测试）
    Memory,
}

/// 对象存储配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: Option<SecretString>,
    pub secret_key: Option<SecretString>,
    /// 是否允许非TLS端点
    pub allow_http: bool,
    /// 本地后端的根目录
    pub root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: "shop".to_string(),
            endpoint: None,
            region: "us-east-1".to_string(),
            access_key: None,
            secret_key: None,
            allow_http: false,
            root: None,
        }
    }
}

/// 购物车暂存配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CartConfig {
    /// 暂存键的过期时间（秒）
    pub ttl_secs: u64,
    /// 暂存新键前是否删除同一用户尚未过期的旧键
    pub supersede_pending: bool,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            supersede_pending: true,
        }
    }
}

/// 保修导入配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GuarantyConfig {
    /// 标记键的过期时间（秒）
    pub marker_ttl_secs: u64,
    /// 每个事务插入的行数
    pub batch_size: usize,
    /// 查询结果缓存时间（秒）
    pub lookup_ttl_secs: u64,
    /// 导入成功后是否删除对象存储中的文件
    pub delete_after_import: bool,
    /// 允许上传的文件扩展名
    pub allowed_extensions: Vec<String>,
}

impl Default for GuarantyConfig {
    fn default() -> Self {
        Self {
            marker_ttl_secs: 1,
            batch_size: 500,
            lookup_ttl_secs: 3600,
            delete_after_import: false,
            allowed_extensions: ["xlsx", "xlsm", "xlsb", "xls", "ods"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// 过期监听器配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ListenerConfig {
    /// 启动时是否执行 `CONFIG SET notify-keyspace-events`
    pub enable_notifications: bool,
    /// 写入的通知标志
    pub notify_flags: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enable_notifications: true,
            notify_flags: "Kx".to_string(),
        }
    }
}

/// HTTP边界配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    /// 上传文件的最大字节数
    pub max_upload_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

/// 日志与链路追踪配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TelemetryConfig {
    /// 未设置 `RUST_LOG` 时使用的过滤表达式
    pub filter: String,
    pub enable_opentelemetry: bool,
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            enable_opentelemetry: false,
            service_name: "shopsync".to_string(),
        }
    }
}

impl Config {
    /// 从TOML文件加载并验证配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// 从TOML字符串解析并验证配置
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(raw).map_err(|e| SyncError::ConfigError(e.to_string()))?;
        config.validate().map_err(SyncError::ConfigError)?;
        Ok(config)
    }

    /// 按路径加载配置；路径缺省时尝试当前目录下的默认文件，不存在则使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                let config = Config::default();
                config.validate().map_err(SyncError::ConfigError)?;
                Ok(config)
            }
        }
    }

    /// 验证配置
    ///
    /// 检查配置的有效性，确保所有值都在合理范围内
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(version) = &self.config_version {
            if *version > CONFIG_VERSION {
                return Err(format!(
                    "Configuration version {} is not supported. Current version is {}.",
                    version, CONFIG_VERSION
                ));
            }
        }

        if self.database.max_connections == 0 {
            return Err("database.max_connections cannot be zero".to_string());
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(format!(
                "database.min_connections ({}) must be <= max_connections ({})",
                self.database.min_connections, self.database.max_connections
            ));
        }

        let timeout = self.redis.connection_timeout_ms;
        if !(100..=30000).contains(&timeout) {
            return Err("redis.connection_timeout_ms must be between 100 and 30000 ms".to_string());
        }

        let timeout = self.redis.command_timeout_ms;
        if !(100..=60000).contains(&timeout) {
            return Err("redis.command_timeout_ms must be between 100 and 60000 ms".to_string());
        }

        self.redis.keyspace_db()?;

        // 负载写在键名里，键名长度需要有上限
        if self.redis.max_key_length < 64 || self.redis.max_key_length > 64 * 1024 {
            return Err("redis.max_key_length must be between 64 and 65536".to_string());
        }

        if self.cart.ttl_secs == 0 {
            return Err("cart.ttl_secs cannot be zero".to_string());
        }

        if self.cart.ttl_secs > 86400 {
            return Err("cart.ttl_secs cannot exceed 1 day (86400 seconds)".to_string());
        }

        if self.guaranty.marker_ttl_secs == 0 {
            return Err("guaranty.marker_ttl_secs cannot be zero".to_string());
        }

        if self.guaranty.batch_size == 0 {
            return Err("guaranty.batch_size cannot be zero".to_string());
        }

        if self.guaranty.batch_size > 10000 {
            return Err("guaranty.batch_size cannot exceed 10000".to_string());
        }

        if self.guaranty.lookup_ttl_secs == 0 {
            return Err("guaranty.lookup_ttl_secs cannot be zero".to_string());
        }

        if self.guaranty.allowed_extensions.is_empty() {
            return Err("guaranty.allowed_extensions cannot be empty".to_string());
        }

        if self.listener.enable_notifications && self.listener.notify_flags.is_empty() {
            return Err(
                "listener.notify_flags cannot be empty when enable_notifications is set"
                    .to_string(),
            );
        }

        if self.http.max_upload_bytes == 0 {
            return Err("http.max_upload_bytes cannot be zero".to_string());
        }

        match self.storage.backend {
            StorageBackend::S3 if self.storage.bucket.is_empty() => {
                return Err("storage.bucket cannot be empty for the s3 backend".to_string());
            }
            StorageBackend::Local if self.storage.root.is_none() => {
                return Err("storage.root is required for the local backend".to_string());
            }
            _ => {}
        }

        Ok(())
    }
}
