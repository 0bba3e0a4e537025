//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 数据库模块
//!
//! 提供连接管理和建表功能，支持PostgreSQL、MySQL和SQLite

use crate::config::DatabaseConfig;
use crate::error::{Result, SyncError};
use sea_orm::sea_query::{ColumnDef, Expr, Table, TableCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, Schema};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};

pub mod entity;

use entity::{cart, cart_product, guaranty};

/// 总价列的小数位数
pub const PRICE_SCALE: u32 = 3;
/// PostgreSQL/MySQL 下总价列的精度
pub const PRICE_PRECISION: u32 = 20;
const SQLITE_PRICE_PRECISION: u32 = 16;

/// 数据库类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseType {
    PostgreSQL,
    MySQL,
    SQLite, // 用于测试和开发
}

impl DatabaseType {
    /// 从URL字符串解析数据库类型
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            DatabaseType::PostgreSQL
        } else if url.starts_with("mysql://") {
            DatabaseType::MySQL
        } else {
            DatabaseType::SQLite
        }
    }
}

/// 建立数据库连接池
///
/// 内存SQLite每个连接是独立的数据库，因此连接数被固定为1
#[instrument(skip(config), level = "info")]
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    let url = config.url.expose_secret();
    let db_type = DatabaseType::from_url(url);

    let mut opt = ConnectOptions::new(url.to_string());
    if db_type == DatabaseType::SQLite && url.contains(":memory:") {
        opt.max_connections(1).min_connections(1);
    } else {
        opt.max_connections(config.max_connections)
            .min_connections(config.min_connections);
    }
    opt.connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);

    let connection = Database::connect(opt)
        .await
        .map_err(|e| SyncError::DatabaseError(e.to_string()))?;
    info!("Connected to {:?} database", db_type);
    Ok(connection)
}

/// 建表语句，每次调用都重新构造
fn table_statements(backend: DbBackend) -> Vec<TableCreateStatement> {
    let schema = Schema::new(backend);
    let carts = match backend {
        DbBackend::Sqlite => sqlite_carts_table(),
        _ => schema
            .create_table_from_entity(cart::Entity)
            .if_not_exists()
            .to_owned(),
    };
    vec![
        carts,
        schema
            .create_table_from_entity(cart_product::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(guaranty::Entity)
            .if_not_exists()
            .check(Expr::col(guaranty::Column::GuarantyDays).gte(1))
            .to_owned(),
    ]
}

/// SQLite的小数精度上限为16，总价列降为 decimal(16, 3)
fn sqlite_carts_table() -> TableCreateStatement {
    Table::create()
        .table(cart::Entity)
        .if_not_exists()
        .col(
            ColumnDef::new(cart::Column::Id)
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        )
        .col(
            ColumnDef::new(cart::Column::UserId)
                .integer()
                .not_null()
                .unique_key(),
        )
        .col(ColumnDef::new(cart::Column::TotalQuantity).integer().null())
        .col(
            ColumnDef::new(cart::Column::TotalPrice)
                .decimal_len(SQLITE_PRICE_PRECISION, PRICE_SCALE)
                .null(),
        )
        .col(
            ColumnDef::new(cart::Column::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(cart::Column::ModifiedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .to_owned()
}

/// 创建所有表（已存在则跳过）
#[instrument(skip(db), level = "info")]
pub async fn migrate(db: &DatabaseConnection) -> Result<()> {
    let backend = db.get_database_backend();
    for statement in table_statements(backend) {
        db.execute(backend.build(&statement)).await?;
    }
    info!("Database schema is up to date");
    Ok(())
}
