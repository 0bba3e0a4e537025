//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了一次性的管理命令：建表、直接导入和保修查询。

use crate::cli::{ImportArgs, LookupArgs};
use crate::config::Config;
use crate::database;
use crate::manager::ServiceManager;
use anyhow::{Context, Result};

pub async fn execute_migrate(config: Config) -> Result<()> {
    let db = database::connect(&config.database).await?;
    database::migrate(&db).await?;
    println!("Database schema is up to date.");
    Ok(())
}

/// 绕过暂存流程，直接走分批导入
pub async fn execute_import(config: Config, args: &ImportArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    let manager = ServiceManager::init(config).await?;
    let report = manager.guaranty().import_bytes(&bytes).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    manager.shutdown().await?;
    if report.failed_batches > 0 {
        anyhow::bail!("{} batches failed", report.failed_batches);
    }
    Ok(())
}

pub async fn execute_lookup(config: Config, args: &LookupArgs) -> Result<()> {
    let manager = ServiceManager::init(config).await?;
    let found = manager.guaranty().lookup(&args.serial).await;
    manager.shutdown().await?;

    let found = found.with_context(|| format!("Lookup of '{}' failed", args.serial))?;
    println!("{}", serde_json::to_string_pretty(&found)?);
    Ok(())
}
