//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了CLI命令行接口。

use crate::config::Config;
use crate::telemetry;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "shopsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 配置文件路径，缺省时使用当前目录下的 shopsync.toml
    #[arg(short, long, global = true, env = "SHOPSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(name = "serve", about = "Run the HTTP boundary")]
    Serve(ServeArgs),

    #[command(name = "listen", about = "Run the write-behind listener")]
    Listen,

    #[command(name = "migrate", about = "Create missing database tables")]
    Migrate,

    #[command(name = "import", about = "Import a guaranty spreadsheet directly")]
    Import(ImportArgs),

    #[command(name = "lookup", about = "Look up a guaranty by serial")]
    Lookup(LookupArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[arg(long, help = "Run the write-behind listener in the same process")]
    pub with_listener: bool,
}

#[derive(Parser, Debug)]
pub struct ImportArgs {
    #[arg(help = "Path to an xlsx/xlsm/xlsb/xls/ods file")]
    pub path: PathBuf,
}

#[derive(Parser, Debug)]
pub struct LookupArgs {
    #[arg(help = "Guaranty serial")]
    pub serial: String,
}

mod admin;
mod serve;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    telemetry::init_tracing(&config.telemetry);

    let result = match &cli.command {
        Commands::Serve(args) => serve::execute_serve(config, args).await,
        Commands::Listen => serve::execute_listen(config).await,
        Commands::Migrate => admin::execute_migrate(config).await,
        Commands::Import(args) => admin::execute_import(config, args).await,
        Commands::Lookup(args) => admin::execute_lookup(config, args).await,
    };
    telemetry::shutdown();
    result
}
