//! Copyright (c) 2025, Kirky.X
//!
//! MIT License
//!
//! 该模块实现了保修表格的暂存、导入与查询。

use super::{
    lookup_cache_key, marker_key, parse_workbook, unique_upload_name, Guaranty, GuarantyError,
    GuarantyRow, ImportReport,
};
use crate::backend::CacheBackend;
use crate::config::GuarantyConfig;
use crate::database::entity::guaranty;
use crate::error::SyncError;
use crate::metrics::GLOBAL_METRICS;
use crate::storage::FileStorage;
use bytes::Bytes;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// 导入标记键的值
const MARKER_VALUE: &str = "1";

/// 保修服务
#[derive(Clone)]
pub struct GuarantyService {
    db: DatabaseConnection,
    cache: Arc<dyn CacheBackend>,
    storage: Arc<dyn FileStorage>,
    config: GuarantyConfig,
}

impl std::fmt::Debug for GuarantyService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuarantyService")
            .field("config", &self.config)
            .finish()
    }
}

impl GuarantyService {
    pub fn new(
        db: DatabaseConnection,
        cache: Arc<dyn CacheBackend>,
        storage: Arc<dyn FileStorage>,
        config: GuarantyConfig,
    ) -> Self {
        Self {
            db,
            cache,
            storage,
            config,
        }
    }

    /// 暂存一次批量导入
    ///
    /// # 参数
    ///
    /// * `original_filename` - 上传时的文件名，只用于取扩展名
    /// * `body` - 文件内容
    ///
    /// # 返回值
    ///
    /// 返回生成的存储名称。上传失败时不会写入标记键。
    #[instrument(skip(self, body), level = "info", fields(size = body.len()))]
    pub async fn stage_import(
        &self,
        original_filename: &str,
        body: Bytes,
    ) -> Result<String, GuarantyError> {
        let name = unique_upload_name(original_filename, &self.config.allowed_extensions)?;
        if body.is_empty() {
            return Err(GuarantyError::MissingFile);
        }

        self.storage.put(&name, body).await?;
        self.cache
            .set_with_ttl(&marker_key(&name), MARKER_VALUE, self.config.marker_ttl_secs)
            .await?;

        GLOBAL_METRICS.incr("staged_keys", "file");
        info!("Staged guaranty import {} from {}", name, original_filename);
        Ok(name)
    }

    /// 从对象存储取回文件并导入
    #[instrument(skip(self), level = "info")]
    pub async fn import_object(&self, name: &str) -> Result<ImportReport, GuarantyError> {
        let body = self.storage.get(name).await?;
        let report = self.import_bytes(&body).await?;

        if self.config.delete_after_import && report.failed_batches == 0 {
            if let Err(e) = self.storage.delete(name).await {
                warn!("Failed to delete imported object {}: {}", name, e);
            }
        }
        info!(
            "Imported {}: inserted={}, skipped={}, rejected={}, batches={}, failed_batches={}",
            name,
            report.inserted,
            report.skipped,
            report.rejected,
            report.batches,
            report.failed_batches
        );
        Ok(report)
    }

    /// 解析表格内容并导入
    pub async fn import_bytes(&self, bytes: &[u8]) -> Result<ImportReport, GuarantyError> {
        let parsed = parse_workbook(bytes)?;
        let mut report = self.insert_rows(parsed.rows).await;
        report.rejected = parsed.rejected.len();
        GLOBAL_METRICS.add("guaranty_rows", "rejected", report.rejected as u64);
        Ok(report)
    }

    /// 分批插入，每批一个事务
    ///
    /// 保修序列号冲突的行被跳过。某一批失败时回滚该批并继续处理后续批次。
    pub async fn insert_rows(&self, rows: Vec<GuarantyRow>) -> ImportReport {
        let mut report = ImportReport::default();
        let batch_size = self.config.batch_size.max(1);
        let now = Utc::now();

        let mut rows = rows.into_iter().peekable();
        let mut index = 0;
        while rows.peek().is_some() {
            let chunk: Vec<GuarantyRow> = rows.by_ref().take(batch_size).collect();
            let len = chunk.len() as u64;
            match self.insert_chunk(chunk, now).await {
                Ok(inserted) => {
                    report.batches += 1;
                    report.inserted += inserted;
                    report.skipped += len.saturating_sub(inserted);
                    GLOBAL_METRICS.incr("import_batches", "committed");
                    debug!("Batch {} committed: {} of {} rows inserted", index, inserted, len);
                }
                Err(e) => {
                    report.failed_batches += 1;
                    GLOBAL_METRICS.incr("import_batches", "failed");
                    error!("Batch {} of {} rows rolled back: {}", index, len, e);
                }
            }
            index += 1;
        }

        GLOBAL_METRICS.add("guaranty_rows", "inserted", report.inserted);
        GLOBAL_METRICS.add("guaranty_rows", "skipped", report.skipped);
        report
    }

    async fn insert_chunk(
        &self,
        chunk: Vec<GuarantyRow>,
        now: chrono::DateTime<Utc>,
    ) -> Result<u64, DbErr> {
        let txn = self.db.begin().await?;
        let models = chunk.into_iter().map(|row| row.into_active_model(now));
        let result = guaranty::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(guaranty::Column::GuarantySerial)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;

        let inserted = match result {
            Ok(n) => n,
            Err(DbErr::RecordNotInserted) => 0,
            Err(e) => {
                txn.rollback().await?;
                return Err(e);
            }
        };
        txn.commit().await?;
        Ok(inserted)
    }

    /// 按保修序列号查询，结果读穿缓存
    ///
    /// 缓存不可用时直接查库，未命中的结果不缓存
    #[instrument(skip(self), level = "debug")]
    pub async fn lookup(&self, guaranty_serial: &str) -> Result<Guaranty, GuarantyError> {
        let key = lookup_cache_key(guaranty_serial);
        match self.cache.get(&key).await {
            Ok(Some(cached)) => match serde_json::from_str::<Guaranty>(&cached) {
                Ok(found) => {
                    GLOBAL_METRICS.incr("lookup", "hit");
                    return Ok(found);
                }
                Err(e) => warn!("Discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Lookup cache unavailable: {}", e),
        }
        GLOBAL_METRICS.incr("lookup", "miss");

        let found: Guaranty = guaranty::Entity::find()
            .filter(guaranty::Column::GuarantySerial.eq(guaranty_serial))
            .one(&self.db)
            .await?
            .ok_or_else(|| GuarantyError::NotFound(guaranty_serial.to_string()))?
            .into();

        let encoded = serde_json::to_string(&found).map_err(SyncError::from)?;
        if let Err(e) = self
            .cache
            .set_with_ttl(&key, &encoded, self.config.lookup_ttl_secs)
            .await
        {
            warn!("Failed to cache {}: {}", key, e);
        }
        Ok(found)
    }
}
