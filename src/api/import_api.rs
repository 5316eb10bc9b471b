// ==========================================
// 课表导入API
// ==========================================
// 流程: 上传 → 预览（待审核批次）→ 单行编辑/删除 → 确认提交
// 职责: 组装导入管道（文件解析 / 目录拉取 / 周次规则 / 提交协作方）
// 红线: 新上传完全丢弃旧批次,提交只包含有效行
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager, ImportConfigReader};
use crate::domain::import::{ImportBatch, ImportSummary, SubmitOutcome, ValidationError};
use crate::domain::timetable::{RawRecord, ReferenceCatalogs, RowKey, RowPatch, TimetableRow};
use crate::domain::types::CallerContext;
use crate::importer::{
    CatalogFetcher, FileParser, ImportBatchProcessor, ImportError, TimetableSubmitter,
    UniversalFileParser,
};
use crate::repository::{CatalogRepository, TimetableRepository};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// 导入确认响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportApiResponse {
    /// 批次ID
    pub batch_id: String,
    /// 本次提交的有效行数
    pub submitted: usize,
    /// 被跳过的错误行数
    pub skipped_invalid: usize,
    /// 空行数
    pub empty_rows: usize,
    /// 提交结果（全部成功 / 部分成功）
    pub outcome: SubmitOutcome,
    /// 是否部分成功（便于调用方对账 "N 条有效, M 条写入"）
    pub partial: bool,
    /// 提交耗时（毫秒）
    pub elapsed_ms: i64,
}

/// 预览行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    pub key: RowKey,
    pub row: TimetableRow,
    pub is_empty: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 预览响应（审核界面数据）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportPreview {
    pub summary: ImportSummary,
    pub rows: Vec<PreviewRow>,
}

// ==========================================
// ImportSession - 审核中的导入批次
// ==========================================
// 每次编辑返回新的会话快照
pub struct ImportSession {
    processor: ImportBatchProcessor,
    batch: ImportBatch,
}

impl ImportSession {
    pub fn batch(&self) -> &ImportBatch {
        &self.batch
    }

    pub fn summary(&self) -> ImportSummary {
        self.processor.summary(&self.batch)
    }

    /// 编辑单行（仅重算该行）
    pub fn update_row(self, key: RowKey, patch: RowPatch) -> Self {
        let batch = self.processor.update_row(self.batch, key, patch);
        Self { batch, ..self }
    }

    /// 删除单行
    pub fn remove_row(self, key: RowKey) -> Self {
        let batch = self.processor.remove_row(self.batch, key);
        Self { batch, ..self }
    }

    /// 当前可提交的行
    pub fn valid_rows(&self) -> Vec<TimetableRow> {
        self.processor.submit(&self.batch)
    }

    /// 审核界面数据
    pub fn preview(&self) -> ImportPreview {
        let rows = self
            .batch
            .rows
            .iter()
            .map(|(key, row)| {
                let error = self.batch.error_for(*key).cloned();
                PreviewRow {
                    key: *key,
                    row: row.clone(),
                    is_empty: self.batch.is_empty_row(*key),
                    message: error.as_ref().map(|e| e.message()),
                    error,
                }
            })
            .collect();

        ImportPreview {
            summary: self.summary(),
            rows,
        }
    }
}

// ==========================================
// ImportApi
// ==========================================
pub struct ImportApi {
    parser: Box<dyn FileParser>,
    catalog_fetcher: Arc<dyn CatalogFetcher>,
    submitter: Arc<dyn TimetableSubmitter>,
    config: Arc<dyn ImportConfigReader>,
}

impl ImportApi {
    /// 由协作方组装
    pub fn new(
        catalog_fetcher: Arc<dyn CatalogFetcher>,
        submitter: Arc<dyn TimetableSubmitter>,
        config: Arc<dyn ImportConfigReader>,
    ) -> Self {
        Self {
            parser: Box::new(UniversalFileParser),
            catalog_fetcher,
            submitter,
            config,
        }
    }

    /// 使用 SQLite 共享连接组装默认协作方
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self::new(
            Arc::new(CatalogRepository::new(conn.clone())),
            Arc::new(TimetableRepository::new(conn)),
            Arc::new(config),
        ))
    }

    /// 上传文件,生成待审核会话
    ///
    /// # 返回
    /// - Ok(ImportSession): 单行问题记录在批次内
    /// - Err(ApiError): 文件无法读取/格式不支持/行数超限/目录拉取失败
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub async fn start_import(
        &self,
        file_path: &Path,
        caller: CallerContext,
    ) -> ApiResult<ImportSession> {
        let records = self.parser.parse_to_raw_records(file_path)?;
        self.start_import_from_records(records, caller).await
    }

    /// 由已解码的原始行生成待审核会话
    pub async fn start_import_from_records(
        &self,
        records: Vec<RawRecord>,
        caller: CallerContext,
    ) -> ApiResult<ImportSession> {
        let limit = self
            .config
            .get_max_import_rows()
            .await
            .map_err(|e| config_error(config_keys::MAX_IMPORT_ROWS, e))?;
        if records.len() > limit {
            return Err(ImportError::TooManyRows {
                rows: records.len(),
                limit,
            }
            .into());
        }

        let catalogs = self.fetch_catalogs().await?;
        let rule = self
            .config
            .get_semester_week_ranges()
            .await
            .map_err(|e| config_error(config_keys::SEMESTER_WEEK_RANGES, e))?;

        let processor = ImportBatchProcessor::new(catalogs, Arc::new(rule), caller);
        let batch = processor.build(records);

        Ok(ImportSession { processor, batch })
    }

    /// 确认提交
    ///
    /// 部分成功是成功结果,通过 outcome / partial 区分
    #[instrument(skip(self, session), fields(batch_id = %session.batch.batch_id))]
    pub async fn confirm_import(&self, session: &ImportSession) -> ApiResult<ImportApiResponse> {
        let start = Instant::now();
        let rows = session.valid_rows();

        let outcome = if rows.is_empty() {
            warn!("无有效行,跳过提交");
            SubmitOutcome::Completed { inserted_count: 0 }
        } else {
            self.submitter
                .submit_rows(&rows, session.processor.caller())
                .await
                .map_err(|e| ApiError::SubmissionFailed(e.to_string()))?
        };

        if outcome.is_partial() {
            warn!(
                submitted = rows.len(),
                inserted = outcome.inserted_count(),
                "课表部分写入"
            );
        } else {
            info!(inserted = outcome.inserted_count(), "课表全部写入");
        }

        Ok(ImportApiResponse {
            batch_id: session.batch.batch_id.clone(),
            submitted: rows.len(),
            skipped_invalid: session.batch.invalid_count(),
            empty_rows: session.batch.empty_count(),
            outcome,
            partial: outcome.is_partial(),
            elapsed_ms: start.elapsed().as_millis() as i64,
        })
    }

    /// 并发拉取房间/教师目录
    async fn fetch_catalogs(&self) -> ApiResult<ReferenceCatalogs> {
        let (rooms, lecturers) = futures::try_join!(
            self.catalog_fetcher.fetch_rooms(),
            self.catalog_fetcher.fetch_lecturers()
        )
        .map_err(|e| ImportError::CatalogFetchError(e.to_string()))?;

        Ok(ReferenceCatalogs::new(rooms, lecturers))
    }
}

fn config_error(key: &str, err: Box<dyn std::error::Error + Send + Sync>) -> ApiError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message: err.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::domain::timetable::{LecturerCatalogItem, RawCell, RoomCatalogItem};
    use std::collections::HashMap;

    fn setup() -> (ImportApi, Arc<Mutex<Connection>>) {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let catalog = CatalogRepository::new(conn.clone());
        catalog
            .upsert_room(&RoomCatalogItem {
                room_id: "P101".to_string(),
                id: "r1".to_string(),
                name: "P101".to_string(),
            })
            .unwrap();
        catalog
            .upsert_lecturer(&LecturerCatalogItem {
                email: "a@x.edu".to_string(),
                id: "u1".to_string(),
                name: "A".to_string(),
            })
            .unwrap();

        (ImportApi::from_connection(conn.clone()).unwrap(), conn)
    }

    fn record(room: &str) -> RawRecord {
        let mut row = HashMap::new();
        row.insert("Năm học".to_string(), RawCell::text("2024-2025"));
        row.insert("Học kỳ".to_string(), RawCell::Number(1.0));
        row.insert("Ngày".to_string(), RawCell::Number(45537.0));
        row.insert("Tuần".to_string(), RawCell::Number(1.0));
        row.insert("Ca".to_string(), RawCell::Number(2.0));
        row.insert("Môn học".to_string(), RawCell::text("Toán"));
        row.insert("Phòng".to_string(), RawCell::text(room));
        row.insert("Lớp".to_string(), RawCell::text("C23A"));
        row.insert("Giảng viên".to_string(), RawCell::text("a@x.edu"));
        row
    }

    #[tokio::test]
    async fn test_preview_edit_confirm() {
        let (api, _conn) = setup();
        let admin = CallerContext::admin("admin", "admin@x.edu");

        let session = api
            .start_import_from_records(vec![record("P101"), record("P999")], admin)
            .await
            .unwrap();
        assert_eq!(session.summary().invalid_rows, 1);

        let preview = session.preview();
        assert!(preview.rows[1].message.is_some());

        let session = session.update_row(
            1,
            RowPatch {
                room: Some(RawCell::text("P101")),
                period: Some(RawCell::Number(3.0)),
                ..Default::default()
            },
        );
        let response = api.confirm_import(&session).await.unwrap();

        assert_eq!(response.submitted, 2);
        assert_eq!(response.skipped_invalid, 0);
        assert_eq!(response.outcome, SubmitOutcome::Completed { inserted_count: 2 });
        assert!(!response.partial);
    }

    #[tokio::test]
    async fn test_slot_conflict_surfaces_partial() {
        let (api, _conn) = setup();
        let admin = CallerContext::admin("admin", "admin@x.edu");

        let session = api
            .start_import_from_records(vec![record("P101"), record("P101")], admin)
            .await
            .unwrap();
        let response = api.confirm_import(&session).await.unwrap();

        assert!(response.partial);
        assert_eq!(response.outcome.inserted_count(), 1);
    }

    #[tokio::test]
    async fn test_too_many_rows_is_rejected() {
        let (api, conn) = setup();
        ConfigManager::from_connection(conn)
            .unwrap()
            .set_global_config_value(config_keys::MAX_IMPORT_ROWS, "1")
            .unwrap();

        let result = api
            .start_import_from_records(
                vec![record("P101"), record("P101")],
                CallerContext::admin("admin", "admin@x.edu"),
            )
            .await;
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }
}
