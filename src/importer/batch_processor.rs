// ==========================================
// 实验室排课管理 - 导入批次处理器
// ==========================================
// 流程: 映射 → 引用解析 → 校验 → 分区（有效/错误/空行）
// 职责: 生成待审核批次 / 审核期单行编辑 / 提交过滤
// 红线: 单行编辑只重算该行（O(1)),不重算整批
// 红线: 提交只包含非空且无错误的行,错误行静默跳过
// ==========================================

use crate::domain::import::{ImportBatch, ImportSummary};
use crate::domain::timetable::{RawRecord, ReferenceCatalogs, RowKey, RowPatch, TimetableRow};
use crate::domain::types::CallerContext;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::reference_resolver::ReferenceResolver;
use crate::importer::row_validator::RowValidator;
use crate::importer::timetable_importer_trait::{FieldMapper as _, WeekSemesterRule};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// ImportBatchProcessor
// ==========================================
pub struct ImportBatchProcessor {
    // 导入上下文（每次上传固定）
    catalogs: ReferenceCatalogs,
    rule: Arc<dyn WeekSemesterRule>,
    caller: CallerContext,

    // 管道组件
    field_mapper: FieldMapper,
    resolver: ReferenceResolver,
    validator: RowValidator,
}

impl ImportBatchProcessor {
    /// 创建处理器
    ///
    /// # 参数
    /// - catalogs: 预先拉取的房间/教师目录（可为空,空目录跳过引用校验）
    /// - rule: 周次/学期一致性规则
    /// - caller: 调用方上下文
    pub fn new(
        catalogs: ReferenceCatalogs,
        rule: Arc<dyn WeekSemesterRule>,
        caller: CallerContext,
    ) -> Self {
        Self {
            catalogs,
            rule,
            caller,
            field_mapper: FieldMapper,
            resolver: ReferenceResolver,
            validator: RowValidator,
        }
    }

    pub fn caller(&self) -> &CallerContext {
        &self.caller
    }

    pub fn catalogs(&self) -> &ReferenceCatalogs {
        &self.catalogs
    }

    /// 由原始行构建批次
    ///
    /// 单行问题只记录为 ValidationError,从不失败
    #[instrument(skip(self, raw_rows), fields(rows = raw_rows.len(), caller = %self.caller.user_id))]
    pub fn build(&self, raw_rows: Vec<RawRecord>) -> ImportBatch {
        let mut batch = ImportBatch::new(Uuid::new_v4().to_string());

        for (key, record) in raw_rows.iter().enumerate() {
            let mapped = self.field_mapper.map_row(record, key, &self.caller);
            self.place_row(&mut batch, key, mapped.row, mapped.is_empty);
        }

        info!(
            batch_id = %batch.batch_id,
            total = batch.total_count(),
            valid = batch.valid_count(),
            invalid = batch.invalid_count(),
            empty = batch.empty_count(),
            "导入批次构建完成"
        );

        batch
    }

    /// 审核期编辑单行: 仅对该行重新映射、解析、校验
    pub fn update_row(&self, mut batch: ImportBatch, key: RowKey, patch: RowPatch) -> ImportBatch {
        let next = match batch.rows.get(&key) {
            Some(current) => self.field_mapper.apply_patch(current, &patch, &self.caller),
            None => {
                warn!(batch_id = %batch.batch_id, row = key, "编辑的行不存在,忽略");
                return batch;
            }
        };

        let is_empty = self.field_mapper.is_row_empty(&next, &self.caller);
        self.place_row(&mut batch, key, next, is_empty);

        debug!(
            batch_id = %batch.batch_id,
            row = key,
            error = ?batch.error_for(key).map(|e| e.code()),
            "单行重新校验完成"
        );

        batch
    }

    /// 从批次中移除一行
    pub fn remove_row(&self, mut batch: ImportBatch, key: RowKey) -> ImportBatch {
        if batch.rows.remove(&key).is_none() {
            warn!(batch_id = %batch.batch_id, row = key, "删除的行不存在,忽略");
            return batch;
        }
        batch.errors_by_row_key.remove(&key);
        batch.empty_row_keys.remove(&key);
        batch
    }

    /// 提交过滤: 返回当前所有非空且无错误的行
    pub fn submit(&self, batch: &ImportBatch) -> Vec<TimetableRow> {
        let rows: Vec<TimetableRow> = batch
            .rows
            .iter()
            .filter(|(key, _)| batch.is_valid_row(**key))
            .map(|(key, row)| TimetableRow {
                key: *key,
                ..row.clone()
            })
            .collect();

        if batch.invalid_count() > 0 {
            warn!(
                batch_id = %batch.batch_id,
                skipped = batch.invalid_count(),
                "存在错误行,提交时将跳过"
            );
        }
        info!(batch_id = %batch.batch_id, submitted = rows.len(), "提交行已确定");

        rows
    }

    /// 审核界面汇总
    pub fn summary(&self, batch: &ImportBatch) -> ImportSummary {
        batch.summary()
    }

    /// 将单行放入批次（清除旧状态后重新分区）
    ///
    /// 行号以批次 map 的键为准: 反序列化后的行 key 不可信
    fn place_row(
        &self,
        batch: &mut ImportBatch,
        key: RowKey,
        mut row: TimetableRow,
        is_empty: bool,
    ) {
        row.key = key;
        batch.errors_by_row_key.remove(&key);
        batch.empty_row_keys.remove(&key);

        if is_empty {
            batch.empty_row_keys.insert(key);
            batch.rows.insert(key, row);
            return;
        }

        let row = self.resolver.resolve(row, &self.catalogs);
        if let Some(err) = self.validator.validate(&row, &self.catalogs, self.rule.as_ref()) {
            debug!(row = key, code = err.code(), "行校验未通过");
            batch.errors_by_row_key.insert(key, err);
        }
        batch.rows.insert(key, row);
    }
}
