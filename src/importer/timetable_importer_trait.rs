// ==========================================
// 实验室排课管理 - 课表导入 Trait
// ==========================================
// 职责: 定义导入管道与外部协作方接口（不包含实现）
// 协作方: 表格解码 / 目录拉取 / 周次-学期规则 / 持久化提交
// ==========================================

use crate::domain::import::SubmitOutcome;
use crate::domain::timetable::{
    LecturerCatalogItem, RawRecord, RoomCatalogItem, RowKey, TimetableRow,
};
use crate::domain::types::CallerContext;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::error::Error;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 表格解码（上传文件 → 原始行记录）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 单元格>）
    ///
    /// # 返回
    /// - Ok(Vec<RawRecord>): 行记录列表（保留空白行,由批次统计为空行）
    /// - Err: 文件不存在 / 格式不支持 / 无法解析
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 原始行 → 候选课表行
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 映射单行
    ///
    /// # 参数
    /// - record: 原始行记录（越南语列名）
    /// - key: 行位置
    /// - caller: 调用方上下文（非管理员强制覆盖教师字段）
    ///
    /// # 返回
    /// - MappedRow: 候选行 + 是否空行
    fn map_row(&self, record: &RawRecord, key: RowKey, caller: &CallerContext) -> MappedRow;
}

/// 映射结果
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row: TimetableRow,
    pub is_empty: bool, // 所有表格字段均为空
}

// ==========================================
// WeekSemesterRule Trait
// ==========================================
// 用途: 周次与学期一致性规则（可插拔策略,不硬编码边界）
// 实现者: SemesterWeekRanges
pub trait WeekSemesterRule: Send + Sync {
    /// 周次是否属于该学期
    fn is_week_valid_for_semester(&self, semester: u32, week: u32) -> bool;

    /// 该学期允许的周次区间（未配置的学期为 None）
    fn allowed_weeks(&self, semester: u32) -> Option<(u32, u32)>;
}

// ==========================================
// CatalogFetcher Trait
// ==========================================
// 用途: 导入前拉取房间/教师目录
// 实现者: CatalogRepository（使用 rusqlite）
#[async_trait]
pub trait CatalogFetcher: Send + Sync {
    async fn fetch_rooms(&self) -> Result<Vec<RoomCatalogItem>, Box<dyn Error + Send + Sync>>;

    async fn fetch_lecturers(
        &self,
    ) -> Result<Vec<LecturerCatalogItem>, Box<dyn Error + Send + Sync>>;
}

// ==========================================
// TimetableSubmitter Trait
// ==========================================
// 用途: 提交已校验的有效行
// 实现者: TimetableRepository（使用 rusqlite）
#[async_trait]
pub trait TimetableSubmitter: Send + Sync {
    /// 提交有效行
    ///
    /// # 返回
    /// - Ok(Completed): 全部写入
    /// - Ok(Partial): 部分写入（207 语义,属于成功结果）
    /// - Err: 传输/存储失败（由调用方决定是否重试）
    async fn submit_rows(
        &self,
        rows: &[TimetableRow],
        caller: &CallerContext,
    ) -> Result<SubmitOutcome, Box<dyn Error + Send + Sync>>;
}
