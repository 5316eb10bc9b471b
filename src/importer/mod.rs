// ==========================================
// 实验室排课管理 - 导入层
// ==========================================
// 流程: 文件解析 → 字段映射 → 引用解析 → 行校验 → 批次分区
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod batch_processor;
pub mod date_normalizer;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod reference_resolver;
pub mod row_validator;
pub mod timetable_importer_trait;
pub mod week_semester_rule;

// 重导出核心类型
pub use batch_processor::ImportBatchProcessor;
pub use date_normalizer::{normalize_date, normalize_date_str, parse_strict_date, serial_to_date};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use reference_resolver::ReferenceResolver;
pub use row_validator::RowValidator;
pub use week_semester_rule::{SemesterWeekRanges, MAX_WEEK};

// 重导出 Trait 接口
pub use timetable_importer_trait::{
    CatalogFetcher, FieldMapper, FileParser, MappedRow, TimetableSubmitter, WeekSemesterRule,
};
