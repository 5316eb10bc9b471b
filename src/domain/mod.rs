// ==========================================
// 实验室排课管理 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod calendar;
pub mod import;
pub mod timetable;
pub mod types;

// 重导出核心类型
pub use calendar::{CalendarDay, CalendarGrid, CellAction, GridCollision, ScheduledCell};
pub use import::{ImportBatch, ImportSummary, SubmitOutcome, ValidationError};
pub use timetable::{
    EntityRef, LecturerCatalogItem, RawCell, RawRecord, ReferenceCatalogs, RoomCatalogItem,
    RowKey, RowPatch, TimetableEntry, TimetableRow,
};
pub use types::{CallerContext, CallerRole, Period, ALL_PERIODS, DEFAULT_STUDY_TIME, MAX_WEEK};
