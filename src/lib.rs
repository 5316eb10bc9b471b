// ==========================================
// 实验室排课管理 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 课表批量导入校验 + 课表日历状态判定
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "vi");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 日历规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CallerContext, CallerRole, Period};

// 领域实体
pub use domain::{
    CalendarGrid, CellAction, EntityRef, ImportBatch, ImportSummary, RawCell, RawRecord,
    ScheduledCell, SubmitOutcome, TimetableEntry, TimetableRow, ValidationError,
};

// 导入管道
pub use importer::{ImportBatchProcessor, SemesterWeekRanges, WeekSemesterRule};

// 引擎
pub use engine::{CalendarGridBuilder, LogIndex, ScheduleStatusClassifier};

// API
pub use api::{CalendarApi, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "Quản lý lịch phòng thực hành";
