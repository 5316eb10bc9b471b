// ==========================================
// 实验室排课管理 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalog_repo;
pub mod error;
pub mod teaching_log_repo;
pub mod timetable_repo;

// 重导出核心仓储
pub use catalog_repo::CatalogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use teaching_log_repo::{TeachingLog, TeachingLogRepository};
pub use timetable_repo::TimetableRepository;
