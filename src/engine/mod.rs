// ==========================================
// 实验室排课管理 - 引擎层
// ==========================================
// 职责: 日历读取路径的业务规则（网格放置 / 状态判定 / 点击路由）
// 红线: Engine 不拼 SQL,日志索引由调用方注入
// ==========================================

pub mod calendar_grid;
pub mod schedule_status;

// 重导出核心引擎
pub use calendar_grid::{parse_entry_date, CalendarGridBuilder};
pub use schedule_status::{LogIndex, ScheduleStatusClassifier};
