// ==========================================
// 实验室排课管理 - 配置层
// ==========================================
// 职责: 系统配置管理（学期周次分区 / 导入上限 / 界面语言）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, parse_semester_week_ranges, ConfigManager};
pub use import_config_trait::ImportConfigReader;
