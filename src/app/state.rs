// ==========================================
// 实验室排课管理 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{CalendarApi, ImportApi};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use crate::repository::CatalogRepository;

/// 应用状态
///
/// 包含所有API实例和共享资源（共享同一 SQLite 连接）
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 课表导入API
    pub import_api: Arc<ImportApi>,

    /// 课表日历API
    pub calendar_api: Arc<CalendarApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 房间/教师目录
    pub catalog_repo: Arc<CatalogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并建表（幂等）
    /// 2. 初始化Repository与配置
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState,数据库路径: {}", db_path);

        // 创建数据库连接（共享连接）
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        match read_schema_version(&conn) {
            Ok(Some(v)) if v != CURRENT_SCHEMA_VERSION => {
                tracing::warn!(
                    db_version = v,
                    expected = CURRENT_SCHEMA_VERSION,
                    "数据库 schema_version 与当前代码不一致"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("读取 schema_version 失败(将继续启动): {}", e),
        }
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let catalog_repo = Arc::new(CatalogRepository::new(conn.clone()));

        let import_api = Arc::new(
            ImportApi::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ImportApi: {}", e))?,
        );
        let calendar_api = Arc::new(CalendarApi::from_connection(conn));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            import_api,
            calendar_api,
            config_manager,
            catalog_repo,
        })
    }

    /// 按配置应用界面语言
    pub async fn apply_configured_locale(&self) {
        match self.config_manager.get_ui_locale().await {
            Ok(locale) => crate::i18n::set_locale(&locale),
            Err(e) => tracing::warn!("读取界面语言失败,保持默认: {}", e),
        }
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 LAB_TIMETABLE_DB_PATH（若设置）
/// - 开发环境: 用户数据目录/lab-timetable-dev/lab_timetable.db
/// - 生产环境: 用户数据目录/lab-timetable/lab_timetable.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("LAB_TIMETABLE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./lab_timetable.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录,避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("lab-timetable-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("lab-timetable");
        }

        // 确保目录存在
        std::fs::create_dir_all(&path).ok();
        path = path.join("lab_timetable.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_app_state_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).unwrap();
        assert_eq!(state.get_db_path(), db_path);
        assert!(state.catalog_repo.list_rooms().unwrap().is_empty());
    }
}
