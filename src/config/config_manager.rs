// ==========================================
// 实验室排课管理 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (scope_id='global', value 为字符串或 JSON)
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use crate::importer::week_semester_rule::SemesterWeekRanges;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 默认单次导入行数上限
pub const DEFAULT_MAX_IMPORT_ROWS: usize = 2000;

/// 默认界面语言
pub const DEFAULT_UI_LOCALE: &str = "vi";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 会对传入连接再次应用统一 PRAGMA（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值,带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }
}

/// 解析学期周次 JSON: {"1":[1,20],"2":[21,40]}
///
/// 学期键非数字或区间倒置的条目被忽略
pub fn parse_semester_week_ranges(raw: &str) -> Result<SemesterWeekRanges, serde_json::Error> {
    let parsed: HashMap<String, (u32, u32)> = serde_json::from_str(raw)?;

    let ranges: BTreeMap<u32, (u32, u32)> = parsed
        .into_iter()
        .filter_map(|(semester, (start, end))| {
            let semester = semester.trim().parse::<u32>().ok()?;
            (start <= end).then_some((semester, (start, end)))
        })
        .collect();

    Ok(SemesterWeekRanges::new(ranges))
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_semester_week_ranges(&self) -> ConfigResult<SemesterWeekRanges> {
        let Some(value) = self.get_global_config_value(config_keys::SEMESTER_WEEK_RANGES)? else {
            return Ok(SemesterWeekRanges::default());
        };

        match parse_semester_week_ranges(&value) {
            Ok(ranges) if !ranges.is_empty() => Ok(ranges),
            _ => {
                warn!(
                    config_key = config_keys::SEMESTER_WEEK_RANGES,
                    raw_value = %value,
                    "学期周次配置格式错误,使用默认分区"
                );
                Ok(SemesterWeekRanges::default())
            }
        }
    }

    async fn get_max_import_rows(&self) -> ConfigResult<usize> {
        let value = self.get_config_or_default(
            config_keys::MAX_IMPORT_ROWS,
            &DEFAULT_MAX_IMPORT_ROWS.to_string(),
        )?;
        Ok(value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|&n| n > 0)
            .unwrap_or(DEFAULT_MAX_IMPORT_ROWS))
    }

    async fn get_ui_locale(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::UI_LOCALE, DEFAULT_UI_LOCALE)?;
        let value = value.trim();
        if value.is_empty() {
            Ok(DEFAULT_UI_LOCALE.to_string())
        } else {
            Ok(value.to_string())
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 学期周次分区 (JSON)
    pub const SEMESTER_WEEK_RANGES: &str = "semester_week_ranges";

    // 导入限制
    pub const MAX_IMPORT_ROWS: &str = "max_import_rows";

    // 界面
    pub const UI_LOCALE: &str = "ui_locale";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::importer::timetable_importer_trait::WeekSemesterRule;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let config = manager();

        assert_eq!(
            config.get_semester_week_ranges().await.unwrap(),
            SemesterWeekRanges::default()
        );
        assert_eq!(config.get_max_import_rows().await.unwrap(), 2000);
        assert_eq!(config.get_ui_locale().await.unwrap(), "vi");
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let config = manager();
        config
            .set_global_config_value(config_keys::SEMESTER_WEEK_RANGES, r#"{"1":[1,22],"2":[23,44]}"#)
            .unwrap();
        config
            .set_global_config_value(config_keys::MAX_IMPORT_ROWS, "50")
            .unwrap();
        config.set_global_config_value(config_keys::UI_LOCALE, "en").unwrap();

        let ranges = config.get_semester_week_ranges().await.unwrap();
        assert!(ranges.is_week_valid_for_semester(1, 22));
        assert!(!ranges.is_week_valid_for_semester(3, 45));
        assert_eq!(config.get_max_import_rows().await.unwrap(), 50);
        assert_eq!(config.get_ui_locale().await.unwrap(), "en");
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back() {
        let config = manager();
        config
            .set_global_config_value(config_keys::SEMESTER_WEEK_RANGES, "not json")
            .unwrap();
        config
            .set_global_config_value(config_keys::MAX_IMPORT_ROWS, "-1")
            .unwrap();

        assert_eq!(
            config.get_semester_week_ranges().await.unwrap(),
            SemesterWeekRanges::default()
        );
        assert_eq!(config.get_max_import_rows().await.unwrap(), 2000);
    }

    #[test]
    fn test_parse_ranges_skips_bad_entries() {
        let ranges = parse_semester_week_ranges(r#"{"1":[1,20],"x":[1,2],"2":[40,21]}"#).unwrap();
        assert_eq!(ranges.range_for(1), Some(1..=20));
        assert_eq!(ranges.range_for(2), None);
    }
}
