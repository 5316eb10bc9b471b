// ==========================================
// 实验室排课管理 - 教学日志仓储
// ==========================================
// 职责: 教学日志写入 / 构建"已登记"索引（按课表 ID）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 教学日志记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingLog {
    pub id: String,
    pub timetable_id: String,
    pub content: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// TeachingLogRepository
// ==========================================
pub struct TeachingLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TeachingLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 登记教学日志
    ///
    /// # 返回
    /// - Ok(log_id)
    /// - Err(NotFound): 课表不存在
    pub fn insert_log(
        &self,
        timetable_id: &str,
        content: &str,
        created_by: Option<&str>,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let log_id = Uuid::new_v4().to_string();

        let result = conn.execute(
            "INSERT INTO teaching_log (id, timetable_id, content, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![log_id, timetable_id, content, created_by, Utc::now()],
        );

        match result.map_err(RepositoryError::from) {
            Ok(_) => Ok(log_id),
            Err(RepositoryError::ForeignKeyViolation(_)) => Err(RepositoryError::NotFound {
                entity: "课表".to_string(),
                id: timetable_id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    /// 查询某条课表的日志
    pub fn find_by_timetable_id(&self, timetable_id: &str) -> RepositoryResult<Vec<TeachingLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, timetable_id, content, created_by, created_at
             FROM teaching_log WHERE timetable_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![timetable_id], |row| {
            Ok(TeachingLog {
                id: row.get(0)?,
                timetable_id: row.get(1)?,
                content: row.get(2)?,
                created_by: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 给定课表 ID 中已有日志的集合（日历状态判定用）
    pub fn find_logged_ids(&self, timetable_ids: &[String]) -> RepositoryResult<HashSet<String>> {
        if timetable_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let conn = self.get_conn()?;
        let placeholders = vec!["?"; timetable_ids.len()].join(", ");
        let sql = format!(
            "SELECT DISTINCT timetable_id FROM teaching_log WHERE timetable_id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(timetable_ids.iter()), |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.collect::<Result<HashSet<_>, _>>()?)
    }
}
