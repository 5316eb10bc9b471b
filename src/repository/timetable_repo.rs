// ==========================================
// 实验室排课管理 - 课表数据仓储
// ==========================================
// 职责: 课表写入（导入提交）/ 按日期范围读取（日历）
// 红线: Repository 不含业务规则,只做数据映射
// 红线: 同一日期+节次+房间唯一,冲突行跳过并计为失败（部分成功）
// ==========================================

use crate::domain::import::SubmitOutcome;
use crate::domain::timetable::{EntityRef, TimetableEntry, TimetableRow};
use crate::domain::types::{CallerContext, Period};
use crate::importer::date_normalizer::parse_strict_date;
use crate::importer::timetable_importer_trait::TimetableSubmitter;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_ENTRY_SQL: &str = "SELECT id, school_year, semester, date, week, period, time, \
     subject, class_name, room_id, lecturer_id, created_by, created_at FROM timetable";

// ==========================================
// TimetableRepository - 课表仓储
// ==========================================
pub struct TimetableRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TimetableRepository {
    /// 创建新的课表仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入单条课表
    pub fn insert(&self, entry: &TimetableEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_entry(&conn, entry)
    }

    /// 批量写入已校验行（单事务）
    ///
    /// # 返回
    /// - Completed: 全部写入
    /// - Partial: 存在唯一约束冲突的行被跳过
    pub fn insert_rows(
        &self,
        rows: &[TimetableRow],
        caller: &CallerContext,
    ) -> RepositoryResult<SubmitOutcome> {
        let entries = rows
            .iter()
            .map(|row| row_to_entry(row, caller))
            .collect::<RepositoryResult<Vec<_>>>()?;

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut inserted_count = 0;
        let mut failed_count = 0;
        for entry in &entries {
            match insert_entry(&tx, entry) {
                Ok(()) => inserted_count += 1,
                Err(e) if e.is_unique_violation() => {
                    warn!(
                        date = %entry.date,
                        period = entry.period.number(),
                        room_id = %entry.room_id,
                        "课表时段冲突,跳过"
                    );
                    failed_count += 1;
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit()?;
        info!(inserted = inserted_count, failed = failed_count, "课表写入完成");

        if failed_count == 0 {
            Ok(SubmitOutcome::Completed { inserted_count })
        } else {
            Ok(SubmitOutcome::Partial {
                inserted_count,
                failed_count,
            })
        }
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按日期范围查询（含首尾）
    ///
    /// # 参数
    /// - lecturer_id: Some 时只返回该教师的课表
    pub fn find_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        lecturer_id: Option<&str>,
    ) -> RepositoryResult<Vec<TimetableEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE date_iso BETWEEN ?1 AND ?2 AND (?3 IS NULL OR lecturer_id = ?3)
             ORDER BY date_iso, period",
            SELECT_ENTRY_SQL
        ))?;

        let rows = stmt.query_map(
            params![
                start.format(ISO_DATE_FORMAT).to_string(),
                end.format(ISO_DATE_FORMAT).to_string(),
                lecturer_id,
            ],
            map_stored_row,
        )?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }

        debug!(start = %start, end = %end, count = entries.len(), "按日期范围查询课表");
        Ok(entries)
    }

    /// 按 ID 查询
    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<TimetableEntry>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_ENTRY_SQL),
            params![id],
            map_stored_row,
        );

        match result {
            Ok(row) => Ok(Some(row.into_entry()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 课表总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM timetable", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ==========================================
// TimetableSubmitter Trait 实现
// ==========================================
#[async_trait]
impl TimetableSubmitter for TimetableRepository {
    async fn submit_rows(
        &self,
        rows: &[TimetableRow],
        caller: &CallerContext,
    ) -> Result<SubmitOutcome, Box<dyn Error + Send + Sync>> {
        Ok(self.insert_rows(rows, caller)?)
    }
}

/// 数据库行（未转换）
struct StoredRow {
    id: String,
    school_year: String,
    semester: u32,
    date: String,
    week: u32,
    period: u32,
    time: String,
    subject: String,
    class_name: String,
    room_id: String,
    lecturer_id: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

fn map_stored_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRow> {
    Ok(StoredRow {
        id: row.get(0)?,
        school_year: row.get(1)?,
        semester: row.get(2)?,
        date: row.get(3)?,
        week: row.get(4)?,
        period: row.get(5)?,
        time: row.get(6)?,
        subject: row.get(7)?,
        class_name: row.get(8)?,
        room_id: row.get(9)?,
        lecturer_id: row.get(10)?,
        created_by: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl StoredRow {
    fn into_entry(self) -> RepositoryResult<TimetableEntry> {
        let period =
            Period::from_number(self.period).ok_or_else(|| RepositoryError::CorruptRow {
                field: "period".to_string(),
                message: format!("无效节次: {}", self.period),
            })?;

        Ok(TimetableEntry {
            id: self.id,
            school_year: self.school_year,
            semester: self.semester,
            date: self.date,
            week: self.week,
            period,
            time: self.time,
            subject: self.subject,
            class_name: self.class_name,
            room_id: self.room_id,
            lecturer_id: self.lecturer_id,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

fn insert_entry(conn: &Connection, entry: &TimetableEntry) -> RepositoryResult<()> {
    let date_iso = parse_strict_date(&entry.date)
        .ok_or_else(|| RepositoryError::CorruptRow {
            field: "date".to_string(),
            message: format!("日期格式错误: {}", entry.date),
        })?
        .format(ISO_DATE_FORMAT)
        .to_string();

    let result = conn.execute(
        r#"
        INSERT INTO timetable (
            id, school_year, semester, date, date_iso, week, period, time,
            subject, class_name, room_id, lecturer_id, created_by, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
        "#,
        params![
            entry.id,
            entry.school_year,
            entry.semester,
            entry.date,
            date_iso,
            entry.week,
            entry.period.number(),
            entry.time,
            entry.subject,
            entry.class_name,
            entry.room_id,
            entry.lecturer_id,
            entry.created_by,
            entry.created_at,
        ],
    );

    match result.map_err(RepositoryError::from) {
        Ok(_) => Ok(()),
        Err(e) if e.is_unique_violation() => Err(RepositoryError::SlotTaken {
            date: entry.date.clone(),
            period: entry.period.number(),
            room_id: entry.room_id.clone(),
        }),
        Err(e) => Err(e),
    }
}

/// 已校验行 → 持久化课表
fn row_to_entry(row: &TimetableRow, caller: &CallerContext) -> RepositoryResult<TimetableEntry> {
    fn required<T: Clone>(value: &Option<T>, field: &str) -> RepositoryResult<T> {
        value
            .clone()
            .ok_or_else(|| RepositoryError::IncompleteRow(field.to_string()))
    }

    let reference = |value: &Option<EntityRef>, field: &str| -> RepositoryResult<String> {
        Ok(required(value, field)?.submit_value().to_string())
    };

    Ok(TimetableEntry {
        id: Uuid::new_v4().to_string(),
        school_year: required(&row.school_year, "school_year")?,
        semester: required(&row.semester, "semester")?,
        date: required(&row.date, "date")?,
        week: required(&row.week, "week")?,
        period: required(&row.period, "period")?,
        time: row.time.clone(),
        subject: required(&row.subject, "subject")?,
        class_name: required(&row.class_name, "class_name")?,
        room_id: reference(&row.room, "room")?,
        lecturer_id: reference(&row.lecturer, "lecturer")?,
        created_by: Some(caller.user_id.clone()),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn make_row(key: usize, date: &str, period: Period, room: &str) -> TimetableRow {
        TimetableRow {
            key,
            school_year: Some("2024-2025".to_string()),
            semester: Some(1),
            date: Some(date.to_string()),
            week: Some(1),
            period: Some(period),
            time: period.study_time().to_string(),
            subject: Some("Toán".to_string()),
            class_name: Some("C23A".to_string()),
            room: Some(EntityRef::Resolved {
                id: room.to_string(),
                natural_key: "P101".to_string(),
            }),
            lecturer: Some(EntityRef::Resolved {
                id: "u1".to_string(),
                natural_key: "a@x.edu".to_string(),
            }),
            rejected: Default::default(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_insert_rows_and_find_by_range() {
        let repo = TimetableRepository::new(setup_test_db());
        let admin = CallerContext::admin("admin", "admin@x.edu");

        let outcome = repo
            .insert_rows(
                &[
                    make_row(0, "02/09/2024", Period::P1, "r1"),
                    make_row(1, "03/09/2024", Period::P2, "r1"),
                    make_row(2, "12/09/2024", Period::P2, "r1"),
                ],
                &admin,
            )
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Completed { inserted_count: 3 });

        let entries = repo
            .find_by_date_range(ymd(2024, 9, 2), ymd(2024, 9, 7), None)
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].date, "02/09/2024");
        assert_eq!(entries[0].room_id, "r1");
        assert_eq!(entries[0].created_by.as_deref(), Some("admin"));
        assert_eq!(entries[1].period, Period::P2);
    }

    #[test]
    fn test_slot_conflict_is_partial() {
        let repo = TimetableRepository::new(setup_test_db());
        let admin = CallerContext::admin("admin", "admin@x.edu");

        let outcome = repo
            .insert_rows(
                &[
                    make_row(0, "02/09/2024", Period::P1, "r1"),
                    make_row(1, "02/09/2024", Period::P1, "r1"),
                    make_row(2, "02/09/2024", Period::P1, "r2"),
                ],
                &admin,
            )
            .unwrap();

        assert_eq!(
            outcome,
            SubmitOutcome::Partial {
                inserted_count: 2,
                failed_count: 1
            }
        );
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_find_by_lecturer_filter() {
        let repo = TimetableRepository::new(setup_test_db());
        let admin = CallerContext::admin("admin", "admin@x.edu");
        let mut other = make_row(1, "03/09/2024", Period::P1, "r1");
        other.lecturer = Some(EntityRef::Resolved {
            id: "u2".to_string(),
            natural_key: "b@x.edu".to_string(),
        });

        repo.insert_rows(&[make_row(0, "02/09/2024", Period::P1, "r1"), other], &admin)
            .unwrap();

        let mine = repo
            .find_by_date_range(ymd(2024, 9, 2), ymd(2024, 9, 7), Some("u2"))
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].lecturer_id, "u2");
    }

    #[test]
    fn test_incomplete_row_is_rejected() {
        let repo = TimetableRepository::new(setup_test_db());
        let mut row = make_row(0, "02/09/2024", Period::P1, "r1");
        row.subject = None;

        let result = repo.insert_rows(&[row], &CallerContext::admin("admin", "admin@x.edu"));
        assert!(matches!(result, Err(RepositoryError::IncompleteRow(_))));
        assert_eq!(repo.count().unwrap(), 0);
    }
}
