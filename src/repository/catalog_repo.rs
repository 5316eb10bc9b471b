// ==========================================
// 实验室排课管理 - 房间/教师目录仓储
// ==========================================
// 职责: 目录维护与导入前拉取（引用解析的数据源）
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::timetable::{LecturerCatalogItem, RoomCatalogItem};
use crate::importer::timetable_importer_trait::CatalogFetcher;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogRepository
// ==========================================
pub struct CatalogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CatalogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 房间 =====

    /// 新增或更新房间（按 room_id 覆盖）
    pub fn upsert_room(&self, room: &RoomCatalogItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO room (id, room_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(room_id) DO UPDATE SET name = excluded.name",
            params![room.id, room.room_id, room.name],
        )?;
        Ok(())
    }

    pub fn list_rooms(&self) -> RepositoryResult<Vec<RoomCatalogItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT room_id, id, name FROM room ORDER BY room_id")?;
        let rows = stmt.query_map([], |row| {
            Ok(RoomCatalogItem {
                room_id: row.get(0)?,
                id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ===== 教师 =====

    /// 新增或更新教师（按 email 覆盖）
    pub fn upsert_lecturer(&self, lecturer: &LecturerCatalogItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO lecturer (id, email, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(email) DO UPDATE SET name = excluded.name",
            params![lecturer.id, lecturer.email, lecturer.name],
        )?;
        Ok(())
    }

    pub fn list_lecturers(&self) -> RepositoryResult<Vec<LecturerCatalogItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT email, id, name FROM lecturer ORDER BY email")?;
        let rows = stmt.query_map([], |row| {
            Ok(LecturerCatalogItem {
                email: row.get(0)?,
                id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 按邮箱查找教师（登录身份 → 内部 ID）
    pub fn find_lecturer_by_email(&self, email: &str) -> RepositoryResult<Option<LecturerCatalogItem>> {
        let conn = self.get_conn()?;
        let result = conn.query_row(
            "SELECT email, id, name FROM lecturer WHERE email = ?1",
            params![email],
            |row| {
                Ok(LecturerCatalogItem {
                    email: row.get(0)?,
                    id: row.get(1)?,
                    name: row.get(2)?,
                })
            },
        );

        match result {
            Ok(item) => Ok(Some(item)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ==========================================
// CatalogFetcher Trait 实现
// ==========================================
#[async_trait]
impl CatalogFetcher for CatalogRepository {
    async fn fetch_rooms(&self) -> Result<Vec<RoomCatalogItem>, Box<dyn Error + Send + Sync>> {
        Ok(self.list_rooms()?)
    }

    async fn fetch_lecturers(
        &self,
    ) -> Result<Vec<LecturerCatalogItem>, Box<dyn Error + Send + Sync>> {
        Ok(self.list_lecturers()?)
    }
}
