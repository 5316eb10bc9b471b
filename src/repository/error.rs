// ==========================================
// 实验室排课管理 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约定: 时段冲突（日期 + 节次 + 房间）单独成类,供批量写入按行跳过
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("{entity}(id={id})不存在")]
    NotFound { entity: String, id: String },

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 约束 =====
    #[error("时段已被占用: {date} 第{period}节 房间 {room_id}")]
    SlotTaken {
        date: String,
        period: u32,
        room_id: String,
    },

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据形态 =====
    #[error("待写入的课表行不完整: 缺少 {0}")]
    IncompleteRow(String),

    #[error("已存储数据无法读取 (field={field}): {message}")]
    CorruptRow { field: String, message: String },
}

impl RepositoryError {
    /// 是否为唯一约束类冲突（含时段冲突）
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            RepositoryError::SlotTaken { .. } | RepositoryError::UniqueConstraintViolation(_)
        )
    }
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
