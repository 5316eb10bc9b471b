// ==========================================
// 实验室排课管理 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,将仓储/导入错误转换为用户可读的错误消息
// 红线: 单行校验问题不是 ApiError（随批次返回）
// ==========================================

use crate::domain::calendar::CellAction;
use crate::i18n::t;
use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ===== 调用方问题 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("无权操作: {0}")]
    PermissionDenied(String),

    // ===== 业务规则 =====
    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("时段冲突: {0}")]
    SlotConflict(String),

    // ===== 数据访问 =====
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ===== 导入 =====
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("课表提交失败: {0}")]
    SubmissionFailed(String),

    // ===== 通用 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::SlotTaken { .. } | RepositoryError::UniqueConstraintViolation(_) => {
                ApiError::SlotConflict(err.to_string())
            }
            RepositoryError::ForeignKeyViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::IncompleteRow(_) => ApiError::InvalidInput(err.to_string()),
            RepositoryError::CorruptRow { .. } => ApiError::InternalError(err.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件 {}", path)),
            ImportError::UnsupportedFormat(_) | ImportError::TooManyRows { .. } => {
                ApiError::InvalidInput(err.to_string())
            }
            ImportError::Other(err) => ApiError::Other(err),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 业务规则校验辅助函数
// ==========================================

/// 教学日志内容: 去首尾空白后不能为空
pub fn validate_log_content(content: &str) -> ApiResult<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidInput("教学日志内容不能为空".to_string()));
    }
    Ok(trimmed)
}

/// 教学日志登记: 仅当点击路由为 OpenLogForm 时允许
///
/// - ViewOnly → PermissionDenied
/// - 其他 → BusinessRuleViolation（附带提示文案）
pub fn validate_log_route(action: CellAction) -> ApiResult<()> {
    match action {
        CellAction::OpenLogForm => Ok(()),
        CellAction::ViewOnly => Err(ApiError::PermissionDenied(t("calendar.view_only"))),
        other => Err(ApiError::BusinessRuleViolation(
            other
                .notice_key()
                .map(t)
                .unwrap_or_else(|| t("calendar.not_loggable")),
        )),
    }
}
