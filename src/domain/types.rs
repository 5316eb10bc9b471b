// ==========================================
// 实验室排课管理 - 领域类型定义
// ==========================================
// 职责: 教学节次（Ca）、调用方角色等基础枚举
// 红线: 节次 → 上课时间为固定查表,不接受用户输入
// ==========================================

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 节次 (Period / Ca)
// ==========================================
// 每天固定 4 个教学节次,每个节次绑定固定时间段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Period {
    P1, // 07:00-09:15
    P2, // 09:30-11:45
    P3, // 12:30-14:45
    P4, // 15:00-17:15
}

/// 全部节次（按时间顺序）
pub const ALL_PERIODS: [Period; 4] = [Period::P1, Period::P2, Period::P3, Period::P4];

/// 节次 1 的上课时间（节次缺失时的兜底值）
pub const DEFAULT_STUDY_TIME: &str = "07:00-09:15";

/// 教学周上限
pub const MAX_WEEK: u32 = 52;

impl Period {
    /// 由数字节次构造（仅接受 1-4）
    pub fn from_number(value: u32) -> Option<Self> {
        match value {
            1 => Some(Period::P1),
            2 => Some(Period::P2),
            3 => Some(Period::P3),
            4 => Some(Period::P4),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Period::P1 => 1,
            Period::P2 => 2,
            Period::P3 => 3,
            Period::P4 => 4,
        }
    }

    /// 节次对应的上课时间标签（StudyTime）
    pub fn study_time(self) -> &'static str {
        match self {
            Period::P1 => "07:00-09:15",
            Period::P2 => "09:30-11:45",
            Period::P3 => "12:30-14:45",
            Period::P4 => "15:00-17:15",
        }
    }

    /// 节次开始时刻
    pub fn start_time(self) -> NaiveTime {
        let (h, m) = match self {
            Period::P1 => (7, 0),
            Period::P2 => (9, 30),
            Period::P3 => (12, 30),
            Period::P4 => (15, 0),
        };
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
    }

    /// 节次结束时刻
    pub fn end_time(self) -> NaiveTime {
        let (h, m) = match self {
            Period::P1 => (9, 15),
            Period::P2 => (11, 45),
            Period::P3 => (14, 45),
            Period::P4 => (17, 15),
        };
        NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
    }

    /// 判断字符串是否为四个标准上课时间之一
    pub fn is_canonical_study_time(value: &str) -> bool {
        ALL_PERIODS.iter().any(|p| p.study_time() == value)
    }

    /// 数组下标（0-3）
    pub fn index(self) -> usize {
        (self.number() - 1) as usize
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ca {}", self.number())
    }
}

impl From<Period> for u32 {
    fn from(period: Period) -> Self {
        period.number()
    }
}

impl TryFrom<u32> for Period {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Period::from_number(value).ok_or_else(|| format!("无效节次: {}", value))
    }
}

// ==========================================
// 调用方角色 (Caller Role)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallerRole {
    Admin,    // 管理员: 可导入/管理任意教师课表
    Lecturer, // 教师: 仅可导入/管理本人课表
}

impl CallerRole {
    pub fn from_str(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "ADMIN" => CallerRole::Admin,
            _ => CallerRole::Lecturer,
        }
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallerRole::Admin => write!(f, "ADMIN"),
            CallerRole::Lecturer => write!(f, "LECTURER"),
        }
    }
}

// ==========================================
// 调用方上下文 (Caller Context)
// ==========================================
// 显式传入映射器/解析器/日历引擎,替代全局会话状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub role: CallerRole,
    pub user_id: String,      // 内部用户 ID
    pub email: String,        // 登录邮箱
    pub display_name: String, // 显示名
}

impl CallerContext {
    pub fn admin(user_id: &str, email: &str) -> Self {
        Self {
            role: CallerRole::Admin,
            user_id: user_id.to_string(),
            email: email.to_string(),
            display_name: email.to_string(),
        }
    }

    pub fn lecturer(user_id: &str, email: &str) -> Self {
        Self {
            role: CallerRole::Lecturer,
            user_id: user_id.to_string(),
            email: email.to_string(),
            display_name: email.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == CallerRole::Admin
    }

    /// 所有者或管理员判定
    pub fn can_manage(&self, lecturer_id: &str) -> bool {
        self.is_admin() || self.user_id == lecturer_id
    }
}
