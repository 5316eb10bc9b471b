// ==========================================
// 实验室排课管理 - 课表领域模型
// ==========================================
// 职责: 导入候选行 / 引用字段 / 外部目录 / 已持久化课表
// 生命周期: TimetableRow 仅存在于导入审核阶段(内存)
// ==========================================

use crate::domain::types::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 行号（上传表格中的行位置,仅用于界面定位,不落库）
pub type RowKey = usize;

// ==========================================
// RawCell - 表格单元格原始值
// ==========================================
// 表格输入为弱类型: 字符串 / 数字 / 空
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCell {
    Number(f64),
    Text(String),
    Empty,
}

impl RawCell {
    pub fn text(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }

    /// 判断单元格是否为"假值"（空 / 空白字符串 / 0）
    pub fn is_blank(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            RawCell::Number(n) => *n == 0.0 || n.is_nan(),
        }
    }
}

impl Default for RawCell {
    fn default() -> Self {
        RawCell::Empty
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.to_string())
    }
}

impl From<f64> for RawCell {
    fn from(value: f64) -> Self {
        RawCell::Number(value)
    }
}

/// 原始行记录（列名 → 单元格）
pub type RawRecord = HashMap<String, RawCell>;

// ==========================================
// EntityRef - 引用字段（房间 / 教师）
// ==========================================
// 解析前为自然键,解析成功后为内部 ID
// 未解析时保留原文,界面仍需显示用户输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityRef {
    /// 尚未对照目录（目录为空时保持此状态）
    Pending { raw: String },
    /// 已解析为内部 ID
    Resolved { id: String, natural_key: String },
    /// 已对照非空目录,未命中
    Unresolved { raw: String },
}

impl EntityRef {
    pub fn pending(raw: &str) -> Self {
        EntityRef::Pending {
            raw: raw.trim().to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, EntityRef::Resolved { .. })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, EntityRef::Unresolved { .. })
    }

    /// 用户输入的自然键
    pub fn natural_key(&self) -> &str {
        match self {
            EntityRef::Pending { raw } | EntityRef::Unresolved { raw } => raw,
            EntityRef::Resolved { natural_key, .. } => natural_key,
        }
    }

    pub fn resolved_id(&self) -> Option<&str> {
        match self {
            EntityRef::Resolved { id, .. } => Some(id),
            _ => None,
        }
    }

    /// 提交值: 已解析取内部 ID,否则取原文
    pub fn submit_value(&self) -> &str {
        match self {
            EntityRef::Resolved { id, .. } => id,
            EntityRef::Pending { raw } | EntityRef::Unresolved { raw } => raw,
        }
    }
}

// ==========================================
// TimetableRow - 导入候选行
// ==========================================
// 用途: 导入管道中间产物（表格解析 → 字段映射 → 引用解析 → 校验）
// 红线: time 永远由 period 派生,不信任表格"Giờ học"列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableRow {
    #[serde(skip)]
    pub key: RowKey, // 行位置（不落库）

    pub school_year: Option<String>, // 学年 YYYY-YYYY
    pub semester: Option<u32>,       // 学期 1/2/3
    pub date: Option<String>,        // 上课日期 DD/MM/YYYY
    pub week: Option<u32>,           // 教学周 1-52
    pub period: Option<Period>,      // 节次 1-4
    pub time: String,                // 上课时间（派生）
    pub subject: Option<String>,     // 课程
    pub class_name: Option<String>,  // 班级
    pub room: Option<EntityRef>,     // 实验室
    pub lecturer: Option<EntityRef>, // 教师

    /// 有内容但无法转换的单元格原文（字段名 → 原文）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rejected: BTreeMap<String, String>,
}

impl TimetableRow {
    /// 空行（未填写任何字段）
    pub fn blank(key: RowKey) -> Self {
        Self {
            key,
            school_year: None,
            semester: None,
            date: None,
            week: None,
            period: None,
            time: crate::domain::types::DEFAULT_STUDY_TIME.to_string(),
            subject: None,
            class_name: None,
            room: None,
            lecturer: None,
            rejected: BTreeMap::new(),
        }
    }
}

// ==========================================
// RowPatch - 审核阶段单行编辑
// ==========================================
// None = 字段不变; Some(RawCell::Empty) = 清空字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowPatch {
    pub school_year: Option<RawCell>,
    pub semester: Option<RawCell>,
    pub date: Option<RawCell>,
    pub week: Option<RawCell>,
    pub period: Option<RawCell>,
    pub subject: Option<RawCell>,
    pub class_name: Option<RawCell>,
    pub room: Option<RawCell>,
    pub lecturer: Option<RawCell>,
}

// ==========================================
// 外部目录（房间 / 教师）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCatalogItem {
    pub room_id: String, // 房间编码（自然键,如 P101）
    pub id: String,      // 内部 ID
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerCatalogItem {
    pub email: String, // 邮箱（自然键）
    pub id: String,    // 内部 ID
    pub name: String,
}

/// 导入时预先拉取的目录快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCatalogs {
    pub rooms: Vec<RoomCatalogItem>,
    pub lecturers: Vec<LecturerCatalogItem>,
}

impl ReferenceCatalogs {
    pub fn new(rooms: Vec<RoomCatalogItem>, lecturers: Vec<LecturerCatalogItem>) -> Self {
        Self { rooms, lecturers }
    }
}

// ==========================================
// TimetableEntry - 已持久化课表
// ==========================================
// 用途: 日历读取路径输入
// 对齐: timetable 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    pub id: String,
    pub school_year: String,
    pub semester: u32,
    pub date: String, // DD/MM/YYYY
    pub week: u32,
    pub period: Period,
    pub time: String,
    pub subject: String,
    pub class_name: String,
    pub room_id: String,
    pub lecturer_id: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}
