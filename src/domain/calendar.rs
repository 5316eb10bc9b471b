// ==========================================
// 实验室排课管理 - 日历领域模型
// ==========================================
// 职责: 周视图网格 / 单元格状态 / 点击路由结果
// 生命周期: 每次渲染从已持久化课表重新计算,不落库
// ==========================================

use crate::domain::timetable::TimetableEntry;
use crate::domain::types::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduledCell - 带状态的日历单元格
// ==========================================
// 不变量:
// - is_past 与 is_future 不同时为真（都为假 = 正在上课）
// - is_overdue ⇒ is_past ∧ ¬has_log
// - can_log ⇒ is_past ∧ ¬has_log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledCell {
    pub entry: TimetableEntry,
    pub has_log: bool,
    pub is_past: bool,
    pub is_future: bool,
    pub is_overdue: bool,
    pub can_log: bool,
}

impl ScheduledCell {
    /// 正在上课（既非过去也非未来）
    pub fn is_ongoing(&self) -> bool {
        !self.is_past && !self.is_future
    }
}

// ==========================================
// CellAction - 点击路由结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CellAction {
    AlreadyLogged, // 提示"已登记",不跳转
    TooEarly,      // 提示"未到上课时间"
    ViewOnly,      // 非所有者: 仅查看
    OpenLogForm,   // 打开教学日志登记
    OpenEditForm,  // 打开课表编辑
}

impl CellAction {
    /// 是否需要跳转
    pub fn navigates(self) -> bool {
        matches!(self, CellAction::OpenLogForm | CellAction::OpenEditForm)
    }

    /// 提示文案的翻译 key（无提示返回 None）
    pub fn notice_key(self) -> Option<&'static str> {
        match self {
            CellAction::AlreadyLogged => Some("calendar.already_logged"),
            CellAction::TooEarly => Some("calendar.too_early"),
            CellAction::ViewOnly => Some("calendar.view_only"),
            CellAction::OpenLogForm | CellAction::OpenEditForm => None,
        }
    }
}

// ==========================================
// CalendarGrid - 周视图网格（周一至周六 × 4 节次）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub slots: [Option<TimetableEntry>; 4], // 下标 = 节次 - 1
}

impl CalendarDay {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            slots: [None, None, None, None],
        }
    }

    pub fn slot(&self, period: Period) -> Option<&TimetableEntry> {
        self.slots[period.index()].as_ref()
    }
}

/// 同一天同一节次的冲突记录（被后写覆盖的课表）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCollision {
    pub date: NaiveDate,
    pub period: Period,
    pub displaced_entry_id: String,
    pub kept_entry_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarGrid {
    pub days: Vec<CalendarDay>,
    pub collisions: Vec<GridCollision>,
}

impl CalendarGrid {
    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }

    /// 已放置的课表数量
    pub fn placed_count(&self) -> usize {
        self.days
            .iter()
            .map(|d| d.slots.iter().filter(|s| s.is_some()).count())
            .sum()
    }
}
