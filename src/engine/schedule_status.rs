// ==========================================
// 实验室排课管理 - 课表状态判定
// ==========================================
// 输入: 课表条目 + 当前时刻 + 教学日志索引
// 输出: ScheduledCell（过去/未来/逾期/可登记）
// 红线: 逾期与可登记使用同一谓词（已结束 ∧ 无日志）
// 红线: 点击路由顺序: 已登记 → 未开始 → 非所有者 → 可登记 → 编辑
// ==========================================

use crate::domain::calendar::{CellAction, ScheduledCell};
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::CallerContext;
use crate::engine::calendar_grid::parse_entry_date;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::warn;

// ==========================================
// LogIndex Trait - 教学日志索引
// ==========================================
// 用途: 判断某条课表是否已有教学日志
// 实现者: HashSet<String>（按课表 ID 预先拉取）
pub trait LogIndex: Send + Sync {
    fn has_log(&self, entry_id: &str) -> bool;
}

impl LogIndex for HashSet<String> {
    fn has_log(&self, entry_id: &str) -> bool {
        self.contains(entry_id)
    }
}

// ==========================================
// ScheduleStatusClassifier
// ==========================================
pub struct ScheduleStatusClassifier;

impl ScheduleStatusClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 判定单元格状态（每次渲染每格计算一次）
    ///
    /// 日期无法解析时既不算过去也不算未来
    pub fn classify(
        &self,
        entry: &TimetableEntry,
        now: NaiveDateTime,
        logs: &dyn LogIndex,
    ) -> ScheduledCell {
        let has_log = logs.has_log(&entry.id);

        let (is_past, is_future) = match parse_entry_date(&entry.date) {
            Some(date) => {
                let start = date.and_time(entry.period.start_time());
                let end = date.and_time(entry.period.end_time());
                (end < now, start > now)
            }
            None => {
                warn!(entry_id = %entry.id, date = %entry.date, "课表日期无法解析,按进行中处理");
                (false, false)
            }
        };

        let is_overdue = is_past && !has_log;
        ScheduledCell {
            entry: entry.clone(),
            has_log,
            is_past,
            is_future,
            is_overdue,
            can_log: is_overdue,
        }
    }

    /// 点击路由
    pub fn route_click(&self, cell: &ScheduledCell, caller: &CallerContext) -> CellAction {
        if cell.has_log {
            return CellAction::AlreadyLogged;
        }
        if cell.is_future {
            return CellAction::TooEarly;
        }
        if !caller.can_manage(&cell.entry.lecturer_id) {
            return CellAction::ViewOnly;
        }
        if cell.can_log {
            return CellAction::OpenLogForm;
        }
        CellAction::OpenEditForm
    }
}

impl Default for ScheduleStatusClassifier {
    fn default() -> Self {
        Self::new()
    }
}
