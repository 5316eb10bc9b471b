// ==========================================
// 实验室排课管理 - 周视图网格构建
// ==========================================
// 输入: 周一至周六 6 天 + 已持久化课表（日期范围可大于本周）
// 输出: CalendarGrid（天 × 4 节次）
// 日期解析链: DD/MM/YYYY → YYYY-MM-DD → 自动识别
// 冲突策略: 同一天同一节次后写覆盖,被覆盖者记入 collisions 并告警
// ==========================================

use crate::domain::calendar::{CalendarDay, CalendarGrid, GridCollision};
use crate::domain::timetable::TimetableEntry;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, instrument, warn};

/// 自动识别阶段尝试的日期格式
const FALLBACK_DATE_FORMATS: [&str; 3] = ["%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// 自动识别阶段尝试的日期时间格式（不含时区）
const FALLBACK_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

// ==========================================
// CalendarGridBuilder
// ==========================================
pub struct CalendarGridBuilder;

impl CalendarGridBuilder {
    pub fn new() -> Self {
        Self
    }

    /// 包含 anchor 的那一周（周一至周六）
    ///
    /// 周日归属其前一周
    pub fn week_days(&self, anchor: NaiveDate) -> [NaiveDate; 6] {
        let offset = anchor.weekday().num_days_from_monday() as i64;
        let monday = anchor - Duration::days(offset);
        let mut days = [monday; 6];
        for (i, day) in days.iter_mut().enumerate() {
            *day = monday + Duration::days(i as i64);
        }
        days
    }

    /// 构建周视图网格
    #[instrument(skip(self, days, entries), fields(entries = entries.len()))]
    pub fn build(&self, days: &[NaiveDate; 6], entries: &[TimetableEntry]) -> CalendarGrid {
        let mut grid = CalendarGrid {
            days: days.iter().map(|d| CalendarDay::new(*d)).collect(),
            collisions: Vec::new(),
        };

        for entry in entries {
            let Some(date) = parse_entry_date(&entry.date) else {
                warn!(entry_id = %entry.id, date = %entry.date, "课表日期无法解析,跳过");
                continue;
            };

            let Some(day) = grid.days.iter_mut().find(|d| d.date == date) else {
                continue;
            };

            let slot = &mut day.slots[entry.period.index()];
            if let Some(previous) = slot.replace(entry.clone()) {
                warn!(
                    date = %date,
                    period = entry.period.number(),
                    displaced = %previous.id,
                    kept = %entry.id,
                    "同一节次存在多条课表,后写覆盖"
                );
                grid.collisions.push(GridCollision {
                    date,
                    period: entry.period,
                    displaced_entry_id: previous.id,
                    kept_entry_id: entry.id.clone(),
                });
            }
        }

        debug!(
            placed = grid.placed_count(),
            collisions = grid.collisions.len(),
            "周视图网格构建完成"
        );
        grid
    }
}

impl Default for CalendarGridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 解析课表日期（容忍多种存储格式）
pub fn parse_entry_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(value, "%d/%m/%Y") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }

    // 自动识别
    if let Some(date) = FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}
