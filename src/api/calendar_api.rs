// ==========================================
// 课表日历API
// ==========================================
// 职责: 周视图（网格 + 单元格状态 + 点击动作）/ 点击路由 / 教学日志登记
// 红线: 状态每次请求重新计算,不落库
// 红线: 非管理员只看到自己的课表
// ==========================================

use crate::api::error::{validate_log_content, validate_log_route, ApiError, ApiResult};
use crate::domain::calendar::{CellAction, GridCollision, ScheduledCell};
use crate::domain::timetable::TimetableEntry;
use crate::domain::types::{CallerContext, ALL_PERIODS};
use crate::engine::{CalendarGridBuilder, ScheduleStatusClassifier};
use crate::i18n::t;
use crate::repository::{TeachingLogRepository, TimetableRepository};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// 单元格视图（状态 + 点击动作）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarCellView {
    pub period: u32,
    #[serde(flatten)]
    pub cell: ScheduledCell,
    pub action: CellAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// 单日视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarDayView {
    pub date: NaiveDate,
    pub cells: Vec<Option<CalendarCellView>>, // 下标 = 节次 - 1
}

/// 周视图响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekCalendarResponse {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub days: Vec<CalendarDayView>,
    pub collisions: Vec<GridCollision>,
    pub overdue_count: usize,
}

/// 点击结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellClickResponse {
    pub entry_id: String,
    pub action: CellAction,
    pub navigates: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

// ==========================================
// CalendarApi
// ==========================================
pub struct CalendarApi {
    timetable_repo: Arc<TimetableRepository>,
    log_repo: Arc<TeachingLogRepository>,
    grid_builder: CalendarGridBuilder,
    classifier: ScheduleStatusClassifier,
}

impl CalendarApi {
    pub fn new(
        timetable_repo: Arc<TimetableRepository>,
        log_repo: Arc<TeachingLogRepository>,
    ) -> Self {
        Self {
            timetable_repo,
            log_repo,
            grid_builder: CalendarGridBuilder::new(),
            classifier: ScheduleStatusClassifier::new(),
        }
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::new(
            Arc::new(TimetableRepository::new(conn.clone())),
            Arc::new(TeachingLogRepository::new(conn)),
        )
    }

    /// 周视图（包含 anchor 的周一至周六）
    #[instrument(skip(self, caller), fields(caller = %caller.user_id))]
    pub fn get_week_calendar(
        &self,
        anchor: NaiveDate,
        now: NaiveDateTime,
        caller: &CallerContext,
    ) -> ApiResult<WeekCalendarResponse> {
        let days = self.grid_builder.week_days(anchor);
        let (week_start, week_end) = (days[0], days[5]);

        let lecturer_filter = (!caller.is_admin()).then_some(caller.user_id.as_str());
        let entries = self
            .timetable_repo
            .find_by_date_range(week_start, week_end, lecturer_filter)?;

        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        let logged = self.log_repo.find_logged_ids(&ids)?;

        let grid = self.grid_builder.build(&days, &entries);

        let mut overdue_count = 0;
        let day_views = grid
            .days
            .iter()
            .map(|day| CalendarDayView {
                date: day.date,
                cells: ALL_PERIODS
                    .iter()
                    .map(|period| {
                        day.slot(*period).map(|entry| {
                            let cell = self.classifier.classify(entry, now, &logged);
                            if cell.is_overdue {
                                overdue_count += 1;
                            }
                            self.cell_view(cell, caller)
                        })
                    })
                    .collect(),
            })
            .collect();

        debug!(
            entries = entries.len(),
            overdue = overdue_count,
            "周视图生成完成"
        );

        Ok(WeekCalendarResponse {
            week_start,
            week_end,
            days: day_views,
            collisions: grid.collisions,
            overdue_count,
        })
    }

    /// 点击单元格
    pub fn click_cell(
        &self,
        entry_id: &str,
        now: NaiveDateTime,
        caller: &CallerContext,
    ) -> ApiResult<CellClickResponse> {
        let entry = self.find_entry(entry_id)?;
        let cell = self.classify_one(&entry, now)?;
        let action = self.classifier.route_click(&cell, caller);

        Ok(CellClickResponse {
            entry_id: entry.id,
            action,
            navigates: action.navigates(),
            notice: action.notice_key().map(t),
        })
    }

    /// 登记教学日志（仅在点击路由为 OpenLogForm 时允许）
    #[instrument(skip(self, content, caller), fields(caller = %caller.user_id))]
    pub fn log_teaching(
        &self,
        entry_id: &str,
        content: &str,
        now: NaiveDateTime,
        caller: &CallerContext,
    ) -> ApiResult<String> {
        let content = validate_log_content(content)?;
        let entry = self.find_entry(entry_id)?;
        let cell = self.classify_one(&entry, now)?;
        validate_log_route(self.classifier.route_click(&cell, caller))?;

        let log_id = self
            .log_repo
            .insert_log(&entry.id, content, Some(&caller.user_id))?;
        info!(entry_id = %entry.id, log_id = %log_id, "教学日志已登记");
        Ok(log_id)
    }

    fn find_entry(&self, entry_id: &str) -> ApiResult<TimetableEntry> {
        self.timetable_repo
            .find_by_id(entry_id)?
            .ok_or_else(|| ApiError::NotFound(format!("课表(id={})不存在", entry_id)))
    }

    fn classify_one(&self, entry: &TimetableEntry, now: NaiveDateTime) -> ApiResult<ScheduledCell> {
        let logged = self.log_repo.find_logged_ids(std::slice::from_ref(&entry.id))?;
        Ok(self.classifier.classify(entry, now, &logged))
    }

    fn cell_view(&self, cell: ScheduledCell, caller: &CallerContext) -> CalendarCellView {
        let action = self.classifier.route_click(&cell, caller);
        CalendarCellView {
            period: cell.entry.period.number(),
            notice: action.notice_key().map(t),
            action,
            cell,
        }
    }
}
