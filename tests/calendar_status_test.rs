// ==========================================
// 课表日历状态集成测试
// ==========================================
// 测试目标: 周视图网格 / 单元格状态 / 点击路由 / 教学日志登记
// ==========================================


use chrono::{Duration, NaiveDate};
use lab_timetable::api::{ApiError, CalendarApi};
use lab_timetable::domain::{CallerContext, CellAction, Period};
use lab_timetable::engine::{CalendarGridBuilder, ScheduleStatusClassifier};
use lab_timetable::repository::{TeachingLogRepository, TimetableRepository};
use std::collections::HashSet;
use std::sync::Arc;
use test_helpers::*;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn no_logs() -> HashSet<String> {
    HashSet::new()
}

// ==========================================
// 单元格状态
// ==========================================

#[test]
fn test_scenario_e_finished_session_without_log_is_overdue() {
    let classifier = ScheduleStatusClassifier::new();
    let e = entry("e1", "02/09/2024", Period::P1, "r1", "u1");

    // P1 结束于 09:15,当前 11:15
    let cell = classifier.classify(&e, sept(2, 11, 15), &no_logs());

    assert!(cell.is_past);
    assert!(!cell.is_future);
    assert!(cell.is_overdue);
    assert!(cell.can_log);
    assert!(!cell.has_log);
}

#[test]
fn test_status_invariants_across_the_day() {
    let classifier = ScheduleStatusClassifier::new();
    let logged: HashSet<String> = ["logged".to_string()].into_iter().collect();

    for period in [Period::P1, Period::P2, Period::P3, Period::P4] {
        for id in ["logged", "open"] {
            let e = entry(id, "02/09/2024", period, "r1", "u1");
            let mut now = sept(1, 23, 0);
            while now < sept(3, 1, 0) {
                let cell = classifier.classify(&e, now, &logged);

                assert!(!(cell.is_past && cell.is_future));
                assert_eq!(cell.is_overdue, cell.is_past && !cell.has_log);
                assert_eq!(cell.can_log, cell.is_overdue);
                assert_eq!(cell.has_log, id == "logged");

                now += Duration::minutes(15);
            }
        }
    }
}

#[test]
fn test_boundaries_are_strict() {
    let classifier = ScheduleStatusClassifier::new();
    let e = entry("e1", "02/09/2024", Period::P2, "r1", "u1");

    let at_start = classifier.classify(&e, sept(2, 9, 30), &no_logs());
    assert!(at_start.is_ongoing());

    let at_end = classifier.classify(&e, sept(2, 11, 45), &no_logs());
    assert!(at_end.is_ongoing());
    assert!(!at_end.can_log);

    let after = classifier.classify(&e, sept(2, 11, 46), &no_logs());
    assert!(after.is_past);
}

#[test]
fn test_iso_stored_date_is_understood() {
    let classifier = ScheduleStatusClassifier::new();
    let e = entry("e1", "2024-09-02", Period::P1, "r1", "u1");

    let cell = classifier.classify(&e, sept(3, 8, 0), &no_logs());
    assert!(cell.is_past);
}

#[test]
fn test_unparseable_date_is_neither_past_nor_future() {
    let classifier = ScheduleStatusClassifier::new();
    let e = entry("e1", "not a date", Period::P1, "r1", "u1");

    let cell = classifier.classify(&e, sept(3, 8, 0), &no_logs());
    assert!(!cell.is_past && !cell.is_future && !cell.can_log);
}

// ==========================================
// 点击路由
// ==========================================

#[test]
fn test_click_routing_order() {
    let classifier = ScheduleStatusClassifier::new();
    let owner = CallerContext::lecturer("u1", "a@x.edu");
    let other = CallerContext::lecturer("u2", "b@x.edu");
    let admin = CallerContext::admin("admin", "admin@x.edu");

    let e = entry("e1", "02/09/2024", Period::P1, "r1", "u1");
    let logged: HashSet<String> = ["e1".to_string()].into_iter().collect();

    // 已登记优先于一切
    let cell = classifier.classify(&e, sept(3, 8, 0), &logged);
    assert_eq!(classifier.route_click(&cell, &other), CellAction::AlreadyLogged);

    // 未开始优先于非所有者
    let cell = classifier.classify(&e, sept(1, 8, 0), &no_logs());
    assert_eq!(classifier.route_click(&cell, &other), CellAction::TooEarly);

    let cell = classifier.classify(&e, sept(3, 8, 0), &no_logs());
    assert_eq!(classifier.route_click(&cell, &other), CellAction::ViewOnly);
    assert_eq!(classifier.route_click(&cell, &owner), CellAction::OpenLogForm);
    assert_eq!(classifier.route_click(&cell, &admin), CellAction::OpenLogForm);

    // 正在上课: 所有者进入编辑
    let cell = classifier.classify(&e, sept(2, 8, 0), &no_logs());
    assert_eq!(classifier.route_click(&cell, &owner), CellAction::OpenEditForm);
    assert!(CellAction::OpenEditForm.navigates());
    assert!(!CellAction::ViewOnly.navigates());
}

// ==========================================
// 周视图网格
// ==========================================

#[test]
fn test_week_days_monday_to_saturday() {
    let builder = CalendarGridBuilder::new();

    let days = builder.week_days(ymd(2024, 9, 4));
    assert_eq!(days[0], ymd(2024, 9, 2));
    assert_eq!(days[5], ymd(2024, 9, 7));

    // 周日归属前一周
    assert_eq!(builder.week_days(ymd(2024, 9, 8))[0], ymd(2024, 9, 2));
    assert_eq!(builder.week_days(ymd(2024, 9, 9))[0], ymd(2024, 9, 9));
}

#[test]
fn test_grid_places_entries_and_reports_collisions() {
    let builder = CalendarGridBuilder::new();
    let days = builder.week_days(ymd(2024, 9, 2));

    let entries = vec![
        entry("a", "02/09/2024", Period::P1, "r1", "u1"),
        entry("b", "2024-09-03", Period::P3, "r1", "u1"),
        entry("c", "02/09/2024", Period::P1, "r2", "u2"),
        entry("sunday", "08/09/2024", Period::P1, "r1", "u1"),
        entry("next-week", "09/09/2024", Period::P1, "r1", "u1"),
        entry("garbage", "??", Period::P2, "r1", "u1"),
    ];
    let grid = builder.build(&days, &entries);

    assert_eq!(grid.placed_count(), 2);
    let monday = grid.day(ymd(2024, 9, 2)).unwrap();
    assert_eq!(monday.slot(Period::P1).map(|e| e.id.as_str()), Some("c"));

    let tuesday = grid.day(ymd(2024, 9, 3)).unwrap();
    assert_eq!(tuesday.slot(Period::P3).map(|e| e.id.as_str()), Some("b"));

    assert_eq!(grid.collisions.len(), 1);
    assert_eq!(grid.collisions[0].displaced_entry_id, "a");
    assert_eq!(grid.collisions[0].kept_entry_id, "c");
}

// ==========================================
// CalendarApi
// ==========================================

fn calendar_api() -> (CalendarApi, Arc<TimetableRepository>) {
    let conn = memory_conn();
    let repo = Arc::new(TimetableRepository::new(conn.clone()));
    let api = CalendarApi::new(repo.clone(), Arc::new(TeachingLogRepository::new(conn)));
    (api, repo)
}

#[test]
fn test_week_view_reflects_logs_without_persisting_status() {
    lab_timetable::logging::init_test();
    let (api, repo) = calendar_api();
    repo.insert(&entry("e1", "02/09/2024", Period::P1, "r1", "u1")).unwrap();
    repo.insert(&entry("e2", "02/09/2024", Period::P4, "r1", "u1")).unwrap();
    let owner = CallerContext::lecturer("u1", "a@x.edu");

    let week = api.get_week_calendar(ymd(2024, 9, 2), sept(2, 12, 0), &owner).unwrap();
    assert_eq!(week.overdue_count, 1);
    let monday = &week.days[0];
    let p1 = monday.cells[0].as_ref().unwrap();
    assert_eq!(p1.action, CellAction::OpenLogForm);
    let p4 = monday.cells[3].as_ref().unwrap();
    assert_eq!(p4.action, CellAction::TooEarly);
    assert!(p4.notice.is_some());

    api.log_teaching("e1", "Thực hành bài 1", sept(2, 12, 0), &owner).unwrap();

    let week = api.get_week_calendar(ymd(2024, 9, 2), sept(2, 12, 0), &owner).unwrap();
    assert_eq!(week.overdue_count, 0);
    let p1 = week.days[0].cells[0].as_ref().unwrap();
    assert!(p1.cell.has_log);
    assert_eq!(p1.action, CellAction::AlreadyLogged);
}

#[test]
fn test_log_teaching_rejections() {
    let (api, repo) = calendar_api();
    repo.insert(&entry("e1", "02/09/2024", Period::P1, "r1", "u1")).unwrap();
    let owner = CallerContext::lecturer("u1", "a@x.edu");

    let empty = api.log_teaching("e1", "   ", sept(2, 12, 0), &owner);
    assert!(matches!(empty, Err(ApiError::InvalidInput(_))));

    let ongoing = api.log_teaching("e1", "x", sept(2, 8, 0), &owner);
    assert!(matches!(ongoing, Err(ApiError::BusinessRuleViolation(_))));

    api.log_teaching("e1", "x", sept(2, 12, 0), &owner).unwrap();
    let twice = api.log_teaching("e1", "y", sept(2, 12, 0), &owner);
    assert!(matches!(twice, Err(ApiError::BusinessRuleViolation(_))));

    let missing = api.log_teaching("nope", "x", sept(2, 12, 0), &owner);
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}
