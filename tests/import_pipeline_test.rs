// ==========================================
// 课表导入管道集成测试
// ==========================================
// 测试目标: 原始行 → 批次分区 → 审核编辑 → 提交 → 持久化
// ==========================================


use lab_timetable::api::ApiError;
use lab_timetable::app::AppState;
use lab_timetable::domain::{
    CallerContext, EntityRef, Period, RawCell, RowPatch, SubmitOutcome, ValidationError,
};
use lab_timetable::importer::{ImportBatchProcessor, SemesterWeekRanges};
use lab_timetable::CalendarApi;
use std::collections::BTreeMap;
use std::sync::Arc;
use test_helpers::*;

fn admin() -> CallerContext {
    CallerContext::admin("admin-1", "admin@x.edu")
}

fn processor(caller: CallerContext) -> ImportBatchProcessor {
    ImportBatchProcessor::new(
        sample_catalogs(),
        Arc::new(SemesterWeekRanges::default()),
        caller,
    )
}

// ==========================================
// 场景 A-D
// ==========================================

#[test]
fn test_scenario_a_valid_row_is_normalized_and_resolved() {
    let processor = processor(admin());
    let batch = processor.build(vec![scenario_record()]);

    assert_eq!(batch.valid_count(), 1);
    let rows = processor.submit(&batch);
    assert_eq!(rows.len(), 1);

    let row = &rows[0];
    assert_eq!(row.date.as_deref(), Some("02/09/2024"));
    assert_eq!(row.period, Some(Period::P2));
    assert_eq!(row.time, "09:30-11:45");
    assert_eq!(row.room.as_ref().and_then(|r| r.resolved_id()), Some("r1"));
    assert_eq!(row.lecturer.as_ref().and_then(|l| l.resolved_id()), Some("u1"));
}

#[test]
fn test_scenario_b_unknown_room_is_excluded_from_submit() {
    let processor = processor(admin());
    let batch = processor.build(vec![
        scenario_record(),
        record_with(&[("Phòng", RawCell::text("P999"))]),
    ]);

    assert_eq!(
        batch.error_for(1),
        Some(&ValidationError::UnknownRoom {
            room: "P999".to_string()
        })
    );
    assert_eq!(batch.invalid_count(), 1);

    let rows = processor.submit(&batch);
    assert_eq!(rows.len(), 1);
    assert!(rows.iter().all(|r| r.key != 1));
}

#[test]
fn test_scenario_c_week_outside_semester() {
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[("Tuần", RawCell::Number(25.0))])]);

    match batch.error_for(0) {
        Some(ValidationError::WeekSemesterMismatch { week, allowed, .. }) => {
            assert_eq!(*week, 25);
            assert_eq!(*allowed, Some((1, 20)));
        }
        other => panic!("expected WeekSemesterMismatch, got {:?}", other),
    }
    assert!(processor.submit(&batch).is_empty());
}

#[test]
fn test_scenario_d_blank_row_counts_nowhere() {
    let processor = processor(admin());
    let batch = processor.build(vec![blank_record(), scenario_record()]);

    let summary = processor.summary(&batch);
    assert_eq!(summary.total_rows, 2);
    assert_eq!(summary.empty_rows, 1);
    assert_eq!(summary.valid_rows, 1);
    assert_eq!(summary.invalid_rows, 0);
    assert!(processor.submit(&batch).iter().all(|r| r.key != 0));
}

// ==========================================
// 不变量
// ==========================================

#[test]
fn test_partition_invariant_over_mixed_batch() {
    let processor = processor(admin());
    let batch = processor.build(vec![
        scenario_record(),
        blank_record(),
        record_with(&[("Phòng", RawCell::text("P999"))]),
        record_with(&[("Năm học", RawCell::text("2024"))]),
        record_with(&[("Ngày", RawCell::text("31/02/2024"))]),
        record_with(&[("Ca", RawCell::Number(3.0)), ("Phòng", RawCell::text("P102"))]),
        record_with(&[("Giảng viên", RawCell::Empty)]),
    ]);

    assert_eq!(
        batch.valid_count() + batch.invalid_count() + batch.empty_count(),
        batch.total_count()
    );
    for key in batch.rows.keys() {
        let states = [
            batch.is_valid_row(*key),
            batch.error_for(*key).is_some(),
            batch.is_empty_row(*key),
        ];
        assert_eq!(states.iter().filter(|s| **s).count(), 1, "row {}", key);
    }

    let codes: Vec<&str> = [2, 3, 4, 6]
        .iter()
        .filter_map(|k| batch.error_for(*k).map(|e| e.code()))
        .collect();
    assert_eq!(codes.len(), 4);
    assert_eq!(
        batch.error_for(6),
        Some(&ValidationError::MissingRequiredField {
            field: "lecturer".to_string(),
            value: None,
        })
    );
}

#[test]
fn test_first_failing_check_wins() {
    // 学年格式错误 + 房间未知: 报告学年
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[
        ("Năm học", RawCell::text("24-25")),
        ("Phòng", RawCell::text("P999")),
    ])]);

    assert!(matches!(
        batch.error_for(0),
        Some(ValidationError::SchoolYearFormat { .. })
    ));
}

#[test]
fn test_out_of_range_period_reports_the_filled_value() {
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[("Ca", RawCell::Number(5.0))])]);

    assert_eq!(
        batch.error_for(0),
        Some(&ValidationError::MissingRequiredField {
            field: "period".to_string(),
            value: Some("5".to_string()),
        })
    );

    let batch = processor.update_row(
        batch,
        0,
        RowPatch {
            period: Some(RawCell::Number(2.0)),
            ..Default::default()
        },
    );
    assert!(batch.is_valid_row(0));
}

#[test]
fn test_edit_after_json_round_trip_lands_on_requested_row() {
    let processor = processor(admin());
    let batch = processor.build(vec![
        scenario_record(),
        record_with(&[("Phòng", RawCell::text("P999"))]),
        record_with(&[("Phòng", RawCell::text("P999")), ("Ca", RawCell::Number(3.0))]),
    ]);
    let row0 = batch.rows[&0].clone();

    let json = serde_json::to_string(&batch).unwrap();
    let restored: lab_timetable::domain::ImportBatch = serde_json::from_str(&json).unwrap();

    let batch = processor.update_row(
        restored,
        2,
        RowPatch {
            room: Some(RawCell::text("P102")),
            ..Default::default()
        },
    );

    assert!(batch.is_valid_row(2));
    assert!(batch.error_for(1).is_some());
    assert_eq!(batch.rows[&0].subject, row0.subject);
    assert_eq!(batch.rows[&0].room, row0.room);

    let submitted = processor.submit(&batch);
    let keys: Vec<usize> = submitted.iter().map(|r| r.key).collect();
    assert_eq!(keys, vec![0, 2]);
    assert_eq!(submitted[1].period, Some(Period::P3));
}

#[test]
fn test_study_time_is_derived_from_period() {
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[
        ("Ca", RawCell::Number(1.0)),
        ("Giờ học", RawCell::text("15:00-17:15")),
    ])]);

    let rows = processor.submit(&batch);
    assert_eq!(rows[0].time, Period::P1.study_time());
}

#[test]
fn test_serial_date_is_normalized() {
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[("Ngày", RawCell::Number(45537.0))])]);

    assert_eq!(batch.rows[&0].date.as_deref(), Some("02/09/2024"));
    assert!(batch.is_valid_row(0));
}

#[test]
fn test_lecturer_with_display_name_resolves_by_email() {
    let processor = processor(admin());
    let batch = processor.build(vec![record_with(&[(
        "Giảng viên",
        RawCell::text("Trần Thị B (b@x.edu)"),
    )])]);

    assert!(batch.is_valid_row(0));
    assert_eq!(
        batch.rows[&0].lecturer.as_ref().and_then(|l| l.resolved_id()),
        Some("u2")
    );
}

#[test]
fn test_non_admin_lecturer_is_forced_to_caller() {
    let caller = CallerContext::lecturer("u2", "b@x.edu");
    let processor = processor(caller);
    let batch = processor.build(vec![scenario_record()]);

    let rows = processor.submit(&batch);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].lecturer,
        Some(EntityRef::Resolved {
            id: "u2".to_string(),
            natural_key: "b@x.edu".to_string(),
        })
    );
}

#[test]
fn test_empty_catalogs_skip_reference_checks() {
    let processor = ImportBatchProcessor::new(
        lab_timetable::domain::ReferenceCatalogs::default(),
        Arc::new(SemesterWeekRanges::default()),
        admin(),
    );
    let batch = processor.build(vec![record_with(&[("Phòng", RawCell::text("P999"))])]);

    assert!(batch.is_valid_row(0));
    assert_eq!(
        batch.rows[&0].room,
        Some(EntityRef::Pending {
            raw: "P999".to_string()
        })
    );
}

#[test]
fn test_custom_week_ranges_are_pluggable() {
    let mut ranges = BTreeMap::new();
    ranges.insert(1, (1, 30));
    let processor = ImportBatchProcessor::new(
        sample_catalogs(),
        Arc::new(SemesterWeekRanges::new(ranges)),
        admin(),
    );

    let batch = processor.build(vec![record_with(&[("Tuần", RawCell::Number(25.0))])]);
    assert!(batch.is_valid_row(0));
}

// ==========================================
// 审核阶段编辑
// ==========================================

#[test]
fn test_edit_revalidates_only_the_edited_row() {
    let processor = processor(admin());
    let batch = processor.build(vec![
        scenario_record(),
        record_with(&[("Phòng", RawCell::text("P999"))]),
    ]);
    let untouched = batch.rows[&0].clone();

    let batch = processor.update_row(
        batch,
        1,
        RowPatch {
            room: Some(RawCell::text("P102")),
            ..Default::default()
        },
    );

    assert!(batch.is_valid_row(1));
    assert_eq!(batch.rows[&0], untouched);
    assert_eq!(processor.submit(&batch).len(), 2);
}

#[test]
fn test_edit_can_break_a_valid_row() {
    let processor = processor(admin());
    let batch = processor.build(vec![scenario_record()]);

    let batch = processor.update_row(
        batch,
        0,
        RowPatch {
            week: Some(RawCell::Number(45.0)),
            ..Default::default()
        },
    );

    assert!(matches!(
        batch.error_for(0),
        Some(ValidationError::WeekSemesterMismatch { .. })
    ));
}

#[test]
fn test_remove_and_unknown_keys() {
    let processor = processor(admin());
    let batch = processor.build(vec![
        scenario_record(),
        record_with(&[("Phòng", RawCell::text("P999"))]),
    ]);

    let batch = processor.remove_row(batch, 1);
    assert_eq!(batch.total_count(), 1);
    assert_eq!(batch.invalid_count(), 0);

    let before = batch.clone();
    let batch = processor.remove_row(batch, 42);
    let batch = processor.update_row(batch, 42, RowPatch::default());
    assert_eq!(batch, before);
}

// ==========================================
// 端到端: CSV 文件 → AppState → 数据库
// ==========================================

#[tokio::test]
async fn test_csv_import_end_to_end() {
    lab_timetable::logging::init_test();
    let (_db_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();
    seed_catalogs(&state.catalog_repo);

    let csv = write_csv(
        "\u{feff}Năm học,Học kỳ,Ngày,Tuần,Ca,Giờ học,Môn học,Phòng,Lớp,Giảng viên\n\
         2024-2025,1,2024-09-02,1,2,,Toán,P101,C23A,a@x.edu\n\
         2024-2025,1,03-09-2024,1,1,15:00-17:15,Lý,P102,C23B,b@x.edu\n\
         ,,,,,,,,,\n\
         2024-2025,1,04/09/2024,1,3,,Hóa,P999,C23C,a@x.edu\n",
    );

    let session = state
        .import_api
        .start_import(csv.path(), admin())
        .await
        .unwrap();
    let summary = session.summary();
    assert_eq!(summary.total_rows, 4);
    assert_eq!(summary.valid_rows, 2);
    assert_eq!(summary.invalid_rows, 1);
    assert_eq!(summary.empty_rows, 1);
    assert_eq!(summary.unresolved_rooms, vec!["P999".to_string()]);

    let response = state.import_api.confirm_import(&session).await.unwrap();
    assert_eq!(response.submitted, 2);
    assert_eq!(response.skipped_invalid, 1);
    assert_eq!(response.outcome, SubmitOutcome::Completed { inserted_count: 2 });

    let week = state
        .calendar_api
        .get_week_calendar(
            chrono::NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            sept(1, 8, 0),
            &admin(),
        )
        .unwrap();
    let placed: Vec<_> = week
        .days
        .iter()
        .flat_map(|d| d.cells.iter().flatten())
        .collect();
    assert_eq!(placed.len(), 2);
    assert!(placed
        .iter()
        .any(|c| c.cell.entry.room_id == "r2" && c.cell.entry.time == "07:00-09:15"));
}

#[tokio::test]
async fn test_unsupported_file_is_rejected() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path).unwrap();

    let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    let result = state.import_api.start_import(file.path(), admin()).await;
    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
}

#[tokio::test]
async fn test_reimport_of_same_slot_is_partial() {
    let (_db_file, db_path) = create_test_db().unwrap();
    let state = AppState::new(db_path.clone()).unwrap();
    seed_catalogs(&state.catalog_repo);

    let csv = write_csv(
        "Năm học,Học kỳ,Ngày,Tuần,Ca,Môn học,Phòng,Lớp,Giảng viên\n\
         2024-2025,1,2024-09-02,1,2,Toán,P101,C23A,a@x.edu\n",
    );

    let first = state.import_api.start_import(csv.path(), admin()).await.unwrap();
    state.import_api.confirm_import(&first).await.unwrap();

    let second = state.import_api.start_import(csv.path(), admin()).await.unwrap();
    let response = state.import_api.confirm_import(&second).await.unwrap();
    assert!(response.partial);
    assert_eq!(
        response.outcome,
        SubmitOutcome::Partial {
            inserted_count: 0,
            failed_count: 1
        }
    );

    // 新连接读取同一数据库
    let calendar = CalendarApi::from_connection(std::sync::Arc::new(std::sync::Mutex::new(
        lab_timetable::db::open_sqlite_connection(&db_path).unwrap(),
    )));
    let week = calendar
        .get_week_calendar(
            chrono::NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
            sept(1, 8, 0),
            &admin(),
        )
        .unwrap();
    assert_eq!(week.days[0].cells.iter().flatten().count(), 1);
}
