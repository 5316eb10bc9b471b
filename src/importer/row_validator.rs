// ==========================================
// 实验室排课管理 - 行校验器
// ==========================================
// 职责: 结构与业务规则校验,每行至多产出一个错误
// 顺序（命中即返回,顺序不可调整）:
// 1) 必填字段  2) 学年格式  3) 日期格式+日历有效性
// 4) 周次/学期一致  5) 房间已解析  6) 教师已解析
// 红线: 纯函数,相同输入必得相同输出（审核统计与提交过滤一致）
// ==========================================

use crate::domain::import::ValidationError;
use crate::domain::timetable::{ReferenceCatalogs, TimetableRow};
use crate::importer::date_normalizer::parse_strict_date;
use crate::importer::timetable_importer_trait::WeekSemesterRule;

pub struct RowValidator;

impl RowValidator {
    /// 校验单行（非空行）
    pub fn validate(
        &self,
        row: &TimetableRow,
        catalogs: &ReferenceCatalogs,
        rule: &dyn WeekSemesterRule,
    ) -> Option<ValidationError> {
        // 1) 必填字段
        if let Some(field) = first_missing_field(row) {
            return Some(ValidationError::MissingRequiredField {
                field: field.to_string(),
                value: row.rejected.get(field).cloned(),
            });
        }

        // 2) 学年格式 YYYY-YYYY
        let school_year = row.school_year.as_deref().unwrap_or_default();
        if !is_school_year(school_year) {
            return Some(ValidationError::SchoolYearFormat {
                value: school_year.to_string(),
            });
        }

        // 3) 日期 DD/MM/YYYY 且日历有效
        let date = row.date.as_deref().unwrap_or_default();
        if parse_strict_date(date).is_none() {
            return Some(ValidationError::DateFormat {
                value: date.to_string(),
            });
        }

        // 4) 周次/学期一致
        if let (Some(semester), Some(week)) = (row.semester, row.week) {
            if !rule.is_week_valid_for_semester(semester, week) {
                return Some(ValidationError::WeekSemesterMismatch {
                    semester,
                    week,
                    allowed: rule.allowed_weeks(semester),
                });
            }
        }

        // 5) 房间目录非空时必须已解析
        if !catalogs.rooms.is_empty() {
            if let Some(room) = row.room.as_ref().filter(|r| !r.is_resolved()) {
                return Some(ValidationError::UnknownRoom {
                    room: room.natural_key().to_string(),
                });
            }
        }

        // 6) 教师目录非空时必须已解析
        if !catalogs.lecturers.is_empty() {
            if let Some(lecturer) = row.lecturer.as_ref().filter(|l| !l.is_resolved()) {
                return Some(ValidationError::UnknownLecturer {
                    lecturer: lecturer.natural_key().to_string(),
                });
            }
        }

        None
    }
}

/// 第一个缺失的必填字段
fn first_missing_field(row: &TimetableRow) -> Option<&'static str> {
    let present = [
        ("school_year", row.school_year.is_some()),
        ("semester", row.semester.is_some()),
        ("date", row.date.is_some()),
        ("week", row.week.is_some()),
        ("period", row.period.is_some()),
        ("time", !row.time.trim().is_empty()),
        ("subject", row.subject.is_some()),
        ("room", row.room.is_some()),
        ("class_name", row.class_name.is_some()),
        ("lecturer", row.lecturer.is_some()),
    ];

    present
        .into_iter()
        .find(|(_, ok)| !ok)
        .map(|(field, _)| field)
}

/// 学年格式: 4 位数字 - 4 位数字
fn is_school_year(value: &str) -> bool {
    match value.split_once('-') {
        Some((a, b)) => {
            a.len() == 4
                && b.len() == 4
                && a.bytes().all(|c| c.is_ascii_digit())
                && b.bytes().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}
