// ==========================================
// 实验室排课管理 - 导入批次领域模型
// ==========================================
// 职责: 行级校验错误 / 导入批次 / 汇总统计 / 提交结果
// 红线: 单行错误是值,不是异常;一行最多一个错误
// ==========================================

use crate::domain::timetable::{RowKey, TimetableRow};
use crate::domain::types::MAX_WEEK;
use crate::i18n::{t, t_with_args};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ==========================================
// ValidationError - 行级校验错误
// ==========================================
// 顺序即优先级: 先命中者胜出（见 RowValidator）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationError {
    /// value: 单元格有内容但无法转换时的原文（如 Ca = 5）
    MissingRequiredField {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    SchoolYearFormat { value: String },
    DateFormat { value: String },
    /// allowed: 该学期配置的周次区间,未配置的学期为 None
    WeekSemesterMismatch {
        semester: u32,
        week: u32,
        allowed: Option<(u32, u32)>,
    },
    UnknownRoom { room: String },
    UnknownLecturer { lecturer: String },
}

impl ValidationError {
    /// 稳定错误码（用于统计与前端分组）
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingRequiredField { .. } => "MISSING_REQUIRED_FIELD",
            ValidationError::SchoolYearFormat { .. } => "SCHOOL_YEAR_FORMAT",
            ValidationError::DateFormat { .. } => "DATE_FORMAT",
            ValidationError::WeekSemesterMismatch { .. } => "WEEK_SEMESTER_MISMATCH",
            ValidationError::UnknownRoom { .. } => "UNKNOWN_ROOM",
            ValidationError::UnknownLecturer { .. } => "UNKNOWN_LECTURER",
        }
    }

    /// 本地化错误说明（调用时按当前语言翻译,错误值本身与语言无关）
    pub fn message(&self) -> String {
        match self {
            ValidationError::MissingRequiredField { field, value } => {
                let label = t(&format!("field.{}", field));
                match value {
                    Some(value) => t_with_args(
                        "validation.invalid_field_value",
                        &[("field", &label), ("value", value)],
                    ),
                    None => t_with_args("validation.missing_required_field", &[("field", &label)]),
                }
            }
            ValidationError::SchoolYearFormat { value } => {
                t_with_args("validation.school_year_format", &[("value", value)])
            }
            ValidationError::DateFormat { value } => {
                t_with_args("validation.date_format", &[("value", value)])
            }
            ValidationError::WeekSemesterMismatch {
                semester,
                week,
                allowed,
            } => week_mismatch_message(*semester, *week, *allowed),
            ValidationError::UnknownRoom { room } => {
                t_with_args("validation.unknown_room", &[("room", room)])
            }
            ValidationError::UnknownLecturer { lecturer } => {
                t_with_args("validation.unknown_lecturer", &[("lecturer", lecturer)])
            }
        }
    }
}

fn week_mismatch_message(semester: u32, week: u32, allowed: Option<(u32, u32)>) -> String {
    let semester_str = semester.to_string();
    let week_str = week.to_string();

    if week == 0 || week > MAX_WEEK {
        return t_with_args(
            "week_rule.week_out_of_range",
            &[("week", &week_str), ("max", &MAX_WEEK.to_string())],
        );
    }

    match allowed {
        None => t_with_args("week_rule.unknown_semester", &[("semester", &semester_str)]),
        Some((start, end)) => t_with_args(
            "week_rule.mismatch",
            &[
                ("semester", &semester_str),
                ("week", &week_str),
                ("start", &start.to_string()),
                ("end", &end.to_string()),
            ],
        ),
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

// ==========================================
// ImportBatch - 待审核导入批次
// ==========================================
// 不变量:
// - rows 包含全部未删除行（含空行）
// - 一个行号最多出现在 errors_by_row_key / empty_row_keys 之一
// - 有效行 = rows - errors - empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub rows: BTreeMap<RowKey, TimetableRow>,
    pub errors_by_row_key: BTreeMap<RowKey, ValidationError>,
    pub empty_row_keys: BTreeSet<RowKey>,
}

impl ImportBatch {
    pub fn new(batch_id: String) -> Self {
        Self {
            batch_id,
            rows: BTreeMap::new(),
            errors_by_row_key: BTreeMap::new(),
            empty_row_keys: BTreeSet::new(),
        }
    }

    pub fn is_empty_row(&self, key: RowKey) -> bool {
        self.empty_row_keys.contains(&key)
    }

    pub fn error_for(&self, key: RowKey) -> Option<&ValidationError> {
        self.errors_by_row_key.get(&key)
    }

    /// 行存在、非空且无错误
    pub fn is_valid_row(&self, key: RowKey) -> bool {
        self.rows.contains_key(&key)
            && !self.empty_row_keys.contains(&key)
            && !self.errors_by_row_key.contains_key(&key)
    }

    /// 错误行（按行号顺序）
    pub fn invalid_rows(&self) -> impl Iterator<Item = (&TimetableRow, &ValidationError)> {
        self.errors_by_row_key
            .iter()
            .filter_map(|(key, err)| self.rows.get(key).map(|row| (row, err)))
    }

    pub fn total_count(&self) -> usize {
        self.rows.len()
    }

    pub fn empty_count(&self) -> usize {
        self.empty_row_keys.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.errors_by_row_key.len()
    }

    pub fn valid_count(&self) -> usize {
        self.total_count() - self.invalid_count() - self.empty_count()
    }

    /// 生成汇总统计（警告聚合）
    pub fn summary(&self) -> ImportSummary {
        let mut error_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut unresolved_rooms = BTreeSet::new();
        let mut unresolved_lecturers = BTreeSet::new();

        for (row, err) in self.invalid_rows() {
            *error_counts.entry(err.code().to_string()).or_insert(0) += 1;

            if let Some(room) = row.room.as_ref().filter(|r| r.is_unresolved()) {
                unresolved_rooms.insert(room.natural_key().to_string());
            }
            if let Some(lecturer) = row.lecturer.as_ref().filter(|l| l.is_unresolved()) {
                unresolved_lecturers.insert(lecturer.natural_key().to_string());
            }
        }

        ImportSummary {
            batch_id: self.batch_id.clone(),
            total_rows: self.total_count(),
            valid_rows: self.valid_count(),
            invalid_rows: self.invalid_count(),
            empty_rows: self.empty_count(),
            error_counts,
            unresolved_rooms: unresolved_rooms.into_iter().collect(),
            unresolved_lecturers: unresolved_lecturers.into_iter().collect(),
        }
    }
}

// ==========================================
// ImportSummary - 审核界面汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize, // 提交时将被跳过
    pub empty_rows: usize,
    pub error_counts: BTreeMap<String, usize>, // 错误码 → 行数
    pub unresolved_rooms: Vec<String>,
    pub unresolved_lecturers: Vec<String>,
}

// ==========================================
// SubmitOutcome - 持久化提交结果
// ==========================================
// Partial 对应 HTTP 207（部分成功）,与全部成功区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmitOutcome {
    Completed {
        inserted_count: usize,
    },
    Partial {
        inserted_count: usize,
        failed_count: usize,
    },
}

impl SubmitOutcome {
    pub fn inserted_count(&self) -> usize {
        match self {
            SubmitOutcome::Completed { inserted_count }
            | SubmitOutcome::Partial { inserted_count, .. } => *inserted_count,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SubmitOutcome::Partial { .. })
    }
}
