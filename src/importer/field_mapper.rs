// ==========================================
// 实验室排课管理 - 字段映射器实现
// ==========================================
// 职责: 越南语列名 → 候选课表行 + 类型转换 + 派生字段
// 红线: 上课时间由节次派生,表格"Giờ học"列仅供参考
// 红线: 非管理员导入时教师字段强制为本人
// ==========================================

use crate::domain::timetable::{EntityRef, RawCell, RawRecord, RowKey, RowPatch, TimetableRow};
use crate::domain::types::{CallerContext, Period, DEFAULT_STUDY_TIME};
use std::collections::BTreeMap;
use crate::importer::date_normalizer::normalize_date;
use crate::importer::timetable_importer_trait::{FieldMapper as FieldMapperTrait, MappedRow};

// ==========================================
// 标准列名
// ==========================================
pub mod headers {
    pub const SCHOOL_YEAR: &str = "Năm học";
    pub const SEMESTER: &str = "Học kỳ";
    pub const DATE: &str = "Ngày";
    pub const WEEK: &str = "Tuần";
    pub const PERIOD: &str = "Ca";
    pub const STUDY_TIME: &str = "Giờ học";
    pub const SUBJECT: &str = "Môn học";
    pub const ROOM: &str = "Phòng";
    pub const CLASS_NAME: &str = "Lớp";
    pub const LECTURER: &str = "Giảng viên";
}

/// 参与空行判定的列（不含模板公式自动计算的"Giờ học"）
const CONTENT_HEADERS: [&str; 9] = [
    headers::SCHOOL_YEAR,
    headers::SEMESTER,
    headers::DATE,
    headers::WEEK,
    headers::PERIOD,
    headers::SUBJECT,
    headers::ROOM,
    headers::CLASS_NAME,
    headers::LECTURER,
];

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_row(&self, record: &RawRecord, key: RowKey, caller: &CallerContext) -> MappedRow {
        let is_empty = CONTENT_HEADERS
            .iter()
            .all(|h| self.get_cell(record, h).is_none());

        let mut rejected = BTreeMap::new();
        let semester = convert_number(
            self.get_cell(record, headers::SEMESTER),
            "semester",
            &mut rejected,
            Some,
        );
        let week = convert_number(self.get_cell(record, headers::WEEK), "week", &mut rejected, Some);
        let period = convert_number(
            self.get_cell(record, headers::PERIOD),
            "period",
            &mut rejected,
            Period::from_number,
        );
        let raw_time = self.get_cell(record, headers::STUDY_TIME).and_then(cell_to_text);

        let lecturer = if caller.is_admin() {
            self.get_cell(record, headers::LECTURER)
                .and_then(cell_to_text)
                .map(|v| EntityRef::pending(&v))
        } else {
            Some(self_reference(caller))
        };

        let row = TimetableRow {
            key,
            school_year: self.get_cell(record, headers::SCHOOL_YEAR).and_then(cell_to_text),
            semester,
            date: self.get_cell(record, headers::DATE).and_then(cell_to_date),
            week,
            period,
            time: derive_study_time(period, raw_time.as_deref()),
            subject: self.get_cell(record, headers::SUBJECT).and_then(cell_to_text),
            class_name: self.get_cell(record, headers::CLASS_NAME).and_then(cell_to_text),
            room: self
                .get_cell(record, headers::ROOM)
                .and_then(cell_to_text)
                .map(|v| EntityRef::pending(&v)),
            lecturer,
            rejected,
        };

        MappedRow { row, is_empty }
    }
}

impl FieldMapper {
    /// 提取单元格（支持列名别名,跳过空白值）
    fn get_cell<'a>(&self, record: &'a RawRecord, key: &str) -> Option<&'a RawCell> {
        let aliases: Vec<&str> = match key {
            headers::DATE => vec![headers::DATE, "Ngày học", "Ngày dạy"],
            headers::PERIOD => vec![headers::PERIOD, "Ca học", "Tiết"],
            headers::SUBJECT => vec![headers::SUBJECT, "Môn", "Tên môn học"],
            headers::ROOM => vec![headers::ROOM, "Phòng học", "Mã phòng"],
            headers::CLASS_NAME => vec![headers::CLASS_NAME, "Lớp học", "Tên lớp"],
            headers::LECTURER => vec![headers::LECTURER, "Email giảng viên", "GV"],
            _ => vec![key],
        };

        aliases
            .into_iter()
            .filter_map(|alias| record.get(alias))
            .find(|cell| !cell.is_blank())
    }

    /// 应用审核阶段的单行编辑
    ///
    /// 只重映射被编辑的字段;房间/教师编辑后回到待解析状态
    pub fn apply_patch(
        &self,
        row: &TimetableRow,
        patch: &RowPatch,
        caller: &CallerContext,
    ) -> TimetableRow {
        let mut next = row.clone();

        if let Some(cell) = &patch.school_year {
            next.school_year = cell_to_text(cell);
        }
        if let Some(cell) = &patch.semester {
            next.semester = convert_number(Some(cell), "semester", &mut next.rejected, Some);
        }
        if let Some(cell) = &patch.date {
            next.date = cell_to_date(cell);
        }
        if let Some(cell) = &patch.week {
            next.week = convert_number(Some(cell), "week", &mut next.rejected, Some);
        }
        if let Some(cell) = &patch.period {
            next.period =
                convert_number(Some(cell), "period", &mut next.rejected, Period::from_number);
            next.time = derive_study_time(next.period, Some(&row.time));
        }
        if let Some(cell) = &patch.subject {
            next.subject = cell_to_text(cell);
        }
        if let Some(cell) = &patch.class_name {
            next.class_name = cell_to_text(cell);
        }
        if let Some(cell) = &patch.room {
            next.room = cell_to_text(cell).map(|v| EntityRef::pending(&v));
        }
        if let Some(cell) = &patch.lecturer {
            next.lecturer = if caller.is_admin() {
                cell_to_text(cell).map(|v| EntityRef::pending(&v))
            } else {
                Some(self_reference(caller))
            };
        }

        next
    }

    /// 编辑后的空行判定（非管理员的教师字段为强制值,不计入）
    pub fn is_row_empty(&self, row: &TimetableRow, caller: &CallerContext) -> bool {
        row.school_year.is_none()
            && row.semester.is_none()
            && row.date.is_none()
            && row.week.is_none()
            && row.period.is_none()
            && row.subject.is_none()
            && row.class_name.is_none()
            && row.room.is_none()
            && row.rejected.is_empty()
            && (!caller.is_admin() || row.lecturer.is_none())
    }
}

/// 派生上课时间
///
/// 规则:
/// 1) 节次为 1-4 → 查表（忽略表格中的时间）
/// 2) 节次无效且原始时间为四个标准值之一 → 保留原始时间
/// 3) 其他 → 节次 1 的时间
pub fn derive_study_time(period: Option<Period>, raw_time: Option<&str>) -> String {
    match (period, raw_time) {
        (Some(p), _) => p.study_time().to_string(),
        (None, Some(t)) if Period::is_canonical_study_time(t.trim()) => t.trim().to_string(),
        _ => DEFAULT_STUDY_TIME.to_string(),
    }
}

/// 非管理员的教师引用: 直接使用登录身份
fn self_reference(caller: &CallerContext) -> EntityRef {
    EntityRef::Resolved {
        id: caller.user_id.clone(),
        natural_key: caller.email.clone(),
    }
}

/// 单元格 → 文本（空白为 None,整数值数字不带小数）
pub fn cell_to_text(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        RawCell::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(format!("{}", *n as i64)),
        RawCell::Number(n) if n.is_finite() => Some(n.to_string()),
        RawCell::Number(_) => None,
    }
}

/// 数值字段转换: 单元格有内容但转换失败时记录原文
///
/// 该字段随后按缺失处理（必填检查命中）,错误中携带原文
fn convert_number<T>(
    cell: Option<&RawCell>,
    field: &str,
    rejected: &mut BTreeMap<String, String>,
    convert: impl Fn(u32) -> Option<T>,
) -> Option<T> {
    rejected.remove(field);
    let cell = cell?;
    let value = cell_to_u32(cell).and_then(convert);
    if value.is_none() {
        if let Some(raw) = cell_to_text(cell) {
            rejected.insert(field.to_string(), raw);
        }
    }
    value
}

/// 单元格 → 正整数（接受数字或数字文本,如 "3" / "3.0"）
pub fn cell_to_u32(cell: &RawCell) -> Option<u32> {
    let value = match cell {
        RawCell::Empty => return None,
        RawCell::Number(n) => *n,
        RawCell::Text(s) => s.trim().parse::<f64>().ok()?,
    };

    if value.is_finite() && value.fract() == 0.0 && value >= 1.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

/// 单元格 → 标准化日期文本
fn cell_to_date(cell: &RawCell) -> Option<String> {
    let normalized = normalize_date(cell);
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
