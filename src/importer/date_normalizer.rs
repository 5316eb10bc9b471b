// ==========================================
// 实验室排课管理 - 日期标准化
// ==========================================
// 职责: 多种原始日期编码 → 统一 DD/MM/YYYY
// 支持: 表格序列号 / YYYY-MM-DD / DD-MM-YYYY / DD/MM/YYYY
// 红线: 从不失败;无法识别时原样返回（交给校验器报错）
// ==========================================

use crate::domain::timetable::RawCell;
use chrono::{Duration, NaiveDate};

/// 统一日期格式
pub const CANONICAL_DATE_FORMAT: &str = "%d/%m/%Y";

/// 表格序列号纪元 1899-12-30
fn serial_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// 标准化日期单元格
///
/// 规则（顺序执行,命中即返回）:
/// 1) 整数值数字 → 1899-12-30 + N 天
/// 2) YYYY-MM-DD → DD/MM/YYYY
/// 3) DD-MM-YYYY → 替换分隔符
/// 4) DD/MM/YYYY → 原样
/// 5) 其他 → 去首尾空白后原样返回
pub fn normalize_date(value: &RawCell) -> String {
    match value {
        RawCell::Empty => String::new(),
        RawCell::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 {
                if let Some(date) = serial_to_date(*n as i64) {
                    return date.format(CANONICAL_DATE_FORMAT).to_string();
                }
            }
            n.to_string()
        }
        RawCell::Text(s) => normalize_date_str(s),
    }
}

/// 标准化日期字符串（规则 2-5）
pub fn normalize_date_str(value: &str) -> String {
    let trimmed = value.trim();

    if let Some((y, m, d)) = split_three(trimmed, '-', [4, 2, 2]) {
        return format!("{}/{}/{}", d, m, y);
    }

    if let Some((d, m, y)) = split_three(trimmed, '-', [2, 2, 4]) {
        return format!("{}/{}/{}", d, m, y);
    }

    // 规则 4 与规则 5 均为原样返回
    trimmed.to_string()
}

/// 序列号 → 日期（纯日期运算,无时区/夏令时漂移）
pub fn serial_to_date(serial: i64) -> Option<NaiveDate> {
    serial_epoch().checked_add_signed(Duration::try_days(serial)?)
}

/// 严格解析 DD/MM/YYYY（格式 + 日历有效性,拒绝 31/02/2025）
pub fn parse_strict_date(value: &str) -> Option<NaiveDate> {
    let (d, m, y) = split_three(value, '/', [2, 2, 4])?;
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

/// 是否满足 DD/MM/YYYY 形态（不检查日历有效性）
pub fn is_canonical_shape(value: &str) -> bool {
    split_three(value, '/', [2, 2, 4]).is_some()
}

/// 按分隔符切成三段纯数字,并校验每段位数
fn split_three(value: &str, sep: char, widths: [usize; 3]) -> Option<(&str, &str, &str)> {
    let mut parts = value.split(sep);
    let a = parts.next()?;
    let b = parts.next()?;
    let c = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let ok = [a, b, c]
        .iter()
        .zip(widths)
        .all(|(part, width)| part.len() == width && part.bytes().all(|ch| ch.is_ascii_digit()));

    if ok {
        Some((a, b, c))
    } else {
        None
    }
}
