// ==========================================
// 实验室排课管理 - 周次/学期一致性规则
// ==========================================
// 默认分区: 学期1 → 1-20 周, 学期2 → 21-40 周, 学期3 → 41-52 周
// 边界来自配置（config_kv: semester_week_ranges）,不在校验器中硬编码
// ==========================================

use crate::importer::timetable_importer_trait::WeekSemesterRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub use crate::domain::types::MAX_WEEK;

// ==========================================
// SemesterWeekRanges - 按学期配置周次区间
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemesterWeekRanges {
    ranges: BTreeMap<u32, (u32, u32)>, // 学期 → (起始周, 结束周)
}

impl SemesterWeekRanges {
    pub fn new(ranges: BTreeMap<u32, (u32, u32)>) -> Self {
        Self { ranges }
    }

    pub fn range_for(&self, semester: u32) -> Option<RangeInclusive<u32>> {
        self.ranges.get(&semester).map(|(start, end)| *start..=*end)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl Default for SemesterWeekRanges {
    fn default() -> Self {
        let mut ranges = BTreeMap::new();
        ranges.insert(1, (1, 20));
        ranges.insert(2, (21, 40));
        ranges.insert(3, (41, MAX_WEEK));
        Self { ranges }
    }
}

impl WeekSemesterRule for SemesterWeekRanges {
    fn is_week_valid_for_semester(&self, semester: u32, week: u32) -> bool {
        if week == 0 || week > MAX_WEEK {
            return false;
        }
        self.range_for(semester)
            .map(|range| range.contains(&week))
            .unwrap_or(false)
    }

    fn allowed_weeks(&self, semester: u32) -> Option<(u32, u32)> {
        self.ranges.get(&semester).copied()
    }
}
