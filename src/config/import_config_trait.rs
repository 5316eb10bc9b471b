// ==========================================
// 实验室排课管理 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::week_semester_rule::SemesterWeekRanges;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取学期周次区间
    ///
    /// # 返回
    /// - SemesterWeekRanges: 学期 → (起始周, 结束周)
    ///
    /// # 默认值
    /// - {"1":[1,20],"2":[21,40],"3":[41,52]}
    async fn get_semester_week_ranges(
        &self,
    ) -> Result<SemesterWeekRanges, Box<dyn Error + Send + Sync>>;

    /// 获取单次导入行数上限
    ///
    /// # 默认值
    /// - 2000
    async fn get_max_import_rows(&self) -> Result<usize, Box<dyn Error + Send + Sync>>;

    /// 获取界面语言
    ///
    /// # 默认值
    /// - "vi"
    async fn get_ui_locale(&self) -> Result<String, Box<dyn Error + Send + Sync>>;
}
