// ==========================================
// 制造追踪与成本核算系统 - 报价导入 Trait
// ==========================================
// 职责: 定义报价单导入各阶段接口（不包含实现）
// ==========================================

use crate::domain::import::{DqReport, DqViolation, PricingImportResult, RawPricingRecord};
use async_trait::async_trait;
use std::error::Error;
use std::path::Path;

// ==========================================
// PricingImporter Trait
// ==========================================
// 用途: 报价单导入主接口
// 实现者: PricingImporterImpl
#[async_trait]
pub trait PricingImporter: Send + Sync {
    /// 从报价单文件导入供应商报价（按扩展名识别 CSV/Excel）
    ///
    /// # 参数
    /// - file_path: 文件路径（.csv/.xlsx/.xls）
    /// - imported_by: 导入人
    ///
    /// # 返回
    /// - Ok(PricingImportResult): 导入结果（批次信息、DQ 报告、汇总统计）
    /// - Err: 文件读取错误、数据库错误等
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 字段映射与类型转换
    /// 3. 基础清洗（TRIM/UPPER/NULL 标准化）
    /// 4. DQ 校验（ERROR 阻断该行，WARNING 放行）
    /// 5. 主数据解析 + 冲突检测（未知编码/批内重复进冲突队列）
    /// 6. 落库（单事务 upsert）+ 批次记录 + DQ 报告
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        imported_by: &str,
    ) -> Result<PricingImportResult, Box<dyn Error>>;

    /// 批量导入多个报价单文件（并发执行）
    ///
    /// # 说明
    /// - 使用 tokio 并发执行多个文件的导入
    /// - 每个文件的导入是独立的，互不影响
    /// - 如果某个文件导入失败，不影响其他文件
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        imported_by: &str,
    ) -> Result<Vec<Result<PricingImportResult, String>>, Box<dyn Error>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<列名, 值>）
    fn parse_to_raw_records(
        &self,
        file_path: &Path,
    ) -> Result<Vec<std::collections::HashMap<String, String>>, Box<dyn Error>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: PricingFieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录映射为 RawPricingRecord
    ///
    /// 类型转换失败不报错: 保留原始值、类型字段置 None，交由 DQ 校验定级。
    fn map_to_raw_pricing(
        &self,
        row: std::collections::HashMap<String, String>,
        row_number: usize,
    ) -> RawPricingRecord;
}

// ==========================================
// DataCleaner Trait
// ==========================================
// 用途: 数据清洗接口（阶段 2）
// 实现者: PricingDataCleaner
pub trait DataCleaner: Send + Sync {
    /// 清洗文本字段（TRIM + 可选 UPPER）
    fn clean_text(&self, value: &str, uppercase: bool) -> String;

    /// 标准化 NULL 值（空字符串/空白 → None）
    fn normalize_null(&self, value: Option<String>) -> Option<String>;

    /// 清洗并标准化报价状态
    ///
    /// # 返回
    /// - Some(PricingStatus): 识别成功（"ACTIVE"/"有效"/"1"/"Y" 等）
    /// - None: 无法识别（由 DQ 校验定级，缺失时默认 ACTIVE）
    fn clean_status(&self, value: Option<&str>) -> Option<crate::domain::types::PricingStatus>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 数据质量校验接口（阶段 3）
// 实现者: PricingDqValidator
pub trait DqValidator: Send + Sync {
    /// 校验单条记录（必填/类型/范围）
    ///
    /// # 参数
    /// - record: 待校验记录
    /// - max_price: 单价合理性上限（超过判 WARNING）
    fn validate_record(
        &self,
        record: &RawPricingRecord,
        max_price: rust_decimal::Decimal,
    ) -> Vec<DqViolation>;

    /// 生成 DQ 报告（blocked/warning/conflict 按违规行去重统计）
    fn generate_dq_report(
        &self,
        batch_id: String,
        total_rows: usize,
        success: usize,
        violations: Vec<DqViolation>,
    ) -> DqReport;
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 冲突检测接口（阶段 4）
// 实现者: PricingConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测同批次内 (物料编码, 供应商) 重复
    ///
    /// # 返回
    /// - Vec<(行号, 物料编码)>: 后出现的重复行（首行保留）
    fn detect_duplicates(&self, records: &[RawPricingRecord]) -> Vec<(usize, String)>;

    /// 检测主数据未命中的物料编码
    ///
    /// # 参数
    /// - records: 待检测记录列表
    /// - known_codes: 主数据中存在的 variant_code 集合
    ///
    /// # 返回
    /// - Vec<(行号, 物料编码)>: 未知编码记录列表
    fn detect_unknown_codes(
        &self,
        records: &[RawPricingRecord],
        known_codes: &std::collections::HashSet<String>,
    ) -> Vec<(usize, String)>;
}
