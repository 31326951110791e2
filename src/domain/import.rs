// ==========================================
// 制造追踪与成本核算系统 - 报价导入领域模型
// ==========================================
// 职责: 报价单导入的原始记录/批次/冲突/DQ 报告定义
// 对齐: db.rs init_schema import_batch / import_conflict 表
// ==========================================

use crate::domain::types::PricingStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// RawPricingRecord - 报价单原始行
// ==========================================
// 用途: 解析 + 清洗后的中间形态，engine 不直接消费
#[derive(Debug, Clone, Default)]
pub struct RawPricingRecord {
    // 源字段（已 trim/大写规范化）
    pub variant_code: Option<String>,
    pub supplier_name: Option<String>,
    pub unit_price_raw: Option<String>,
    pub lead_time_days_raw: Option<String>,
    pub status_raw: Option<String>,

    // 类型转换结果（转换失败保持 None 并产生 DQ 违规）
    pub unit_price: Option<Decimal>,
    pub lead_time_days: Option<i32>,
    pub status: Option<PricingStatus>,

    // 主数据解析结果
    pub variant_id: Option<String>, // 按 variant_code 解析；未命中进冲突队列

    // 元信息
    pub row_number: usize, // 原始文件行号（用于 DQ 报告）
}

// ==========================================
// ImportBatch - 导入批次
// ==========================================
// 用途: 记录导入批次元信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub batch_id: String,                   // 批次 ID（UUID）
    pub file_name: Option<String>,          // 源文件名
    pub file_path: Option<String>,          // 源文件路径
    pub total_rows: i32,                    // 总行数
    pub success_rows: i32,                  // 成功导入行数
    pub blocked_rows: i32,                  // 阻断行数（DQ ERROR）
    pub warning_rows: i32,                  // 警告行数（DQ WARNING）
    pub conflict_rows: i32,                 // 冲突行数
    pub imported_at: Option<DateTime<Utc>>, // 导入时间
    pub imported_by: Option<String>,        // 导入人
    pub elapsed_ms: Option<i32>,            // 导入耗时（毫秒）
    pub dq_report_json: Option<String>,     // DQ 报告 JSON
}

// ==========================================
// ImportConflict - 导入冲突记录
// ==========================================
// 用途: 未知物料编码/批内重复等，进入人工队列
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConflict {
    pub conflict_id: String,            // 冲突记录 ID（UUID）
    pub batch_id: String,               // 关联批次 ID
    pub row_number: usize,              // 原始文件行号
    pub variant_code: Option<String>,   // 物料编码（如果可解析）
    pub conflict_type: ConflictType,    // 冲突类型
    pub raw_data: String,               // 原始行数据（JSON）
    pub reason: String,                 // 冲突原因
    pub resolved: bool,                 // 是否已处理
    pub resolved_by: Option<String>,    // 处理人
    pub resolved_at: Option<DateTime<Utc>>, // 处理时间
    pub created_at: DateTime<Utc>,      // 创建时间
}

// ==========================================
// ConflictType - 冲突类型枚举
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictType {
    UnknownVariantCode, // 物料编码不存在于主数据
    DuplicateInBatch,   // 同批次内 (物料, 供应商) 重复
    DataTypeError,      // 数据类型错误
}

impl ConflictType {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ConflictType::UnknownVariantCode => "UNKNOWN_VARIANT_CODE",
            ConflictType::DuplicateInBatch => "DUPLICATE_IN_BATCH",
            ConflictType::DataTypeError => "DATA_TYPE_ERROR",
        }
    }

    /// 从字符串解析冲突类型
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "UNKNOWN_VARIANT_CODE" => Some(ConflictType::UnknownVariantCode),
            "DUPLICATE_IN_BATCH" => Some(ConflictType::DuplicateInBatch),
            "DATA_TYPE_ERROR" => Some(ConflictType::DataTypeError),
            _ => None,
        }
    }
}

// ==========================================
// DqViolation - 数据质量违规记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqViolation {
    pub row_number: usize,            // 原始文件行号
    pub variant_code: Option<String>, // 物料编码（如果可解析）
    pub level: DqLevel,               // 违规级别
    pub field: String,                // 违规字段
    pub message: String,              // 违规描述
}

// ==========================================
// DqLevel - 数据质量级别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DqLevel {
    Error,    // 错误（阻断该行导入）
    Warning,  // 警告（允许导入）
    Conflict, // 冲突（进入冲突队列）
}

// ==========================================
// DqReport - 数据质量报告
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqReport {
    pub batch_id: String,             // 批次 ID
    pub summary: DqSummary,           // 汇总统计
    pub violations: Vec<DqViolation>, // 违规明细
}

// ==========================================
// DqSummary - 数据质量汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqSummary {
    pub total_rows: usize, // 总行数
    pub success: usize,    // 成功导入
    pub blocked: usize,    // 阻断（ERROR）
    pub warning: usize,    // 警告（WARNING）
    pub conflict: usize,   // 冲突（CONFLICT）
}

// ==========================================
// PricingImportResult - 导入结果
// ==========================================
// 用途: 导入接口返回值
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingImportResult {
    pub batch: ImportBatch,                // 批次信息
    pub summary: DqSummary,                // 汇总统计
    pub violations: Vec<DqViolation>,      // 违规明细
    pub elapsed_time: std::time::Duration, // 导入耗时
}
