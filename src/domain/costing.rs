// ==========================================
// 制造追踪与成本核算系统 - 成本报告领域模型
// ==========================================
// 职责: 最坏情况成本报告的结构化输出
// 红线: 所有金额 2 位小数、非负; 缺报价必须进 warnings
// ==========================================

use crate::domain::types::CostCategory;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ProcessCostReport - 工艺最坏情况成本报告
// ==========================================
// 用途: CostingEngine 输出，逐工序明细 + 分类汇总
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessCostReport {
    // ===== 工艺信息 =====
    pub process_id: String,
    pub process_code: String,
    pub process_name: String,

    // ===== 明细 =====
    pub subprocess_lines: Vec<SubprocessCostLine>, // 按挂接顺序
    pub overhead_lines: Vec<OverheadCostLine>,     // 工艺级费用项

    // ===== 分类汇总（均为 2 位小数）=====
    pub material_cost: Decimal,   // 物料成本（最坏情况口径）
    pub labor_cost: Decimal,      // 人工成本项合计
    pub other_item_cost: Decimal, // 其他成本项合计
    pub overhead_cost: Decimal,   // 工艺管理费用合计
    pub total_cost: Decimal,      // 总成本

    // ===== 告警 =====
    pub warnings: Vec<CostingWarning>, // 缺报价等口径问题

    pub generated_at: DateTime<Utc>, // 报告生成时间
}

impl ProcessCostReport {
    /// 是否存在口径告警（缺活跃报价）
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

// ==========================================
// SubprocessCostLine - 工序成本行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessCostLine {
    pub subprocess_id: String,
    pub subprocess_code: String,
    pub subprocess_name: String,
    pub seq_no: i32, // 挂接顺序

    pub group_lines: Vec<GroupCostLine>, // 替代组成本行
    pub usage_lines: Vec<UsageCostLine>, // 非替代组用料行
    pub item_lines: Vec<CostItemLine>,   // 固定成本项行

    pub material_cost: Decimal, // 本工序物料成本
    pub item_cost: Decimal,     // 本工序固定成本项合计
    pub subtotal: Decimal,      // 本工序小计
}

// ==========================================
// GroupCostLine - 替代组成本行
// ==========================================
// 用途: 记录最坏情况下选中的成员与金额
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupCostLine {
    pub group_id: String,
    pub group_name: String,
    pub member_count: usize,               // 组成员数
    pub worst_variant_id: Option<String>,  // 最坏情况命中的成员（无报价时为空）
    pub worst_variant_code: Option<String>,
    pub cost: Decimal,                     // 组成本（无活跃报价时为 0）
    pub has_active_pricing: bool,          // 组内是否存在活跃报价
}

// ==========================================
// UsageCostLine - 非替代组用料成本行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageCostLine {
    pub usage_id: String,
    pub variant_id: String,
    pub variant_code: String,
    pub quantity: Decimal,                // 单位用量
    pub max_unit_price: Option<Decimal>,  // 活跃报价最高单价（无报价时为空）
    pub cost: Decimal,                    // 行成本（单价 × 用量，缺报价为 0）
}

// ==========================================
// CostItemLine - 固定成本项行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostItemLine {
    pub item_id: String,
    pub item_name: String,
    pub category: CostCategory,
    pub amount: Decimal,
}

// ==========================================
// OverheadCostLine - 工艺费用项行
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverheadCostLine {
    pub overhead_id: String,
    pub item_name: String,
    pub amount: Decimal,
}

// ==========================================
// CostingWarning - 成本口径告警
// ==========================================
// 用途: 缺活跃报价的组/用料，金额按 0 计入但必须可见
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostingWarning {
    pub subprocess_id: String,
    pub group_id: Option<String>,   // 替代组告警时非空
    pub variant_id: Option<String>, // 非替代组用料告警时非空
    pub message: String,            // 人读描述
}
