// ==========================================
// 制造追踪与成本核算系统 - 工艺领域模型
// ==========================================
// 职责: 工艺/工序/用料/替代组/成本项实体定义
// 红线: 不含数据访问逻辑,不含成本计算逻辑
// 对齐: db.rs init_schema process/subprocess 相关表
// ==========================================

use crate::domain::types::{CostCategory, ProcessStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Process - 工艺主数据
// ==========================================
// 用途: 成本核算与批次创建的根实体
// 红线: 只有 ACTIVE 工艺可被新批次引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    // ===== 主键 =====
    pub process_id: String, // 工艺唯一标识（UUID v4）

    // ===== 基础信息 =====
    pub process_code: String,     // 工艺编码（全局唯一）
    pub process_name: String,     // 工艺名称
    pub category: Option<String>, // 工艺分类（自由文本，可空）
    pub status: ProcessStatus,    // 生命周期状态

    // ===== 审计字段 =====
    pub created_by: String,        // 创建人
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl Process {
    /// 是否允许被新批次引用
    pub fn is_active(&self) -> bool {
        self.status == ProcessStatus::Active
    }
}

// ==========================================
// Subprocess - 工序模板
// ==========================================
// 用途: 可复用工序,可挂接到多个工艺
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subprocess {
    pub subprocess_id: String,     // 工序唯一标识（UUID v4）
    pub subprocess_code: String,   // 工序编码（全局唯一）
    pub subprocess_name: String,   // 工序名称
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// ProcessSubprocessLink - 工艺-工序挂接
// ==========================================
// 红线: seq_no 决定工序执行顺序，同一工艺内唯一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSubprocessLink {
    pub link_id: String,       // 挂接记录 ID（UUID v4）
    pub process_id: String,    // 关联工艺（FK）
    pub subprocess_id: String, // 关联工序（FK）
    pub seq_no: i32,           // 工序顺序（1 起，连续）
}

// ==========================================
// VariantUsage - 工序用料
// ==========================================
// 用途: 工序对某物料的单位用量；group_id 非空表示替代组成员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantUsage {
    pub usage_id: String,          // 用料记录 ID（UUID v4）
    pub subprocess_id: String,     // 所属工序（FK）
    pub variant_id: String,        // 物料（FK）
    pub quantity: Decimal,         // 单位用量（> 0）
    pub group_id: Option<String>,  // 替代组归属（NULL = 非替代组用量）
    pub created_at: DateTime<Utc>, // 记录创建时间
}

impl VariantUsage {
    /// 是否属于某替代组
    pub fn is_grouped(&self) -> bool {
        self.group_id.is_some()
    }
}

// ==========================================
// SubstituteGroup - 替代组（OR 组）
// ==========================================
// 红线: 成员数必须 >= 2（建组与移除成员时校验）
// 用途: 批次选型时每组恰好选定一个成员
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstituteGroup {
    pub group_id: String,          // 替代组 ID（UUID v4）
    pub subprocess_id: String,     // 所属工序（FK）
    pub group_name: String,        // 替代组名称
    pub created_at: DateTime<Utc>, // 记录创建时间
}

// ==========================================
// CostItem - 工序固定成本项
// ==========================================
// 用途: 人工/电力等与用量无关的固定金额项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostItem {
    pub item_id: String,           // 成本项 ID（UUID v4）
    pub subprocess_id: String,     // 所属工序（FK）
    pub item_name: String,         // 成本项名称
    pub category: CostCategory,    // 成本分类（LABOR 单列进 labor_cost）
    pub amount: Decimal,           // 固定金额（>= 0）
    pub created_at: DateTime<Utc>, // 记录创建时间
}

// ==========================================
// OverheadItem - 工艺级管理费用项
// ==========================================
// 用途: 工序合计之外、按工艺整体附加的费用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverheadItem {
    pub overhead_id: String,       // 费用项 ID（UUID v4）
    pub process_id: String,        // 所属工艺（FK）
    pub item_name: String,         // 费用项名称
    pub amount: Decimal,           // 金额（>= 0）
    pub created_at: DateTime<Utc>, // 记录创建时间
}
