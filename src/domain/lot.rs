// ==========================================
// 制造追踪与成本核算系统 - 生产批次领域模型
// ==========================================
// 职责: 批次/选型/工序执行/成本快照实体定义
// 红线: 状态字段只能经由 LifecycleEngine 校验后写入
// 对齐: db.rs init_schema production_lot 相关表
// ==========================================

use crate::domain::types::{ExecutionStatus, LotStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionLot - 生产批次
// ==========================================
// 用途: 按工艺下达的一次生产，驱动告警与执行追踪
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionLot {
    // ===== 主键 =====
    pub lot_id: String, // 批次唯一标识（UUID v4）

    // ===== 基础信息 =====
    pub lot_code: String,   // 批次编码（全局唯一）
    pub process_id: String, // 关联工艺（FK，创建时必须 ACTIVE）
    pub quantity: Decimal,  // 批次数量（> 0）
    pub status: LotStatus,  // 状态机当前状态

    // ===== 计划信息 =====
    pub planned_start_date: NaiveDate, // 计划开工日期（采购建议交期基准）

    // ===== 成本快照（CostingEngine 刷新，可空=尚未计算）=====
    pub cost_snapshot: Option<LotCostSnapshot>,

    // ===== 审计字段 =====
    pub created_by: String,        // 创建人
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// LotCostSnapshot - 批次成本快照
// ==========================================
// 红线: 所有金额 2 位小数、非负; total = 四项之和
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotCostSnapshot {
    pub material_cost: Decimal,      // 物料成本（最坏情况/选型口径）
    pub labor_cost: Decimal,         // 人工成本（LABOR 分类成本项）
    pub other_item_cost: Decimal,    // 其他固定成本项
    pub overhead_cost: Decimal,      // 工艺管理费用
    pub total_cost: Decimal,         // 合计
    pub refreshed_at: DateTime<Utc>, // 快照刷新时间
}

// ==========================================
// VariantSelection - 批次选型
// ==========================================
// 用途: 替代组 -> 具体物料的定型记录，每组至多一条
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSelection {
    pub selection_id: String,       // 选型记录 ID（UUID v4）
    pub lot_id: String,             // 关联批次（FK）
    pub group_id: String,           // 替代组（FK）
    pub variant_id: String,         // 选定物料（必须是该组成员）
    pub selected_by: String,        // 操作人
    pub selected_at: DateTime<Utc>, // 选型时间
}

// ==========================================
// SubprocessExecution - 工序执行记录
// ==========================================
// 用途: READY -> IN_PROGRESS 时按挂接顺序生成
// 红线: 存在执行记录的批次不可删除
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessExecution {
    pub execution_id: String,                // 执行记录 ID（UUID v4）
    pub lot_id: String,                      // 关联批次（FK）
    pub subprocess_id: String,               // 关联工序（FK）
    pub seq_no: i32,                         // 执行顺序（沿用挂接顺序）
    pub status: ExecutionStatus,             // 执行状态
    pub completed_at: Option<DateTime<Utc>>, // 完成时间
    pub completed_by: Option<String>,        // 完成人
}

impl SubprocessExecution {
    /// 是否已完成
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}
