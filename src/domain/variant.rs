// ==========================================
// 制造追踪与成本核算系统 - 物料领域模型
// ==========================================
// 职责: 物料主数据与供应商报价实体定义
// 对齐: db.rs init_schema item_variant / supplier_pricing 表
// ==========================================

use crate::domain::types::PricingStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ItemVariant - 物料主数据（含库存口径）
// ==========================================
// 用途: 用料/报价/库存告警的共同主数据
// 红线: 库存三阈值（当前/安全/再订货点）只在此处维护
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemVariant {
    // ===== 主键 =====
    pub variant_id: String, // 物料唯一标识（UUID v4）

    // ===== 基础信息 =====
    pub variant_code: String, // 物料编码（全局唯一）
    pub variant_name: String, // 物料名称
    pub unit: String,         // 计量单位（kg/件/米...）

    // ===== 库存口径 =====
    pub current_stock: Decimal, // 当前库存（>= 0）
    pub safety_stock: Decimal,  // 安全库存（>= 0）
    pub reorder_point: Decimal, // 再订货点（>= 0）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

// ==========================================
// SupplierPricing - 供应商报价
// ==========================================
// 红线: 最坏情况成本与采购建议只消费 ACTIVE 行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierPricing {
    pub pricing_id: String,        // 报价记录 ID（UUID v4）
    pub variant_id: String,        // 关联物料（FK）
    pub supplier_name: String,     // 供应商名称（同一物料内唯一）
    pub unit_price: Decimal,       // 单价（>= 0）
    pub lead_time_days: i32,       // 供货周期（天，>= 0）
    pub status: PricingStatus,     // 报价状态
    pub created_at: DateTime<Utc>, // 记录创建时间
    pub updated_at: DateTime<Utc>, // 记录更新时间
}

impl SupplierPricing {
    /// 是否参与成本计算与采购建议
    pub fn is_active(&self) -> bool {
        self.status == PricingStatus::Active
    }
}
