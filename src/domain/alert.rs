// ==========================================
// 制造追踪与成本核算系统 - 库存告警领域模型
// ==========================================
// 职责: 告警/采购建议实体与评估输出定义
// 红线: severity 为等级制，首条命中规则即定级
// 对齐: db.rs init_schema inventory_alert / procurement_recommendation 表
// ==========================================

use crate::domain::types::{AckAction, AlertSeverity};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// InventoryAlert - 库存告警
// ==========================================
// 用途: 按批次/物料持久化的缺料告警（OK 评估不落库）
// 红线: 未确认的 CRITICAL 告警阻断批次离开 PLANNING/READY
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryAlert {
    // ===== 主键与关联 =====
    pub alert_id: String,   // 告警 ID（UUID v4）
    pub lot_id: String,     // 关联批次（FK）
    pub variant_id: String, // 关联物料（FK）

    // ===== 评估结果 =====
    pub severity: AlertSeverity, // 告警等级
    pub current_stock: Decimal,  // 评估时库存
    pub required_qty: Decimal,   // 需求量（批次数量 × 单位用量合计）
    pub shortfall: Decimal,      // 缺口（max(需求 - 库存, 0)）
    pub reason: Option<String>,  // 定级解释（JSON：命中规则 + 数值）

    // ===== 确认记录 =====
    pub acknowledged: bool,                     // 是否已确认
    pub acknowledged_by: Option<String>,        // 确认人
    pub acknowledged_at: Option<DateTime<Utc>>, // 确认时间
    pub ack_action: Option<AckAction>,          // 确认动作
    pub ack_note: Option<String>,               // 确认备注

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>, // 告警生成时间
}

impl InventoryAlert {
    /// 是否阻断批次状态跳转（未确认的 CRITICAL）
    pub fn is_blocking(&self) -> bool {
        self.severity == AlertSeverity::Critical && !self.acknowledged
    }
}

// ==========================================
// ProcurementRecommendation - 采购建议
// ==========================================
// 用途: 由 CRITICAL/HIGH 告警派生的补货建议
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcurementRecommendation {
    pub recommendation_id: String,     // 建议 ID（UUID v4）
    pub alert_id: String,              // 来源告警（FK）
    pub lot_id: String,                // 关联批次（FK）
    pub variant_id: String,            // 关联物料（FK）
    pub supplier_name: Option<String>, // 建议供应商（无活跃报价时为空）
    pub lead_time_days: i32,           // 采用的供货周期（含配置回退值）
    pub recommended_qty: Decimal,      // 建议采购量（缺口 + 安全库存）
    pub required_by_date: NaiveDate,   // 最迟到货日（计划开工 + 供货周期）
    pub created_at: DateTime<Utc>,     // 建议生成时间
}

// ==========================================
// AlertEvaluation - 单物料评估输出
// ==========================================
// 用途: AlertEngine 的内存输出，含 OK 项；持久化由 API 层裁剪
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvaluation {
    pub variant_id: String,      // 物料 ID
    pub variant_code: String,    // 物料编码（解释用）
    pub severity: AlertSeverity, // 评估等级
    pub current_stock: Decimal,  // 当前库存
    pub required_qty: Decimal,   // 需求量
    pub shortfall: Decimal,      // 缺口
    pub reason: String,          // 定级解释（JSON）
}
