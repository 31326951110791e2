// ==========================================
// 制造追踪与成本核算系统 - 库存告警引擎
// ==========================================
// 红线: 等级制,规则自上而下首条命中即定级
// 红线: 所有定级必须输出 reason (JSON: 命中规则 + 数值)
// 红线: 采购建议只消费 ACTIVE 报价; 无活跃报价时回退配置周期
// ==========================================
// 职责: 批次用料的库存评估 + CRITICAL/HIGH 派生采购建议
// 输入: API 层装配好的物料库存切片 (引擎不查库)
// ==========================================

use crate::domain::alert::{AlertEvaluation, ProcurementRecommendation};
use crate::domain::types::AlertSeverity;
use crate::domain::variant::{ItemVariant, SupplierPricing};
use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{debug, instrument};
use uuid::Uuid;

// ==========================================
// 引擎输入
// ==========================================

/// 单个物料的库存评估切片
///
/// unit_quantity 为该物料在整个工艺内的单位用量合计
/// （替代组成员按选型结果计入，未选型的组不进评估）。
pub struct VariantStockInput {
    pub variant: ItemVariant,
    pub unit_quantity: Decimal,
}

// ==========================================
// AlertEngine - 库存告警引擎
// ==========================================
pub struct AlertEngine;

impl AlertEngine {
    /// 创建新的告警引擎
    pub fn new() -> Self {
        Self
    }

    /// 评估批次全部用料的库存状态
    ///
    /// 输出包含 OK 项（调用方决定哪些落库）。
    #[instrument(skip(self, inputs), fields(lot_quantity = %lot_quantity, variants = inputs.len()))]
    pub fn evaluate_lot(
        &self,
        lot_quantity: Decimal,
        inputs: &[VariantStockInput],
    ) -> Vec<AlertEvaluation> {
        let evaluations: Vec<AlertEvaluation> = inputs
            .iter()
            .map(|input| self.evaluate_variant(lot_quantity, input))
            .collect();

        let blocking = evaluations
            .iter()
            .filter(|e| e.severity == AlertSeverity::Critical)
            .count();
        debug!(total = evaluations.len(), critical = blocking, "库存评估完成");

        evaluations
    }

    /// 单物料定级: 规则自上而下，首条命中即定级
    ///
    /// L4 零库存            -> CRITICAL
    /// L3 库存 < 需求        -> HIGH
    /// L2 库存 < 需求+安全   -> MEDIUM
    /// L1 库存 < 再订货点    -> LOW
    /// L0 其余              -> OK
    fn evaluate_variant(
        &self,
        lot_quantity: Decimal,
        input: &VariantStockInput,
    ) -> AlertEvaluation {
        let variant = &input.variant;
        let required_qty = input.unit_quantity * lot_quantity;
        let stock = variant.current_stock;

        let (severity, rule) = if stock == Decimal::ZERO {
            (AlertSeverity::Critical, "STOCK_RULE_L4_ZERO")
        } else if stock < required_qty {
            (AlertSeverity::High, "STOCK_RULE_L3_SHORTFALL")
        } else if stock < required_qty + variant.safety_stock {
            (AlertSeverity::Medium, "STOCK_RULE_L2_SAFETY")
        } else if stock < variant.reorder_point {
            (AlertSeverity::Low, "STOCK_RULE_L1_REORDER")
        } else {
            (AlertSeverity::Ok, "STOCK_RULE_L0_OK")
        };

        let shortfall = if required_qty > stock {
            required_qty - stock
        } else {
            Decimal::ZERO
        };

        let reason = json!({
            "rule": rule,
            "current_stock": stock.to_string(),
            "required_qty": required_qty.to_string(),
            "safety_stock": variant.safety_stock.to_string(),
            "reorder_point": variant.reorder_point.to_string(),
        })
        .to_string();

        AlertEvaluation {
            variant_id: variant.variant_id.clone(),
            variant_code: variant.variant_code.clone(),
            severity,
            current_stock: stock,
            required_qty,
            shortfall,
            reason,
        }
    }

    // ==========================================
    // 采购建议派生
    // ==========================================

    /// 由 CRITICAL/HIGH 告警派生采购建议
    ///
    /// - 建议量 = 缺口 + 安全库存
    /// - 供货周期取活跃报价中最短者（并列时按供应商名次序定）
    /// - 无活跃报价时回退配置周期, 供应商留空
    /// - 最迟到货日 = 计划开工日 + 供货周期
    pub fn build_recommendation(
        &self,
        alert_id: &str,
        lot_id: &str,
        evaluation: &AlertEvaluation,
        safety_stock: Decimal,
        planned_start_date: NaiveDate,
        active_pricing: &[SupplierPricing],
        default_lead_time_days: i32,
    ) -> Option<ProcurementRecommendation> {
        if !evaluation.severity.needs_recommendation() {
            return None;
        }

        let fastest = active_pricing
            .iter()
            .filter(|p| p.is_active())
            .min_by(|a, b| {
                a.lead_time_days
                    .cmp(&b.lead_time_days)
                    .then_with(|| a.supplier_name.cmp(&b.supplier_name))
            });

        let (supplier_name, lead_time_days) = match fastest {
            Some(pricing) => (Some(pricing.supplier_name.clone()), pricing.lead_time_days),
            None => (None, default_lead_time_days),
        };

        Some(ProcurementRecommendation {
            recommendation_id: Uuid::new_v4().to_string(),
            alert_id: alert_id.to_string(),
            lot_id: lot_id.to_string(),
            variant_id: evaluation.variant_id.clone(),
            supplier_name,
            lead_time_days,
            recommended_qty: evaluation.shortfall + safety_stock,
            required_by_date: planned_start_date + Duration::days(lead_time_days as i64),
            created_at: Utc::now(),
        })
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PricingStatus;
    use rust_decimal_macros::dec;

    fn make_variant(stock: Decimal, safety: Decimal, reorder: Decimal) -> ItemVariant {
        ItemVariant {
            variant_id: "V1".to_string(),
            variant_code: "V-001".to_string(),
            variant_name: "测试物料".to_string(),
            unit: "kg".to_string(),
            current_stock: stock,
            safety_stock: safety,
            reorder_point: reorder,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_input(stock: Decimal, safety: Decimal, reorder: Decimal, unit_qty: Decimal) -> VariantStockInput {
        VariantStockInput {
            variant: make_variant(stock, safety, reorder),
            unit_quantity: unit_qty,
        }
    }

    fn make_pricing(supplier: &str, lead: i32, status: PricingStatus) -> SupplierPricing {
        SupplierPricing {
            pricing_id: format!("PR-{}", supplier),
            variant_id: "V1".to_string(),
            supplier_name: supplier.to_string(),
            unit_price: dec!(10),
            lead_time_days: lead,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn evaluate_one(lot_qty: Decimal, input: VariantStockInput) -> AlertEvaluation {
        AlertEngine::new().evaluate_lot(lot_qty, &[input]).remove(0)
    }

    #[test]
    fn test_01_zero_stock_is_critical() {
        // 库存 0 无条件 CRITICAL, 即使需求也是 0
        let eval = evaluate_one(dec!(10), make_input(dec!(0), dec!(5), dec!(20), dec!(0)));
        assert_eq!(eval.severity, AlertSeverity::Critical);
        assert!(eval.reason.contains("STOCK_RULE_L4_ZERO"));
    }

    #[test]
    fn test_02_stock_below_required_is_high() {
        // 需求 = 2 × 10 = 20, 库存 15 < 20 → HIGH, 缺口 5
        let eval = evaluate_one(dec!(10), make_input(dec!(15), dec!(5), dec!(10), dec!(2)));
        assert_eq!(eval.severity, AlertSeverity::High);
        assert_eq!(eval.required_qty, dec!(20));
        assert_eq!(eval.shortfall, dec!(5));
        assert!(eval.reason.contains("STOCK_RULE_L3_SHORTFALL"));
    }

    #[test]
    fn test_03_stock_eating_safety_is_medium() {
        // 需求 20, 库存 22, 安全 5: 22 < 25 → MEDIUM, 缺口 0
        let eval = evaluate_one(dec!(10), make_input(dec!(22), dec!(5), dec!(10), dec!(2)));
        assert_eq!(eval.severity, AlertSeverity::Medium);
        assert_eq!(eval.shortfall, Decimal::ZERO);
    }

    #[test]
    fn test_04_stock_below_reorder_point_is_low() {
        // 需求 20, 安全 5, 库存 26 >= 25, 再订货点 30: 26 < 30 → LOW
        let eval = evaluate_one(dec!(10), make_input(dec!(26), dec!(5), dec!(30), dec!(2)));
        assert_eq!(eval.severity, AlertSeverity::Low);
    }

    #[test]
    fn test_05_ample_stock_is_ok() {
        let eval = evaluate_one(dec!(10), make_input(dec!(100), dec!(5), dec!(30), dec!(2)));
        assert_eq!(eval.severity, AlertSeverity::Ok);
        assert!(eval.reason.contains("STOCK_RULE_L0_OK"));
    }

    #[test]
    fn test_06_boundary_stock_equal_required_is_not_high() {
        // 库存恰好等于需求: L3 不命中, 落到 L2 (20 < 25)
        let eval = evaluate_one(dec!(10), make_input(dec!(20), dec!(5), dec!(10), dec!(2)));
        assert_eq!(eval.severity, AlertSeverity::Medium);
    }

    #[test]
    fn test_07_reason_is_parseable_json() {
        let eval = evaluate_one(dec!(10), make_input(dec!(15), dec!(5), dec!(10), dec!(2)));
        let parsed: serde_json::Value = serde_json::from_str(&eval.reason).unwrap();
        assert_eq!(parsed["rule"], "STOCK_RULE_L3_SHORTFALL");
        assert_eq!(parsed["required_qty"], "20");
    }

    #[test]
    fn test_08_recommendation_quantity_and_due_date() {
        // 缺口 5 + 安全 5 = 建议 10; 最短周期供应商 (3 天) 胜出
        let eval = evaluate_one(dec!(10), make_input(dec!(15), dec!(5), dec!(10), dec!(2)));
        let pricing = vec![
            make_pricing("慢供应商", 10, PricingStatus::Active),
            make_pricing("快供应商", 3, PricingStatus::Active),
        ];
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let rec = AlertEngine::new()
            .build_recommendation("A1", "L1", &eval, dec!(5), start, &pricing, 7)
            .unwrap();

        assert_eq!(rec.recommended_qty, dec!(10));
        assert_eq!(rec.supplier_name.as_deref(), Some("快供应商"));
        assert_eq!(rec.lead_time_days, 3);
        assert_eq!(rec.required_by_date, NaiveDate::from_ymd_opt(2026, 9, 4).unwrap());
    }

    #[test]
    fn test_09_recommendation_falls_back_without_active_pricing() {
        let eval = evaluate_one(dec!(10), make_input(dec!(0), dec!(5), dec!(10), dec!(2)));
        let pricing = vec![make_pricing("停用供应商", 2, PricingStatus::Inactive)];
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let rec = AlertEngine::new()
            .build_recommendation("A1", "L1", &eval, dec!(5), start, &pricing, 7)
            .unwrap();

        assert!(rec.supplier_name.is_none());
        assert_eq!(rec.lead_time_days, 7);
        assert_eq!(rec.required_by_date, NaiveDate::from_ymd_opt(2026, 9, 8).unwrap());
    }

    #[test]
    fn test_10_no_recommendation_for_medium_and_below() {
        let eval = evaluate_one(dec!(10), make_input(dec!(22), dec!(5), dec!(10), dec!(2)));
        let start = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();

        let rec = AlertEngine::new().build_recommendation("A1", "L1", &eval, dec!(5), start, &[], 7);
        assert!(rec.is_none());
    }
}
