// ==========================================
// 库存告警流程集成测试
// ==========================================
// 目标: 真实库上验证定级边界、告警重评与确认语义
// ==========================================


use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use mtc_tracking::api::ApiError;
use mtc_tracking::app::AppState;
use mtc_tracking::domain::types::{AckAction, AlertSeverity};

use test_helpers::{seed_structure, setup_state, ACTOR, ROLE};

fn start_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(14)
}

/// 调整底漆库存后重评批次告警,返回底漆行的当前定级
fn reevaluate_paint(
    state: &AppState,
    lot_id: &str,
    paint_id: &str,
    stock: Decimal,
) -> Option<AlertSeverity> {
    state
        .variant_api
        .set_stock_levels(paint_id, stock, dec!(20), dec!(40), ACTOR, ROLE)
        .unwrap();
    // 计划字段更新会触发告警重评（数量与日期保持不变）
    state
        .lot_api
        .update_lot_plan(lot_id, dec!(10), start_date(), ACTOR, ROLE)
        .unwrap();

    state
        .alert_api
        .list_alerts(Some(lot_id), None, false)
        .unwrap()
        .into_iter()
        .filter(|a| a.variant_id == paint_id && a.acknowledged_at.is_none())
        .map(|a| a.severity)
        .next()
}

#[test]
fn test_severity_boundaries_follow_strict_comparison() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 底漆需求 = 10 × 1.5 = 15; 安全 20, 再订货点 40
    let lot = state
        .lot_api
        .create_lot(
            "LOT-ALERT-001",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    // 零库存 → CRITICAL（与其他阈值无关）
    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);

    // 库存 < 需求 → HIGH
    assert_eq!(
        reevaluate_paint(&state, &lot.lot_id, &ids.paint_id, dec!(14)),
        Some(AlertSeverity::High)
    );

    // 库存 == 需求: 不再是 HIGH, 落入安全库存区间 → MEDIUM
    assert_eq!(
        reevaluate_paint(&state, &lot.lot_id, &ids.paint_id, dec!(15)),
        Some(AlertSeverity::Medium)
    );

    // 库存 == 需求+安全: 不再是 MEDIUM, 低于再订货点 → LOW
    assert_eq!(
        reevaluate_paint(&state, &lot.lot_id, &ids.paint_id, dec!(35)),
        Some(AlertSeverity::Low)
    );

    // 库存 == 再订货点: 严格小于不成立 → OK, 不落告警
    assert_eq!(
        reevaluate_paint(&state, &lot.lot_id, &ids.paint_id, dec!(40)),
        None
    );
}

#[test]
fn test_selection_change_reevaluates_alerts() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 选铝板: 需求 40, 库存 80 → 80 < 40+50=90 → MEDIUM; 底漆仍 CRITICAL
    let lot = state
        .lot_api
        .create_lot(
            "LOT-ALERT-002",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.alu_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    assert_eq!(alerts.len(), 2);
    let alu_alert = alerts.iter().find(|a| a.variant_id == ids.alu_id).unwrap();
    assert_eq!(alu_alert.severity, AlertSeverity::Medium);
    assert_eq!(alu_alert.required_qty, dec!(40));

    // 改选钢板 → 铝板行消失,只剩底漆
    state
        .lot_api
        .update_selection(&lot.lot_id, &ids.group_id, &ids.steel_id, ACTOR, ROLE)
        .unwrap();
    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].variant_id, ids.paint_id);
}

#[test]
fn test_acknowledge_is_single_shot() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-ALERT-003",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    let alert_id = alerts[0].alert_id.clone();

    let acked = state
        .alert_api
        .acknowledge_alert(&alert_id, AckAction::Override, Some("已安排采购"), ACTOR, ROLE)
        .unwrap();
    assert!(acked.acknowledged_at.is_some());
    assert_eq!(acked.acknowledged_by.as_deref(), Some(ACTOR));

    // 重复确认 → 冲突
    let err = state
        .alert_api
        .acknowledge_alert(&alert_id, AckAction::Acknowledge, None, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // 未确认过滤生效
    assert!(state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap()
        .is_empty());
    assert_eq!(
        state
            .alert_api
            .count_unacknowledged_critical(&lot.lot_id)
            .unwrap(),
        0
    );
}

#[test]
fn test_required_qty_scales_with_lot_quantity() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 钢板清零: 需求 = 10 × 5 = 50, 零库存 → CRITICAL
    state
        .variant_api
        .set_stock_levels(&ids.steel_id, dec!(0), dec!(100), dec!(200), ACTOR, ROLE)
        .unwrap();
    let lot = state
        .lot_api
        .create_lot(
            "LOT-ALERT-004",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    let steel_alert = alerts
        .iter()
        .find(|a| a.variant_id == ids.steel_id)
        .unwrap();
    assert_eq!(steel_alert.severity, AlertSeverity::Critical);
    assert_eq!(steel_alert.required_qty, dec!(50));
    assert_eq!(steel_alert.shortfall, dec!(50));

    // 建议量 = 缺口 + 安全库存, 至少覆盖缺口
    let recos = state
        .alert_api
        .list_recommendations(Some(&lot.lot_id))
        .unwrap();
    let steel_reco = recos
        .iter()
        .find(|r| r.variant_id == ids.steel_id)
        .unwrap();
    assert_eq!(steel_reco.recommended_qty, dec!(150));
    assert!(steel_reco.recommended_qty >= steel_alert.shortfall);
}
