// ==========================================
// 成本核算 API 集成测试
// ==========================================
// 目标: 真实库上验证最坏情况报告与批次成本快照口径
// ==========================================


use chrono::{Duration, Local};
use rust_decimal_macros::dec;

use mtc_tracking::api::ApiError;
use mtc_tracking::domain::types::PricingStatus;

use test_helpers::{seed_structure, setup_state, ACTOR, ROLE};

#[test]
fn test_worst_case_report_totals() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let report = state
        .costing_api
        .process_worst_case_report(&ids.process_id)
        .unwrap();

    // 组候选: 钢板 9.20×5=46, 铝板 22×4=88 → 组最坏 88 (铝板)
    // 底漆 35×1.5=52.50 → 物料合计 140.50
    assert_eq!(report.material_cost, dec!(140.50));
    assert_eq!(report.labor_cost, dec!(120.00));
    assert_eq!(report.other_item_cost, dec!(0));
    assert_eq!(report.overhead_cost, dec!(300.00));
    assert_eq!(report.total_cost, dec!(560.50));
    assert!(report.warnings.is_empty());

    assert_eq!(report.subprocess_lines.len(), 2);
    let cutting = &report.subprocess_lines[0];
    assert_eq!(cutting.seq_no, 1);
    assert_eq!(cutting.group_lines.len(), 1);
    let group = &cutting.group_lines[0];
    assert_eq!(group.cost, dec!(88.00));
    assert_eq!(group.worst_variant_id.as_deref(), Some(ids.alu_id.as_str()));
    assert_eq!(group.member_count, 2);
}

#[test]
fn test_report_warns_when_group_has_no_active_pricing() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 停用组内全部报价
    for variant_id in [&ids.steel_id, &ids.alu_id] {
        for pricing in state.variant_api.list_pricing(variant_id).unwrap() {
            state
                .variant_api
                .set_pricing_status(&pricing.pricing_id, PricingStatus::Inactive, ACTOR, ROLE)
                .unwrap();
        }
    }

    let report = state
        .costing_api
        .process_worst_case_report(&ids.process_id)
        .unwrap();

    // 组按 0 计入并产生告警; 只剩底漆 52.50
    assert_eq!(report.material_cost, dec!(52.50));
    assert_eq!(report.total_cost, dec!(472.50));
    assert!(report
        .warnings
        .iter()
        .any(|w| w.group_id.as_deref() == Some(ids.group_id.as_str())));
    let group = &report.subprocess_lines[0].group_lines[0];
    assert!(!group.has_active_pricing);
    assert_eq!(group.cost, dec!(0));
}

#[test]
fn test_refresh_lot_cost_uses_selection() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-COST-001",
            &ids.process_id,
            dec!(10),
            Local::now().date_naive() + Duration::days(14),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let snapshot = state
        .costing_api
        .refresh_lot_cost(&lot.lot_id, ACTOR, ROLE)
        .unwrap();

    // 选钢板: 单件物料 = 9.20×5 + 35×1.5 = 98.50 → ×10 = 985.00
    assert_eq!(snapshot.material_cost, dec!(985.00));
    assert_eq!(snapshot.labor_cost, dec!(1200.00));
    assert_eq!(snapshot.overhead_cost, dec!(3000.00));
    assert_eq!(snapshot.total_cost, dec!(5185.00));

    // 快照已落库
    let detail = state.lot_api.get_lot_detail(&lot.lot_id).unwrap();
    let stored = detail.lot.cost_snapshot.expect("快照应已落库");
    assert_eq!(stored.total_cost, dec!(5185.00));
}

#[test]
fn test_refresh_lot_cost_unresolved_group_falls_back_to_worst() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-COST-002",
            &ids.process_id,
            dec!(10),
            Local::now().date_naive() + Duration::days(14),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let snapshot = state
        .costing_api
        .refresh_lot_cost(&lot.lot_id, ACTOR, ROLE)
        .unwrap();

    // 未定型 → 组退回最坏 88: 单件物料 140.50 → ×10 = 1405.00, 总计 5605.00
    assert_eq!(snapshot.material_cost, dec!(1405.00));
    assert_eq!(snapshot.total_cost, dec!(5605.00));
}

#[test]
fn test_report_unknown_process_not_found() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    let err = state
        .costing_api
        .process_worst_case_report("不存在的工艺")
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
