// ==========================================
// 批次全流程端到端测试
// ==========================================
// 目标: 创建 → 告警 → 确认 → 就绪 → 开工 → 完工的完整链路
// 以及状态机守卫与删除保护
// ==========================================


use chrono::{Duration, Local, NaiveDate};
use rust_decimal_macros::dec;

use mtc_tracking::api::ApiError;
use mtc_tracking::domain::types::{AckAction, ExecutionStatus, LotStatus};

use test_helpers::{seed_structure, setup_state, ACTOR, ROLE};

fn start_date() -> NaiveDate {
    Local::now().date_naive() + Duration::days(14)
}

#[test]
fn test_create_lot_generates_critical_alert_and_recommendation() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 选钢板: 钢板需求 50 库存充足; 底漆零库存 → CRITICAL
    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-001",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();
    assert_eq!(lot.status, LotStatus::Planning);

    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, false)
        .unwrap();
    assert_eq!(alerts.len(), 1);
    let alert = &alerts[0];
    assert_eq!(alert.variant_id, ids.paint_id);
    assert_eq!(alert.required_qty, dec!(15.0));
    assert_eq!(alert.current_stock, dec!(0));

    // 建议量 = 缺口 15 + 安全库存 20
    let recos = state
        .alert_api
        .list_recommendations(Some(&lot.lot_id))
        .unwrap();
    assert_eq!(recos.len(), 1);
    assert_eq!(recos[0].recommended_qty, dec!(35.0));
    assert_eq!(recos[0].supplier_name.as_deref(), Some("涂料一厂"));
    assert_eq!(recos[0].lead_time_days, 7);
}

#[test]
fn test_unacked_critical_blocks_ready() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-002",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let err = state
        .lot_api
        .mark_ready(&lot.lot_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::UnacknowledgedCriticalAlerts { count: 1, .. }
    ));

    // 确认后放行
    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    state
        .alert_api
        .acknowledge_alert(
            &alerts[0].alert_id,
            AckAction::Override,
            Some("接受缺料风险"),
            ACTOR,
            ROLE,
        )
        .unwrap();

    let lot = state.lot_api.mark_ready(&lot.lot_id, ACTOR, ROLE).unwrap();
    assert_eq!(lot.status, LotStatus::Ready);
}

#[test]
fn test_unresolved_group_blocks_ready() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 不带初始选型 → 组未定型
    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-003",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap();

    // 底漆告警先确认掉,只留组未定型一个阻塞项
    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    for alert in &alerts {
        state
            .alert_api
            .acknowledge_alert(&alert.alert_id, AckAction::Acknowledge, None, ACTOR, ROLE)
            .unwrap();
    }

    let err = state
        .lot_api
        .mark_ready(&lot.lot_id, ACTOR, ROLE)
        .unwrap_err();
    match err {
        ApiError::UnresolvedSubstituteGroups(groups) => {
            assert_eq!(groups, vec![ids.group_id.clone()]);
        }
        other => panic!("意外错误: {:?}", other),
    }

    // 定型后放行
    state
        .lot_api
        .update_selection(&lot.lot_id, &ids.group_id, &ids.alu_id, ACTOR, ROLE)
        .unwrap();
    // 选型变更会重评告警,重新确认
    let alerts = state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, true)
        .unwrap();
    for alert in &alerts {
        state
            .alert_api
            .acknowledge_alert(&alert.alert_id, AckAction::Acknowledge, None, ACTOR, ROLE)
            .unwrap();
    }
    let lot = state.lot_api.mark_ready(&lot.lot_id, ACTOR, ROLE).unwrap();
    assert_eq!(lot.status, LotStatus::Ready);
}

#[test]
fn test_full_execution_flow_and_delete_guard() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-004",
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
    state
        .alert_api
        .acknowledge_alert(&alerts[0].alert_id, AckAction::Override, None, ACTOR, ROLE)
        .unwrap();
    state.lot_api.mark_ready(&lot.lot_id, ACTOR, ROLE).unwrap();

    // 开工: 按挂接顺序生成两条执行记录
    let executions = state
        .lot_api
        .start_execution(&lot.lot_id, ACTOR, ROLE)
        .unwrap();
    assert_eq!(executions.len(), 2);
    assert_eq!(executions[0].seq_no, 1);
    assert_eq!(executions[0].subprocess_id, ids.cutting_id);
    assert_eq!(executions[1].seq_no, 2);
    assert_eq!(executions[1].subprocess_id, ids.coating_id);
    assert!(executions
        .iter()
        .all(|e| e.status == ExecutionStatus::Pending));

    // 有执行记录的批次不可删除
    let err = state
        .lot_api
        .delete_lot(&lot.lot_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // 有未完成工序时不可完工
    let err = state
        .lot_api
        .complete_lot(&lot.lot_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    for execution in &executions {
        let done = state
            .lot_api
            .complete_execution(&execution.execution_id, ACTOR, ROLE)
            .unwrap();
        assert_eq!(done.status, ExecutionStatus::Completed);
        assert_eq!(done.completed_by.as_deref(), Some(ACTOR));
    }

    // 重复完成同一道工序 → 冲突
    let err = state
        .lot_api
        .complete_execution(&executions[0].execution_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let lot = state
        .lot_api
        .complete_lot(&lot.lot_id, ACTOR, ROLE)
        .unwrap();
    assert_eq!(lot.status, LotStatus::Completed);

    // 终态不可再跳转
    let err = state
        .lot_api
        .cancel_lot(&lot.lot_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
}

#[test]
fn test_delete_planning_lot_cascades() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-005",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    state.lot_api.delete_lot(&lot.lot_id, ACTOR, ROLE).unwrap();

    let err = state.lot_api.get_lot_detail(&lot.lot_id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    // 告警与建议随批次级联删除
    assert!(state
        .alert_api
        .list_alerts(Some(&lot.lot_id), None, false)
        .unwrap()
        .is_empty());
    assert!(state
        .alert_api
        .list_recommendations(Some(&lot.lot_id))
        .unwrap()
        .is_empty());
}

#[test]
fn test_lot_requires_active_process_and_unique_code() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    state
        .lot_api
        .create_lot(
            "LOT-E2E-006",
            &ids.process_id,
            dec!(1),
            start_date(),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap();

    // 批次编码唯一
    let err = state
        .lot_api
        .create_lot(
            "LOT-E2E-006",
            &ids.process_id,
            dec!(1),
            start_date(),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // 数量必须为正
    let err = state
        .lot_api
        .create_lot(
            "LOT-E2E-007",
            &ids.process_id,
            dec!(0),
            start_date(),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_failed_delete_guard_never_deletes() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-E2E-008",
            &ids.process_id,
            dec!(10),
            start_date(),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    // 第二连接破坏执行表,使守卫查询必然失败
    let conn = rusqlite::Connection::open(&state.db_path).unwrap();
    conn.execute_batch("DROP TABLE subprocess_execution").unwrap();

    let err = state.lot_api.delete_lot(&lot.lot_id, ACTOR, ROLE).unwrap_err();
    assert!(matches!(err, ApiError::DatabaseError(_)));

    // 守卫失败时批次必须原样保留
    let lots = state.lot_api.list_lots(None).unwrap();
    assert!(lots.iter().any(|l| l.lot_id == lot.lot_id));
}
