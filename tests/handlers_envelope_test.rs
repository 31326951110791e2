// ==========================================
// 请求处理层信封测试
// ==========================================
// 目标: 验证 {success, data, error, message} 信封与状态码映射
// ==========================================


use chrono::{Duration, Local};
use rust_decimal_macros::dec;

use mtc_tracking::app::handlers;

use test_helpers::{seed_structure, setup_state, ACTOR, ROLE};

#[test]
fn test_success_envelope_carries_data() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    let response = handlers::list_variants(&state);
    assert!(response.success);
    assert_eq!(response.status, 200);
    assert!(response.error.is_none());

    let data = response.data.expect("成功响应应带数据");
    assert_eq!(data.as_array().map(|a| a.len()), Some(3));
}

#[test]
fn test_not_found_maps_to_404() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    let response = handlers::get_process_detail(&state, "不存在的工艺");
    assert!(!response.success);
    assert_eq!(response.status, 404);
    assert_eq!(response.error_code(), Some("NOT_FOUND"));
}

#[test]
fn test_invalid_input_maps_to_400() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    // 空名称
    let response = handlers::create_process(&state, "PROC-X", "  ", None, ACTOR, "ADMIN");
    assert_eq!(response.status, 400);
    assert_eq!(response.error_code(), Some("INVALID_INPUT"));

    // 非法数值
    let response = handlers::add_overhead_item(
        &state,
        "P-任意",
        "费用",
        "not-a-number",
        ACTOR,
        "ADMIN",
    );
    assert_eq!(response.status, 400);
    assert_eq!(response.error_code(), Some("INVALID_INPUT"));

    // 未知角色
    let response = handlers::create_subprocess(&state, "SP-X", "工序X", ACTOR, "SUPERUSER");
    assert_eq!(response.status, 400);
    assert_eq!(response.error_code(), Some("INVALID_INPUT"));
}

#[test]
fn test_conflict_maps_to_409() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    // 工艺编码已被演示结构占用
    let response =
        handlers::create_process(&state, "PROC-PANEL", "重复工艺", None, ACTOR, "ADMIN");
    assert!(!response.success);
    assert_eq!(response.status, 409);
    assert_eq!(response.error_code(), Some("CONFLICT"));
}

#[test]
fn test_forbidden_maps_to_403() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    // VIEWER 只读
    let response = handlers::create_subprocess(&state, "SP-NEW", "新工序", ACTOR, "VIEWER");
    assert_eq!(response.status, 403);
    assert_eq!(response.error_code(), Some("FORBIDDEN"));

    // 删除要求 ADMIN, PLANNER 不够
    let response = handlers::delete_process(&state, "P-任意", ACTOR, "PLANNER");
    assert_eq!(response.status, 403);
    assert_eq!(response.error_code(), Some("FORBIDDEN"));
}

#[test]
fn test_blocked_transition_maps_to_422() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let lot = state
        .lot_api
        .create_lot(
            "LOT-ENV-001",
            &ids.process_id,
            dec!(10),
            Local::now().date_naive() + Duration::days(14),
            &[(ids.group_id.clone(), ids.steel_id.clone())],
            ACTOR,
            ROLE,
        )
        .unwrap();

    // 未确认 CRITICAL 告警阻断就绪
    let response = handlers::mark_ready(&state, &lot.lot_id, ACTOR, "PLANNER");
    assert!(!response.success);
    assert_eq!(response.status, 422);
    assert_eq!(
        response.error_code(),
        Some("UNACKNOWLEDGED_CRITICAL_ALERTS")
    );

    // 非法状态跳转（PLANNING → COMPLETED）
    let response = handlers::complete_lot(&state, &lot.lot_id, ACTOR, "PLANNER");
    assert_eq!(response.status, 422);
    assert_eq!(response.error_code(), Some("INVALID_STATE_TRANSITION"));
}

#[test]
fn test_envelope_serializes_without_status_field() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    let response = handlers::get_process_detail(&state, "不存在的工艺");
    let wire = serde_json::to_value(&response).unwrap();

    assert_eq!(wire["success"], serde_json::json!(false));
    assert_eq!(wire["error"]["code"], serde_json::json!("NOT_FOUND"));
    assert!(wire.get("status").is_none());
    assert!(wire.get("message").is_some());
}
