// ==========================================
// 工艺结构 API 集成测试
// ==========================================
// 目标: 结构编辑守卫（替代组成员数、状态机、删除保护）
// ==========================================


use chrono::{Duration, Local};
use rust_decimal_macros::dec;

use mtc_tracking::api::ApiError;
use mtc_tracking::domain::types::ProcessStatus;

use test_helpers::{seed_structure, setup_state, ACTOR, ROLE};

#[test]
fn test_substitute_group_needs_two_members() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let err = state
        .process_api
        .create_substitute_group(
            &ids.cutting_id,
            "单成员组",
            &[ids.steel_usage_id.clone()],
            ACTOR,
            ROLE,
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_duplicate_member_ids_do_not_form_group() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 涂装工序上新建一条未入组用料,同一 ID 重复传入
    let usage = state
        .process_api
        .add_variant_usage(&ids.coating_id, &ids.steel_id, dec!(2), ACTOR, ROLE)
        .unwrap();
    let err = state
        .process_api
        .create_substitute_group(
            &ids.coating_id,
            "重复成员组",
            &[usage.usage_id.clone(), usage.usage_id.clone()],
            ACTOR,
            ROLE,
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));

    // 不得残留半成品组: 涂装工序无组,该用料仍未入组
    let detail = state.process_api.get_process_detail(&ids.process_id).unwrap();
    let coating = &detail.subprocesses[1];
    assert!(coating.groups.is_empty());
    let usage_row = coating
        .usages
        .iter()
        .find(|u| u.usage_id == usage.usage_id)
        .unwrap();
    assert!(usage_row.group_id.is_none());
}

#[test]
fn test_cannot_shrink_group_below_two_members() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    // 组只有两个成员, 移除任何一个都会使组退化
    let err = state
        .process_api
        .remove_variant_usage(&ids.steel_usage_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_process_status_machine() {
    let (_tmp, state) = setup_state().unwrap();
    seed_structure(&state).unwrap();

    let process = state
        .process_api
        .create_process("PROC-SM", "状态机工艺", None, ACTOR, ROLE)
        .unwrap();
    assert_eq!(process.status, ProcessStatus::Draft);

    // DRAFT → INACTIVE 非法
    let err = state
        .process_api
        .set_process_status(&process.process_id, ProcessStatus::Inactive, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidStateTransition { .. }));

    // DRAFT → ACTIVE → INACTIVE → ACTIVE 合法
    state
        .process_api
        .set_process_status(&process.process_id, ProcessStatus::Active, ACTOR, ROLE)
        .unwrap();
    state
        .process_api
        .set_process_status(&process.process_id, ProcessStatus::Inactive, ACTOR, ROLE)
        .unwrap();
    let process = state
        .process_api
        .set_process_status(&process.process_id, ProcessStatus::Active, ACTOR, ROLE)
        .unwrap();
    assert_eq!(process.status, ProcessStatus::Active);
}

#[test]
fn test_inactive_process_rejects_new_lots() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    state
        .process_api
        .set_process_status(&ids.process_id, ProcessStatus::Inactive, ACTOR, ROLE)
        .unwrap();

    let err = state
        .lot_api
        .create_lot(
            "LOT-INACTIVE",
            &ids.process_id,
            dec!(1),
            Local::now().date_naive() + Duration::days(7),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::BusinessRuleViolation(_)));
}

#[test]
fn test_delete_process_with_lots_conflicts() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    state
        .lot_api
        .create_lot(
            "LOT-GUARD",
            &ids.process_id,
            dec!(1),
            Local::now().date_naive() + Duration::days(7),
            &[],
            ACTOR,
            ROLE,
        )
        .unwrap();

    let err = state
        .process_api
        .delete_process(&ids.process_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn test_attach_detach_keeps_sequence() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let packing = state
        .process_api
        .create_subprocess("SP-PACK", "包装", ACTOR, ROLE)
        .unwrap();
    let link = state
        .process_api
        .attach_subprocess(&ids.process_id, &packing.subprocess_id, ACTOR, ROLE)
        .unwrap();
    assert_eq!(link.seq_no, 3);

    // 重复挂接 → 冲突
    let err = state
        .process_api
        .attach_subprocess(&ids.process_id, &packing.subprocess_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    state
        .process_api
        .detach_subprocess(&ids.process_id, &packing.subprocess_id, ACTOR, ROLE)
        .unwrap();
    let detail = state.process_api.get_process_detail(&ids.process_id).unwrap();
    assert_eq!(detail.subprocesses.len(), 2);

    // 再次摘除 → 不存在
    let err = state
        .process_api
        .detach_subprocess(&ids.process_id, &packing.subprocess_id, ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn test_process_detail_assembles_structure() {
    let (_tmp, state) = setup_state().unwrap();
    let ids = seed_structure(&state).unwrap();

    let detail = state.process_api.get_process_detail(&ids.process_id).unwrap();
    assert_eq!(detail.subprocesses.len(), 2);
    assert_eq!(detail.overheads.len(), 1);

    let cutting = &detail.subprocesses[0];
    assert_eq!(cutting.link.seq_no, 1);
    assert_eq!(cutting.usages.len(), 2);
    assert_eq!(cutting.groups.len(), 1);
    assert!(cutting.cost_items.is_empty());

    let coating = &detail.subprocesses[1];
    assert_eq!(coating.usages.len(), 1);
    assert_eq!(coating.cost_items.len(), 1);
}
