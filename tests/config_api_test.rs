// ==========================================
// 配置 API 集成测试
// ==========================================
// 目标: 默认值种入、读写、快照导出/恢复与权限
// ==========================================


use mtc_tracking::api::ApiError;
use mtc_tracking::config::config_manager::config_keys;
use mtc_tracking::domain::types::OperatorRole;

use test_helpers::{setup_state, ACTOR, ROLE};

#[test]
fn test_defaults_are_seeded() {
    let (_tmp, state) = setup_state().unwrap();

    let configs = state.config_api.list_configs().unwrap();
    for (key, default) in config_keys::DEFAULTS {
        assert_eq!(
            configs.get(*key).map(String::as_str),
            Some(*default),
            "缺默认配置: {}",
            key
        );
    }
}

#[test]
fn test_update_config_rejects_unknown_key_and_empty_value() {
    let (_tmp, state) = setup_state().unwrap();

    let err = state
        .config_api
        .update_config("no.such.key", "1", ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    let err = state
        .config_api
        .update_config(config_keys::DEFAULT_LEAD_TIME_DAYS, "  ", ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
}

#[test]
fn test_update_config_roundtrip() {
    let (_tmp, state) = setup_state().unwrap();

    state
        .config_api
        .update_config(config_keys::DEFAULT_LEAD_TIME_DAYS, "14", ACTOR, ROLE)
        .unwrap();

    assert_eq!(
        state
            .config_api
            .get_config(config_keys::DEFAULT_LEAD_TIME_DAYS)
            .unwrap()
            .as_deref(),
        Some("14")
    );
}

#[test]
fn test_snapshot_restore_requires_admin() {
    let (_tmp, state) = setup_state().unwrap();

    let snapshot = state.config_api.get_config_snapshot().unwrap();

    // 改掉一个值后从快照恢复
    state
        .config_api
        .update_config(config_keys::RECENT_ACTIONS_LIMIT, "99", ACTOR, ROLE)
        .unwrap();

    // PLANNER 无权恢复
    let err = state
        .config_api
        .restore_config_snapshot(&snapshot, ACTOR, OperatorRole::Planner)
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let restored = state
        .config_api
        .restore_config_snapshot(&snapshot, ACTOR, ROLE)
        .unwrap();
    assert!(restored >= 1);
    assert_eq!(
        state
            .config_api
            .get_config(config_keys::RECENT_ACTIONS_LIMIT)
            .unwrap()
            .as_deref(),
        Some("20")
    );
}

#[test]
fn test_restore_rejects_malformed_snapshot() {
    let (_tmp, state) = setup_state().unwrap();

    let err = state
        .config_api
        .restore_config_snapshot("不是 JSON", ACTOR, ROLE)
        .unwrap_err();
    assert!(matches!(err, ApiError::ValidationError(_)));
}
