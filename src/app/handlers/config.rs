use crate::app::state::AppState;

use super::common::{parse_role, respond, ApiResponse};

// ==========================================
// 配置管理相关 handler
// ==========================================

/// 查询全量配置
pub fn list_configs(state: &AppState) -> ApiResponse {
    respond(state.config_api.list_configs())
}

/// 查询单个配置
pub fn get_config(state: &AppState, key: &str) -> ApiResponse {
    respond(state.config_api.get_config(key))
}

/// 更新配置
pub fn update_config(
    state: &AppState,
    key: &str,
    value: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role)
            .and_then(|role| state.config_api.update_config(key, value, operator, role)),
    )
}

/// 导出配置快照
pub fn get_config_snapshot(state: &AppState) -> ApiResponse {
    respond(state.config_api.get_config_snapshot())
}

/// 从快照恢复配置（仅 ADMIN）
pub fn restore_config_snapshot(
    state: &AppState,
    snapshot_json: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .config_api
            .restore_config_snapshot(snapshot_json, operator, role)
    }))
}
