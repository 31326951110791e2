use crate::app::state::AppState;

use super::common::{parse_role, respond, ApiResponse};

// ==========================================
// 报价导入相关 handler
// ==========================================

/// 导入供应商报价文件（CSV / Excel）
pub async fn import_pricing_file(
    state: &AppState,
    file_path: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    let role = match parse_role(role) {
        Ok(role) => role,
        Err(e) => return super::common::fail(e),
    };
    respond(
        state
            .import_api
            .import_pricing_file(file_path, operator, role)
            .await,
    )
}

/// 查询导入批次历史
pub fn list_import_batches(state: &AppState, limit: i32) -> ApiResponse {
    respond(state.import_api.list_import_batches(limit))
}

/// 查询导入冲突
pub fn list_import_conflicts(
    state: &AppState,
    batch_id: Option<&str>,
    include_resolved: bool,
) -> ApiResponse {
    respond(state.import_api.list_import_conflicts(batch_id, include_resolved))
}

/// 标记导入冲突已处理
pub fn resolve_import_conflict(
    state: &AppState,
    conflict_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .import_api
            .resolve_import_conflict(conflict_id, operator, role)
    }))
}
