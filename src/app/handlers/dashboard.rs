use crate::app::state::AppState;

use super::common::{respond, ApiResponse};

// ==========================================
// 看板相关 handler
// ==========================================

/// 看板汇总（告警/批次/工艺计数 + 最近操作）
pub fn get_dashboard_summary(state: &AppState) -> ApiResponse {
    respond(state.dashboard_api.get_summary())
}

/// 最近操作日志
pub fn recent_actions(state: &AppState) -> ApiResponse {
    respond(state.dashboard_api.recent_actions())
}
