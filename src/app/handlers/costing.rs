use crate::app::state::AppState;

use super::common::{parse_role, respond, ApiResponse};

// ==========================================
// 成本核算相关 handler
// ==========================================

/// 工艺最坏情况成本报告
pub fn process_worst_case_report(state: &AppState, process_id: &str) -> ApiResponse {
    respond(state.costing_api.process_worst_case_report(process_id))
}

/// 重算并落库批次成本快照
pub fn refresh_lot_cost(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(
        parse_role(role).and_then(|role| state.costing_api.refresh_lot_cost(lot_id, operator, role)),
    )
}
