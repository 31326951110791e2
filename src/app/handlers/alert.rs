use crate::api::error::ApiError;
use crate::app::state::AppState;
use crate::domain::types::{AckAction, AlertSeverity};

use super::common::{fail, parse_role, respond, ApiResponse};

// ==========================================
// 库存告警相关 handler
// ==========================================

/// 组合条件查询告警
pub fn list_alerts(
    state: &AppState,
    lot_id: Option<&str>,
    severity: Option<&str>,
    unacknowledged_only: bool,
) -> ApiResponse {
    let severity = match severity {
        Some(s) => match AlertSeverity::from_str(s) {
            Some(parsed) => Some(parsed),
            None => return fail(ApiError::InvalidInput(format!("未知告警级别: {}", s))),
        },
        None => None,
    };
    respond(state.alert_api.list_alerts(lot_id, severity, unacknowledged_only))
}

/// 确认告警
pub fn acknowledge_alert(
    state: &AppState,
    alert_id: &str,
    action: &str,
    note: Option<&str>,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let action = AckAction::from_str(action)
            .ok_or_else(|| ApiError::InvalidInput(format!("未知确认动作: {}", action)))?;
        state
            .alert_api
            .acknowledge_alert(alert_id, action, note, operator, role)
    }))
}

/// 查询采购建议
pub fn list_recommendations(state: &AppState, lot_id: Option<&str>) -> ApiResponse {
    respond(state.alert_api.list_recommendations(lot_id))
}

/// 统计批次未确认 CRITICAL 告警数
pub fn count_unacknowledged_critical(state: &AppState, lot_id: &str) -> ApiResponse {
    respond(state.alert_api.count_unacknowledged_critical(lot_id))
}
