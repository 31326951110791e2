use crate::app::state::AppState;
use crate::domain::types::LotStatus;

use crate::api::error::ApiError;

use super::common::{fail, parse_date, parse_decimal, parse_role, respond, ApiResponse};

// ==========================================
// 生产批次相关 handler
// ==========================================

/// 创建批次（可携带初始选型）
#[allow(clippy::too_many_arguments)]
pub fn create_lot(
    state: &AppState,
    lot_code: &str,
    process_id: &str,
    quantity: &str,
    planned_start_date: &str,
    initial_selections: &[(String, String)],
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let quantity = parse_decimal("quantity", quantity)?;
        let date = parse_date(planned_start_date)?;
        state.lot_api.create_lot(
            lot_code,
            process_id,
            quantity,
            date,
            initial_selections,
            operator,
            role,
        )
    }))
}

/// 变更替代组选型（仅 PLANNING）
pub fn update_selection(
    state: &AppState,
    lot_id: &str,
    group_id: &str,
    variant_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .lot_api
            .update_selection(lot_id, group_id, variant_id, operator, role)
    }))
}

/// 更新批次计划字段（仅 PLANNING）
pub fn update_lot_plan(
    state: &AppState,
    lot_id: &str,
    quantity: &str,
    planned_start_date: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let quantity = parse_decimal("quantity", quantity)?;
        let date = parse_date(planned_start_date)?;
        state
            .lot_api
            .update_lot_plan(lot_id, quantity, date, operator, role)
    }))
}

/// 批次就绪（PLANNING → READY）
pub fn mark_ready(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(parse_role(role).and_then(|role| state.lot_api.mark_ready(lot_id, operator, role)))
}

/// 批次开工（READY → IN_PROGRESS,生成工序执行记录）
pub fn start_execution(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(parse_role(role).and_then(|role| state.lot_api.start_execution(lot_id, operator, role)))
}

/// 完成单道工序执行
pub fn complete_execution(
    state: &AppState,
    execution_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role)
            .and_then(|role| state.lot_api.complete_execution(execution_id, operator, role)),
    )
}

/// 批次完成（IN_PROGRESS → COMPLETED）
pub fn complete_lot(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(parse_role(role).and_then(|role| state.lot_api.complete_lot(lot_id, operator, role)))
}

/// 批次取消（PLANNING/READY → CANCELLED）
pub fn cancel_lot(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(parse_role(role).and_then(|role| state.lot_api.cancel_lot(lot_id, operator, role)))
}

/// 删除批次（无执行记录时,仅 ADMIN）
pub fn delete_lot(state: &AppState, lot_id: &str, operator: &str, role: &str) -> ApiResponse {
    respond(parse_role(role).and_then(|role| state.lot_api.delete_lot(lot_id, operator, role)))
}

/// 查询批次列表（可按状态过滤）
pub fn list_lots(state: &AppState, status: Option<&str>) -> ApiResponse {
    let status = match status {
        Some(s) => match LotStatus::from_str(s) {
            Some(parsed) => Some(parsed),
            None => return fail(ApiError::InvalidInput(format!("未知批次状态: {}", s))),
        },
        None => None,
    };
    respond(state.lot_api.list_lots(status))
}

/// 查询批次详情（选型 + 成本快照 + 执行记录）
pub fn get_lot_detail(state: &AppState, lot_id: &str) -> ApiResponse {
    respond(state.lot_api.get_lot_detail(lot_id))
}
