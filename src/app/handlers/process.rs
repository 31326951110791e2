use crate::app::state::AppState;
use crate::domain::types::{CostCategory, ProcessStatus};

use super::common::{parse_decimal, parse_role, respond, ApiResponse};

// ==========================================
// 工艺与工序结构相关 handler
// ==========================================

/// 创建工艺（初始 DRAFT）
pub fn create_process(
    state: &AppState,
    process_code: &str,
    process_name: &str,
    category: Option<&str>,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .process_api
            .create_process(process_code, process_name, category, operator, role)
    }))
}

/// 更新工艺基本信息
pub fn update_process(
    state: &AppState,
    process_id: &str,
    process_name: &str,
    category: Option<&str>,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .process_api
            .update_process(process_id, process_name, category, operator, role)
    }))
}

/// 变更工艺状态
pub fn set_process_status(
    state: &AppState,
    process_id: &str,
    status: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state.process_api.set_process_status(
            process_id,
            ProcessStatus::from_str(status),
            operator,
            role,
        )
    }))
}

/// 查询工艺列表（可按状态过滤）
pub fn list_processes(state: &AppState, status: Option<&str>) -> ApiResponse {
    respond(
        state
            .process_api
            .list_processes(status.map(ProcessStatus::from_str)),
    )
}

/// 查询工艺完整结构
pub fn get_process_detail(state: &AppState, process_id: &str) -> ApiResponse {
    respond(state.process_api.get_process_detail(process_id))
}

/// 删除工艺（无批次引用时,仅 ADMIN）
pub fn delete_process(
    state: &AppState,
    process_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role)
            .and_then(|role| state.process_api.delete_process(process_id, operator, role)),
    )
}

/// 创建工序
pub fn create_subprocess(
    state: &AppState,
    subprocess_code: &str,
    subprocess_name: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .process_api
            .create_subprocess(subprocess_code, subprocess_name, operator, role)
    }))
}

/// 查询全部工序
pub fn list_subprocesses(state: &AppState) -> ApiResponse {
    respond(state.process_api.list_subprocesses())
}

/// 挂接工序到工艺（追加到末尾）
pub fn attach_subprocess(
    state: &AppState,
    process_id: &str,
    subprocess_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .process_api
            .attach_subprocess(process_id, subprocess_id, operator, role)
    }))
}

/// 从工艺摘除工序
pub fn detach_subprocess(
    state: &AppState,
    process_id: &str,
    subprocess_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .process_api
            .detach_subprocess(process_id, subprocess_id, operator, role)
    }))
}

/// 添加物料用量
pub fn add_variant_usage(
    state: &AppState,
    subprocess_id: &str,
    variant_id: &str,
    quantity: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let quantity = parse_decimal("quantity", quantity)?;
        state
            .process_api
            .add_variant_usage(subprocess_id, variant_id, quantity, operator, role)
    }))
}

/// 移除物料用量
pub fn remove_variant_usage(
    state: &AppState,
    usage_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role)
            .and_then(|role| state.process_api.remove_variant_usage(usage_id, operator, role)),
    )
}

/// 创建替代组（至少 2 个成员用量）
pub fn create_substitute_group(
    state: &AppState,
    subprocess_id: &str,
    group_name: &str,
    member_usage_ids: &[String],
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state.process_api.create_substitute_group(
            subprocess_id,
            group_name,
            member_usage_ids,
            operator,
            role,
        )
    }))
}

/// 添加工序成本项
pub fn add_cost_item(
    state: &AppState,
    subprocess_id: &str,
    item_name: &str,
    category: &str,
    amount: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let amount = parse_decimal("amount", amount)?;
        state.process_api.add_cost_item(
            subprocess_id,
            item_name,
            CostCategory::from_str(category),
            amount,
            operator,
            role,
        )
    }))
}

/// 移除工序成本项
pub fn remove_cost_item(
    state: &AppState,
    item_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role).and_then(|role| state.process_api.remove_cost_item(item_id, operator, role)),
    )
}

/// 添加工艺级费用项
pub fn add_overhead_item(
    state: &AppState,
    process_id: &str,
    item_name: &str,
    amount: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let amount = parse_decimal("amount", amount)?;
        state
            .process_api
            .add_overhead_item(process_id, item_name, amount, operator, role)
    }))
}

/// 移除工艺级费用项
pub fn remove_overhead_item(
    state: &AppState,
    overhead_id: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(
        parse_role(role)
            .and_then(|role| state.process_api.remove_overhead_item(overhead_id, operator, role)),
    )
}
