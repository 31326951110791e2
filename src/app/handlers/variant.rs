use crate::app::state::AppState;
use crate::domain::types::PricingStatus;

use super::common::{parse_decimal, parse_role, respond, ApiResponse};

// ==========================================
// 物料与供应商报价相关 handler
// ==========================================

/// 创建物料
#[allow(clippy::too_many_arguments)]
pub fn create_variant(
    state: &AppState,
    variant_code: &str,
    variant_name: &str,
    unit: &str,
    current_stock: &str,
    safety_stock: &str,
    reorder_point: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let current = parse_decimal("current_stock", current_stock)?;
        let safety = parse_decimal("safety_stock", safety_stock)?;
        let reorder = parse_decimal("reorder_point", reorder_point)?;
        state.variant_api.create_variant(
            variant_code,
            variant_name,
            unit,
            current,
            safety,
            reorder,
            operator,
            role,
        )
    }))
}

/// 更新物料基本信息
pub fn update_variant(
    state: &AppState,
    variant_id: &str,
    variant_name: &str,
    unit: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state
            .variant_api
            .update_variant(variant_id, variant_name, unit, operator, role)
    }))
}

/// 设置库存水位（现存/安全/再订货点）
pub fn set_stock_levels(
    state: &AppState,
    variant_id: &str,
    current_stock: &str,
    safety_stock: &str,
    reorder_point: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let current = parse_decimal("current_stock", current_stock)?;
        let safety = parse_decimal("safety_stock", safety_stock)?;
        let reorder = parse_decimal("reorder_point", reorder_point)?;
        state
            .variant_api
            .set_stock_levels(variant_id, current, safety, reorder, operator, role)
    }))
}

/// 增减现存库存
pub fn adjust_stock(
    state: &AppState,
    variant_id: &str,
    delta: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let delta = parse_decimal("delta", delta)?;
        state.variant_api.adjust_stock(variant_id, delta, operator, role)
    }))
}

/// 查询全部物料
pub fn list_variants(state: &AppState) -> ApiResponse {
    respond(state.variant_api.list_variants())
}

/// 查询物料详情（含报价）
pub fn get_variant_detail(state: &AppState, variant_id: &str) -> ApiResponse {
    respond(state.variant_api.get_variant_detail(variant_id))
}

/// 新增/更新供应商报价
#[allow(clippy::too_many_arguments)]
pub fn upsert_supplier_pricing(
    state: &AppState,
    variant_id: &str,
    supplier_name: &str,
    unit_price: &str,
    lead_time_days: i32,
    status: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        let price = parse_decimal("unit_price", unit_price)?;
        state.variant_api.upsert_supplier_pricing(
            variant_id,
            supplier_name,
            price,
            lead_time_days,
            PricingStatus::from_str(status),
            operator,
            role,
        )
    }))
}

/// 变更报价状态
pub fn set_pricing_status(
    state: &AppState,
    pricing_id: &str,
    status: &str,
    operator: &str,
    role: &str,
) -> ApiResponse {
    respond(parse_role(role).and_then(|role| {
        state.variant_api.set_pricing_status(
            pricing_id,
            PricingStatus::from_str(status),
            operator,
            role,
        )
    }))
}

/// 查询物料的全部报价
pub fn list_pricing(state: &AppState, variant_id: &str) -> ApiResponse {
    respond(state.variant_api.list_pricing(variant_id))
}
