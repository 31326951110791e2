// ==========================================
// 制造追踪与成本核算系统 - 物料 API
// ==========================================
// 职责: 物料主数据维护、库存口径调整、供应商报价维护
// 红线: 库存三阈值非负; 报价单价/周期非负
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::api::error::{require_write, ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::types::{OperatorRole, PricingStatus};
use crate::domain::variant::{ItemVariant, SupplierPricing};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::variant_repo::VariantRepository;

// ==========================================
// VariantDetail - 物料详情（主数据 + 报价）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantDetail {
    pub variant: ItemVariant,
    pub pricing: Vec<SupplierPricing>,
}

// ==========================================
// VariantApi
// ==========================================

pub struct VariantApi {
    variant_repo: Arc<VariantRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl VariantApi {
    pub fn new(
        variant_repo: Arc<VariantRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            variant_repo,
            action_log_repo,
        }
    }

    fn log_action(
        &self,
        action_type: &str,
        actor: &str,
        variant_id: &str,
        payload: Option<serde_json::Value>,
        detail: &str,
    ) {
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: None,
            process_id: None,
            variant_id: Some(variant_id.to_string()),
            payload_json: payload,
            detail: Some(detail.to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(action_type = %action_type, error = %e, "操作日志写入失败");
        }
    }

    // ==========================================
    // 物料主数据
    // ==========================================

    /// 创建物料（编码统一大写）
    #[allow(clippy::too_many_arguments)]
    pub fn create_variant(
        &self,
        variant_code: &str,
        variant_name: &str,
        unit: &str,
        current_stock: Decimal,
        safety_stock: Decimal,
        reorder_point: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ItemVariant> {
        require_write(role, "create_variant")?;

        let code = variant_code.trim().to_uppercase();
        let name = variant_name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput(
                "物料编码和名称不能为空".to_string(),
            ));
        }
        if current_stock < Decimal::ZERO
            || safety_stock < Decimal::ZERO
            || reorder_point < Decimal::ZERO
        {
            return Err(ApiError::InvalidInput("库存阈值不能为负".to_string()));
        }
        if self.variant_repo.find_by_code(&code)?.is_some() {
            return Err(ApiError::Conflict(format!("物料编码已存在: {}", code)));
        }

        let now = Utc::now();
        let variant = ItemVariant {
            variant_id: Uuid::new_v4().to_string(),
            variant_code: code.clone(),
            variant_name: name.to_string(),
            unit: unit.trim().to_string(),
            current_stock,
            safety_stock,
            reorder_point,
            created_at: now,
            updated_at: now,
        };
        self.variant_repo.insert_variant(&variant)?;

        self.log_action(
            "CREATE_VARIANT",
            actor,
            &variant.variant_id,
            Some(json!({ "variant_code": code })),
            &format!("创建物料 {}", code),
        );
        Ok(variant)
    }

    /// 更新物料名称与计量单位
    pub fn update_variant(
        &self,
        variant_id: &str,
        variant_name: &str,
        unit: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ItemVariant> {
        require_write(role, "update_variant")?;

        let name = variant_name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("物料名称不能为空".to_string()));
        }
        self.find_variant(variant_id)?;
        self.variant_repo
            .update_variant(variant_id, name, unit.trim())?;

        self.log_action(
            "UPDATE_VARIANT",
            actor,
            variant_id,
            Some(json!({ "variant_name": name })),
            "更新物料基本信息",
        );
        self.find_variant(variant_id)
    }

    /// 设置库存三阈值（当前/安全/再订货点）
    pub fn set_stock_levels(
        &self,
        variant_id: &str,
        current_stock: Decimal,
        safety_stock: Decimal,
        reorder_point: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ItemVariant> {
        require_write(role, "set_stock_levels")?;

        if current_stock < Decimal::ZERO
            || safety_stock < Decimal::ZERO
            || reorder_point < Decimal::ZERO
        {
            return Err(ApiError::InvalidInput("库存阈值不能为负".to_string()));
        }
        self.find_variant(variant_id)?;
        self.variant_repo
            .set_stock_levels(variant_id, current_stock, safety_stock, reorder_point)?;

        self.log_action(
            "SET_STOCK_LEVELS",
            actor,
            variant_id,
            Some(json!({
                "current_stock": current_stock.to_string(),
                "safety_stock": safety_stock.to_string(),
                "reorder_point": reorder_point.to_string(),
            })),
            "设置库存阈值",
        );
        self.find_variant(variant_id)
    }

    /// 按增量调整当前库存（出入库），结果不能为负
    pub fn adjust_stock(
        &self,
        variant_id: &str,
        delta: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ItemVariant> {
        require_write(role, "adjust_stock")?;

        let variant = self.find_variant(variant_id)?;
        let new_stock = variant.current_stock + delta;
        if new_stock < Decimal::ZERO {
            return Err(ApiError::BusinessRuleViolation(format!(
                "库存调整后为负: 当前 {} 调整 {}",
                variant.current_stock, delta
            )));
        }
        self.variant_repo.set_current_stock(variant_id, new_stock)?;

        self.log_action(
            "ADJUST_STOCK",
            actor,
            variant_id,
            Some(json!({
                "delta": delta.to_string(),
                "new_stock": new_stock.to_string(),
            })),
            "调整当前库存",
        );
        self.find_variant(variant_id)
    }

    /// 查询全部物料
    pub fn list_variants(&self) -> ApiResult<Vec<ItemVariant>> {
        Ok(self.variant_repo.list_all()?)
    }

    /// 查询物料详情（含全部报价行）
    pub fn get_variant_detail(&self, variant_id: &str) -> ApiResult<VariantDetail> {
        let variant = self.find_variant(variant_id)?;
        let pricing = self.variant_repo.list_pricing_by_variant(variant_id)?;
        Ok(VariantDetail { variant, pricing })
    }

    // ==========================================
    // 供应商报价
    // ==========================================

    /// 插入或更新供应商报价（按物料 + 供应商去重）
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_supplier_pricing(
        &self,
        variant_id: &str,
        supplier_name: &str,
        unit_price: Decimal,
        lead_time_days: i32,
        status: PricingStatus,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<SupplierPricing> {
        require_write(role, "upsert_supplier_pricing")?;

        let supplier = supplier_name.trim();
        if supplier.is_empty() {
            return Err(ApiError::InvalidInput("供应商名称不能为空".to_string()));
        }
        if unit_price < Decimal::ZERO {
            return Err(ApiError::InvalidInput("单价不能为负".to_string()));
        }
        if lead_time_days < 0 {
            return Err(ApiError::InvalidInput("供货周期不能为负".to_string()));
        }
        self.find_variant(variant_id)?;

        let now = Utc::now();
        let pricing = SupplierPricing {
            pricing_id: Uuid::new_v4().to_string(),
            variant_id: variant_id.to_string(),
            supplier_name: supplier.to_string(),
            unit_price,
            lead_time_days,
            status,
            created_at: now,
            updated_at: now,
        };
        self.variant_repo.upsert_pricing(&pricing)?;

        self.log_action(
            "UPSERT_SUPPLIER_PRICING",
            actor,
            variant_id,
            Some(json!({
                "supplier_name": supplier,
                "unit_price": unit_price.to_string(),
                "lead_time_days": lead_time_days,
            })),
            &format!("维护供应商报价 {}", supplier),
        );
        Ok(pricing)
    }

    /// 变更报价状态（启用/停用）
    pub fn set_pricing_status(
        &self,
        pricing_id: &str,
        status: PricingStatus,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<SupplierPricing> {
        require_write(role, "set_pricing_status")?;

        let pricing = self
            .variant_repo
            .find_pricing(pricing_id)?
            .ok_or_else(|| ApiError::NotFound(format!("报价不存在: {}", pricing_id)))?;
        self.variant_repo.set_pricing_status(pricing_id, status)?;

        self.log_action(
            "SET_PRICING_STATUS",
            actor,
            &pricing.variant_id,
            Some(json!({
                "pricing_id": pricing_id,
                "from": pricing.status.to_string(),
                "to": status.to_string(),
            })),
            "变更报价状态",
        );
        self.variant_repo
            .find_pricing(pricing_id)?
            .ok_or_else(|| ApiError::NotFound(format!("报价不存在: {}", pricing_id)))
    }

    /// 查询某物料的报价列表
    pub fn list_pricing(&self, variant_id: &str) -> ApiResult<Vec<SupplierPricing>> {
        self.find_variant(variant_id)?;
        Ok(self.variant_repo.list_pricing_by_variant(variant_id)?)
    }

    fn find_variant(&self, variant_id: &str) -> ApiResult<ItemVariant> {
        self.variant_repo
            .find_by_id(variant_id)?
            .ok_or_else(|| ApiError::NotFound(format!("物料不存在: {}", variant_id)))
    }
}
