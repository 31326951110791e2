// ==========================================
// 制造追踪与成本核算系统 - 生产批次 API
// ==========================================
// 职责: 批次创建/选型/状态流转/执行追踪/删除
// 红线: 状态写入前必须经 LifecycleEngine 校验;
//       选型变更仅 PLANNING 态允许并触发告警重评
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{require_admin, require_write, ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::alert::{InventoryAlert, ProcurementRecommendation};
use crate::domain::lot::{ProductionLot, SubprocessExecution, VariantSelection};
use crate::domain::types::{AlertSeverity, ExecutionStatus, LotStatus, OperatorRole};
use crate::engine::alert::{AlertEngine, VariantStockInput};
use crate::engine::lifecycle::{LifecycleEngine, TransitionContext};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::alert_repo::AlertRepository;
use crate::repository::lot_repo::{LotRepository, LotTrackingRepository};
use crate::repository::process_repo::{ProcessRepository, ProcessStructureRepository};
use crate::repository::variant_repo::VariantRepository;

// ==========================================
// LotDetail - 批次详情（主数据 + 选型 + 执行记录）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotDetail {
    pub lot: ProductionLot,
    pub selections: Vec<VariantSelection>,
    pub executions: Vec<SubprocessExecution>,
}

// ==========================================
// LotApi
// ==========================================

pub struct LotApi {
    lot_repo: Arc<LotRepository>,
    tracking_repo: Arc<LotTrackingRepository>,
    process_repo: Arc<ProcessRepository>,
    structure_repo: Arc<ProcessStructureRepository>,
    variant_repo: Arc<VariantRepository>,
    alert_repo: Arc<AlertRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config: Arc<ConfigManager>,
    lifecycle: LifecycleEngine,
    alert_engine: AlertEngine,
}

impl LotApi {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lot_repo: Arc<LotRepository>,
        tracking_repo: Arc<LotTrackingRepository>,
        process_repo: Arc<ProcessRepository>,
        structure_repo: Arc<ProcessStructureRepository>,
        variant_repo: Arc<VariantRepository>,
        alert_repo: Arc<AlertRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            lot_repo,
            tracking_repo,
            process_repo,
            structure_repo,
            variant_repo,
            alert_repo,
            action_log_repo,
            config,
            lifecycle: LifecycleEngine::new(),
            alert_engine: AlertEngine::new(),
        }
    }

    fn log_action(
        &self,
        action_type: &str,
        actor: &str,
        lot_id: &str,
        payload: Option<serde_json::Value>,
        detail: &str,
    ) {
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: Some(lot_id.to_string()),
            process_id: None,
            variant_id: None,
            payload_json: payload,
            detail: Some(detail.to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(action_type = %action_type, error = %e, "操作日志写入失败");
        }
    }

    // ==========================================
    // 创建与选型
    // ==========================================

    /// 创建批次（初始 PLANNING），可带初始选型，随即生成库存告警
    #[allow(clippy::too_many_arguments)]
    pub fn create_lot(
        &self,
        lot_code: &str,
        process_id: &str,
        quantity: Decimal,
        planned_start_date: NaiveDate,
        initial_selections: &[(String, String)],
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ProductionLot> {
        require_write(role, "create_lot")?;

        let code = lot_code.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidInput("批次编码不能为空".to_string()));
        }
        if quantity <= Decimal::ZERO {
            return Err(ApiError::InvalidInput("批次数量必须大于 0".to_string()));
        }
        if self.lot_repo.find_by_code(code)?.is_some() {
            return Err(ApiError::Conflict(format!("批次编码已存在: {}", code)));
        }

        let process = self
            .process_repo
            .find_by_id(process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工艺不存在: {}", process_id)))?;
        if !process.is_active() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "工艺 {} 不是 ACTIVE 状态,不可创建批次",
                process.process_code
            )));
        }

        let now = Utc::now();
        let lot = ProductionLot {
            lot_id: Uuid::new_v4().to_string(),
            lot_code: code.to_string(),
            process_id: process_id.to_string(),
            quantity,
            status: LotStatus::Planning,
            planned_start_date,
            cost_snapshot: None,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.lot_repo.insert_lot(&lot)?;

        for (group_id, variant_id) in initial_selections {
            self.apply_selection(&lot, group_id, variant_id, actor)?;
        }
        self.regenerate_alerts(&lot)?;

        info!(lot_id = %lot.lot_id, lot_code = %code, "批次已创建");
        self.log_action(
            "CREATE_LOT",
            actor,
            &lot.lot_id,
            Some(json!({
                "lot_code": code,
                "process_id": process_id,
                "quantity": quantity.to_string(),
            })),
            &format!("创建批次 {}", code),
        );
        Ok(lot)
    }

    /// 变更替代组选型（仅 PLANNING 态），随即重评告警
    pub fn update_selection(
        &self,
        lot_id: &str,
        group_id: &str,
        variant_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<VariantSelection> {
        require_write(role, "update_selection")?;

        let lot = self.find_lot(lot_id)?;
        if lot.status != LotStatus::Planning {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前为 {} 态,仅 PLANNING 态允许选型",
                lot.lot_code, lot.status
            )));
        }

        let selection = self.apply_selection(&lot, group_id, variant_id, actor)?;
        self.regenerate_alerts(&lot)?;

        self.log_action(
            "UPDATE_SELECTION",
            actor,
            lot_id,
            Some(json!({ "group_id": group_id, "variant_id": variant_id })),
            "变更替代组选型",
        );
        Ok(selection)
    }

    /// 更新批次计划字段（数量/计划开工日期，仅 PLANNING 态），随即重评告警
    pub fn update_lot_plan(
        &self,
        lot_id: &str,
        quantity: Decimal,
        planned_start_date: NaiveDate,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ProductionLot> {
        require_write(role, "update_lot_plan")?;

        if quantity <= Decimal::ZERO {
            return Err(ApiError::InvalidInput("批次数量必须大于 0".to_string()));
        }
        let lot = self.find_lot(lot_id)?;
        if lot.status != LotStatus::Planning {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前为 {} 态,仅 PLANNING 态允许修改计划",
                lot.lot_code, lot.status
            )));
        }

        self.lot_repo
            .update_plan_fields(lot_id, quantity, planned_start_date)?;
        let updated = self.find_lot(lot_id)?;
        self.regenerate_alerts(&updated)?;

        self.log_action(
            "UPDATE_LOT_PLAN",
            actor,
            lot_id,
            Some(json!({
                "quantity": quantity.to_string(),
                "planned_start_date": planned_start_date.to_string(),
            })),
            "更新批次计划",
        );
        Ok(updated)
    }

    // ==========================================
    // 状态流转
    // ==========================================

    /// PLANNING -> READY（替代组全部定型 + 工艺 ACTIVE + 无未确认 CRITICAL）
    pub fn mark_ready(&self, lot_id: &str, actor: &str, role: OperatorRole) -> ApiResult<ProductionLot> {
        require_write(role, "mark_ready")?;
        let lot = self.transition(lot_id, LotStatus::Ready)?;
        self.log_action("MARK_READY", actor, lot_id, None, "批次进入待产");
        Ok(lot)
    }

    /// READY -> IN_PROGRESS，按挂接顺序播种执行记录
    pub fn start_execution(
        &self,
        lot_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<Vec<SubprocessExecution>> {
        require_write(role, "start_execution")?;

        let lot = self.transition(lot_id, LotStatus::InProgress)?;

        let links = self.structure_repo.list_links(&lot.process_id)?;
        let executions: Vec<SubprocessExecution> = links
            .iter()
            .map(|link| SubprocessExecution {
                execution_id: Uuid::new_v4().to_string(),
                lot_id: lot_id.to_string(),
                subprocess_id: link.subprocess_id.clone(),
                seq_no: link.seq_no,
                status: ExecutionStatus::Pending,
                completed_at: None,
                completed_by: None,
            })
            .collect();
        self.tracking_repo.insert_executions(&executions)?;

        info!(lot_id = %lot_id, executions = executions.len(), "批次开工");
        self.log_action(
            "START_EXECUTION",
            actor,
            lot_id,
            Some(json!({ "executions": executions.len() })),
            "批次开工",
        );
        Ok(executions)
    }

    /// 完成单道工序执行
    pub fn complete_execution(
        &self,
        execution_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<SubprocessExecution> {
        require_write(role, "complete_execution")?;

        let execution = self
            .tracking_repo
            .find_execution(execution_id)?
            .ok_or_else(|| ApiError::NotFound(format!("执行记录不存在: {}", execution_id)))?;
        let lot = self.find_lot(&execution.lot_id)?;
        if lot.status != LotStatus::InProgress {
            return Err(ApiError::BusinessRuleViolation(format!(
                "批次 {} 当前为 {} 态,不可完成工序",
                lot.lot_code, lot.status
            )));
        }

        let rows = self.tracking_repo.complete_execution(execution_id, actor)?;
        if rows == 0 {
            return Err(ApiError::Conflict(format!(
                "执行记录 {} 已完成",
                execution_id
            )));
        }

        self.log_action(
            "COMPLETE_EXECUTION",
            actor,
            &execution.lot_id,
            Some(json!({ "execution_id": execution_id, "seq_no": execution.seq_no })),
            "完成工序执行",
        );
        self.tracking_repo
            .find_execution(execution_id)?
            .ok_or_else(|| ApiError::NotFound(format!("执行记录不存在: {}", execution_id)))
    }

    /// IN_PROGRESS -> COMPLETED（全部工序已完成）
    pub fn complete_lot(&self, lot_id: &str, actor: &str, role: OperatorRole) -> ApiResult<ProductionLot> {
        require_write(role, "complete_lot")?;
        let lot = self.transition(lot_id, LotStatus::Completed)?;
        self.log_action("COMPLETE_LOT", actor, lot_id, None, "批次完工");
        Ok(lot)
    }

    /// PLANNING/READY -> CANCELLED（未确认 CRITICAL 告警同样阻断）
    pub fn cancel_lot(&self, lot_id: &str, actor: &str, role: OperatorRole) -> ApiResult<ProductionLot> {
        require_write(role, "cancel_lot")?;
        let lot = self.transition(lot_id, LotStatus::Cancelled)?;
        self.log_action("CANCEL_LOT", actor, lot_id, None, "批次取消");
        Ok(lot)
    }

    /// 删除批次（存在执行记录时拒绝；守卫查询失败时删除同样失败）
    pub fn delete_lot(&self, lot_id: &str, actor: &str, role: OperatorRole) -> ApiResult<()> {
        require_admin(role, "delete_lot")?;

        let lot = self.find_lot(lot_id)?;
        let executions = self.tracking_repo.list_executions(lot_id)?;
        self.lifecycle.validate_delete(lot_id, executions.len())?;

        self.lot_repo.delete_lot(lot_id)?;
        self.log_action(
            "DELETE_LOT",
            actor,
            lot_id,
            Some(json!({ "lot_code": lot.lot_code })),
            &format!("删除批次 {}", lot.lot_code),
        );
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 查询批次列表，可按状态过滤
    pub fn list_lots(&self, status: Option<LotStatus>) -> ApiResult<Vec<ProductionLot>> {
        Ok(self.lot_repo.list(status)?)
    }

    /// 查询批次详情（选型 + 执行记录 + 成本快照）
    pub fn get_lot_detail(&self, lot_id: &str) -> ApiResult<LotDetail> {
        let lot = self.find_lot(lot_id)?;
        let selections = self.tracking_repo.list_selections(lot_id)?;
        let executions = self.tracking_repo.list_executions(lot_id)?;
        Ok(LotDetail {
            lot,
            selections,
            executions,
        })
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn find_lot(&self, lot_id: &str) -> ApiResult<ProductionLot> {
        self.lot_repo
            .find_by_id(lot_id)?
            .ok_or_else(|| ApiError::NotFound(format!("批次不存在: {}", lot_id)))
    }

    /// 校验并执行状态跳转（带前置状态条件，并发下返回冲突）
    fn transition(&self, lot_id: &str, to: LotStatus) -> ApiResult<ProductionLot> {
        let lot = self.find_lot(lot_id)?;
        let ctx = self.build_context(&lot)?;
        self.lifecycle.validate_transition(&ctx, to)?;

        let rows = self.lot_repo.update_status_from(lot_id, lot.status, to)?;
        if rows == 0 {
            return Err(ApiError::Conflict(format!(
                "批次 {} 状态已被并发修改",
                lot.lot_code
            )));
        }
        self.find_lot(lot_id)
    }

    /// 组装状态机守卫上下文
    fn build_context(&self, lot: &ProductionLot) -> ApiResult<TransitionContext> {
        let unacked = self.alert_repo.count_unacked_critical(&lot.lot_id)?;

        let groups = self.structure_repo.list_groups_for_process(&lot.process_id)?;
        let selected: HashMap<String, String> = self
            .tracking_repo
            .list_selections(&lot.lot_id)?
            .into_iter()
            .map(|s| (s.group_id, s.variant_id))
            .collect();
        let unresolved_group_ids: Vec<String> = groups
            .iter()
            .filter(|g| !selected.contains_key(&g.group_id))
            .map(|g| g.group_id.clone())
            .collect();

        let process = self
            .process_repo
            .find_by_id(&lot.process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工艺不存在: {}", lot.process_id)))?;
        let links = self.structure_repo.list_links(&lot.process_id)?;
        let pending = self.tracking_repo.count_pending_executions(&lot.lot_id)?;

        Ok(TransitionContext {
            lot_id: lot.lot_id.clone(),
            current_status: lot.status,
            unacked_critical_alerts: unacked as usize,
            unresolved_group_ids,
            process_is_active: process.is_active(),
            subprocess_count: links.len(),
            pending_execution_count: pending as usize,
        })
    }

    /// 校验并写入一条替代组选型
    fn apply_selection(
        &self,
        lot: &ProductionLot,
        group_id: &str,
        variant_id: &str,
        actor: &str,
    ) -> ApiResult<VariantSelection> {
        let process_groups = self.structure_repo.list_groups_for_process(&lot.process_id)?;
        if !process_groups.iter().any(|g| g.group_id == group_id) {
            return Err(ApiError::InvalidInput(format!(
                "替代组 {} 不属于批次工艺",
                group_id
            )));
        }

        let members = self.structure_repo.list_usages_by_group(group_id)?;
        if !members.iter().any(|m| m.variant_id == variant_id) {
            return Err(ApiError::InvalidInput(format!(
                "物料 {} 不是替代组 {} 的成员",
                variant_id, group_id
            )));
        }

        let selection = VariantSelection {
            selection_id: Uuid::new_v4().to_string(),
            lot_id: lot.lot_id.clone(),
            group_id: group_id.to_string(),
            variant_id: variant_id.to_string(),
            selected_by: actor.to_string(),
            selected_at: Utc::now(),
        };
        self.tracking_repo.upsert_selection(&selection)?;
        Ok(selection)
    }

    /// 重评批次库存告警并落库（已确认的历史告警保留）
    ///
    /// BOM 口径: 非替代组用量恒计入; 替代组用量仅当该成员被选定时计入。
    fn regenerate_alerts(&self, lot: &ProductionLot) -> ApiResult<()> {
        let selected: HashMap<String, String> = self
            .tracking_repo
            .list_selections(&lot.lot_id)?
            .into_iter()
            .map(|s| (s.group_id, s.variant_id))
            .collect();

        let links = self.structure_repo.list_links(&lot.process_id)?;
        let mut bom: HashMap<String, Decimal> = HashMap::new();
        let mut variant_order: Vec<String> = Vec::new();

        for link in &links {
            let usages = self
                .structure_repo
                .list_usages_by_subprocess(&link.subprocess_id)?;
            for usage in usages {
                let applies = match &usage.group_id {
                    None => true,
                    Some(group_id) => {
                        selected.get(group_id).map(String::as_str) == Some(usage.variant_id.as_str())
                    }
                };
                if !applies {
                    continue;
                }
                if !bom.contains_key(&usage.variant_id) {
                    variant_order.push(usage.variant_id.clone());
                }
                *bom.entry(usage.variant_id.clone()).or_insert(Decimal::ZERO) += usage.quantity;
            }
        }

        let variants = self.variant_repo.batch_find_by_ids(&variant_order)?;
        let mut inputs = Vec::with_capacity(variant_order.len());
        for variant_id in &variant_order {
            let variant = variants.get(variant_id).ok_or_else(|| {
                ApiError::NotFound(format!("物料不存在: {}", variant_id))
            })?;
            inputs.push(VariantStockInput {
                variant: variant.clone(),
                unit_quantity: bom[variant_id],
            });
        }

        let evaluations = self.alert_engine.evaluate_lot(lot.quantity, &inputs);

        let default_lead = self
            .config
            .get_default_lead_time_days()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let pricing = self.variant_repo.batch_active_pricing(&variant_order)?;

        let mut alerts: Vec<InventoryAlert> = Vec::new();
        let mut recommendations: Vec<ProcurementRecommendation> = Vec::new();
        for eval in evaluations
            .iter()
            .filter(|e| e.severity != AlertSeverity::Ok)
        {
            let alert = InventoryAlert {
                alert_id: Uuid::new_v4().to_string(),
                lot_id: lot.lot_id.clone(),
                variant_id: eval.variant_id.clone(),
                severity: eval.severity,
                current_stock: eval.current_stock,
                required_qty: eval.required_qty,
                shortfall: eval.shortfall,
                reason: Some(eval.reason.clone()),
                acknowledged: false,
                acknowledged_by: None,
                acknowledged_at: None,
                ack_action: None,
                ack_note: None,
                created_at: Utc::now(),
            };

            let safety_stock = variants
                .get(&eval.variant_id)
                .map(|v| v.safety_stock)
                .unwrap_or(Decimal::ZERO);
            let active = pricing
                .get(&eval.variant_id)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if let Some(reco) = self.alert_engine.build_recommendation(
                &alert.alert_id,
                &lot.lot_id,
                eval,
                safety_stock,
                lot.planned_start_date,
                active,
                default_lead,
            ) {
                recommendations.push(reco);
            }
            alerts.push(alert);
        }

        self.alert_repo
            .replace_lot_alerts(&lot.lot_id, &alerts, &recommendations)?;
        Ok(())
    }
}
