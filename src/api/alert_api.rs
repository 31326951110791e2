// ==========================================
// 制造追踪与成本核算系统 - 库存告警 API
// ==========================================
// 职责: 告警查询/确认、采购建议查询
// 红线: 确认是单次动作,重复确认报冲突
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::api::error::{require_write, ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::alert::{InventoryAlert, ProcurementRecommendation};
use crate::domain::types::{AckAction, AlertSeverity, OperatorRole};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::alert_repo::AlertRepository;

pub struct AlertApi {
    alert_repo: Arc<AlertRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl AlertApi {
    pub fn new(
        alert_repo: Arc<AlertRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            alert_repo,
            action_log_repo,
        }
    }

    /// 组合条件查询告警（批次/级别/仅未确认）
    pub fn list_alerts(
        &self,
        lot_id: Option<&str>,
        severity: Option<AlertSeverity>,
        unacknowledged_only: bool,
    ) -> ApiResult<Vec<InventoryAlert>> {
        Ok(self.alert_repo.list(lot_id, severity, unacknowledged_only)?)
    }

    /// 确认告警（记录动作与备注）
    pub fn acknowledge_alert(
        &self,
        alert_id: &str,
        action: AckAction,
        note: Option<&str>,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<InventoryAlert> {
        require_write(role, "acknowledge_alert")?;

        let alert = self
            .alert_repo
            .find_by_id(alert_id)?
            .ok_or_else(|| ApiError::NotFound(format!("告警不存在: {}", alert_id)))?;

        let rows = self.alert_repo.acknowledge(alert_id, actor, action, note)?;
        if rows == 0 {
            return Err(ApiError::Conflict(format!("告警 {} 已被确认", alert_id)));
        }

        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: "ACKNOWLEDGE_ALERT".to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: Some(alert.lot_id.clone()),
            process_id: None,
            variant_id: Some(alert.variant_id.clone()),
            payload_json: Some(json!({
                "alert_id": alert_id,
                "severity": alert.severity.to_string(),
                "action": action.to_string(),
            })),
            detail: Some("确认库存告警".to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(alert_id = %alert_id, error = %e, "操作日志写入失败");
        }

        self.alert_repo
            .find_by_id(alert_id)?
            .ok_or_else(|| ApiError::NotFound(format!("告警不存在: {}", alert_id)))
    }

    /// 查询采购建议，可按批次过滤
    pub fn list_recommendations(
        &self,
        lot_id: Option<&str>,
    ) -> ApiResult<Vec<ProcurementRecommendation>> {
        Ok(self.alert_repo.list_recommendations(lot_id)?)
    }

    /// 统计批次未确认的 CRITICAL 告警数
    pub fn count_unacknowledged_critical(&self, lot_id: &str) -> ApiResult<i64> {
        Ok(self.alert_repo.count_unacked_critical(lot_id)?)
    }
}
