// ==========================================
// 制造追踪与成本核算系统 - 看板 API
// ==========================================
// 职责: 汇总统计（告警/批次/工艺）与最近操作日志
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::alert_repo::AlertRepository;
use crate::repository::lot_repo::LotRepository;
use crate::repository::process_repo::ProcessRepository;

// ==========================================
// DashboardSummary - 看板汇总
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    /// 未确认告警数（按级别）
    pub alert_counts: HashMap<String, i64>,
    /// 批次数（按状态）
    pub lot_counts: HashMap<String, i64>,
    /// 工艺数（按状态）
    pub process_counts: HashMap<String, i64>,
    /// 最近操作日志（时间倒序）
    pub recent_actions: Vec<ActionLog>,
}

pub struct DashboardApi {
    alert_repo: Arc<AlertRepository>,
    lot_repo: Arc<LotRepository>,
    process_repo: Arc<ProcessRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config: Arc<ConfigManager>,
}

impl DashboardApi {
    pub fn new(
        alert_repo: Arc<AlertRepository>,
        lot_repo: Arc<LotRepository>,
        process_repo: Arc<ProcessRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config: Arc<ConfigManager>,
    ) -> Self {
        Self {
            alert_repo,
            lot_repo,
            process_repo,
            action_log_repo,
            config,
        }
    }

    /// 看板汇总（单次调用取齐四块数据）
    pub fn get_summary(&self) -> ApiResult<DashboardSummary> {
        Ok(DashboardSummary {
            alert_counts: self.alert_counts_by_severity()?,
            lot_counts: self.lot_counts_by_status()?,
            process_counts: self.process_counts_by_status()?,
            recent_actions: self.recent_actions()?,
        })
    }

    /// 未确认告警数（按级别）
    pub fn alert_counts_by_severity(&self) -> ApiResult<HashMap<String, i64>> {
        Ok(self
            .alert_repo
            .count_unacknowledged_by_severity()?
            .into_iter()
            .collect())
    }

    /// 批次数（按状态）
    pub fn lot_counts_by_status(&self) -> ApiResult<HashMap<String, i64>> {
        Ok(self.lot_repo.count_by_status()?.into_iter().collect())
    }

    /// 工艺数（按状态）
    pub fn process_counts_by_status(&self) -> ApiResult<HashMap<String, i64>> {
        Ok(self.process_repo.count_by_status()?.into_iter().collect())
    }

    /// 最近操作日志（条数上限由配置决定）
    pub fn recent_actions(&self) -> ApiResult<Vec<ActionLog>> {
        let limit = self
            .config
            .get_recent_actions_limit()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        Ok(self.action_log_repo.find_recent(limit)?)
    }
}
