// ==========================================
// 制造追踪与成本核算系统 - 配置 API
// ==========================================
// 职责: 配置读写、快照导出/恢复
// 红线: 快照恢复为破坏性操作,仅 ADMIN
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{require_admin, require_write, ApiError, ApiResult};
use crate::config::config_manager::{config_keys, ConfigManager};
use crate::domain::action_log::ActionLog;
use crate::domain::types::OperatorRole;
use crate::repository::action_log_repo::ActionLogRepository;

pub struct ConfigApi {
    config: Arc<ConfigManager>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ConfigApi {
    pub fn new(config: Arc<ConfigManager>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            config,
            action_log_repo,
        }
    }

    fn log_action(&self, action_type: &str, actor: &str, payload: serde_json::Value, detail: &str) {
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: None,
            process_id: None,
            variant_id: None,
            payload_json: Some(payload),
            detail: Some(detail.to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(action_type = %action_type, error = %e, "操作日志写入失败");
        }
    }

    /// 查询全量配置（键 -> 值）
    pub fn list_configs(&self) -> ApiResult<HashMap<String, String>> {
        let snapshot = self
            .config
            .get_config_snapshot()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        serde_json::from_str(&snapshot)
            .map_err(|e| ApiError::InternalError(format!("配置快照解析失败: {}", e)))
    }

    /// 查询单个配置值
    pub fn get_config(&self, key: &str) -> ApiResult<Option<String>> {
        self.config
            .get_global_config_value(key)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// 更新配置值（仅限已知配置键）
    pub fn update_config(
        &self,
        key: &str,
        value: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_write(role, "update_config")?;

        let known = config_keys::DEFAULTS.iter().any(|(k, _)| *k == key);
        if !known {
            return Err(ApiError::InvalidInput(format!("未知配置键: {}", key)));
        }
        if value.trim().is_empty() {
            return Err(ApiError::InvalidInput("配置值不能为空".to_string()));
        }

        self.config
            .set_config_value(key, value.trim(), actor)
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!(config_key = %key, "配置已更新");
        self.log_action(
            "UPDATE_CONFIG",
            actor,
            json!({ "key": key, "value": value.trim() }),
            &format!("更新配置 {}", key),
        );
        Ok(())
    }

    /// 导出配置快照（JSON）
    pub fn get_config_snapshot(&self) -> ApiResult<String> {
        self.config
            .get_config_snapshot()
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// 从快照恢复配置（整体覆盖）
    pub fn restore_config_snapshot(
        &self,
        snapshot_json: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<usize> {
        require_admin(role, "restore_config_snapshot")?;

        let restored = self
            .config
            .restore_config_from_snapshot(snapshot_json)
            .map_err(|e| ApiError::ValidationError(format!("快照恢复失败: {}", e)))?;

        info!(restored, "配置已从快照恢复");
        self.log_action(
            "RESTORE_CONFIG_SNAPSHOT",
            actor,
            json!({ "restored": restored }),
            "从快照恢复配置",
        );
        Ok(restored)
    }
}
