// ==========================================
// 制造追踪与成本核算系统 - 报价导入 API
// ==========================================
// 职责: 触发导入流水线、批次与冲突查询、冲突处理
// ==========================================

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{require_write, ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::action_log::ActionLog;
use crate::domain::import::{ImportBatch, ImportConflict, PricingImportResult};
use crate::domain::types::OperatorRole;
use crate::importer::pricing_importer_impl::PricingImporterImpl;
use crate::importer::pricing_importer_trait::PricingImporter;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::import_repo::ImportRepository;

pub struct ImportApi {
    importer: PricingImporterImpl<ConfigManager>,
    import_repo: Arc<ImportRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ImportApi {
    pub fn new(
        importer: PricingImporterImpl<ConfigManager>,
        import_repo: Arc<ImportRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            importer,
            import_repo,
            action_log_repo,
        }
    }

    /// 导入供应商报价文件（CSV / Excel）
    pub async fn import_pricing_file(
        &self,
        file_path: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<PricingImportResult> {
        require_write(role, "import_pricing_file")?;

        if file_path.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件路径不能为空".to_string()));
        }

        let result = self
            .importer
            .import_file(file_path, actor)
            .await
            .map_err(|e| ApiError::ImportError(e.to_string()))?;

        info!(
            batch_id = %result.batch.batch_id,
            total = result.batch.total_rows,
            success = result.batch.success_rows,
            "报价导入完成"
        );
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: "IMPORT_PRICING".to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: None,
            process_id: None,
            variant_id: None,
            payload_json: Some(json!({
                "batch_id": result.batch.batch_id,
                "total_rows": result.batch.total_rows,
                "success_rows": result.batch.success_rows,
                "blocked_rows": result.batch.blocked_rows,
                "conflict_rows": result.batch.conflict_rows,
            })),
            detail: Some(format!("导入报价文件 {}", file_path)),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(error = %e, "操作日志写入失败");
        }

        Ok(result)
    }

    /// 查询导入批次历史（时间倒序）
    pub fn list_import_batches(&self, limit: i32) -> ApiResult<Vec<ImportBatch>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.import_repo.list_batches(limit)?)
    }

    /// 查询导入冲突（可按批次过滤）
    pub fn list_import_conflicts(
        &self,
        batch_id: Option<&str>,
        include_resolved: bool,
    ) -> ApiResult<Vec<ImportConflict>> {
        Ok(self.import_repo.list_conflicts(batch_id, include_resolved)?)
    }

    /// 标记冲突已处理
    pub fn resolve_import_conflict(
        &self,
        conflict_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ImportConflict> {
        require_write(role, "resolve_import_conflict")?;

        let conflict = self
            .import_repo
            .find_conflict(conflict_id)?
            .ok_or_else(|| ApiError::NotFound(format!("冲突记录不存在: {}", conflict_id)))?;

        let rows = self.import_repo.resolve_conflict(conflict_id, actor)?;
        if rows == 0 {
            return Err(ApiError::Conflict(format!(
                "冲突 {} 已被处理",
                conflict_id
            )));
        }

        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: "RESOLVE_IMPORT_CONFLICT".to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: None,
            process_id: None,
            variant_id: None,
            payload_json: Some(json!({
                "conflict_id": conflict_id,
                "batch_id": conflict.batch_id,
                "conflict_type": conflict.conflict_type.to_db_str(),
            })),
            detail: Some("处理导入冲突".to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(conflict_id = %conflict_id, error = %e, "操作日志写入失败");
        }

        self.import_repo
            .find_conflict(conflict_id)?
            .ok_or_else(|| ApiError::NotFound(format!("冲突记录不存在: {}", conflict_id)))
    }
}
