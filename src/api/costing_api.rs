// ==========================================
// 制造追踪与成本核算系统 - 成本核算 API
// ==========================================
// 职责: 组装成本输入（结构 + 活跃报价），调用 CostingEngine
// 红线: 引擎不拼 SQL，全部数据访问在此层完成
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{require_write, ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::costing::ProcessCostReport;
use crate::domain::lot::LotCostSnapshot;
use crate::domain::types::OperatorRole;
use crate::engine::costing::{CostingEngine, ProcessCostInput, SubprocessSection};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::lot_repo::{LotRepository, LotTrackingRepository};
use crate::repository::process_repo::{ProcessRepository, ProcessStructureRepository};
use crate::repository::variant_repo::VariantRepository;

pub struct CostingApi {
    process_repo: Arc<ProcessRepository>,
    structure_repo: Arc<ProcessStructureRepository>,
    variant_repo: Arc<VariantRepository>,
    lot_repo: Arc<LotRepository>,
    tracking_repo: Arc<LotTrackingRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    engine: CostingEngine,
}

impl CostingApi {
    pub fn new(
        process_repo: Arc<ProcessRepository>,
        structure_repo: Arc<ProcessStructureRepository>,
        variant_repo: Arc<VariantRepository>,
        lot_repo: Arc<LotRepository>,
        tracking_repo: Arc<LotTrackingRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            process_repo,
            structure_repo,
            variant_repo,
            lot_repo,
            tracking_repo,
            action_log_repo,
            engine: CostingEngine::new(),
        }
    }

    /// 工艺最坏情况成本报告（逐工序口径 + 告警标记）
    pub fn process_worst_case_report(&self, process_id: &str) -> ApiResult<ProcessCostReport> {
        let input = self.build_cost_input(process_id)?;
        Ok(self.engine.build_process_report(&input))
    }

    /// 重算并落库批次成本快照
    pub fn refresh_lot_cost(
        &self,
        lot_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<LotCostSnapshot> {
        require_write(role, "refresh_lot_cost")?;

        let lot = self
            .lot_repo
            .find_by_id(lot_id)?
            .ok_or_else(|| ApiError::NotFound(format!("批次不存在: {}", lot_id)))?;

        let input = self.build_cost_input(&lot.process_id)?;
        let selections: HashMap<String, String> = self
            .tracking_repo
            .list_selections(lot_id)?
            .into_iter()
            .map(|s| (s.group_id, s.variant_id))
            .collect();

        let snapshot = self
            .engine
            .build_lot_snapshot(&input, &selections, lot.quantity);
        self.lot_repo.update_cost_snapshot(lot_id, &snapshot)?;

        info!(lot_id = %lot_id, total_cost = %snapshot.total_cost, "批次成本快照已刷新");
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: "REFRESH_LOT_COST".to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: Some(lot_id.to_string()),
            process_id: Some(lot.process_id.clone()),
            variant_id: None,
            payload_json: Some(json!({ "total_cost": snapshot.total_cost.to_string() })),
            detail: Some("刷新批次成本快照".to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(lot_id = %lot_id, error = %e, "操作日志写入失败");
        }

        Ok(snapshot)
    }

    // ==========================================
    // 成本输入组装
    // ==========================================

    /// 组装某工艺的完整成本输入（结构 + 全量活跃报价 + 编码映射）
    pub(crate) fn build_cost_input(&self, process_id: &str) -> ApiResult<ProcessCostInput> {
        let process = self
            .process_repo
            .find_by_id(process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工艺不存在: {}", process_id)))?;

        let links = self.structure_repo.list_links(process_id)?;
        let mut sections = Vec::with_capacity(links.len());
        let mut variant_ids: Vec<String> = Vec::new();

        for link in links {
            let subprocess = self
                .process_repo
                .find_subprocess_by_id(&link.subprocess_id)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("工序不存在: {}", link.subprocess_id))
                })?;
            let usages = self
                .structure_repo
                .list_usages_by_subprocess(&link.subprocess_id)?;
            let groups = self
                .structure_repo
                .list_groups_by_subprocess(&link.subprocess_id)?;
            let cost_items = self.structure_repo.list_cost_items(&link.subprocess_id)?;

            for usage in &usages {
                if !variant_ids.contains(&usage.variant_id) {
                    variant_ids.push(usage.variant_id.clone());
                }
            }
            sections.push(SubprocessSection {
                link,
                subprocess,
                usages,
                groups,
                cost_items,
            });
        }

        let overheads = self.structure_repo.list_overheads(process_id)?;
        let pricing = self.variant_repo.batch_active_pricing(&variant_ids)?;
        let variant_codes: HashMap<String, String> = self
            .variant_repo
            .batch_find_by_ids(&variant_ids)?
            .into_iter()
            .map(|(id, v)| (id, v.variant_code))
            .collect();

        Ok(ProcessCostInput {
            process,
            sections,
            overheads,
            pricing,
            variant_codes,
        })
    }
}
