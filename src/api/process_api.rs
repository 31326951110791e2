// ==========================================
// 制造追踪与成本核算系统 - 工艺 API
// ==========================================
// 职责: 工艺/工序主数据维护、结构编辑（挂接/用料/替代组/成本项）
// 红线: 替代组成员数 >= 2; 存在批次的工艺不可删除
// ==========================================

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::error::{require_admin, require_write, ApiError, ApiResult};
use crate::domain::action_log::ActionLog;
use crate::domain::process::{
    CostItem, OverheadItem, Process, ProcessSubprocessLink, Subprocess, SubstituteGroup,
    VariantUsage,
};
use crate::domain::types::{CostCategory, OperatorRole, ProcessStatus};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::lot_repo::LotRepository;
use crate::repository::process_repo::{ProcessRepository, ProcessStructureRepository};
use crate::repository::variant_repo::VariantRepository;

// ==========================================
// ProcessDetail - 工艺详情（主数据 + 结构）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDetail {
    pub process: Process,
    pub subprocesses: Vec<SubprocessDetail>,
    pub overheads: Vec<OverheadItem>,
}

/// 单个挂接工序的结构明细
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprocessDetail {
    pub link: ProcessSubprocessLink,
    pub subprocess: Subprocess,
    pub usages: Vec<VariantUsage>,
    pub groups: Vec<SubstituteGroup>,
    pub cost_items: Vec<CostItem>,
}

// ==========================================
// ProcessApi
// ==========================================

pub struct ProcessApi {
    process_repo: Arc<ProcessRepository>,
    structure_repo: Arc<ProcessStructureRepository>,
    variant_repo: Arc<VariantRepository>,
    lot_repo: Arc<LotRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl ProcessApi {
    pub fn new(
        process_repo: Arc<ProcessRepository>,
        structure_repo: Arc<ProcessStructureRepository>,
        variant_repo: Arc<VariantRepository>,
        lot_repo: Arc<LotRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            process_repo,
            structure_repo,
            variant_repo,
            lot_repo,
            action_log_repo,
        }
    }

    /// 操作日志写入失败不阻断业务，仅记录告警
    fn log_action(
        &self,
        action_type: &str,
        actor: &str,
        process_id: Option<&str>,
        variant_id: Option<&str>,
        payload: Option<serde_json::Value>,
        detail: &str,
    ) {
        let log = ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            lot_id: None,
            process_id: process_id.map(|s| s.to_string()),
            variant_id: variant_id.map(|s| s.to_string()),
            payload_json: payload,
            detail: Some(detail.to_string()),
        };
        if let Err(e) = self.action_log_repo.insert(&log) {
            warn!(action_type = %action_type, error = %e, "操作日志写入失败");
        }
    }

    // ==========================================
    // 工艺主数据
    // ==========================================

    /// 创建工艺（初始状态 DRAFT）
    pub fn create_process(
        &self,
        process_code: &str,
        process_name: &str,
        category: Option<&str>,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<Process> {
        require_write(role, "create_process")?;

        let code = process_code.trim();
        let name = process_name.trim();
        if code.is_empty() {
            return Err(ApiError::InvalidInput("工艺编码不能为空".to_string()));
        }
        if name.is_empty() {
            return Err(ApiError::InvalidInput("工艺名称不能为空".to_string()));
        }
        if self.process_repo.find_by_code(code)?.is_some() {
            return Err(ApiError::Conflict(format!("工艺编码已存在: {}", code)));
        }

        let now = Utc::now();
        let process = Process {
            process_id: Uuid::new_v4().to_string(),
            process_code: code.to_string(),
            process_name: name.to_string(),
            category: category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()),
            status: ProcessStatus::Draft,
            created_by: actor.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.process_repo.insert_process(&process)?;

        info!(process_id = %process.process_id, process_code = %code, "工艺已创建");
        self.log_action(
            "CREATE_PROCESS",
            actor,
            Some(&process.process_id),
            None,
            Some(json!({ "process_code": code })),
            &format!("创建工艺 {}", code),
        );
        Ok(process)
    }

    /// 更新工艺基本信息
    pub fn update_process(
        &self,
        process_id: &str,
        process_name: &str,
        category: Option<&str>,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<Process> {
        require_write(role, "update_process")?;

        let name = process_name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("工艺名称不能为空".to_string()));
        }
        self.find_process(process_id)?;
        self.process_repo.update_process(process_id, name, category)?;

        self.log_action(
            "UPDATE_PROCESS",
            actor,
            Some(process_id),
            None,
            Some(json!({ "process_name": name })),
            "更新工艺基本信息",
        );
        self.find_process(process_id)
    }

    /// 变更工艺状态
    ///
    /// 合法跳转: DRAFT -> ACTIVE, ACTIVE <-> INACTIVE
    pub fn set_process_status(
        &self,
        process_id: &str,
        status: ProcessStatus,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<Process> {
        require_write(role, "set_process_status")?;

        let process = self.find_process(process_id)?;
        let allowed = matches!(
            (process.status, status),
            (ProcessStatus::Draft, ProcessStatus::Active)
                | (ProcessStatus::Active, ProcessStatus::Inactive)
                | (ProcessStatus::Inactive, ProcessStatus::Active)
        );
        if !allowed {
            return Err(ApiError::InvalidStateTransition {
                from: process.status.to_string(),
                to: status.to_string(),
            });
        }

        self.process_repo.set_status(process_id, status)?;
        self.log_action(
            "SET_PROCESS_STATUS",
            actor,
            Some(process_id),
            None,
            Some(json!({ "from": process.status.to_string(), "to": status.to_string() })),
            &format!("工艺状态 {} -> {}", process.status, status),
        );
        self.find_process(process_id)
    }

    /// 查询工艺列表，可按状态过滤
    pub fn list_processes(&self, status: Option<ProcessStatus>) -> ApiResult<Vec<Process>> {
        Ok(self.process_repo.list(status)?)
    }

    /// 查询工艺详情（主数据 + 挂接结构 + 费用项）
    pub fn get_process_detail(&self, process_id: &str) -> ApiResult<ProcessDetail> {
        let process = self.find_process(process_id)?;
        let links = self.structure_repo.list_links(process_id)?;

        let mut subprocesses = Vec::with_capacity(links.len());
        for link in links {
            let subprocess = self
                .process_repo
                .find_subprocess_by_id(&link.subprocess_id)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("工序不存在: {}", link.subprocess_id))
                })?;
            let usages = self.structure_repo.list_usages_by_subprocess(&link.subprocess_id)?;
            let groups = self.structure_repo.list_groups_by_subprocess(&link.subprocess_id)?;
            let cost_items = self.structure_repo.list_cost_items(&link.subprocess_id)?;
            subprocesses.push(SubprocessDetail {
                link,
                subprocess,
                usages,
                groups,
                cost_items,
            });
        }

        let overheads = self.structure_repo.list_overheads(process_id)?;
        Ok(ProcessDetail {
            process,
            subprocesses,
            overheads,
        })
    }

    /// 删除工艺（存在批次时拒绝）
    pub fn delete_process(
        &self,
        process_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_admin(role, "delete_process")?;

        let process = self.find_process(process_id)?;
        let lot_count = self.lot_repo.count_by_process(process_id)?;
        if lot_count > 0 {
            return Err(ApiError::Conflict(format!(
                "工艺 {} 下存在 {} 个批次,不可删除",
                process.process_code, lot_count
            )));
        }

        self.process_repo.delete_process(process_id)?;
        self.log_action(
            "DELETE_PROCESS",
            actor,
            Some(process_id),
            None,
            Some(json!({ "process_code": process.process_code })),
            &format!("删除工艺 {}", process.process_code),
        );
        Ok(())
    }

    // ==========================================
    // 工序模板
    // ==========================================

    /// 创建工序模板
    pub fn create_subprocess(
        &self,
        subprocess_code: &str,
        subprocess_name: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<Subprocess> {
        require_write(role, "create_subprocess")?;

        let code = subprocess_code.trim();
        let name = subprocess_name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput(
                "工序编码和名称不能为空".to_string(),
            ));
        }
        if self.process_repo.find_subprocess_by_code(code)?.is_some() {
            return Err(ApiError::Conflict(format!("工序编码已存在: {}", code)));
        }

        let now = Utc::now();
        let subprocess = Subprocess {
            subprocess_id: Uuid::new_v4().to_string(),
            subprocess_code: code.to_string(),
            subprocess_name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.process_repo.insert_subprocess(&subprocess)?;

        self.log_action(
            "CREATE_SUBPROCESS",
            actor,
            None,
            None,
            Some(json!({ "subprocess_code": code })),
            &format!("创建工序 {}", code),
        );
        Ok(subprocess)
    }

    /// 查询全部工序模板
    pub fn list_subprocesses(&self) -> ApiResult<Vec<Subprocess>> {
        Ok(self.process_repo.list_subprocesses()?)
    }

    /// 挂接工序到工艺（顺序号自动延续）
    pub fn attach_subprocess(
        &self,
        process_id: &str,
        subprocess_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<ProcessSubprocessLink> {
        require_write(role, "attach_subprocess")?;

        self.find_process(process_id)?;
        self.find_subprocess(subprocess_id)?;

        let existing = self.structure_repo.list_links(process_id)?;
        if existing.iter().any(|l| l.subprocess_id == subprocess_id) {
            return Err(ApiError::Conflict("该工序已挂接到此工艺".to_string()));
        }

        let link = ProcessSubprocessLink {
            link_id: Uuid::new_v4().to_string(),
            process_id: process_id.to_string(),
            subprocess_id: subprocess_id.to_string(),
            seq_no: self.structure_repo.next_seq_no(process_id)?,
        };
        self.structure_repo.insert_link(&link)?;

        self.log_action(
            "ATTACH_SUBPROCESS",
            actor,
            Some(process_id),
            None,
            Some(json!({ "subprocess_id": subprocess_id, "seq_no": link.seq_no })),
            "挂接工序",
        );
        Ok(link)
    }

    /// 解除工艺-工序挂接
    pub fn detach_subprocess(
        &self,
        process_id: &str,
        subprocess_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_write(role, "detach_subprocess")?;

        let rows = self.structure_repo.delete_link(process_id, subprocess_id)?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!(
                "工艺 {} 未挂接工序 {}",
                process_id, subprocess_id
            )));
        }

        self.log_action(
            "DETACH_SUBPROCESS",
            actor,
            Some(process_id),
            None,
            Some(json!({ "subprocess_id": subprocess_id })),
            "解除工序挂接",
        );
        Ok(())
    }

    // ==========================================
    // 用料与替代组
    // ==========================================

    /// 添加工序用料（建组前 group_id 为空）
    pub fn add_variant_usage(
        &self,
        subprocess_id: &str,
        variant_id: &str,
        quantity: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<VariantUsage> {
        require_write(role, "add_variant_usage")?;

        if quantity <= Decimal::ZERO {
            return Err(ApiError::InvalidInput("用量必须大于 0".to_string()));
        }
        self.find_subprocess(subprocess_id)?;
        if self.variant_repo.find_by_id(variant_id)?.is_none() {
            return Err(ApiError::NotFound(format!("物料不存在: {}", variant_id)));
        }

        let usage = VariantUsage {
            usage_id: Uuid::new_v4().to_string(),
            subprocess_id: subprocess_id.to_string(),
            variant_id: variant_id.to_string(),
            quantity,
            group_id: None,
            created_at: Utc::now(),
        };
        self.structure_repo.insert_usage(&usage)?;

        self.log_action(
            "ADD_VARIANT_USAGE",
            actor,
            None,
            Some(variant_id),
            Some(json!({ "subprocess_id": subprocess_id, "quantity": quantity.to_string() })),
            "添加工序用料",
        );
        Ok(usage)
    }

    /// 删除工序用料（替代组成员删除后余员不足 2 时拒绝）
    pub fn remove_variant_usage(
        &self,
        usage_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_write(role, "remove_variant_usage")?;

        let usage = self
            .structure_repo
            .find_usage(usage_id)?
            .ok_or_else(|| ApiError::NotFound(format!("用料记录不存在: {}", usage_id)))?;

        if let Some(group_id) = &usage.group_id {
            let members = self.structure_repo.count_group_members(group_id)?;
            if members <= 2 {
                return Err(ApiError::BusinessRuleViolation(format!(
                    "替代组 {} 删除该成员后少于 2 个成员",
                    group_id
                )));
            }
        }

        self.structure_repo.delete_usage(usage_id)?;
        self.log_action(
            "REMOVE_VARIANT_USAGE",
            actor,
            None,
            Some(&usage.variant_id),
            Some(json!({ "usage_id": usage_id })),
            "删除工序用料",
        );
        Ok(())
    }

    /// 创建替代组并纳入成员用料
    ///
    /// 红线: 成员数必须 >= 2，成员必须属于同一工序且未入组
    pub fn create_substitute_group(
        &self,
        subprocess_id: &str,
        group_name: &str,
        member_usage_ids: &[String],
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<SubstituteGroup> {
        require_write(role, "create_substitute_group")?;

        let name = group_name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("替代组名称不能为空".to_string()));
        }

        // 成员去重后再校验数量,重复 ID 不得折算成多个成员
        let mut member_ids: Vec<String> = member_usage_ids.to_vec();
        member_ids.sort();
        member_ids.dedup();
        if member_ids.len() < 2 {
            return Err(ApiError::BusinessRuleViolation(
                "替代组至少需要 2 个成员".to_string(),
            ));
        }
        self.find_subprocess(subprocess_id)?;

        for usage_id in &member_ids {
            let usage = self
                .structure_repo
                .find_usage(usage_id)?
                .ok_or_else(|| ApiError::NotFound(format!("用料记录不存在: {}", usage_id)))?;
            if usage.subprocess_id != subprocess_id {
                return Err(ApiError::InvalidInput(format!(
                    "用料 {} 不属于工序 {}",
                    usage_id, subprocess_id
                )));
            }
            if usage.group_id.is_some() {
                return Err(ApiError::Conflict(format!(
                    "用料 {} 已属于其他替代组",
                    usage_id
                )));
            }
        }

        let group = SubstituteGroup {
            group_id: Uuid::new_v4().to_string(),
            subprocess_id: subprocess_id.to_string(),
            group_name: name.to_string(),
            created_at: Utc::now(),
        };
        self.structure_repo
            .insert_group_with_members(&group, &member_ids)?;

        self.log_action(
            "CREATE_SUBSTITUTE_GROUP",
            actor,
            None,
            None,
            Some(json!({
                "group_id": group.group_id,
                "subprocess_id": subprocess_id,
                "members": member_ids.len(),
            })),
            &format!("创建替代组 {}", name),
        );
        Ok(group)
    }

    // ==========================================
    // 成本项与费用项
    // ==========================================

    /// 添加工序固定成本项
    pub fn add_cost_item(
        &self,
        subprocess_id: &str,
        item_name: &str,
        category: CostCategory,
        amount: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<CostItem> {
        require_write(role, "add_cost_item")?;

        let name = item_name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("成本项名称不能为空".to_string()));
        }
        if amount < Decimal::ZERO {
            return Err(ApiError::InvalidInput("成本金额不能为负".to_string()));
        }
        self.find_subprocess(subprocess_id)?;

        let item = CostItem {
            item_id: Uuid::new_v4().to_string(),
            subprocess_id: subprocess_id.to_string(),
            item_name: name.to_string(),
            category,
            amount,
            created_at: Utc::now(),
        };
        self.structure_repo.insert_cost_item(&item)?;

        self.log_action(
            "ADD_COST_ITEM",
            actor,
            None,
            None,
            Some(json!({
                "subprocess_id": subprocess_id,
                "category": category.to_string(),
                "amount": amount.to_string(),
            })),
            &format!("添加成本项 {}", name),
        );
        Ok(item)
    }

    /// 删除工序固定成本项
    pub fn remove_cost_item(
        &self,
        item_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_write(role, "remove_cost_item")?;

        let rows = self.structure_repo.delete_cost_item(item_id)?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!("成本项不存在: {}", item_id)));
        }
        self.log_action(
            "REMOVE_COST_ITEM",
            actor,
            None,
            None,
            Some(json!({ "item_id": item_id })),
            "删除成本项",
        );
        Ok(())
    }

    /// 添加工艺费用项
    pub fn add_overhead_item(
        &self,
        process_id: &str,
        item_name: &str,
        amount: Decimal,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<OverheadItem> {
        require_write(role, "add_overhead_item")?;

        let name = item_name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("费用项名称不能为空".to_string()));
        }
        if amount < Decimal::ZERO {
            return Err(ApiError::InvalidInput("费用金额不能为负".to_string()));
        }
        self.find_process(process_id)?;

        let item = OverheadItem {
            overhead_id: Uuid::new_v4().to_string(),
            process_id: process_id.to_string(),
            item_name: name.to_string(),
            amount,
            created_at: Utc::now(),
        };
        self.structure_repo.insert_overhead(&item)?;

        self.log_action(
            "ADD_OVERHEAD_ITEM",
            actor,
            Some(process_id),
            None,
            Some(json!({ "amount": amount.to_string() })),
            &format!("添加费用项 {}", name),
        );
        Ok(item)
    }

    /// 删除工艺费用项
    pub fn remove_overhead_item(
        &self,
        overhead_id: &str,
        actor: &str,
        role: OperatorRole,
    ) -> ApiResult<()> {
        require_write(role, "remove_overhead_item")?;

        let rows = self.structure_repo.delete_overhead(overhead_id)?;
        if rows == 0 {
            return Err(ApiError::NotFound(format!("费用项不存在: {}", overhead_id)));
        }
        self.log_action(
            "REMOVE_OVERHEAD_ITEM",
            actor,
            None,
            None,
            Some(json!({ "overhead_id": overhead_id })),
            "删除费用项",
        );
        Ok(())
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn find_process(&self, process_id: &str) -> ApiResult<Process> {
        self.process_repo
            .find_by_id(process_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工艺不存在: {}", process_id)))
    }

    fn find_subprocess(&self, subprocess_id: &str) -> ApiResult<Subprocess> {
        self.process_repo
            .find_subprocess_by_id(subprocess_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工序不存在: {}", subprocess_id)))
    }
}
