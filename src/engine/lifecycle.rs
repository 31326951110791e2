// ==========================================
// 制造追踪与成本核算系统 - 批次状态机引擎
// ==========================================
// 红线: 状态跳转必须先过跳转表,再过业务守卫,缺一不可
// 红线: 未确认 CRITICAL 告警阻断离开 PLANNING/READY 的一切跳转(含取消)
// 红线: 守卫失败必须携带可解释的违规信息,不得静默吞掉
// ==========================================
// 职责: 校验状态跳转与删除前置条件; 不执行任何写库动作
// 输入: API 层装配好的 TransitionContext (引擎不查库)
// ==========================================

use crate::domain::types::LotStatus;
use thiserror::Error;
use tracing::{debug, warn};

// ==========================================
// 守卫违规
// ==========================================

/// 状态机守卫违规（API 层映射为对应错误码）
#[derive(Debug, Clone, Error)]
pub enum LifecycleViolation {
    #[error("状态跳转不合法: {from} -> {to}")]
    InvalidTransition { from: LotStatus, to: LotStatus },

    #[error("批次 {lot_id} 存在 {count} 条未确认的 CRITICAL 告警")]
    UnacknowledgedCriticalAlerts { lot_id: String, count: usize },

    #[error("存在未定型的替代组: {0:?}")]
    UnresolvedSubstituteGroups(Vec<String>),

    #[error("关联工艺不是 ACTIVE 状态")]
    ProcessNotActive,

    #[error("关联工艺未挂接任何工序")]
    EmptyProcess,

    #[error("批次 {lot_id} 仍有 {pending} 道工序未完成")]
    PendingExecutions { lot_id: String, pending: usize },

    #[error("批次 {lot_id} 已生成工序执行记录,不可删除")]
    HasExecutions { lot_id: String },
}

// ==========================================
// 引擎输入
// ==========================================

/// 状态跳转校验上下文（调用方从各仓储装配）
pub struct TransitionContext {
    pub lot_id: String,
    pub current_status: LotStatus,
    /// 批次未确认的 CRITICAL 告警数
    pub unacked_critical_alerts: usize,
    /// 工艺内尚未定型的替代组 ID
    pub unresolved_group_ids: Vec<String>,
    /// 关联工艺是否 ACTIVE
    pub process_is_active: bool,
    /// 工艺挂接的工序数
    pub subprocess_count: usize,
    /// 未完成的工序执行记录数
    pub pending_execution_count: usize,
}

// ==========================================
// LifecycleEngine - 批次状态机引擎
// ==========================================
pub struct LifecycleEngine;

impl LifecycleEngine {
    /// 创建新的状态机引擎
    pub fn new() -> Self {
        Self
    }

    /// 校验状态跳转: 跳转表 + 业务守卫
    ///
    /// 守卫顺序:
    /// 1. 跳转表结构合法性
    /// 2. 离开 PLANNING/READY 的一切跳转（含取消）被未确认 CRITICAL 告警阻断
    /// 3. PLANNING -> READY 额外要求: 替代组全部定型、工艺 ACTIVE、至少一道工序
    /// 4. IN_PROGRESS -> COMPLETED 额外要求: 全部工序执行完成
    pub fn validate_transition(
        &self,
        ctx: &TransitionContext,
        to: LotStatus,
    ) -> Result<(), LifecycleViolation> {
        let from = ctx.current_status;

        if !from.can_transition(to) {
            warn!(lot_id = %ctx.lot_id, %from, %to, "跳转表拒绝");
            return Err(LifecycleViolation::InvalidTransition { from, to });
        }

        if matches!(from, LotStatus::Planning | LotStatus::Ready)
            && ctx.unacked_critical_alerts > 0
        {
            warn!(
                lot_id = %ctx.lot_id,
                count = ctx.unacked_critical_alerts,
                "未确认 CRITICAL 告警阻断跳转"
            );
            return Err(LifecycleViolation::UnacknowledgedCriticalAlerts {
                lot_id: ctx.lot_id.clone(),
                count: ctx.unacked_critical_alerts,
            });
        }

        if from == LotStatus::Planning && to == LotStatus::Ready {
            if !ctx.unresolved_group_ids.is_empty() {
                return Err(LifecycleViolation::UnresolvedSubstituteGroups(
                    ctx.unresolved_group_ids.clone(),
                ));
            }
            if !ctx.process_is_active {
                return Err(LifecycleViolation::ProcessNotActive);
            }
            if ctx.subprocess_count == 0 {
                return Err(LifecycleViolation::EmptyProcess);
            }
        }

        if from == LotStatus::InProgress
            && to == LotStatus::Completed
            && ctx.pending_execution_count > 0
        {
            return Err(LifecycleViolation::PendingExecutions {
                lot_id: ctx.lot_id.clone(),
                pending: ctx.pending_execution_count,
            });
        }

        debug!(lot_id = %ctx.lot_id, %from, %to, "跳转校验通过");
        Ok(())
    }

    /// 校验批次删除前置条件
    ///
    /// 存在执行记录的批次不可删除（任何状态下均如此）。
    pub fn validate_delete(
        &self,
        lot_id: &str,
        execution_count: usize,
    ) -> Result<(), LifecycleViolation> {
        if execution_count > 0 {
            return Err(LifecycleViolation::HasExecutions {
                lot_id: lot_id.to_string(),
            });
        }
        Ok(())
    }
}

impl Default for LifecycleEngine {
    fn default() -> Self {
        Self::new()
    }
}
