// ==========================================
// 制造追踪与成本核算系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository/Engine错误为用户友好的错误消息
// 红线: VIEWER 只读; 删除/配置恢复仅 ADMIN (403)
// ==========================================

use crate::domain::types::OperatorRole;
use crate::engine::lifecycle::LifecycleViolation;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
/// 所有错误信息必须包含显式原因
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入/权限错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    #[error("权限不足: {0}")]
    Forbidden(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("资源冲突: {0}")]
    Conflict(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    /// 批次存在未确认的 CRITICAL 告警，禁止离开 Planning/Ready
    #[error("批次 {lot_id} 存在 {count} 条未确认的 CRITICAL 告警")]
    UnacknowledgedCriticalAlerts { lot_id: String, count: usize },

    /// 批次存在未定型的替代组，禁止 Planning -> Ready
    #[error("存在未定型的替代组: {0:?}")]
    UnresolvedSubstituteGroups(Vec<String>),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定的机器可读错误码（写入响应信封的 error 字段）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            ApiError::UnacknowledgedCriticalAlerts { .. } => "UNACKNOWLEDGED_CRITICAL_ALERTS",
            ApiError::UnresolvedSubstituteGroups(_) => "UNRESOLVED_SUBSTITUTE_GROUPS",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::DatabaseTransactionError(_) => "DATABASE_TRANSACTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP 风格状态码
    /// 400 输入 / 403 权限 / 404 未找到 / 409 冲突 / 422 业务与状态机 / 500 其余
    pub fn http_status(&self) -> u16 {
        match self {
            ApiError::InvalidInput(_) | ApiError::ValidationError(_) => 400,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::BusinessRuleViolation(_)
            | ApiError::InvalidStateTransition { .. }
            | ApiError::UnacknowledgedCriticalAlerts { .. }
            | ApiError::UnresolvedSubstituteGroups(_)
            | ApiError::ImportError(_) => 422,
            ApiError::DatabaseError(_)
            | ApiError::DatabaseConnectionError(_)
            | ApiError::DatabaseTransactionError(_)
            | ApiError::InternalError(_)
            | ApiError::Other(_) => 500,
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 目的: 将Repository层的技术错误转换为用户友好的业务错误
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 数据库错误
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),

            // 约束冲突统一归 409
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::Conflict(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::Conflict(format!("外键约束违反: {}", msg))
            }

            // 业务规则错误
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }

            // 数据质量错误
            RepositoryError::ValidationError(msg) => ApiError::ValidationError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 LifecycleViolation 转换
// 状态机守卫失败映射到 422 族错误
// ==========================================
impl From<LifecycleViolation> for ApiError {
    fn from(err: LifecycleViolation) -> Self {
        match err {
            LifecycleViolation::InvalidTransition { from, to } => {
                ApiError::InvalidStateTransition {
                    from: from.to_string(),
                    to: to.to_string(),
                }
            }
            LifecycleViolation::UnacknowledgedCriticalAlerts { lot_id, count } => {
                ApiError::UnacknowledgedCriticalAlerts { lot_id, count }
            }
            LifecycleViolation::UnresolvedSubstituteGroups(group_ids) => {
                ApiError::UnresolvedSubstituteGroups(group_ids)
            }
            LifecycleViolation::HasExecutions { lot_id } => ApiError::Conflict(format!(
                "批次 {} 已生成工序执行记录,不可删除",
                lot_id
            )),
            other => ApiError::BusinessRuleViolation(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 角色权限校验辅助函数
// ==========================================

/// 业务写操作校验: ADMIN / PLANNER 允许, VIEWER 拒绝
pub fn require_write(role: OperatorRole, operation: &str) -> ApiResult<()> {
    if role.can_write() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "角色 {} 无权执行写操作: {}",
            role, operation
        )))
    }
}

/// 破坏性操作校验（删除、配置恢复）: 仅 ADMIN
pub fn require_admin(role: OperatorRole, operation: &str) -> ApiResult<()> {
    if role.can_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "角色 {} 无权执行管理操作: {}",
            role, operation
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::LotStatus;

    #[test]
    fn test_repository_error_conversion() {
        // NotFound错误转换
        let repo_err = RepositoryError::NotFound {
            entity: "ProductionLot".to_string(),
            id: "LOT-001".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("ProductionLot"));
                assert!(msg.contains("LOT-001"));
            }
            _ => panic!("Expected NotFound"),
        }

        // 唯一约束违反归 409
        let repo_err =
            RepositoryError::UniqueConstraintViolation("process_code=P-001".to_string());
        let api_err: ApiError = repo_err.into();
        assert_eq!(api_err.http_status(), 409);
        assert_eq!(api_err.code(), "CONFLICT");
    }

    #[test]
    fn test_lifecycle_violation_conversion() {
        let api_err: ApiError = LifecycleViolation::InvalidTransition {
            from: LotStatus::Completed,
            to: LotStatus::Planning,
        }
        .into();
        match &api_err {
            ApiError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "COMPLETED");
                assert_eq!(to, "PLANNING");
            }
            _ => panic!("Expected InvalidStateTransition"),
        }
        assert_eq!(api_err.http_status(), 422);

        let api_err: ApiError = LifecycleViolation::UnacknowledgedCriticalAlerts {
            lot_id: "lot-1".to_string(),
            count: 2,
        }
        .into();
        assert_eq!(api_err.code(), "UNACKNOWLEDGED_CRITICAL_ALERTS");
        assert_eq!(api_err.http_status(), 422);

        let api_err: ApiError =
            LifecycleViolation::HasExecutions { lot_id: "lot-1".to_string() }.into();
        assert_eq!(api_err.http_status(), 409);
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ApiError::InvalidInput("x".into()).http_status(), 400);
        assert_eq!(ApiError::ValidationError("x".into()).http_status(), 400);
        assert_eq!(ApiError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(ApiError::NotFound("x".into()).http_status(), 404);
        assert_eq!(ApiError::Conflict("x".into()).http_status(), 409);
        assert_eq!(
            ApiError::BusinessRuleViolation("x".into()).http_status(),
            422
        );
        assert_eq!(ApiError::DatabaseError("x".into()).http_status(), 500);
    }

    #[test]
    fn test_role_guards() {
        assert!(require_write(OperatorRole::Planner, "create_lot").is_ok());
        assert!(require_write(OperatorRole::Admin, "create_lot").is_ok());
        assert!(require_write(OperatorRole::Viewer, "create_lot").is_err());

        assert!(require_admin(OperatorRole::Admin, "delete_lot").is_ok());
        let err = require_admin(OperatorRole::Planner, "delete_lot").unwrap_err();
        assert_eq!(err.http_status(), 403);
    }
}
