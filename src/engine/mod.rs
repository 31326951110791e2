// ==========================================
// 制造追踪与成本核算系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod alert;
pub mod costing;
pub mod lifecycle;

// 重导出核心引擎
pub use alert::{AlertEngine, VariantStockInput};
pub use costing::{CostingEngine, ProcessCostInput, SubprocessSection};
pub use lifecycle::{LifecycleEngine, LifecycleViolation, TransitionContext};
