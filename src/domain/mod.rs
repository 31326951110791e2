// ==========================================
// 制造追踪与成本核算系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod alert;
pub mod costing;
pub mod import;
pub mod lot;
pub mod process;
pub mod types;
pub mod variant;

// 重导出核心类型
pub use action_log::ActionLog;
pub use alert::{AlertEvaluation, InventoryAlert, ProcurementRecommendation};
pub use costing::{
    CostItemLine, CostingWarning, GroupCostLine, OverheadCostLine, ProcessCostReport,
    SubprocessCostLine, UsageCostLine,
};
pub use import::{
    ConflictType, DqLevel, DqReport, DqSummary, DqViolation, ImportBatch, ImportConflict,
    PricingImportResult, RawPricingRecord,
};
pub use lot::{LotCostSnapshot, ProductionLot, SubprocessExecution, VariantSelection};
pub use process::{
    CostItem, OverheadItem, Process, ProcessSubprocessLink, Subprocess, SubstituteGroup,
    VariantUsage,
};
pub use types::{
    AckAction, AlertSeverity, CostCategory, ExecutionStatus, LotStatus, OperatorRole,
    PricingStatus, ProcessStatus,
};
pub use variant::{ItemVariant, SupplierPricing};
