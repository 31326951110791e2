// ==========================================
// 制造追踪与成本核算系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 工艺/库存/生产批次的追踪与最坏情况成本核算
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装与请求处理
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AckAction, AlertSeverity, CostCategory, ExecutionStatus, LotStatus, OperatorRole,
    PricingStatus, ProcessStatus,
};

// 领域实体
pub use domain::{
    ActionLog, InventoryAlert, ItemVariant, LotCostSnapshot, Process, ProcessCostReport,
    ProductionLot, ProcurementRecommendation, Subprocess, SupplierPricing,
};

// 引擎
pub use engine::{AlertEngine, CostingEngine, LifecycleEngine};

// API
pub use api::{
    AlertApi, ConfigApi, CostingApi, DashboardApi, ImportApi, LotApi, ProcessApi, VariantApi,
};

// 应用层
pub use app::{AppState, ApiResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "制造追踪与成本核算系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
