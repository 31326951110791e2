// ==========================================
// 制造追踪与成本核算系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供请求处理层调用
// 红线: 参数校验/权限校验/操作日志在此层收口
// ==========================================

pub mod alert_api;
pub mod config_api;
pub mod costing_api;
pub mod dashboard_api;
pub mod error;
pub mod import_api;
pub mod lot_api;
pub mod process_api;
pub mod variant_api;

// 重导出核心类型
pub use alert_api::AlertApi;
pub use config_api::ConfigApi;
pub use costing_api::CostingApi;
pub use dashboard_api::{DashboardApi, DashboardSummary};
pub use error::{require_admin, require_write, ApiError, ApiResult};
pub use import_api::ImportApi;
pub use lot_api::{LotApi, LotDetail};
pub use process_api::{ProcessApi, ProcessDetail, SubprocessDetail};
pub use variant_api::{VariantApi, VariantDetail};
