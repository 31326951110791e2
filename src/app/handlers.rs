// ==========================================
// 制造追踪与成本核算系统 - 请求处理层（按域拆分）
// ==========================================
// 职责: 把 API 调用折叠为统一响应信封 {success, data, error, message}
// 红线: handler 只做参数解析与信封包装,业务校验在 API 层
// ==========================================

mod alert;
mod common;
mod config;
mod costing;
mod dashboard;
mod import;
mod lot;
mod process;
mod variant;

pub use alert::*;
pub use common::{fail, ok, respond, ApiResponse, ErrorBody};
pub use config::*;
pub use costing::*;
pub use dashboard::*;
pub use import::*;
pub use lot::*;
pub use process::*;
pub use variant::*;
