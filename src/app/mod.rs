// ==========================================
// 制造追踪与成本核算系统 - 应用层
// ==========================================
// 职责: 组装共享状态与请求处理入口
// ==========================================

pub mod handlers;
pub mod state;

// 重导出
pub use handlers::ApiResponse;
pub use state::{get_default_db_path, AppState};
