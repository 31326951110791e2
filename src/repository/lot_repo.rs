// ==========================================
// 制造追踪与成本核算系统 - 生产批次仓储
// ==========================================
// 职责: 声明 lot_repo 子模块并导出仓储类型
// ==========================================

mod core;
mod tracking;


pub use core::LotRepository;
pub use tracking::LotTrackingRepository;
