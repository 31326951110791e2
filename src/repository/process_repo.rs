// ==========================================
// 制造追踪与成本核算系统 - 工艺数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================

mod master;
mod structure;

#[cfg(test)]
mod tests;

pub use master::ProcessRepository;
pub use structure::ProcessStructureRepository;
