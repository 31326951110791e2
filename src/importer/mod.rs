// ==========================================
// 制造追踪与成本核算系统 - 导入层
// ==========================================
// 职责: 供应商报价单导入,生成内部报价数据
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod pricing_importer_impl;
pub mod pricing_importer_trait;

// 重导出核心类型
pub use conflict_handler::PricingConflictHandler;
pub use data_cleaner::PricingDataCleaner;
pub use dq_validator::PricingDqValidator;
pub use error::{ImportError, ImportResult};
pub use field_mapper::PricingFieldMapper;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use pricing_importer_impl::PricingImporterImpl;

// 重导出 Trait 接口
pub use pricing_importer_trait::{
    ConflictHandler, DataCleaner, DqValidator, FieldMapper, FileParser, PricingImporter,
};
