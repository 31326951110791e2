// ==========================================
// 制造追踪与成本核算系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod alert_repo;
pub mod error;
pub mod import_repo;
pub mod lot_repo;
pub mod process_repo;
pub mod variant_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use alert_repo::AlertRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_repo::ImportRepository;
pub use lot_repo::{LotRepository, LotTrackingRepository};
pub use process_repo::{ProcessRepository, ProcessStructureRepository};
pub use variant_repo::VariantRepository;

use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;

// ==========================================
// 行映射辅助
// ==========================================
// 金额/数量列统一存 TEXT 十进制字符串（见 db.rs），
// 这里集中做 TEXT -> Decimal 转换，解析失败按列转换错误上抛。

/// 读取非空 Decimal 列
pub(crate) fn decimal_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    raw.trim().parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
    })
}

/// 读取可空 Decimal 列
pub(crate) fn opt_decimal_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        None => Ok(None),
    }
}

/// 枚举列解析失败时的统一错误
pub(crate) fn enum_column_error(idx: usize, raw: &str, what: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("无法解析{}: {}", what, raw).into(),
    )
}
