// ==========================================
// 制造追踪与成本核算系统 - 生产批次主数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑，状态机守卫在引擎层
// 职责: production_lot 表的增删改查与成本快照落库
// 对齐: 状态更新带前置状态条件，并发下不会跳过守卫
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::lot::{LotCostSnapshot, ProductionLot};
use crate::domain::types::LotStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{enum_column_error, opt_decimal_from_row};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct LotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LotRepository {
    /// 创建新的 LotRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 插入生产批次（初始状态 PLANNING，无成本快照）
    pub fn insert_lot(&self, lot: &ProductionLot) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_lot (
                lot_id, lot_code, process_id, quantity, status,
                planned_start_date, created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                lot.lot_id,
                lot.lot_code,
                lot.process_id,
                lot.quantity.to_string(),
                lot.status.to_db_str(),
                lot.planned_start_date.format("%Y-%m-%d").to_string(),
                lot.created_by,
                lot.created_at.to_rfc3339(),
                lot.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(lot.lot_id.clone())
    }

    /// 带前置状态条件的状态更新
    ///
    /// 只有当前状态等于 expected_from 时才会生效，返回受影响行数。
    /// 返回 0 表示批次不存在或状态已被并发修改，调用方据此报冲突。
    pub fn update_status_from(
        &self,
        lot_id: &str,
        expected_from: LotStatus,
        to: LotStatus,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE production_lot
            SET status = ?3, updated_at = datetime('now')
            WHERE lot_id = ?1 AND status = ?2
            "#,
            params![lot_id, expected_from.to_db_str(), to.to_db_str()],
        )?;
        Ok(rows)
    }

    /// 更新批次基本信息（数量/计划开工日期，仅 PLANNING 态允许，守卫在引擎层）
    pub fn update_plan_fields(
        &self,
        lot_id: &str,
        quantity: rust_decimal::Decimal,
        planned_start_date: NaiveDate,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE production_lot
            SET quantity = ?2, planned_start_date = ?3, updated_at = datetime('now')
            WHERE lot_id = ?1
            "#,
            params![
                lot_id,
                quantity.to_string(),
                planned_start_date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        Ok(rows)
    }

    /// 写入成本快照（五项成本 + 刷新时间整体覆盖）
    pub fn update_cost_snapshot(
        &self,
        lot_id: &str,
        snapshot: &LotCostSnapshot,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE production_lot
            SET material_cost = ?2, labor_cost = ?3, other_item_cost = ?4,
                overhead_cost = ?5, total_cost = ?6, cost_refreshed_at = ?7,
                updated_at = datetime('now')
            WHERE lot_id = ?1
            "#,
            params![
                lot_id,
                snapshot.material_cost.to_string(),
                snapshot.labor_cost.to_string(),
                snapshot.other_item_cost.to_string(),
                snapshot.overhead_cost.to_string(),
                snapshot.total_cost.to_string(),
                snapshot.refreshed_at.to_rfc3339(),
            ],
        )?;
        Ok(rows)
    }

    /// 删除批次及其下属记录（单事务）
    ///
    /// 删除顺序: 采购建议 -> 库存预警 -> 组选择 -> 批次本体。
    /// subprocess_execution 故意不在此删除: 若仍有执行记录，
    /// 外键约束会使整个事务回滚，删除不会部分生效。
    pub fn delete_lot(&self, lot_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            DELETE FROM procurement_recommendation
            WHERE alert_id IN (SELECT alert_id FROM inventory_alert WHERE lot_id = ?1)
            "#,
            params![lot_id],
        )?;
        tx.execute(
            "DELETE FROM inventory_alert WHERE lot_id = ?1",
            params![lot_id],
        )?;
        tx.execute(
            "DELETE FROM variant_selection WHERE lot_id = ?1",
            params![lot_id],
        )?;
        let rows = tx.execute(
            "DELETE FROM production_lot WHERE lot_id = ?1",
            params![lot_id],
        )?;

        tx.commit()?;
        Ok(rows)
    }

    // ==========================================
    // 查询
    // ==========================================

    const LOT_COLUMNS: &'static str = "lot_id, lot_code, process_id, quantity, status, \
         planned_start_date, created_by, created_at, updated_at, \
         material_cost, labor_cost, other_item_cost, overhead_cost, total_cost, cost_refreshed_at";

    fn map_lot_row(row: &Row<'_>) -> rusqlite::Result<ProductionLot> {
        let status_raw: String = row.get(4)?;
        let status = LotStatus::from_str(&status_raw)
            .ok_or_else(|| enum_column_error(4, &status_raw, "批次状态"))?;

        let date_raw: String = row.get(5)?;
        let planned_start_date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        // 成本快照按整体读取: total_cost 与刷新时间同时存在才视为有效快照
        let total_cost = opt_decimal_from_row(row, 13)?;
        let refreshed_raw: Option<String> = row.get(14)?;
        let cost_snapshot = match (total_cost, refreshed_raw) {
            (Some(total), Some(ts)) => Some(LotCostSnapshot {
                material_cost: opt_decimal_from_row(row, 9)?.unwrap_or_default(),
                labor_cost: opt_decimal_from_row(row, 10)?.unwrap_or_default(),
                other_item_cost: opt_decimal_from_row(row, 11)?.unwrap_or_default(),
                overhead_cost: opt_decimal_from_row(row, 12)?.unwrap_or_default(),
                total_cost: total,
                refreshed_at: ts
                    .parse::<chrono::DateTime<chrono::Utc>>()
                    .unwrap_or_else(|_| chrono::Utc::now()),
            }),
            _ => None,
        };

        Ok(ProductionLot {
            lot_id: row.get(0)?,
            lot_code: row.get(1)?,
            process_id: row.get(2)?,
            quantity: crate::repository::decimal_from_row(row, 3)?,
            status,
            planned_start_date,
            cost_snapshot,
            created_by: row.get(6)?,
            created_at: row
                .get::<_, String>(7)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(8)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 按 lot_id 查询批次
    pub fn find_by_id(&self, lot_id: &str) -> RepositoryResult<Option<ProductionLot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_lot WHERE lot_id = ?1",
            Self::LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![lot_id], Self::map_lot_row) {
            Ok(lot) => Ok(Some(lot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 lot_code 查询批次
    pub fn find_by_code(&self, lot_code: &str) -> RepositoryResult<Option<ProductionLot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_lot WHERE lot_code = ?1",
            Self::LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![lot_code], Self::map_lot_row) {
            Ok(lot) => Ok(Some(lot)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询批次列表，可按状态过滤
    pub fn list(&self, status: Option<LotStatus>) -> RepositoryResult<Vec<ProductionLot>> {
        let conn = self.get_conn()?;

        let lots = match status {
            Some(s) => {
                let sql = format!(
                    "SELECT {} FROM production_lot WHERE status = ?1 ORDER BY created_at DESC",
                    Self::LOT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![s.to_db_str()], Self::map_lot_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM production_lot ORDER BY created_at DESC",
                    Self::LOT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], Self::map_lot_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };
        Ok(lots)
    }

    /// 查询某工艺下的全部批次
    pub fn list_by_process(&self, process_id: &str) -> RepositoryResult<Vec<ProductionLot>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_lot WHERE process_id = ?1 ORDER BY created_at DESC",
            Self::LOT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let lots = stmt
            .query_map(params![process_id], Self::map_lot_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lots)
    }

    /// 统计某工艺下的批次数量（工艺删除守卫用）
    pub fn count_by_process(&self, process_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM production_lot WHERE process_id = ?1",
            params![process_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 按状态统计批次数量（看板用）
    pub fn count_by_status(&self) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM production_lot GROUP BY status ORDER BY status",
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(counts)
    }
}
