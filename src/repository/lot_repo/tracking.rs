// ==========================================
// 制造追踪与成本核算系统 - 批次跟踪仓储
// ==========================================
// 职责: variant_selection / subprocess_execution 表
// 对齐: 组选择按 (lot_id, group_id) 幂等覆盖，
//       执行记录完成更新带 PENDING 前置条件
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::lot::{SubprocessExecution, VariantSelection};
use crate::domain::types::ExecutionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct LotTrackingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LotTrackingRepository {
    /// 创建新的 LotTrackingRepository 实例
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
    // 组选择 (variant_selection)
    // ==========================================

    /// 写入组选择（同一 (批次, 替代组) 重复选择时覆盖）
    pub fn upsert_selection(&self, selection: &VariantSelection) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO variant_selection (
                selection_id, lot_id, group_id, variant_id, selected_by, selected_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(lot_id, group_id) DO UPDATE SET
                variant_id = ?4, selected_by = ?5, selected_at = ?6
            "#,
            params![
                selection.selection_id,
                selection.lot_id,
                selection.group_id,
                selection.variant_id,
                selection.selected_by,
                selection.selected_at.to_rfc3339(),
            ],
        )?;
        Ok(selection.selection_id.clone())
    }

    fn map_selection_row(row: &Row<'_>) -> rusqlite::Result<VariantSelection> {
        Ok(VariantSelection {
            selection_id: row.get(0)?,
            lot_id: row.get(1)?,
            group_id: row.get(2)?,
            variant_id: row.get(3)?,
            selected_by: row.get(4)?,
            selected_at: row
                .get::<_, String>(5)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    const SELECTION_COLUMNS: &'static str =
        "selection_id, lot_id, group_id, variant_id, selected_by, selected_at";

    /// 查询批次的全部组选择
    pub fn list_selections(&self, lot_id: &str) -> RepositoryResult<Vec<VariantSelection>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM variant_selection WHERE lot_id = ?1",
            Self::SELECTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let selections = stmt
            .query_map(params![lot_id], Self::map_selection_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(selections)
    }

    /// 查询批次在某替代组上的选择
    pub fn find_selection(
        &self,
        lot_id: &str,
        group_id: &str,
    ) -> RepositoryResult<Option<VariantSelection>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM variant_selection WHERE lot_id = ?1 AND group_id = ?2",
            Self::SELECTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![lot_id, group_id], Self::map_selection_row) {
            Ok(selection) => Ok(Some(selection)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ==========================================
    // 执行记录 (subprocess_execution)
    // ==========================================

    /// 批量插入执行记录（开工时按工序顺序播种，单事务）
    pub fn insert_executions(
        &self,
        executions: &[SubprocessExecution],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        for exec in executions {
            tx.execute(
                r#"
                INSERT INTO subprocess_execution (
                    execution_id, lot_id, subprocess_id, seq_no, status,
                    completed_at, completed_by
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    exec.execution_id,
                    exec.lot_id,
                    exec.subprocess_id,
                    exec.seq_no,
                    exec.status.to_db_str(),
                    exec.completed_at.map(|ts| ts.to_rfc3339()),
                    exec.completed_by,
                ],
            )?;
        }

        tx.commit()?;
        Ok(executions.len())
    }

    fn map_execution_row(row: &Row<'_>) -> rusqlite::Result<SubprocessExecution> {
        Ok(SubprocessExecution {
            execution_id: row.get(0)?,
            lot_id: row.get(1)?,
            subprocess_id: row.get(2)?,
            seq_no: row.get(3)?,
            status: ExecutionStatus::from_str(&row.get::<_, String>(4)?),
            completed_at: row
                .get::<_, Option<String>>(5)?
                .and_then(|ts| ts.parse::<chrono::DateTime<chrono::Utc>>().ok()),
            completed_by: row.get(6)?,
        })
    }

    const EXECUTION_COLUMNS: &'static str =
        "execution_id, lot_id, subprocess_id, seq_no, status, completed_at, completed_by";

    /// 按执行 ID 查询
    pub fn find_execution(
        &self,
        execution_id: &str,
    ) -> RepositoryResult<Option<SubprocessExecution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM subprocess_execution WHERE execution_id = ?1",
            Self::EXECUTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![execution_id], Self::map_execution_row) {
            Ok(exec) => Ok(Some(exec)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询批次的执行记录（按工序顺序）
    pub fn list_executions(&self, lot_id: &str) -> RepositoryResult<Vec<SubprocessExecution>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM subprocess_execution WHERE lot_id = ?1 ORDER BY seq_no",
            Self::EXECUTION_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let executions = stmt
            .query_map(params![lot_id], Self::map_execution_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(executions)
    }

    /// 完成一条执行记录（带 PENDING 前置条件，返回受影响行数）
    ///
    /// 返回 0 表示记录不存在或已完成，调用方据此报错。
    pub fn complete_execution(
        &self,
        execution_id: &str,
        completed_by: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE subprocess_execution
            SET status = 'COMPLETED', completed_at = ?2, completed_by = ?3
            WHERE execution_id = ?1 AND status = 'PENDING'
            "#,
            params![
                execution_id,
                chrono::Utc::now().to_rfc3339(),
                completed_by,
            ],
        )?;
        Ok(rows)
    }

    /// 统计批次未完成的执行记录数（完工守卫用）
    pub fn count_pending_executions(&self, lot_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subprocess_execution WHERE lot_id = ?1 AND status = 'PENDING'",
            params![lot_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 批次是否存在执行记录（删除守卫用）
    ///
    /// 查询失败必须原样上抛: 守卫拿不到答案时删除不得放行。
    pub fn has_executions(&self, lot_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM subprocess_execution WHERE lot_id = ?1",
            params![lot_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
