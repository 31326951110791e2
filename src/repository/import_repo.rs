// ==========================================
// 制造追踪与成本核算系统 - 报价导入仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: import_batch / import_conflict 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{ConflictType, ImportBatch, ImportConflict};
use crate::repository::enum_column_error;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ImportRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRepository {
    /// 创建新的 ImportRepository 实例
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
    // 导入批次
    // ==========================================

    /// 插入导入批次记录
    pub fn insert_batch(&self, batch: &ImportBatch) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO import_batch (
                batch_id, file_name, file_path, total_rows, success_rows,
                blocked_rows, warning_rows, conflict_rows, imported_at,
                imported_by, elapsed_ms, dq_report_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                batch.batch_id,
                batch.file_name,
                batch.file_path,
                batch.total_rows,
                batch.success_rows,
                batch.blocked_rows,
                batch.warning_rows,
                batch.conflict_rows,
                batch.imported_at.map(|ts| ts.to_rfc3339()),
                batch.imported_by,
                batch.elapsed_ms,
                batch.dq_report_json,
            ],
        )?;
        Ok(batch.batch_id.clone())
    }

    const BATCH_COLUMNS: &'static str = "batch_id, file_name, file_path, total_rows, success_rows, \
         blocked_rows, warning_rows, conflict_rows, imported_at, imported_by, elapsed_ms, dq_report_json";

    fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<ImportBatch> {
        Ok(ImportBatch {
            batch_id: row.get(0)?,
            file_name: row.get(1)?,
            file_path: row.get(2)?,
            total_rows: row.get(3)?,
            success_rows: row.get(4)?,
            blocked_rows: row.get(5)?,
            warning_rows: row.get(6)?,
            conflict_rows: row.get(7)?,
            imported_at: row
                .get::<_, Option<String>>(8)?
                .and_then(|ts| ts.parse::<chrono::DateTime<chrono::Utc>>().ok()),
            imported_by: row.get(9)?,
            elapsed_ms: row.get(10)?,
            dq_report_json: row.get(11)?,
        })
    }

    /// 按 batch_id 查询批次
    pub fn find_batch(&self, batch_id: &str) -> RepositoryResult<Option<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batch WHERE batch_id = ?1",
            Self::BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![batch_id], Self::map_batch_row) {
            Ok(batch) => Ok(Some(batch)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询导入批次列表（时间倒序）
    pub fn list_batches(&self, limit: i32) -> RepositoryResult<Vec<ImportBatch>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_batch ORDER BY imported_at DESC LIMIT ?1",
            Self::BATCH_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let batches = stmt
            .query_map(params![limit], Self::map_batch_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(batches)
    }

    // ==========================================
    // 导入冲突
    // ==========================================

    /// 批量插入冲突记录（单事务）
    pub fn insert_conflicts(&self, conflicts: &[ImportConflict]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        for conflict in conflicts {
            tx.execute(
                r#"
                INSERT INTO import_conflict (
                    conflict_id, batch_id, row_number, variant_code, conflict_type,
                    raw_data, reason, resolved, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
                "#,
                params![
                    conflict.conflict_id,
                    conflict.batch_id,
                    conflict.row_number as i64,
                    conflict.variant_code,
                    conflict.conflict_type.to_db_str(),
                    conflict.raw_data,
                    conflict.reason,
                    conflict.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(conflicts.len())
    }

    const CONFLICT_COLUMNS: &'static str = "conflict_id, batch_id, row_number, variant_code, \
         conflict_type, raw_data, reason, resolved, resolved_by, resolved_at, created_at";

    fn map_conflict_row(row: &Row<'_>) -> rusqlite::Result<ImportConflict> {
        let type_raw: String = row.get(4)?;
        let conflict_type = ConflictType::from_str(&type_raw)
            .ok_or_else(|| enum_column_error(4, &type_raw, "冲突类型"))?;

        Ok(ImportConflict {
            conflict_id: row.get(0)?,
            batch_id: row.get(1)?,
            row_number: row.get::<_, i64>(2)? as usize,
            variant_code: row.get(3)?,
            conflict_type,
            raw_data: row.get(5)?,
            reason: row.get(6)?,
            resolved: row.get::<_, i64>(7)? != 0,
            resolved_by: row.get(8)?,
            resolved_at: row
                .get::<_, Option<String>>(9)?
                .and_then(|ts| ts.parse::<chrono::DateTime<chrono::Utc>>().ok()),
            created_at: row
                .get::<_, String>(10)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 按 conflict_id 查询冲突
    pub fn find_conflict(&self, conflict_id: &str) -> RepositoryResult<Option<ImportConflict>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM import_conflict WHERE conflict_id = ?1",
            Self::CONFLICT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![conflict_id], Self::map_conflict_row) {
            Ok(conflict) => Ok(Some(conflict)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询冲突列表（可按批次过滤，未处理优先）
    pub fn list_conflicts(
        &self,
        batch_id: Option<&str>,
        include_resolved: bool,
    ) -> RepositoryResult<Vec<ImportConflict>> {
        let conn = self.get_conn()?;

        let mut sql = format!("SELECT {} FROM import_conflict WHERE 1=1", Self::CONFLICT_COLUMNS);
        if batch_id.is_some() {
            sql.push_str(" AND batch_id = ?1");
        }
        if !include_resolved {
            sql.push_str(" AND resolved = 0");
        }
        sql.push_str(" ORDER BY created_at DESC, row_number");

        let mut stmt = conn.prepare(&sql)?;
        let conflicts = match batch_id {
            Some(id) => stmt
                .query_map(params![id], Self::map_conflict_row)?
                .collect::<SqliteResult<Vec<_>>>()?,
            None => stmt
                .query_map([], Self::map_conflict_row)?
                .collect::<SqliteResult<Vec<_>>>()?,
        };
        Ok(conflicts)
    }

    /// 标记冲突已处理（带未处理前置条件，返回受影响行数）
    pub fn resolve_conflict(
        &self,
        conflict_id: &str,
        resolved_by: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE import_conflict
            SET resolved = 1, resolved_by = ?2, resolved_at = ?3
            WHERE conflict_id = ?1 AND resolved = 0
            "#,
            params![conflict_id, resolved_by, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn setup_repo() -> ImportRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ImportRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make_batch() -> ImportBatch {
        ImportBatch {
            batch_id: Uuid::new_v4().to_string(),
            file_name: Some("pricing.csv".to_string()),
            file_path: Some("/tmp/pricing.csv".to_string()),
            total_rows: 10,
            success_rows: 8,
            blocked_rows: 1,
            warning_rows: 2,
            conflict_rows: 1,
            imported_at: Some(Utc::now()),
            imported_by: Some("测试员".to_string()),
            elapsed_ms: Some(42),
            dq_report_json: None,
        }
    }

    #[test]
    fn test_batch_roundtrip() {
        let repo = setup_repo();
        let batch = make_batch();
        repo.insert_batch(&batch).unwrap();

        let found = repo.find_batch(&batch.batch_id).unwrap().unwrap();
        assert_eq!(found.total_rows, 10);
        assert_eq!(found.success_rows, 8);
        assert_eq!(found.conflict_rows, 1);
    }

    #[test]
    fn test_conflict_resolve_is_idempotent_guarded() {
        let repo = setup_repo();
        let batch = make_batch();
        repo.insert_batch(&batch).unwrap();

        let conflict = ImportConflict {
            conflict_id: Uuid::new_v4().to_string(),
            batch_id: batch.batch_id.clone(),
            row_number: 3,
            variant_code: Some("V-MISSING".to_string()),
            conflict_type: ConflictType::UnknownVariantCode,
            raw_data: r#"{"variant_code":"V-MISSING"}"#.to_string(),
            reason: "物料编码不存在".to_string(),
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        };
        repo.insert_conflicts(std::slice::from_ref(&conflict)).unwrap();

        // 首次处理生效
        assert_eq!(repo.resolve_conflict(&conflict.conflict_id, "管理员").unwrap(), 1);
        // 二次处理带前置条件，返回 0
        assert_eq!(repo.resolve_conflict(&conflict.conflict_id, "管理员").unwrap(), 0);

        let unresolved = repo.list_conflicts(Some(&batch.batch_id), false).unwrap();
        assert!(unresolved.is_empty());
        let all = repo.list_conflicts(Some(&batch.batch_id), true).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].resolved);
    }
}
