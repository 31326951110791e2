// ==========================================
// 制造追踪与成本核算系统 - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 约束: action_log 无外键,业务实体删除后日志仍可追溯
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
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
    // 写入操作
    // ==========================================

    /// 插入操作日志
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, action_ts, actor,
                lot_id, process_id, variant_id, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                log.actor,
                log.lot_id,
                log.process_id,
                log.variant_id,
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    const COLUMNS: &'static str =
        "action_id, action_type, action_ts, actor, lot_id, process_id, variant_id, payload_json, detail";

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ActionLog> {
        let ts_raw: String = row.get(2)?;
        let action_ts = NaiveDateTime::parse_from_str(&ts_raw, "%Y-%m-%d %H:%M:%S")
            .unwrap_or_else(|_| chrono::Local::now().naive_local());

        let payload_raw: Option<String> = row.get(7)?;
        let payload_json = payload_raw.and_then(|s| serde_json::from_str(&s).ok());

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts,
            actor: row.get(3)?,
            lot_id: row.get(4)?,
            process_id: row.get(5)?,
            variant_id: row.get(6)?,
            payload_json,
            detail: row.get(8)?,
        })
    }

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_id = ?1",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![action_id], Self::map_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某批次的操作日志（时间倒序）
    pub fn find_by_lot(&self, lot_id: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE lot_id = ?1 ORDER BY action_ts DESC LIMIT ?2",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![lot_id, limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询某工艺的操作日志（时间倒序）
    pub fn find_by_process(&self, process_id: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE process_id = ?1 ORDER BY action_ts DESC LIMIT ?2",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![process_id, limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询最近的操作日志（看板用，时间倒序）
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log ORDER BY action_ts DESC LIMIT ?1",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }

    /// 按操作类型查询日志（时间倒序）
    pub fn find_by_action_type(
        &self,
        action_type: &str,
        limit: i32,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM action_log WHERE action_type = ?1 ORDER BY action_ts DESC LIMIT ?2",
            Self::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![action_type, limit], Self::map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn setup_repo() -> ActionLogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ActionLogRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make_log(action_type: &str, lot_id: Option<&str>) -> ActionLog {
        ActionLog {
            action_id: Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: chrono::Local::now().naive_local(),
            actor: "测试员".to_string(),
            lot_id: lot_id.map(|s| s.to_string()),
            process_id: None,
            variant_id: None,
            payload_json: Some(json!({"quantity": "10"})),
            detail: Some("单元测试日志".to_string()),
        }
    }

    #[test]
    fn test_insert_and_find_by_id() {
        let repo = setup_repo();
        let log = make_log("CREATE_LOT", Some("lot-1"));

        repo.insert(&log).unwrap();

        let found = repo.find_by_id(&log.action_id).unwrap().unwrap();
        assert_eq!(found.action_type, "CREATE_LOT");
        assert_eq!(found.lot_id.as_deref(), Some("lot-1"));
        assert_eq!(found.payload_json, Some(json!({"quantity": "10"})));
    }

    #[test]
    fn test_find_by_lot_filters_other_lots() {
        let repo = setup_repo();
        repo.insert(&make_log("CREATE_LOT", Some("lot-A"))).unwrap();
        repo.insert(&make_log("MARK_READY", Some("lot-A"))).unwrap();
        repo.insert(&make_log("CREATE_LOT", Some("lot-B"))).unwrap();

        let logs = repo.find_by_lot("lot-A", 10).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.lot_id.as_deref() == Some("lot-A")));
    }

    #[test]
    fn test_find_recent_respects_limit() {
        let repo = setup_repo();
        for i in 0..5 {
            repo.insert(&make_log(&format!("ACTION_{}", i), None)).unwrap();
        }

        let logs = repo.find_recent(3).unwrap();
        assert_eq!(logs.len(), 3);
    }
}
