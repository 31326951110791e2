use crate::db::open_sqlite_connection;
use crate::domain::process::{Process, Subprocess};
use crate::domain::types::ProcessStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ProcessRepository - 工艺/工序主数据仓储
// ==========================================
/// 职责: 管理 process / subprocess 表的 CRUD 操作
/// 红线: 不含业务逻辑，只负责数据访问
pub struct ProcessRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessRepository {
    /// 创建新的 ProcessRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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
    // Process 写入
    // ==========================================

    /// 插入工艺主数据
    pub fn insert_process(&self, process: &Process) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO process (
                process_id, process_code, process_name, category, status,
                created_by, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                process.process_id,
                process.process_code,
                process.process_name,
                process.category,
                process.status.to_db_str(),
                process.created_by,
                process.created_at.to_rfc3339(),
                process.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(process.process_id.clone())
    }

    /// 更新工艺基本信息（名称/分类）
    pub fn update_process(
        &self,
        process_id: &str,
        process_name: &str,
        category: Option<&str>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE process
            SET process_name = ?2, category = ?3, updated_at = datetime('now')
            WHERE process_id = ?1
            "#,
            params![process_id, process_name, category],
        )?;
        Ok(rows)
    }

    /// 更新工艺状态
    pub fn set_status(&self, process_id: &str, status: ProcessStatus) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE process SET status = ?2, updated_at = datetime('now') WHERE process_id = ?1",
            params![process_id, status.to_db_str()],
        )?;
        Ok(rows)
    }

    /// 删除工艺（结构表经由外键级联删除）
    ///
    /// 说明: 是否允许删除（存在批次引用）由 API 层先行校验
    pub fn delete_process(&self, process_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM process WHERE process_id = ?1",
            params![process_id],
        )?;
        Ok(rows)
    }

    // ==========================================
    // Process 查询
    // ==========================================

    fn map_process_row(row: &Row<'_>) -> rusqlite::Result<Process> {
        Ok(Process {
            process_id: row.get(0)?,
            process_code: row.get(1)?,
            process_name: row.get(2)?,
            category: row.get(3)?,
            status: ProcessStatus::from_str(&row.get::<_, String>(4)?),
            created_by: row.get(5)?,
            created_at: row
                .get::<_, String>(6)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(7)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    const PROCESS_COLUMNS: &'static str =
        "process_id, process_code, process_name, category, status, created_by, created_at, updated_at";

    /// 按 process_id 查询工艺
    pub fn find_by_id(&self, process_id: &str) -> RepositoryResult<Option<Process>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM process WHERE process_id = ?1",
            Self::PROCESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![process_id], Self::map_process_row) {
            Ok(process) => Ok(Some(process)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 process_code 查询工艺
    pub fn find_by_code(&self, process_code: &str) -> RepositoryResult<Option<Process>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM process WHERE process_code = ?1",
            Self::PROCESS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![process_code], Self::map_process_row) {
            Ok(process) => Ok(Some(process)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询工艺列表（可按状态过滤）
    pub fn list(&self, status: Option<ProcessStatus>) -> RepositoryResult<Vec<Process>> {
        let conn = self.get_conn()?;

        let processes = match status {
            Some(s) => {
                let sql = format!(
                    "SELECT {} FROM process WHERE status = ?1 ORDER BY process_code",
                    Self::PROCESS_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![s.to_db_str()], Self::map_process_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM process ORDER BY process_code",
                    Self::PROCESS_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], Self::map_process_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        Ok(processes)
    }

    /// 按状态统计工艺数量（仪表盘用）
    pub fn count_by_status(&self) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT status, COUNT(*) FROM process GROUP BY status ORDER BY status")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(counts)
    }

    // ==========================================
    // Subprocess 写入与查询
    // ==========================================

    /// 插入工序模板
    pub fn insert_subprocess(&self, subprocess: &Subprocess) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO subprocess (
                subprocess_id, subprocess_code, subprocess_name, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                subprocess.subprocess_id,
                subprocess.subprocess_code,
                subprocess.subprocess_name,
                subprocess.created_at.to_rfc3339(),
                subprocess.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(subprocess.subprocess_id.clone())
    }

    fn map_subprocess_row(row: &Row<'_>) -> rusqlite::Result<Subprocess> {
        Ok(Subprocess {
            subprocess_id: row.get(0)?,
            subprocess_code: row.get(1)?,
            subprocess_name: row.get(2)?,
            created_at: row
                .get::<_, String>(3)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
            updated_at: row
                .get::<_, String>(4)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 按 subprocess_id 查询工序
    pub fn find_subprocess_by_id(&self, subprocess_id: &str) -> RepositoryResult<Option<Subprocess>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT subprocess_id, subprocess_code, subprocess_name, created_at, updated_at
            FROM subprocess
            WHERE subprocess_id = ?1
            "#,
        )?;

        match stmt.query_row(params![subprocess_id], Self::map_subprocess_row) {
            Ok(sp) => Ok(Some(sp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 subprocess_code 查询工序
    pub fn find_subprocess_by_code(
        &self,
        subprocess_code: &str,
    ) -> RepositoryResult<Option<Subprocess>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT subprocess_id, subprocess_code, subprocess_name, created_at, updated_at
            FROM subprocess
            WHERE subprocess_code = ?1
            "#,
        )?;

        match stmt.query_row(params![subprocess_code], Self::map_subprocess_row) {
            Ok(sp) => Ok(Some(sp)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部工序模板
    pub fn list_subprocesses(&self) -> RepositoryResult<Vec<Subprocess>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT subprocess_id, subprocess_code, subprocess_name, created_at, updated_at
            FROM subprocess
            ORDER BY subprocess_code
            "#,
        )?;

        let subprocesses = stmt
            .query_map([], Self::map_subprocess_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(subprocesses)
    }
}
