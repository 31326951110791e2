use crate::db::open_sqlite_connection;
use crate::domain::process::{
    CostItem, OverheadItem, ProcessSubprocessLink, SubstituteGroup, VariantUsage,
};
use crate::domain::types::CostCategory;
use crate::repository::decimal_from_row;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ProcessStructureRepository - 工艺结构仓储
// ==========================================
/// 职责: 管理挂接/用料/替代组/成本项/费用项表
/// 红线: 替代组成员数 >= 2 的校验在 API 层，此处只做数据访问
pub struct ProcessStructureRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProcessStructureRepository {
    /// 创建新的 ProcessStructureRepository 实例
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
    // 工艺-工序挂接
    // ==========================================

    /// 挂接工序到工艺
    pub fn insert_link(&self, link: &ProcessSubprocessLink) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO process_subprocess (link_id, process_id, subprocess_id, seq_no)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![link.link_id, link.process_id, link.subprocess_id, link.seq_no],
        )?;
        Ok(link.link_id.clone())
    }

    /// 解除工艺-工序挂接
    pub fn delete_link(&self, process_id: &str, subprocess_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM process_subprocess WHERE process_id = ?1 AND subprocess_id = ?2",
            params![process_id, subprocess_id],
        )?;
        Ok(rows)
    }

    /// 查询工艺的挂接列表（按 seq_no 升序）
    pub fn list_links(&self, process_id: &str) -> RepositoryResult<Vec<ProcessSubprocessLink>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT link_id, process_id, subprocess_id, seq_no
            FROM process_subprocess
            WHERE process_id = ?1
            ORDER BY seq_no
            "#,
        )?;

        let links = stmt
            .query_map(params![process_id], |row| {
                Ok(ProcessSubprocessLink {
                    link_id: row.get(0)?,
                    process_id: row.get(1)?,
                    subprocess_id: row.get(2)?,
                    seq_no: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(links)
    }

    /// 下一个可用的挂接顺序号（当前最大值 + 1，空工艺从 1 起）
    pub fn next_seq_no(&self, process_id: &str) -> RepositoryResult<i32> {
        let conn = self.get_conn()?;
        let max: Option<i32> = conn.query_row(
            "SELECT MAX(seq_no) FROM process_subprocess WHERE process_id = ?1",
            params![process_id],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) + 1)
    }

    // ==========================================
    // 工序用料
    // ==========================================

    fn map_usage_row(row: &Row<'_>) -> rusqlite::Result<VariantUsage> {
        Ok(VariantUsage {
            usage_id: row.get(0)?,
            subprocess_id: row.get(1)?,
            variant_id: row.get(2)?,
            quantity: decimal_from_row(row, 3)?,
            group_id: row.get(4)?,
            created_at: row
                .get::<_, String>(5)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 插入工序用料
    pub fn insert_usage(&self, usage: &VariantUsage) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO variant_usage (usage_id, subprocess_id, variant_id, quantity, group_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                usage.usage_id,
                usage.subprocess_id,
                usage.variant_id,
                usage.quantity.to_string(),
                usage.group_id,
                usage.created_at.to_rfc3339(),
            ],
        )?;
        Ok(usage.usage_id.clone())
    }

    /// 删除工序用料
    pub fn delete_usage(&self, usage_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM variant_usage WHERE usage_id = ?1",
            params![usage_id],
        )?;
        Ok(rows)
    }

    /// 按 usage_id 查询用料
    pub fn find_usage(&self, usage_id: &str) -> RepositoryResult<Option<VariantUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT usage_id, subprocess_id, variant_id, quantity, group_id, created_at
            FROM variant_usage
            WHERE usage_id = ?1
            "#,
        )?;

        match stmt.query_row(params![usage_id], Self::map_usage_row) {
            Ok(usage) => Ok(Some(usage)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某工序的全部用料
    pub fn list_usages_by_subprocess(
        &self,
        subprocess_id: &str,
    ) -> RepositoryResult<Vec<VariantUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT usage_id, subprocess_id, variant_id, quantity, group_id, created_at
            FROM variant_usage
            WHERE subprocess_id = ?1
            ORDER BY created_at, usage_id
            "#,
        )?;

        let usages = stmt
            .query_map(params![subprocess_id], Self::map_usage_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(usages)
    }

    /// 查询某替代组的成员用料
    pub fn list_usages_by_group(&self, group_id: &str) -> RepositoryResult<Vec<VariantUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT usage_id, subprocess_id, variant_id, quantity, group_id, created_at
            FROM variant_usage
            WHERE group_id = ?1
            ORDER BY created_at, usage_id
            "#,
        )?;

        let usages = stmt
            .query_map(params![group_id], Self::map_usage_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(usages)
    }

    /// 设置用料的替代组归属（建组/解组）
    pub fn set_usage_group(&self, usage_id: &str, group_id: Option<&str>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE variant_usage SET group_id = ?2 WHERE usage_id = ?1",
            params![usage_id, group_id],
        )?;
        Ok(rows)
    }

    /// 统计替代组成员数
    pub fn count_group_members(&self, group_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM variant_usage WHERE group_id = ?1",
            params![group_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 替代组
    // ==========================================

    /// 插入替代组
    pub fn insert_group(&self, group: &SubstituteGroup) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO substitute_group (group_id, subprocess_id, group_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                group.group_id,
                group.subprocess_id,
                group.group_name,
                group.created_at.to_rfc3339(),
            ],
        )?;
        Ok(group.group_id.clone())
    }

    /// 建组并纳入成员（单事务,任一成员更新失败整体回滚）
    pub fn insert_group_with_members(
        &self,
        group: &SubstituteGroup,
        member_usage_ids: &[String],
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO substitute_group (group_id, subprocess_id, group_name, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                group.group_id,
                group.subprocess_id,
                group.group_name,
                group.created_at.to_rfc3339(),
            ],
        )?;
        for usage_id in member_usage_ids {
            tx.execute(
                "UPDATE variant_usage SET group_id = ?2 WHERE usage_id = ?1",
                params![usage_id, group.group_id],
            )?;
        }

        tx.commit()?;
        Ok(group.group_id.clone())
    }

    fn map_group_row(row: &Row<'_>) -> rusqlite::Result<SubstituteGroup> {
        Ok(SubstituteGroup {
            group_id: row.get(0)?,
            subprocess_id: row.get(1)?,
            group_name: row.get(2)?,
            created_at: row
                .get::<_, String>(3)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 按 group_id 查询替代组
    pub fn find_group(&self, group_id: &str) -> RepositoryResult<Option<SubstituteGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT group_id, subprocess_id, group_name, created_at
            FROM substitute_group
            WHERE group_id = ?1
            "#,
        )?;

        match stmt.query_row(params![group_id], Self::map_group_row) {
            Ok(group) => Ok(Some(group)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某工序的替代组列表
    pub fn list_groups_by_subprocess(
        &self,
        subprocess_id: &str,
    ) -> RepositoryResult<Vec<SubstituteGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT group_id, subprocess_id, group_name, created_at
            FROM substitute_group
            WHERE subprocess_id = ?1
            ORDER BY created_at, group_id
            "#,
        )?;

        let groups = stmt
            .query_map(params![subprocess_id], Self::map_group_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(groups)
    }

    /// 查询某工艺（经由挂接）覆盖的全部替代组
    ///
    /// 用途: 批次 PLANNING -> READY 的"全部替代组已定型"校验
    pub fn list_groups_for_process(
        &self,
        process_id: &str,
    ) -> RepositoryResult<Vec<SubstituteGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT g.group_id, g.subprocess_id, g.group_name, g.created_at
            FROM substitute_group g
            JOIN process_subprocess ps ON ps.subprocess_id = g.subprocess_id
            WHERE ps.process_id = ?1
            ORDER BY ps.seq_no, g.created_at
            "#,
        )?;

        let groups = stmt
            .query_map(params![process_id], Self::map_group_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(groups)
    }

    // ==========================================
    // 固定成本项 / 工艺费用项
    // ==========================================

    /// 插入工序固定成本项
    pub fn insert_cost_item(&self, item: &CostItem) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO cost_item (item_id, subprocess_id, item_name, category, amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                item.item_id,
                item.subprocess_id,
                item.item_name,
                item.category.to_db_str(),
                item.amount.to_string(),
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(item.item_id.clone())
    }

    /// 删除工序固定成本项
    pub fn delete_cost_item(&self, item_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM cost_item WHERE item_id = ?1", params![item_id])?;
        Ok(rows)
    }

    /// 查询某工序的固定成本项
    pub fn list_cost_items(&self, subprocess_id: &str) -> RepositoryResult<Vec<CostItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT item_id, subprocess_id, item_name, category, amount, created_at
            FROM cost_item
            WHERE subprocess_id = ?1
            ORDER BY created_at, item_id
            "#,
        )?;

        let items = stmt
            .query_map(params![subprocess_id], |row| {
                Ok(CostItem {
                    item_id: row.get(0)?,
                    subprocess_id: row.get(1)?,
                    item_name: row.get(2)?,
                    category: CostCategory::from_str(&row.get::<_, String>(3)?),
                    amount: decimal_from_row(row, 4)?,
                    created_at: row
                        .get::<_, String>(5)?
                        .parse::<chrono::DateTime<chrono::Utc>>()
                        .unwrap_or_else(|_| chrono::Utc::now()),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }

    /// 插入工艺费用项
    pub fn insert_overhead(&self, item: &OverheadItem) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO overhead_item (overhead_id, process_id, item_name, amount, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                item.overhead_id,
                item.process_id,
                item.item_name,
                item.amount.to_string(),
                item.created_at.to_rfc3339(),
            ],
        )?;
        Ok(item.overhead_id.clone())
    }

    /// 删除工艺费用项
    pub fn delete_overhead(&self, overhead_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM overhead_item WHERE overhead_id = ?1",
            params![overhead_id],
        )?;
        Ok(rows)
    }

    /// 查询某工艺的费用项
    pub fn list_overheads(&self, process_id: &str) -> RepositoryResult<Vec<OverheadItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT overhead_id, process_id, item_name, amount, created_at
            FROM overhead_item
            WHERE process_id = ?1
            ORDER BY created_at, overhead_id
            "#,
        )?;

        let items = stmt
            .query_map(params![process_id], |row| {
                Ok(OverheadItem {
                    overhead_id: row.get(0)?,
                    process_id: row.get(1)?,
                    item_name: row.get(2)?,
                    amount: decimal_from_row(row, 3)?,
                    created_at: row
                        .get::<_, String>(4)?
                        .parse::<chrono::DateTime<chrono::Utc>>()
                        .unwrap_or_else(|_| chrono::Utc::now()),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(items)
    }
}
