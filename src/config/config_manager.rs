// ==========================================
// 制造追踪与成本核算系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope, 当前仅 global)
// 红线: 缺失配置一律回退默认值, 不得让引擎看见空配置
// ==========================================

use crate::config::import_config_trait::ImportConfigReader;
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 的配置值（UPSERT，带审计字段）
    pub fn set_config_value(
        &self,
        key: &str,
        value: &str,
        updated_by: &str,
    ) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at, updated_by)
             VALUES ('global', ?1, ?2, ?3, ?4)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3, updated_by = ?4",
            params![key, value, chrono::Utc::now().to_rfc3339(), updated_by],
        )?;
        Ok(())
    }

    /// 写入缺失的默认配置（已有值不覆盖）
    ///
    /// 首次建库后调用，保证配置页始终有完整键集可展示。
    pub fn seed_defaults(&self) -> Result<usize, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut count = 0;
        for (key, value) in config_keys::DEFAULTS {
            let affected = conn.execute(
                "INSERT OR IGNORE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
                params![key, value],
            )?;
            count += affected;
        }
        Ok(count)
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 配置页整体展示与备份
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    /// 从配置快照恢复配置
    ///
    /// # 注意
    /// - 此方法会覆盖现有的global配置
    /// - 仅用于备份恢复场景
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> Result<usize, Box<dyn Error>> {
        let config_map: HashMap<String, String> = serde_json::from_str(snapshot_json)?;

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute("BEGIN TRANSACTION", [])?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            let affected = conn.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                params![key, value],
            )?;
            count += affected;
        }

        conn.execute("COMMIT", [])?;

        Ok(count)
    }

    // ===== 告警配置 =====

    /// 获取无活跃报价时采购建议的回退供货周期（天）
    pub fn get_default_lead_time_days(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::DEFAULT_LEAD_TIME_DAYS, "7")?;
        Ok(value.parse::<i32>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_LEAD_TIME_DAYS,
                raw_value = %value,
                "回退供货周期配置格式错误，使用默认值 7"
            );
            7
        }))
    }

    // ===== 看板配置 =====

    /// 获取看板最近操作日志条数
    pub fn get_recent_actions_limit(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::RECENT_ACTIONS_LIMIT, "20")?;
        Ok(value.parse::<i32>().unwrap_or(20))
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_price(&self) -> Result<Decimal, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::IMPORT_MAX_PRICE, "1000000")?;
        Ok(Decimal::from_str(&value).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::IMPORT_MAX_PRICE,
                raw_value = %value,
                "单价上限配置格式错误，使用默认值 1000000"
            );
            Decimal::from(1_000_000)
        }))
    }

    async fn get_batch_retention_days(&self) -> Result<i32, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::BATCH_RETENTION_DAYS, "90")?;
        Ok(value.parse::<i32>().unwrap_or(90))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 告警
    pub const DEFAULT_LEAD_TIME_DAYS: &str = "alerts.default_lead_time_days";

    // 看板
    pub const RECENT_ACTIONS_LIMIT: &str = "dashboard.recent_actions_limit";

    // 导入
    pub const IMPORT_MAX_PRICE: &str = "import.max_price";
    pub const BATCH_RETENTION_DAYS: &str = "import.batch_retention_days";

    /// 全量默认值（seed_defaults 用）
    pub const DEFAULTS: &[(&str, &str)] = &[
        (DEFAULT_LEAD_TIME_DAYS, "7"),
        (RECENT_ACTIONS_LIMIT, "20"),
        (IMPORT_MAX_PRICE, "1000000"),
        (BATCH_RETENTION_DAYS, "90"),
    ];
}

// ==========================================
// 单元测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_unset() {
        let mgr = setup_manager();
        assert_eq!(mgr.get_default_lead_time_days().unwrap(), 7);
        assert_eq!(mgr.get_recent_actions_limit().unwrap(), 20);
    }

    #[test]
    fn test_set_and_read_back() {
        let mgr = setup_manager();
        mgr.set_config_value(config_keys::DEFAULT_LEAD_TIME_DAYS, "14", "管理员")
            .unwrap();
        assert_eq!(mgr.get_default_lead_time_days().unwrap(), 14);
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let mgr = setup_manager();
        mgr.set_config_value(config_keys::DEFAULT_LEAD_TIME_DAYS, "不是数字", "管理员")
            .unwrap();
        assert_eq!(mgr.get_default_lead_time_days().unwrap(), 7);
    }

    #[test]
    fn test_seed_defaults_is_idempotent_and_non_destructive() {
        let mgr = setup_manager();
        mgr.set_config_value(config_keys::RECENT_ACTIONS_LIMIT, "50", "管理员")
            .unwrap();

        let seeded = mgr.seed_defaults().unwrap();
        assert_eq!(seeded, config_keys::DEFAULTS.len() - 1);
        // 已有值不被覆盖
        assert_eq!(mgr.get_recent_actions_limit().unwrap(), 50);
        // 再次播种为空操作
        assert_eq!(mgr.seed_defaults().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_max_price_decimal() {
        let mgr = setup_manager();
        assert_eq!(mgr.get_max_price().await.unwrap(), dec!(1000000));

        mgr.set_config_value(config_keys::IMPORT_MAX_PRICE, "5000.50", "管理员")
            .unwrap();
        assert_eq!(mgr.get_max_price().await.unwrap(), dec!(5000.50));
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mgr = setup_manager();
        mgr.seed_defaults().unwrap();
        mgr.set_config_value(config_keys::DEFAULT_LEAD_TIME_DAYS, "10", "管理员")
            .unwrap();

        let snapshot = mgr.get_config_snapshot().unwrap();

        mgr.set_config_value(config_keys::DEFAULT_LEAD_TIME_DAYS, "3", "管理员")
            .unwrap();
        mgr.restore_config_from_snapshot(&snapshot).unwrap();

        assert_eq!(mgr.get_default_lead_time_days().unwrap(), 10);
    }
}
