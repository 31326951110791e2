// ==========================================
// 制造追踪与成本核算系统 - 库存预警仓储
// ==========================================
// 红线: Repository 不含业务逻辑，预警分级在引擎层
// 职责: inventory_alert / procurement_recommendation 表
// 对齐: 重评时保留已确认预警，只替换未确认部分
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::alert::{InventoryAlert, ProcurementRecommendation};
use crate::domain::types::{AckAction, AlertSeverity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{decimal_from_row, enum_column_error};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    /// 创建新的 AlertRepository 实例
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

    /// 覆盖批次的预警结果（单事务）
    ///
    /// 删除该批次所有**未确认**预警（采购建议随外键级联删除），
    /// 再写入新一轮评估产出的预警与建议。已确认的历史预警保留。
    pub fn replace_lot_alerts(
        &self,
        lot_id: &str,
        alerts: &[InventoryAlert],
        recommendations: &[ProcurementRecommendation],
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            DELETE FROM procurement_recommendation
            WHERE alert_id IN (
                SELECT alert_id FROM inventory_alert
                WHERE lot_id = ?1 AND acknowledged = 0
            )
            "#,
            params![lot_id],
        )?;
        tx.execute(
            "DELETE FROM inventory_alert WHERE lot_id = ?1 AND acknowledged = 0",
            params![lot_id],
        )?;

        for alert in alerts {
            tx.execute(
                r#"
                INSERT INTO inventory_alert (
                    alert_id, lot_id, variant_id, severity, current_stock,
                    required_qty, shortfall, reason, acknowledged, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)
                "#,
                params![
                    alert.alert_id,
                    alert.lot_id,
                    alert.variant_id,
                    alert.severity.to_db_str(),
                    alert.current_stock.to_string(),
                    alert.required_qty.to_string(),
                    alert.shortfall.to_string(),
                    alert.reason,
                    alert.created_at.to_rfc3339(),
                ],
            )?;
        }

        for reco in recommendations {
            tx.execute(
                r#"
                INSERT INTO procurement_recommendation (
                    recommendation_id, alert_id, lot_id, variant_id, supplier_name,
                    lead_time_days, recommended_qty, required_by_date, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![
                    reco.recommendation_id,
                    reco.alert_id,
                    reco.lot_id,
                    reco.variant_id,
                    reco.supplier_name,
                    reco.lead_time_days,
                    reco.recommended_qty.to_string(),
                    reco.required_by_date.format("%Y-%m-%d").to_string(),
                    reco.created_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(alerts.len())
    }

    /// 确认预警（带未确认前置条件，返回受影响行数）
    ///
    /// 返回 0 表示预警不存在或已被确认。
    pub fn acknowledge(
        &self,
        alert_id: &str,
        acknowledged_by: &str,
        action: AckAction,
        note: Option<&str>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE inventory_alert
            SET acknowledged = 1, acknowledged_by = ?2, acknowledged_at = ?3,
                ack_action = ?4, ack_note = ?5
            WHERE alert_id = ?1 AND acknowledged = 0
            "#,
            params![
                alert_id,
                acknowledged_by,
                chrono::Utc::now().to_rfc3339(),
                action.to_db_str(),
                note,
            ],
        )?;
        Ok(rows)
    }

    // ==========================================
    // 查询
    // ==========================================

    const ALERT_COLUMNS: &'static str = "alert_id, lot_id, variant_id, severity, current_stock, \
         required_qty, shortfall, reason, acknowledged, acknowledged_by, acknowledged_at, \
         ack_action, ack_note, created_at";

    fn map_alert_row(row: &Row<'_>) -> rusqlite::Result<InventoryAlert> {
        let severity_raw: String = row.get(3)?;
        let severity = AlertSeverity::from_str(&severity_raw)
            .ok_or_else(|| enum_column_error(3, &severity_raw, "预警级别"))?;

        let ack_action = row
            .get::<_, Option<String>>(11)?
            .and_then(|s| AckAction::from_str(&s));

        Ok(InventoryAlert {
            alert_id: row.get(0)?,
            lot_id: row.get(1)?,
            variant_id: row.get(2)?,
            severity,
            current_stock: decimal_from_row(row, 4)?,
            required_qty: decimal_from_row(row, 5)?,
            shortfall: decimal_from_row(row, 6)?,
            reason: row.get(7)?,
            acknowledged: row.get::<_, i64>(8)? != 0,
            acknowledged_by: row.get(9)?,
            acknowledged_at: row
                .get::<_, Option<String>>(10)?
                .and_then(|ts| ts.parse::<chrono::DateTime<chrono::Utc>>().ok()),
            ack_action,
            ack_note: row.get(12)?,
            created_at: row
                .get::<_, String>(13)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 按 alert_id 查询预警
    pub fn find_by_id(&self, alert_id: &str) -> RepositoryResult<Option<InventoryAlert>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM inventory_alert WHERE alert_id = ?1",
            Self::ALERT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![alert_id], Self::map_alert_row) {
            Ok(alert) => Ok(Some(alert)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 组合条件查询预警（批次/级别/仅未确认）
    pub fn list(
        &self,
        lot_id: Option<&str>,
        severity: Option<AlertSeverity>,
        unacknowledged_only: bool,
    ) -> RepositoryResult<Vec<InventoryAlert>> {
        let conn = self.get_conn()?;

        let mut sql = format!(
            "SELECT {} FROM inventory_alert WHERE 1=1",
            Self::ALERT_COLUMNS
        );
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(lot) = lot_id {
            params_vec.push(Box::new(lot.to_string()));
            sql.push_str(&format!(" AND lot_id = ?{}", params_vec.len()));
        }
        if let Some(sev) = severity {
            params_vec.push(Box::new(sev.to_db_str().to_string()));
            sql.push_str(&format!(" AND severity = ?{}", params_vec.len()));
        }
        if unacknowledged_only {
            sql.push_str(" AND acknowledged = 0");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn rusqlite::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();

        let alerts = stmt
            .query_map(params_refs.as_slice(), Self::map_alert_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(alerts)
    }

    /// 统计批次未确认的 CRITICAL 预警数（状态流转守卫用）
    ///
    /// 查询失败必须原样上抛: 守卫拿不到答案时流转不得放行。
    pub fn count_unacked_critical(&self, lot_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM inventory_alert
            WHERE lot_id = ?1 AND severity = 'CRITICAL' AND acknowledged = 0
            "#,
            params![lot_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 按级别统计未确认预警数（看板用）
    pub fn count_unacknowledged_by_severity(&self) -> RepositoryResult<Vec<(String, i64)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT severity, COUNT(*) FROM inventory_alert
            WHERE acknowledged = 0
            GROUP BY severity
            "#,
        )?;

        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(counts)
    }

    // ==========================================
    // 采购建议
    // ==========================================

    const RECO_COLUMNS: &'static str = "recommendation_id, alert_id, lot_id, variant_id, \
         supplier_name, lead_time_days, recommended_qty, required_by_date, created_at";

    fn map_recommendation_row(row: &Row<'_>) -> rusqlite::Result<ProcurementRecommendation> {
        let date_raw: String = row.get(7)?;
        let required_by_date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ProcurementRecommendation {
            recommendation_id: row.get(0)?,
            alert_id: row.get(1)?,
            lot_id: row.get(2)?,
            variant_id: row.get(3)?,
            supplier_name: row.get(4)?,
            lead_time_days: row.get(5)?,
            recommended_qty: decimal_from_row(row, 6)?,
            required_by_date,
            created_at: row
                .get::<_, String>(8)?
                .parse::<chrono::DateTime<chrono::Utc>>()
                .unwrap_or_else(|_| chrono::Utc::now()),
        })
    }

    /// 查询采购建议，可按批次过滤
    pub fn list_recommendations(
        &self,
        lot_id: Option<&str>,
    ) -> RepositoryResult<Vec<ProcurementRecommendation>> {
        let conn = self.get_conn()?;

        let recos = match lot_id {
            Some(lot) => {
                let sql = format!(
                    "SELECT {} FROM procurement_recommendation WHERE lot_id = ?1 ORDER BY created_at DESC",
                    Self::RECO_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![lot], Self::map_recommendation_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM procurement_recommendation ORDER BY created_at DESC",
                    Self::RECO_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], Self::map_recommendation_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };
        Ok(recos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn setup_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    /// 预警外键所需的批次与物料
    fn seed_lot_fixture(conn: &Arc<Mutex<Connection>>) -> (String, String) {
        let process_id = Uuid::new_v4().to_string();
        let lot_id = Uuid::new_v4().to_string();
        let variant_id = Uuid::new_v4().to_string();

        let guard = conn.lock().unwrap();
        guard
            .execute(
                "INSERT INTO process (process_id, process_code, process_name, status, created_by, created_at, updated_at)
                 VALUES (?1, ?2, '测试工艺', 'ACTIVE', 'tester', datetime('now'), datetime('now'))",
                params![process_id, format!("P-{}", &process_id[..8])],
            )
            .unwrap();
        guard
            .execute(
                "INSERT INTO production_lot (lot_id, lot_code, process_id, quantity, status, planned_start_date, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, '10', 'PLANNING', '2026-09-01', 'tester', datetime('now'), datetime('now'))",
                params![lot_id, format!("LOT-{}", &lot_id[..8]), process_id],
            )
            .unwrap();
        guard
            .execute(
                "INSERT INTO item_variant (variant_id, variant_code, variant_name, created_at, updated_at)
                 VALUES (?1, ?2, '测试物料', datetime('now'), datetime('now'))",
                params![variant_id, format!("V-{}", &variant_id[..8])],
            )
            .unwrap();

        (lot_id, variant_id)
    }

    fn make_alert(lot_id: &str, variant_id: &str, severity: AlertSeverity) -> InventoryAlert {
        InventoryAlert {
            alert_id: Uuid::new_v4().to_string(),
            lot_id: lot_id.to_string(),
            variant_id: variant_id.to_string(),
            severity,
            current_stock: dec!(0),
            required_qty: dec!(50),
            shortfall: dec!(50),
            reason: Some("{\"rule\":\"STOCK_ZERO\"}".to_string()),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            ack_action: None,
            ack_note: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_replace_keeps_acknowledged_alerts() {
        let conn = setup_db();
        let (lot_id, variant_id) = seed_lot_fixture(&conn);
        let repo = AlertRepository::from_connection(conn);

        let first = make_alert(&lot_id, &variant_id, AlertSeverity::Critical);
        repo.replace_lot_alerts(&lot_id, std::slice::from_ref(&first), &[])
            .unwrap();
        repo.acknowledge(&first.alert_id, "admin", AckAction::Override, Some("手工确认"))
            .unwrap();

        // 第二轮评估产出一条新预警
        let second = make_alert(&lot_id, &variant_id, AlertSeverity::High);
        repo.replace_lot_alerts(&lot_id, std::slice::from_ref(&second), &[])
            .unwrap();

        let all = repo.list(Some(&lot_id), None, false).unwrap();
        assert_eq!(all.len(), 2, "已确认预警应在重评后保留");

        let unacked = repo.list(Some(&lot_id), None, true).unwrap();
        assert_eq!(unacked.len(), 1);
        assert_eq!(unacked[0].severity, AlertSeverity::High);
    }

    #[test]
    fn test_acknowledge_is_single_shot() {
        let conn = setup_db();
        let (lot_id, variant_id) = seed_lot_fixture(&conn);
        let repo = AlertRepository::from_connection(conn);

        let alert = make_alert(&lot_id, &variant_id, AlertSeverity::Critical);
        repo.replace_lot_alerts(&lot_id, std::slice::from_ref(&alert), &[])
            .unwrap();

        assert_eq!(repo.count_unacked_critical(&lot_id).unwrap(), 1);

        let rows = repo
            .acknowledge(&alert.alert_id, "planner", AckAction::Acknowledge, None)
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(repo.count_unacked_critical(&lot_id).unwrap(), 0);

        // 重复确认不生效
        let rows = repo
            .acknowledge(&alert.alert_id, "planner", AckAction::Acknowledge, None)
            .unwrap();
        assert_eq!(rows, 0);

        let found = repo.find_by_id(&alert.alert_id).unwrap().unwrap();
        assert!(found.acknowledged);
        assert_eq!(found.ack_action, Some(AckAction::Acknowledge));
        assert_eq!(found.acknowledged_by.as_deref(), Some("planner"));
    }

    #[test]
    fn test_recommendations_follow_their_alert() {
        let conn = setup_db();
        let (lot_id, variant_id) = seed_lot_fixture(&conn);
        let repo = AlertRepository::from_connection(conn);

        let alert = make_alert(&lot_id, &variant_id, AlertSeverity::Critical);
        let reco = ProcurementRecommendation {
            recommendation_id: Uuid::new_v4().to_string(),
            alert_id: alert.alert_id.clone(),
            lot_id: lot_id.clone(),
            variant_id: variant_id.clone(),
            supplier_name: Some("供应商A".to_string()),
            lead_time_days: 7,
            recommended_qty: dec!(60),
            required_by_date: chrono::NaiveDate::from_ymd_opt(2026, 9, 8).unwrap(),
            created_at: Utc::now(),
        };
        repo.replace_lot_alerts(&lot_id, std::slice::from_ref(&alert), std::slice::from_ref(&reco))
            .unwrap();

        let recos = repo.list_recommendations(Some(&lot_id)).unwrap();
        assert_eq!(recos.len(), 1);
        assert_eq!(recos[0].recommended_qty, dec!(60));

        // 重评清除未确认预警时，其建议随之删除
        repo.replace_lot_alerts(&lot_id, &[], &[]).unwrap();
        assert!(repo.list_recommendations(Some(&lot_id)).unwrap().is_empty());
    }

    #[test]
    fn test_severity_counts_for_dashboard() {
        let conn = setup_db();
        let (lot_id, variant_id) = seed_lot_fixture(&conn);
        let repo = AlertRepository::from_connection(conn);

        let alerts = vec![
            make_alert(&lot_id, &variant_id, AlertSeverity::Critical),
            make_alert(&lot_id, &variant_id, AlertSeverity::High),
            make_alert(&lot_id, &variant_id, AlertSeverity::High),
        ];
        repo.replace_lot_alerts(&lot_id, &alerts, &[]).unwrap();

        let counts = repo.count_unacknowledged_by_severity().unwrap();
        let get = |sev: &str| {
            counts
                .iter()
                .find(|(s, _)| s == sev)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };
        assert_eq!(get("CRITICAL"), 1);
        assert_eq!(get("HIGH"), 2);
    }
}
