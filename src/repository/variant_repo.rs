// ==========================================
// 制造追踪与成本核算系统 - 物料数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 管理 item_variant / supplier_pricing 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::types::PricingStatus;
use crate::domain::variant::{ItemVariant, SupplierPricing};
use crate::repository::decimal_from_row;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// IN 子句分块大小（SQLite 变量上限 999，留余量）
const CHUNK_SIZE: usize = 900;

pub struct VariantRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VariantRepository {
    /// 创建新的 VariantRepository 实例
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
    // ItemVariant 写入
    // ==========================================

    /// 插入物料主数据
    pub fn insert_variant(&self, variant: &ItemVariant) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO item_variant (
                variant_id, variant_code, variant_name, unit,
                current_stock, safety_stock, reorder_point, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                variant.variant_id,
                variant.variant_code,
                variant.variant_name,
                variant.unit,
                variant.current_stock.to_string(),
                variant.safety_stock.to_string(),
                variant.reorder_point.to_string(),
                variant.created_at.to_rfc3339(),
                variant.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(variant.variant_id.clone())
    }

    /// 更新物料基本信息（名称/单位）
    pub fn update_variant(
        &self,
        variant_id: &str,
        variant_name: &str,
        unit: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE item_variant
            SET variant_name = ?2, unit = ?3, updated_at = datetime('now')
            WHERE variant_id = ?1
            "#,
            params![variant_id, variant_name, unit],
        )?;
        Ok(rows)
    }

    /// 设置库存三阈值（当前/安全/再订货点）
    pub fn set_stock_levels(
        &self,
        variant_id: &str,
        current_stock: Decimal,
        safety_stock: Decimal,
        reorder_point: Decimal,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE item_variant
            SET current_stock = ?2, safety_stock = ?3, reorder_point = ?4,
                updated_at = datetime('now')
            WHERE variant_id = ?1
            "#,
            params![
                variant_id,
                current_stock.to_string(),
                safety_stock.to_string(),
                reorder_point.to_string(),
            ],
        )?;
        Ok(rows)
    }

    /// 直接写入当前库存（盘点/出入库调整后的终值）
    pub fn set_current_stock(&self, variant_id: &str, current_stock: Decimal) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE item_variant
            SET current_stock = ?2, updated_at = datetime('now')
            WHERE variant_id = ?1
            "#,
            params![variant_id, current_stock.to_string()],
        )?;
        Ok(rows)
    }

    // ==========================================
    // ItemVariant 查询
    // ==========================================

    fn map_variant_row(row: &Row<'_>) -> rusqlite::Result<ItemVariant> {
        Ok(ItemVariant {
            variant_id: row.get(0)?,
            variant_code: row.get(1)?,
            variant_name: row.get(2)?,
            unit: row.get(3)?,
            current_stock: decimal_from_row(row, 4)?,
            safety_stock: decimal_from_row(row, 5)?,
            reorder_point: decimal_from_row(row, 6)?,
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

    const VARIANT_COLUMNS: &'static str =
        "variant_id, variant_code, variant_name, unit, current_stock, safety_stock, reorder_point, created_at, updated_at";

    /// 按 variant_id 查询物料
    pub fn find_by_id(&self, variant_id: &str) -> RepositoryResult<Option<ItemVariant>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM item_variant WHERE variant_id = ?1",
            Self::VARIANT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![variant_id], Self::map_variant_row) {
            Ok(variant) => Ok(Some(variant)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 按 variant_code 查询物料
    pub fn find_by_code(&self, variant_code: &str) -> RepositoryResult<Option<ItemVariant>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM item_variant WHERE variant_code = ?1",
            Self::VARIANT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![variant_code], Self::map_variant_row) {
            Ok(variant) => Ok(Some(variant)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部物料
    pub fn list_all(&self) -> RepositoryResult<Vec<ItemVariant>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM item_variant ORDER BY variant_code",
            Self::VARIANT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let variants = stmt
            .query_map([], Self::map_variant_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(variants)
    }

    /// 批量按 ID 查询物料（IN 子句分块）
    pub fn batch_find_by_ids(
        &self,
        variant_ids: &[String],
    ) -> RepositoryResult<HashMap<String, ItemVariant>> {
        if variant_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let mut result = HashMap::new();

        for chunk in variant_ids.chunks(CHUNK_SIZE) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT {} FROM item_variant WHERE variant_id IN ({})",
                Self::VARIANT_COLUMNS,
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let variants = stmt
                .query_map(params_vec.as_slice(), Self::map_variant_row)?
                .collect::<SqliteResult<Vec<_>>>()?;

            for v in variants {
                result.insert(v.variant_id.clone(), v);
            }
        }

        Ok(result)
    }

    /// 批量按编码解析 variant_id（导入用，IN 子句分块）
    ///
    /// # 返回
    /// - HashMap<variant_code, variant_id>
    pub fn batch_resolve_codes(
        &self,
        variant_codes: &[String],
    ) -> RepositoryResult<HashMap<String, String>> {
        if variant_codes.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let mut result = HashMap::new();

        for chunk in variant_codes.chunks(CHUNK_SIZE) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT variant_code, variant_id FROM item_variant WHERE variant_code IN ({})",
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|c| c as &dyn rusqlite::ToSql).collect();

            let rows = stmt
                .query_map(params_vec.as_slice(), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<SqliteResult<Vec<_>>>()?;

            for (code, id) in rows {
                result.insert(code, id);
            }
        }

        Ok(result)
    }

    // ==========================================
    // SupplierPricing 写入
    // ==========================================

    /// 插入或更新供应商报价（按 variant_id + supplier_name 去重）
    pub fn upsert_pricing(&self, pricing: &SupplierPricing) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO supplier_pricing (
                pricing_id, variant_id, supplier_name, unit_price,
                lead_time_days, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(variant_id, supplier_name) DO UPDATE SET
                unit_price = ?4, lead_time_days = ?5, status = ?6, updated_at = ?8
            "#,
            params![
                pricing.pricing_id,
                pricing.variant_id,
                pricing.supplier_name,
                pricing.unit_price.to_string(),
                pricing.lead_time_days,
                pricing.status.to_db_str(),
                pricing.created_at.to_rfc3339(),
                pricing.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(pricing.pricing_id.clone())
    }

    /// 批量插入/更新供应商报价（导入用，单事务保证原子性）
    pub fn batch_upsert_pricing(&self, pricings: Vec<SupplierPricing>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut count = 0;
        for pricing in pricings {
            tx.execute(
                r#"
                INSERT INTO supplier_pricing (
                    pricing_id, variant_id, supplier_name, unit_price,
                    lead_time_days, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(variant_id, supplier_name) DO UPDATE SET
                    unit_price = ?4, lead_time_days = ?5, status = ?6, updated_at = ?8
                "#,
                params![
                    pricing.pricing_id,
                    pricing.variant_id,
                    pricing.supplier_name,
                    pricing.unit_price.to_string(),
                    pricing.lead_time_days,
                    pricing.status.to_db_str(),
                    pricing.created_at.to_rfc3339(),
                    pricing.updated_at.to_rfc3339(),
                ],
            )?;
            count += 1;
        }

        tx.commit()?;
        Ok(count)
    }

    /// 更新报价状态
    pub fn set_pricing_status(
        &self,
        pricing_id: &str,
        status: PricingStatus,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE supplier_pricing
            SET status = ?2, updated_at = datetime('now')
            WHERE pricing_id = ?1
            "#,
            params![pricing_id, status.to_db_str()],
        )?;
        Ok(rows)
    }

    // ==========================================
    // SupplierPricing 查询
    // ==========================================

    fn map_pricing_row(row: &Row<'_>) -> rusqlite::Result<SupplierPricing> {
        Ok(SupplierPricing {
            pricing_id: row.get(0)?,
            variant_id: row.get(1)?,
            supplier_name: row.get(2)?,
            unit_price: decimal_from_row(row, 3)?,
            lead_time_days: row.get(4)?,
            status: PricingStatus::from_str(&row.get::<_, String>(5)?),
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

    const PRICING_COLUMNS: &'static str =
        "pricing_id, variant_id, supplier_name, unit_price, lead_time_days, status, created_at, updated_at";

    /// 按 pricing_id 查询报价
    pub fn find_pricing(&self, pricing_id: &str) -> RepositoryResult<Option<SupplierPricing>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM supplier_pricing WHERE pricing_id = ?1",
            Self::PRICING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![pricing_id], Self::map_pricing_row) {
            Ok(pricing) => Ok(Some(pricing)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某物料的全部报价
    pub fn list_pricing_by_variant(
        &self,
        variant_id: &str,
    ) -> RepositoryResult<Vec<SupplierPricing>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM supplier_pricing WHERE variant_id = ?1 ORDER BY supplier_name",
            Self::PRICING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let pricings = stmt
            .query_map(params![variant_id], Self::map_pricing_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(pricings)
    }

    /// 批量查询多个物料的活跃报价（成本引擎用，IN 子句分块）
    ///
    /// # 返回
    /// - HashMap<variant_id, Vec<SupplierPricing>>（只含 ACTIVE 行）
    pub fn batch_active_pricing(
        &self,
        variant_ids: &[String],
    ) -> RepositoryResult<HashMap<String, Vec<SupplierPricing>>> {
        if variant_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let mut result: HashMap<String, Vec<SupplierPricing>> = HashMap::new();

        for chunk in variant_ids.chunks(CHUNK_SIZE) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(",");
            let sql = format!(
                "SELECT {} FROM supplier_pricing WHERE status = 'ACTIVE' AND variant_id IN ({})",
                Self::PRICING_COLUMNS,
                placeholders
            );

            let mut stmt = conn.prepare(&sql)?;
            let params_vec: Vec<&dyn rusqlite::ToSql> =
                chunk.iter().map(|id| id as &dyn rusqlite::ToSql).collect();

            let pricings = stmt
                .query_map(params_vec.as_slice(), Self::map_pricing_row)?
                .collect::<SqliteResult<Vec<_>>>()?;

            for p in pricings {
                result.entry(p.variant_id.clone()).or_default().push(p);
            }
        }

        Ok(result)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PricingStatus;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn setup_repo() -> VariantRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        VariantRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn make_variant(code: &str) -> ItemVariant {
        ItemVariant {
            variant_id: Uuid::new_v4().to_string(),
            variant_code: code.to_string(),
            variant_name: format!("物料-{}", code),
            unit: "kg".to_string(),
            current_stock: dec!(100),
            safety_stock: dec!(10),
            reorder_point: dec!(20),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn make_pricing(variant_id: &str, supplier: &str, price: Decimal, lead: i32) -> SupplierPricing {
        SupplierPricing {
            pricing_id: Uuid::new_v4().to_string(),
            variant_id: variant_id.to_string(),
            supplier_name: supplier.to_string(),
            unit_price: price,
            lead_time_days: lead,
            status: PricingStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_variant_stock_roundtrip() {
        let repo = setup_repo();
        let variant = make_variant("V-100");
        repo.insert_variant(&variant).unwrap();

        repo.set_stock_levels(&variant.variant_id, dec!(55.5), dec!(5), dec!(15))
            .unwrap();

        let found = repo.find_by_id(&variant.variant_id).unwrap().unwrap();
        assert_eq!(found.current_stock, dec!(55.5));
        assert_eq!(found.safety_stock, dec!(5));
        assert_eq!(found.reorder_point, dec!(15));
    }

    #[test]
    fn test_upsert_pricing_dedup_by_supplier() {
        let repo = setup_repo();
        let variant = make_variant("V-200");
        repo.insert_variant(&variant).unwrap();

        repo.upsert_pricing(&make_pricing(&variant.variant_id, "供应商A", dec!(10.00), 5))
            .unwrap();
        // 同一 (物料, 供应商) 再次导入应更新而非新增
        repo.upsert_pricing(&make_pricing(&variant.variant_id, "供应商A", dec!(12.50), 3))
            .unwrap();

        let pricings = repo.list_pricing_by_variant(&variant.variant_id).unwrap();
        assert_eq!(pricings.len(), 1);
        assert_eq!(pricings[0].unit_price, dec!(12.50));
        assert_eq!(pricings[0].lead_time_days, 3);
    }

    #[test]
    fn test_batch_active_pricing_excludes_inactive() {
        let repo = setup_repo();
        let variant = make_variant("V-300");
        repo.insert_variant(&variant).unwrap();

        let active = make_pricing(&variant.variant_id, "供应商A", dec!(8), 7);
        let mut inactive = make_pricing(&variant.variant_id, "供应商B", dec!(99), 1);
        inactive.status = PricingStatus::Inactive;
        repo.upsert_pricing(&active).unwrap();
        repo.upsert_pricing(&inactive).unwrap();

        let map = repo
            .batch_active_pricing(&[variant.variant_id.clone()])
            .unwrap();
        let rows = map.get(&variant.variant_id).unwrap();
        assert_eq!(rows.len(), 1, "INACTIVE 报价不应参与");
        assert_eq!(rows[0].supplier_name, "供应商A");
    }

    #[test]
    fn test_batch_resolve_codes() {
        let repo = setup_repo();
        let v1 = make_variant("V-A");
        let v2 = make_variant("V-B");
        repo.insert_variant(&v1).unwrap();
        repo.insert_variant(&v2).unwrap();

        let resolved = repo
            .batch_resolve_codes(&["V-A".to_string(), "V-B".to_string(), "V-MISSING".to_string()])
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get("V-A"), Some(&v1.variant_id));
        assert!(!resolved.contains_key("V-MISSING"));
    }
}
