// ==========================================
// 制造追踪与成本核算系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 提供幂等建表入口 init_schema（应用启动与测试共用同一份 DDL）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于**提示/告警**（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 幂等建表（CREATE TABLE IF NOT EXISTS）
///
/// 说明：
/// - 金额/数量列统一存 TEXT（十进制字符串），由仓储层转 Decimal，避免浮点漂移
/// - 日期列存 TEXT（YYYY-MM-DD），时间戳列存 RFC3339 TEXT
/// - action_log 不设外键：审计记录必须在业务实体删除后仍可追溯
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS process (
            process_id   TEXT PRIMARY KEY,
            process_code TEXT NOT NULL UNIQUE,
            process_name TEXT NOT NULL,
            category     TEXT,
            status       TEXT NOT NULL DEFAULT 'DRAFT'
                         CHECK (status IN ('DRAFT', 'ACTIVE', 'INACTIVE')),
            created_by   TEXT NOT NULL,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subprocess (
            subprocess_id   TEXT PRIMARY KEY,
            subprocess_code TEXT NOT NULL UNIQUE,
            subprocess_name TEXT NOT NULL,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS process_subprocess (
            link_id       TEXT PRIMARY KEY,
            process_id    TEXT NOT NULL REFERENCES process(process_id) ON DELETE CASCADE,
            subprocess_id TEXT NOT NULL REFERENCES subprocess(subprocess_id),
            seq_no        INTEGER NOT NULL,
            UNIQUE (process_id, subprocess_id),
            UNIQUE (process_id, seq_no)
        );

        CREATE TABLE IF NOT EXISTS item_variant (
            variant_id    TEXT PRIMARY KEY,
            variant_code  TEXT NOT NULL UNIQUE,
            variant_name  TEXT NOT NULL,
            unit          TEXT NOT NULL DEFAULT '件',
            current_stock TEXT NOT NULL DEFAULT '0',
            safety_stock  TEXT NOT NULL DEFAULT '0',
            reorder_point TEXT NOT NULL DEFAULT '0',
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS substitute_group (
            group_id      TEXT PRIMARY KEY,
            subprocess_id TEXT NOT NULL REFERENCES subprocess(subprocess_id) ON DELETE CASCADE,
            group_name    TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variant_usage (
            usage_id      TEXT PRIMARY KEY,
            subprocess_id TEXT NOT NULL REFERENCES subprocess(subprocess_id) ON DELETE CASCADE,
            variant_id    TEXT NOT NULL REFERENCES item_variant(variant_id),
            quantity      TEXT NOT NULL,
            group_id      TEXT REFERENCES substitute_group(group_id) ON DELETE SET NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cost_item (
            item_id       TEXT PRIMARY KEY,
            subprocess_id TEXT NOT NULL REFERENCES subprocess(subprocess_id) ON DELETE CASCADE,
            item_name     TEXT NOT NULL,
            category      TEXT NOT NULL DEFAULT 'OTHER'
                          CHECK (category IN ('LABOR', 'ELECTRICITY', 'EQUIPMENT', 'OTHER')),
            amount        TEXT NOT NULL,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS overhead_item (
            overhead_id TEXT PRIMARY KEY,
            process_id  TEXT NOT NULL REFERENCES process(process_id) ON DELETE CASCADE,
            item_name   TEXT NOT NULL,
            amount      TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS supplier_pricing (
            pricing_id     TEXT PRIMARY KEY,
            variant_id     TEXT NOT NULL REFERENCES item_variant(variant_id) ON DELETE CASCADE,
            supplier_name  TEXT NOT NULL,
            unit_price     TEXT NOT NULL,
            lead_time_days INTEGER NOT NULL DEFAULT 0,
            status         TEXT NOT NULL DEFAULT 'ACTIVE'
                           CHECK (status IN ('ACTIVE', 'INACTIVE')),
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL,
            UNIQUE (variant_id, supplier_name)
        );

        CREATE TABLE IF NOT EXISTS production_lot (
            lot_id             TEXT PRIMARY KEY,
            lot_code           TEXT NOT NULL UNIQUE,
            process_id         TEXT NOT NULL REFERENCES process(process_id),
            quantity           TEXT NOT NULL,
            status             TEXT NOT NULL DEFAULT 'PLANNING'
                               CHECK (status IN ('PLANNING', 'READY', 'IN_PROGRESS', 'COMPLETED', 'CANCELLED')),
            planned_start_date TEXT NOT NULL,
            material_cost      TEXT,
            labor_cost         TEXT,
            other_item_cost    TEXT,
            overhead_cost      TEXT,
            total_cost         TEXT,
            cost_refreshed_at  TEXT,
            created_by         TEXT NOT NULL,
            created_at         TEXT NOT NULL,
            updated_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS variant_selection (
            selection_id TEXT PRIMARY KEY,
            lot_id       TEXT NOT NULL REFERENCES production_lot(lot_id) ON DELETE CASCADE,
            group_id     TEXT NOT NULL REFERENCES substitute_group(group_id),
            variant_id   TEXT NOT NULL REFERENCES item_variant(variant_id),
            selected_by  TEXT NOT NULL,
            selected_at  TEXT NOT NULL,
            UNIQUE (lot_id, group_id)
        );

        CREATE TABLE IF NOT EXISTS subprocess_execution (
            execution_id  TEXT PRIMARY KEY,
            lot_id        TEXT NOT NULL REFERENCES production_lot(lot_id),
            subprocess_id TEXT NOT NULL REFERENCES subprocess(subprocess_id),
            seq_no        INTEGER NOT NULL,
            status        TEXT NOT NULL DEFAULT 'PENDING'
                          CHECK (status IN ('PENDING', 'COMPLETED')),
            completed_at  TEXT,
            completed_by  TEXT,
            UNIQUE (lot_id, subprocess_id)
        );

        CREATE TABLE IF NOT EXISTS inventory_alert (
            alert_id        TEXT PRIMARY KEY,
            lot_id          TEXT NOT NULL REFERENCES production_lot(lot_id) ON DELETE CASCADE,
            variant_id      TEXT NOT NULL REFERENCES item_variant(variant_id),
            severity        TEXT NOT NULL
                            CHECK (severity IN ('OK', 'LOW', 'MEDIUM', 'HIGH', 'CRITICAL')),
            current_stock   TEXT NOT NULL,
            required_qty    TEXT NOT NULL,
            shortfall       TEXT NOT NULL,
            reason          TEXT,
            acknowledged    INTEGER NOT NULL DEFAULT 0,
            acknowledged_by TEXT,
            acknowledged_at TEXT,
            ack_action      TEXT CHECK (ack_action IS NULL OR ack_action IN ('ACKNOWLEDGE', 'OVERRIDE')),
            ack_note        TEXT,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS procurement_recommendation (
            recommendation_id TEXT PRIMARY KEY,
            alert_id          TEXT NOT NULL REFERENCES inventory_alert(alert_id) ON DELETE CASCADE,
            lot_id            TEXT NOT NULL,
            variant_id        TEXT NOT NULL REFERENCES item_variant(variant_id),
            supplier_name     TEXT,
            lead_time_days    INTEGER NOT NULL,
            recommended_qty   TEXT NOT NULL,
            required_by_date  TEXT NOT NULL,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS action_log (
            action_id    TEXT PRIMARY KEY,
            action_type  TEXT NOT NULL,
            action_ts    TEXT NOT NULL,
            actor        TEXT NOT NULL,
            lot_id       TEXT,
            process_id   TEXT,
            variant_id   TEXT,
            payload_json TEXT,
            detail       TEXT
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id   TEXT NOT NULL,
            key        TEXT NOT NULL,
            value      TEXT NOT NULL,
            updated_at TEXT,
            updated_by TEXT,
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS import_batch (
            batch_id       TEXT PRIMARY KEY,
            file_name      TEXT,
            file_path      TEXT,
            total_rows     INTEGER NOT NULL DEFAULT 0,
            success_rows   INTEGER NOT NULL DEFAULT 0,
            blocked_rows   INTEGER NOT NULL DEFAULT 0,
            warning_rows   INTEGER NOT NULL DEFAULT 0,
            conflict_rows  INTEGER NOT NULL DEFAULT 0,
            imported_at    TEXT,
            imported_by    TEXT,
            elapsed_ms     INTEGER,
            dq_report_json TEXT
        );

        CREATE TABLE IF NOT EXISTS import_conflict (
            conflict_id   TEXT PRIMARY KEY,
            batch_id      TEXT NOT NULL REFERENCES import_batch(batch_id),
            row_number    INTEGER NOT NULL,
            variant_code  TEXT,
            conflict_type TEXT NOT NULL,
            raw_data      TEXT NOT NULL,
            reason        TEXT NOT NULL,
            resolved      INTEGER NOT NULL DEFAULT 0,
            resolved_by   TEXT,
            resolved_at   TEXT,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_variant_usage_subprocess ON variant_usage(subprocess_id);
        CREATE INDEX IF NOT EXISTS idx_variant_usage_group ON variant_usage(group_id);
        CREATE INDEX IF NOT EXISTS idx_supplier_pricing_variant ON supplier_pricing(variant_id, status);
        CREATE INDEX IF NOT EXISTS idx_production_lot_status ON production_lot(status);
        CREATE INDEX IF NOT EXISTS idx_subprocess_execution_lot ON subprocess_execution(lot_id);
        CREATE INDEX IF NOT EXISTS idx_inventory_alert_lot ON inventory_alert(lot_id);
        CREATE INDEX IF NOT EXISTS idx_inventory_alert_severity ON inventory_alert(severity, acknowledged);
        CREATE INDEX IF NOT EXISTS idx_procurement_reco_lot ON procurement_recommendation(lot_id);
        CREATE INDEX IF NOT EXISTS idx_action_log_ts ON action_log(action_ts);
        CREATE INDEX IF NOT EXISTS idx_action_log_lot ON action_log(lot_id);
        CREATE INDEX IF NOT EXISTS idx_import_conflict_batch ON import_conflict(batch_id, resolved);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
