// ==========================================
// 制造追踪与成本核算系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写操作必须记录
// 用途: 审计追踪
// 对齐: db.rs init_schema action_log 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// action_type 存储为 SCREAMING_SNAKE_CASE 字面量
// （CREATE_LOT / ACKNOWLEDGE_ALERT / UPDATE_CONFIG ...）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,        // 日志 ID（UUID v4）
    pub action_type: String,      // 操作类型（存储为字符串）
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 业务关联（可空）=====
    pub lot_id: Option<String>,     // 关联批次
    pub process_id: Option<String>, // 关联工艺
    pub variant_id: Option<String>, // 关联物料

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>, // 操作参数（JSON）
    pub detail: Option<String>,          // 详细描述
}
