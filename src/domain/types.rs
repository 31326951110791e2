// ==========================================
// 制造追踪与成本核算系统 - 领域类型定义
// ==========================================
// 红线: 枚举字面量与数据库存储一致 (SCREAMING_SNAKE_CASE)
// 对齐: db.rs init_schema 各状态列 CHECK 约束
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工艺状态 (Process Status)
// ==========================================
// 生命周期: DRAFT -> ACTIVE -> INACTIVE (可重新激活)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Draft,    // 草稿（结构可编辑）
    Active,   // 启用（可被批次引用）
    Inactive, // 停用（不可新建批次）
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Draft => write!(f, "DRAFT"),
            ProcessStatus::Active => write!(f, "ACTIVE"),
            ProcessStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

impl ProcessStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => ProcessStatus::Active,
            "INACTIVE" => ProcessStatus::Inactive,
            _ => ProcessStatus::Draft, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProcessStatus::Draft => "DRAFT",
            ProcessStatus::Active => "ACTIVE",
            ProcessStatus::Inactive => "INACTIVE",
        }
    }
}

// ==========================================
// 报价状态 (Pricing Status)
// ==========================================
// 红线: 最坏情况成本只取 ACTIVE 报价
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingStatus {
    Active,   // 有效报价
    Inactive, // 停用报价
}

impl fmt::Display for PricingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingStatus::Active => write!(f, "ACTIVE"),
            PricingStatus::Inactive => write!(f, "INACTIVE"),
        }
    }
}

impl PricingStatus {
    /// 从字符串解析状态（未知值按停用处理，宁缺勿滥）
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "ACTIVE" => PricingStatus::Active,
            _ => PricingStatus::Inactive,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PricingStatus::Active => "ACTIVE",
            PricingStatus::Inactive => "INACTIVE",
        }
    }
}

// ==========================================
// 批次状态 (Lot Status)
// ==========================================
// 状态机: PLANNING -> READY -> IN_PROGRESS -> COMPLETED
//         PLANNING/READY -> CANCELLED
// 红线: 状态跳转只能经由 LifecycleEngine 校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotStatus {
    Planning,   // 计划中（选型可编辑）
    Ready,      // 就绪（替代组已全部定型）
    InProgress, // 执行中（工序执行记录已生成）
    Completed,  // 已完成（终态）
    Cancelled,  // 已取消（终态）
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotStatus::Planning => write!(f, "PLANNING"),
            LotStatus::Ready => write!(f, "READY"),
            LotStatus::InProgress => write!(f, "IN_PROGRESS"),
            LotStatus::Completed => write!(f, "COMPLETED"),
            LotStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl LotStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLANNING" => Some(LotStatus::Planning),
            "READY" => Some(LotStatus::Ready),
            "IN_PROGRESS" => Some(LotStatus::InProgress),
            "COMPLETED" => Some(LotStatus::Completed),
            "CANCELLED" => Some(LotStatus::Cancelled),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LotStatus::Planning => "PLANNING",
            LotStatus::Ready => "READY",
            LotStatus::InProgress => "IN_PROGRESS",
            LotStatus::Completed => "COMPLETED",
            LotStatus::Cancelled => "CANCELLED",
        }
    }

    /// 是否终态（不允许再跳转）
    pub fn is_terminal(&self) -> bool {
        matches!(self, LotStatus::Completed | LotStatus::Cancelled)
    }

    /// 状态机跳转表（仅结构合法性，业务守卫在 LifecycleEngine）
    pub fn can_transition(&self, to: LotStatus) -> bool {
        matches!(
            (self, to),
            (LotStatus::Planning, LotStatus::Ready)
                | (LotStatus::Planning, LotStatus::Cancelled)
                | (LotStatus::Ready, LotStatus::InProgress)
                | (LotStatus::Ready, LotStatus::Cancelled)
                | (LotStatus::InProgress, LotStatus::Completed)
        )
    }
}

// ==========================================
// 工序执行状态 (Execution Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,   // 待执行
    Completed, // 已完成
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "PENDING"),
            ExecutionStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl ExecutionStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "COMPLETED" => ExecutionStatus::Completed,
            _ => ExecutionStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "PENDING",
            ExecutionStatus::Completed => "COMPLETED",
        }
    }
}

// ==========================================
// 告警等级 (Alert Severity)
// ==========================================
// 红线: 等级制,首条命中规则即定级
// 顺序: OK < LOW < MEDIUM < HIGH < CRITICAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    Ok,       // 库存充足
    Low,      // 低于再订货点
    Medium,   // 吃入安全库存
    High,     // 不足以覆盖需求
    Critical, // 零库存
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertSeverity::Ok => write!(f, "OK"),
            AlertSeverity::Low => write!(f, "LOW"),
            AlertSeverity::Medium => write!(f, "MEDIUM"),
            AlertSeverity::High => write!(f, "HIGH"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

impl AlertSeverity {
    /// 从字符串解析等级
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OK" => Some(AlertSeverity::Ok),
            "LOW" => Some(AlertSeverity::Low),
            "MEDIUM" => Some(AlertSeverity::Medium),
            "HIGH" => Some(AlertSeverity::High),
            "CRITICAL" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertSeverity::Ok => "OK",
            AlertSeverity::Low => "LOW",
            AlertSeverity::Medium => "MEDIUM",
            AlertSeverity::High => "HIGH",
            AlertSeverity::Critical => "CRITICAL",
        }
    }

    /// 是否需要生成采购建议（CRITICAL/HIGH）
    pub fn needs_recommendation(&self) -> bool {
        matches!(self, AlertSeverity::Critical | AlertSeverity::High)
    }
}

// ==========================================
// 告警确认动作 (Ack Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AckAction {
    Acknowledge, // 知悉（正常确认）
    Override,    // 强制放行（接受缺料风险）
}

impl fmt::Display for AckAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckAction::Acknowledge => write!(f, "ACKNOWLEDGE"),
            AckAction::Override => write!(f, "OVERRIDE"),
        }
    }
}

impl AckAction {
    /// 从字符串解析动作
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACKNOWLEDGE" => Some(AckAction::Acknowledge),
            "OVERRIDE" => Some(AckAction::Override),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AckAction::Acknowledge => "ACKNOWLEDGE",
            AckAction::Override => "OVERRIDE",
        }
    }
}

// ==========================================
// 成本项分类 (Cost Category)
// ==========================================
// 用途: 成本报告按分类拆分（人工单列为 labor_cost）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostCategory {
    Labor,       // 人工
    Electricity, // 电力
    Equipment,   // 设备
    Other,       // 其他
}

impl fmt::Display for CostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostCategory::Labor => write!(f, "LABOR"),
            CostCategory::Electricity => write!(f, "ELECTRICITY"),
            CostCategory::Equipment => write!(f, "EQUIPMENT"),
            CostCategory::Other => write!(f, "OTHER"),
        }
    }
}

impl CostCategory {
    /// 从字符串解析分类
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LABOR" => CostCategory::Labor,
            "ELECTRICITY" => CostCategory::Electricity,
            "EQUIPMENT" => CostCategory::Equipment,
            _ => CostCategory::Other, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CostCategory::Labor => "LABOR",
            CostCategory::Electricity => "ELECTRICITY",
            CostCategory::Equipment => "EQUIPMENT",
            CostCategory::Other => "OTHER",
        }
    }
}

// ==========================================
// 操作员角色 (Operator Role)
// ==========================================
// 红线: VIEWER 只读; 删除/配置恢复仅 ADMIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorRole {
    Admin,   // 管理员（全部操作）
    Planner, // 计划员（业务写操作）
    Viewer,  // 观察员（只读）
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorRole::Admin => write!(f, "ADMIN"),
            OperatorRole::Planner => write!(f, "PLANNER"),
            OperatorRole::Viewer => write!(f, "VIEWER"),
        }
    }
}

impl OperatorRole {
    /// 从字符串解析角色
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(OperatorRole::Admin),
            "PLANNER" => Some(OperatorRole::Planner),
            "VIEWER" => Some(OperatorRole::Viewer),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OperatorRole::Admin => "ADMIN",
            OperatorRole::Planner => "PLANNER",
            OperatorRole::Viewer => "VIEWER",
        }
    }

    /// 是否允许业务写操作
    pub fn can_write(&self) -> bool {
        matches!(self, OperatorRole::Admin | OperatorRole::Planner)
    }

    /// 是否允许破坏性操作（删除、配置恢复）
    pub fn can_admin(&self) -> bool {
        matches!(self, OperatorRole::Admin)
    }
}
