// ==========================================
// 制造追踪与成本核算系统 - 导入配置读取 Trait
// ==========================================
// 职责: 定义报价导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::error::Error;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 报价导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取单价合理性上限
    ///
    /// # 默认值
    /// - 1000000
    ///
    /// # 用途
    /// - 超过上限的报价行判 DQ 警告（疑似单位错误）
    async fn get_max_price(&self) -> Result<Decimal, Box<dyn Error>>;

    /// 获取导入批次保留天数
    ///
    /// # 默认值
    /// - 90
    ///
    /// # 用途
    /// - 超期批次可清理
    async fn get_batch_retention_days(&self) -> Result<i32, Box<dyn Error>>;
}
