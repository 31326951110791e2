// ==========================================
// 制造追踪与成本核算系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 所有仓储共享同一个连接,避免多连接 PRAGMA 不一致
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{
    AlertApi, ConfigApi, CostingApi, DashboardApi, ImportApi, LotApi, ProcessApi, VariantApi,
};
use crate::config::config_manager::ConfigManager;
use crate::importer::{
    PricingConflictHandler, PricingDataCleaner, PricingDqValidator, PricingFieldMapper,
    PricingImporterImpl, UniversalFileParser,
};
use crate::repository::{
    action_log_repo::ActionLogRepository,
    alert_repo::AlertRepository,
    import_repo::ImportRepository,
    lot_repo::{LotRepository, LotTrackingRepository},
    process_repo::{ProcessRepository, ProcessStructureRepository},
    variant_repo::VariantRepository,
};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 工艺/工序结构API
    pub process_api: Arc<ProcessApi>,

    /// 物料与报价API
    pub variant_api: Arc<VariantApi>,

    /// 成本核算API
    pub costing_api: Arc<CostingApi>,

    /// 生产批次API
    pub lot_api: Arc<LotApi>,

    /// 库存告警API
    pub alert_api: Arc<AlertApi>,

    /// 看板API
    pub dashboard_api: Arc<DashboardApi>,

    /// 报价导入API
    pub import_api: Arc<ImportApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,

    /// 操作日志仓储（用于审计追踪查询）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 初始化顺序: 连接 → 建表 → Repository → ConfigManager → API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        crate::db::init_schema(&conn).map_err(|e| format!("初始化数据库结构失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================

        let process_repo = Arc::new(ProcessRepository::from_connection(conn.clone()));
        let structure_repo = Arc::new(ProcessStructureRepository::from_connection(conn.clone()));
        let variant_repo = Arc::new(VariantRepository::from_connection(conn.clone()));
        let lot_repo = Arc::new(LotRepository::from_connection(conn.clone()));
        let tracking_repo = Arc::new(LotTrackingRepository::from_connection(conn.clone()));
        let alert_repo = Arc::new(AlertRepository::from_connection(conn.clone()));
        let import_repo = Arc::new(ImportRepository::from_connection(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::from_connection(conn.clone()));

        // ==========================================
        // 配置管理器（种默认值,幂等）
        // ==========================================

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        config_manager
            .seed_defaults()
            .map_err(|e| format!("初始化默认配置失败: {}", e))?;

        // ==========================================
        // 初始化API层
        // ==========================================

        let process_api = Arc::new(ProcessApi::new(
            process_repo.clone(),
            structure_repo.clone(),
            variant_repo.clone(),
            lot_repo.clone(),
            action_log_repo.clone(),
        ));

        let variant_api = Arc::new(VariantApi::new(
            variant_repo.clone(),
            action_log_repo.clone(),
        ));

        let costing_api = Arc::new(CostingApi::new(
            process_repo.clone(),
            structure_repo.clone(),
            variant_repo.clone(),
            lot_repo.clone(),
            tracking_repo.clone(),
            action_log_repo.clone(),
        ));

        let lot_api = Arc::new(LotApi::new(
            lot_repo.clone(),
            tracking_repo.clone(),
            process_repo.clone(),
            structure_repo.clone(),
            variant_repo.clone(),
            alert_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
        ));

        let alert_api = Arc::new(AlertApi::new(
            alert_repo.clone(),
            action_log_repo.clone(),
        ));

        let dashboard_api = Arc::new(DashboardApi::new(
            alert_repo,
            lot_repo,
            process_repo,
            action_log_repo.clone(),
            config_manager.clone(),
        ));

        // 导入流水线持有独立的仓储实例（同一底层连接）
        let importer = PricingImporterImpl::new(
            VariantRepository::from_connection(conn.clone()),
            ImportRepository::from_connection(conn.clone()),
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
            Box::new(UniversalFileParser),
            Box::new(PricingFieldMapper),
            Box::new(PricingDataCleaner),
            Box::new(PricingDqValidator),
            Box::new(PricingConflictHandler),
        );
        let import_api = Arc::new(ImportApi::new(
            importer,
            import_repo,
            action_log_repo.clone(),
        ));

        let config_api = Arc::new(ConfigApi::new(
            config_manager,
            action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            process_api,
            variant_api,
            costing_api,
            lot_api,
            alert_api,
            dashboard_api,
            import_api,
            config_api,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// 优先级: 环境变量 MTC_TRACKING_DB_PATH > 用户数据目录 > 当前目录回退
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("MTC_TRACKING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./mtc_tracking.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("mtc-tracking-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("mtc-tracking");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("mtc_tracking.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    // 注意：AppState::new() 的测试需要真实的数据库文件
    // 这些测试在集成测试中进行
}
