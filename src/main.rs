// ==========================================
// 制造追踪与成本核算系统 - 主入口
// ==========================================
// 职责: 初始化日志与应用状态,打印启动自检信息
// ==========================================

use mtc_tracking::app::{get_default_db_path, AppState};

fn main() {
    // 初始化日志系统
    mtc_tracking::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", mtc_tracking::APP_NAME);
    tracing::info!("系统版本: {}", mtc_tracking::VERSION);
    tracing::info!("==================================================");

    // 获取数据库路径
    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    // 创建AppState（建表 + 种默认配置）
    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("初始化AppState失败: {}", e);
            std::process::exit(1);
        }
    };

    // 启动自检: 打印看板汇总,确认数据链路可用
    let summary = mtc_tracking::app::handlers::get_dashboard_summary(&state);
    match serde_json::to_string_pretty(&summary) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::warn!("看板汇总序列化失败: {}", e),
    }

    tracing::info!("AppState初始化成功（库模式使用: mtc_tracking::app::AppState）");
}
