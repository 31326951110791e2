// ==========================================
// 制造追踪与成本核算系统 - 演示数据种子
// ==========================================
// 用法: seed_demo_db [db_path]
// 职责: 重置数据库并通过 API 层构造一套可演示的完整场景
// ==========================================

use std::error::Error;
use std::fs;
use std::path::Path;

use chrono::{Duration, Local};

use mtc_tracking::app::{get_default_db_path, AppState};
use mtc_tracking::domain::types::{CostCategory, OperatorRole, PricingStatus, ProcessStatus};

const SEED_ACTOR: &str = "seed";
const SEED_ROLE: OperatorRole = OperatorRole::Admin;

fn main() -> Result<(), Box<dyn Error>> {
    mtc_tracking::logging::init();

    let db_path = std::env::args().nth(1).unwrap_or_else(get_default_db_path);

    backup_and_reset_db(&db_path)?;

    // AppState 负责建表和种默认配置
    let state = AppState::new(db_path.clone()).map_err(|e| -> Box<dyn Error> { e.into() })?;

    seed_demo_scenario(&state)?;
    print_quick_counts(&state)?;

    eprintln!("演示数据已写入 {}", db_path);
    Ok(())
}

fn backup_and_reset_db(db_path: &str) -> Result<(), Box<dyn Error>> {
    let path = Path::new(db_path);
    if !path.exists() {
        return Ok(());
    }

    let ts = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let backup_path = format!("{}.bak.{}", db_path, ts);
    fs::copy(path, &backup_path)?;
    fs::remove_file(path)?;

    eprintln!("已备份 {} -> {}", db_path, backup_path);
    Ok(())
}

fn seed_demo_scenario(state: &AppState) -> Result<(), Box<dyn Error>> {
    // === 物料主数据 ===
    let steel = state.variant_api.create_variant(
        "MAT-STEEL-01",
        "冷轧钢板",
        "kg",
        "500".parse()?,
        "100".parse()?,
        "200".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    let alu = state.variant_api.create_variant(
        "MAT-ALU-01",
        "铝合金板",
        "kg",
        "80".parse()?,
        "50".parse()?,
        "120".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    let paint = state.variant_api.create_variant(
        "MAT-PAINT-01",
        "环氧底漆",
        "L",
        "0".parse()?,
        "20".parse()?,
        "40".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // === 供应商报价 ===
    state.variant_api.upsert_supplier_pricing(
        &steel.variant_id,
        "华东钢铁",
        "8.50".parse()?,
        5,
        PricingStatus::Active,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.variant_api.upsert_supplier_pricing(
        &steel.variant_id,
        "北方特钢",
        "9.20".parse()?,
        3,
        PricingStatus::Active,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.variant_api.upsert_supplier_pricing(
        &alu.variant_id,
        "西南铝业",
        "22.00".parse()?,
        10,
        PricingStatus::Active,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.variant_api.upsert_supplier_pricing(
        &paint.variant_id,
        "涂料一厂",
        "35.00".parse()?,
        7,
        PricingStatus::Active,
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // === 工序与工艺结构 ===
    let cutting = state
        .process_api
        .create_subprocess("SP-CUT", "下料", SEED_ACTOR, SEED_ROLE)?;
    let coating = state
        .process_api
        .create_subprocess("SP-COAT", "涂装", SEED_ACTOR, SEED_ROLE)?;

    let process = state.process_api.create_process(
        "PROC-PANEL",
        "面板制造",
        Some("装配件"),
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.process_api.attach_subprocess(
        &process.process_id,
        &cutting.subprocess_id,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.process_api.attach_subprocess(
        &process.process_id,
        &coating.subprocess_id,
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // 下料: 钢/铝二选一（替代组）
    let steel_usage = state.process_api.add_variant_usage(
        &cutting.subprocess_id,
        &steel.variant_id,
        "5".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    let alu_usage = state.process_api.add_variant_usage(
        &cutting.subprocess_id,
        &alu.variant_id,
        "4".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    let group = state.process_api.create_substitute_group(
        &cutting.subprocess_id,
        "基材二选一",
        &[steel_usage.usage_id.clone(), alu_usage.usage_id.clone()],
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // 涂装: 固定用漆 + 人工成本
    state.process_api.add_variant_usage(
        &coating.subprocess_id,
        &paint.variant_id,
        "1.5".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.process_api.add_cost_item(
        &coating.subprocess_id,
        "喷涂人工",
        CostCategory::Labor,
        "120.00".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;
    state.process_api.add_overhead_item(
        &process.process_id,
        "车间摊销",
        "300.00".parse()?,
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // 启用工艺后才可开批次
    state.process_api.set_process_status(
        &process.process_id,
        ProcessStatus::Active,
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // === 生产批次（选钢板,漆库存为零 → 触发 CRITICAL 告警） ===
    let start_date = Local::now().date_naive() + Duration::days(14);
    let lot = state.lot_api.create_lot(
        "LOT-2024-001",
        &process.process_id,
        "10".parse()?,
        start_date,
        &[(group.group_id.clone(), steel.variant_id.clone())],
        SEED_ACTOR,
        SEED_ROLE,
    )?;

    // 成本快照
    state
        .costing_api
        .refresh_lot_cost(&lot.lot_id, SEED_ACTOR, SEED_ROLE)?;

    Ok(())
}

fn print_quick_counts(state: &AppState) -> Result<(), Box<dyn Error>> {
    let summary = state.dashboard_api.get_summary()?;
    eprintln!("批次: {:?}", summary.lot_counts);
    eprintln!("工艺: {:?}", summary.process_counts);
    eprintln!("未确认告警: {:?}", summary.alert_counts);
    Ok(())
}
