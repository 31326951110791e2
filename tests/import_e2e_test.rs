// ==========================================
// 报价导入端到端测试
// ==========================================
// 目标: CSV 导入全流水线（解析→清洗→DQ→冲突→落库）与冲突处理
// ==========================================


use std::fs;

use rust_decimal_macros::dec;

use mtc_tracking::api::ApiError;
use mtc_tracking::domain::import::ConflictType;
use mtc_tracking::domain::types::{OperatorRole, PricingStatus};

use test_helpers::{setup_state, ACTOR, ROLE};

/// 基础物料: MAT-STEEL-01（无报价）
fn seed_variant(state: &mtc_tracking::app::AppState) -> String {
    state
        .variant_api
        .create_variant(
            "MAT-STEEL-01",
            "冷轧钢板",
            "kg",
            dec!(500),
            dec!(100),
            dec!(200),
            ACTOR,
            ROLE,
        )
        .unwrap()
        .variant_id
}

#[tokio::test]
async fn test_csv_import_full_pipeline() {
    let (_tmp, state) = setup_state().unwrap();
    let variant_id = seed_variant(&state);

    // 行1 正常; 行2 编码未命中 → 冲突; 行3 负单价 → DQ 阻断; 行4 批内重复 → 冲突
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("pricing.csv");
    fs::write(
        &csv_path,
        "variant_code,supplier_name,unit_price,lead_time_days\n\
         MAT-STEEL-01,华东钢铁,8.50,5\n\
         MAT-UNKNOWN,未知供应商,10.00,3\n\
         MAT-STEEL-01,报废供应商,-5,2\n\
         MAT-STEEL-01,华东钢铁,9.00,4\n",
    )
    .unwrap();

    let result = state
        .import_api
        .import_pricing_file(csv_path.to_str().unwrap(), ACTOR, OperatorRole::Planner)
        .await;
    let result = match result {
        Ok(r) => r,
        Err(e) => panic!("导入失败: {}", e),
    };

    assert_eq!(result.batch.total_rows, 4);
    assert_eq!(result.batch.success_rows, 1);
    assert_eq!(result.batch.blocked_rows, 1);
    assert_eq!(result.batch.conflict_rows, 2);

    // 只有行1落库, 保留首行口径
    let pricing = state.variant_api.list_pricing(&variant_id).unwrap();
    assert_eq!(pricing.len(), 1);
    assert_eq!(pricing[0].supplier_name, "华东钢铁");
    assert_eq!(pricing[0].unit_price, dec!(8.50));
    assert_eq!(pricing[0].lead_time_days, 5);
    assert_eq!(pricing[0].status, PricingStatus::Active);

    // 批次历史可查
    let batches = state.import_api.list_import_batches(10).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].batch_id, result.batch.batch_id);
    assert_eq!(batches[0].imported_by.as_deref(), Some(ACTOR));
}

#[tokio::test]
async fn test_conflict_queue_and_resolution() {
    let (_tmp, state) = setup_state().unwrap();
    seed_variant(&state);

    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("pricing.csv");
    fs::write(
        &csv_path,
        "variant_code,supplier_name,unit_price,lead_time_days\n\
         MAT-UNKNOWN,未知供应商,10.00,3\n\
         MAT-STEEL-01,华东钢铁,8.50,5\n\
         MAT-STEEL-01,华东钢铁,9.00,4\n",
    )
    .unwrap();

    let result = state
        .import_api
        .import_pricing_file(csv_path.to_str().unwrap(), ACTOR, OperatorRole::Admin)
        .await
        .unwrap();
    assert_eq!(result.batch.conflict_rows, 2);

    let conflicts = state
        .import_api
        .list_import_conflicts(Some(&result.batch.batch_id), false)
        .unwrap();
    assert_eq!(conflicts.len(), 2);
    assert!(conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::UnknownVariantCode
            && c.variant_code.as_deref() == Some("MAT-UNKNOWN")));
    assert!(conflicts
        .iter()
        .any(|c| c.conflict_type == ConflictType::DuplicateInBatch));

    // 处理一条冲突
    let resolved = state
        .import_api
        .resolve_import_conflict(&conflicts[0].conflict_id, ACTOR, OperatorRole::Admin)
        .unwrap();
    assert!(resolved.resolved);
    assert_eq!(resolved.resolved_by.as_deref(), Some(ACTOR));

    // 重复处理 → 冲突
    let err = state
        .import_api
        .resolve_import_conflict(&conflicts[0].conflict_id, ACTOR, OperatorRole::Admin)
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // 未处理过滤
    let open = state
        .import_api
        .list_import_conflicts(Some(&result.batch.batch_id), false)
        .unwrap();
    assert_eq!(open.len(), 1);
    let all = state
        .import_api
        .list_import_conflicts(Some(&result.batch.batch_id), true)
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_import_rejects_viewer_and_missing_file() {
    let (_tmp, state) = setup_state().unwrap();
    seed_variant(&state);

    let err = state
        .import_api
        .import_pricing_file("/tmp/any.csv", ACTOR, OperatorRole::Viewer)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    let err = state
        .import_api
        .import_pricing_file("/不存在/的/文件.csv", ACTOR, OperatorRole::Admin)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
}
