// ==========================================
// 制造追踪与成本核算系统 - 报价导入器实现
// ==========================================
// 职责: 整合报价单导入流程，从文件到数据库
// 流程: 解析 → 映射 → 清洗 → DQ 校验 → 主数据解析/冲突检测 → 落库
// 红线: ERROR/冲突行不得落库; 落库必须单事务
// ==========================================

use crate::config::ImportConfigReader;
use crate::domain::import::{
    ConflictType, DqLevel, DqViolation, ImportBatch, ImportConflict, PricingImportResult,
    RawPricingRecord,
};
use crate::domain::types::PricingStatus;
use crate::domain::variant::SupplierPricing;
use crate::importer::pricing_importer_trait::{
    ConflictHandler, DataCleaner, DqValidator, FieldMapper, FileParser, PricingImporter,
};
use crate::repository::import_repo::ImportRepository;
use crate::repository::variant_repo::VariantRepository;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

// ==========================================
// PricingImporterImpl - 报价导入器实现
// ==========================================
pub struct PricingImporterImpl<C>
where
    C: ImportConfigReader,
{
    // 数据访问层
    variant_repo: VariantRepository,
    import_repo: ImportRepository,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    field_mapper: Box<dyn FieldMapper>,
    data_cleaner: Box<dyn DataCleaner>,
    dq_validator: Box<dyn DqValidator>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl<C> PricingImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 创建新的 PricingImporter 实例
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        variant_repo: VariantRepository,
        import_repo: ImportRepository,
        config: C,
        file_parser: Box<dyn FileParser>,
        field_mapper: Box<dyn FieldMapper>,
        data_cleaner: Box<dyn DataCleaner>,
        dq_validator: Box<dyn DqValidator>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            variant_repo,
            import_repo,
            config,
            file_parser,
            field_mapper,
            data_cleaner,
            dq_validator,
            conflict_handler,
        }
    }
}

#[async_trait::async_trait]
impl<C> PricingImporter for PricingImporterImpl<C>
where
    C: ImportConfigReader + Send + Sync,
{
    #[instrument(skip(self, file_path), fields(batch_id))]
    async fn import_file<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        imported_by: &str,
    ) -> Result<PricingImportResult, Box<dyn Error>> {
        use std::time::Instant;
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        // 配置先行读取，后续全流程为同步计算
        let max_price = self.config.get_max_price().await?;

        let file_path_str = file_path.as_ref().to_str().unwrap_or("unknown");
        info!(batch_id = %batch_id, file_path = %file_path_str, "开始导入供应商报价");

        // === 步骤 1: 解析文件 ===
        debug!("步骤 1: 解析文件");
        let raw_rows = self
            .file_parser
            .parse_to_raw_records(file_path.as_ref())
            .map_err(|e| {
                error!(error = %e, "文件解析失败");
                format!("文件解析失败: {}", e)
            })?;

        let total_rows = raw_rows.len();
        info!(total_rows = total_rows, "文件解析完成");

        // === 步骤 2: 字段映射 ===
        debug!("步骤 2: 字段映射");
        let mut records: Vec<RawPricingRecord> = raw_rows
            .into_iter()
            .enumerate()
            .map(|(idx, row)| self.field_mapper.map_to_raw_pricing(row, idx + 1))
            .collect();

        // === 步骤 3: 数据清洗 ===
        debug!("步骤 3: 数据清洗");
        for record in &mut records {
            self.clean_record(record);
        }

        // === 步骤 4: DQ 校验 ===
        debug!("步骤 4: DQ 校验");
        let mut violations: Vec<DqViolation> = Vec::new();
        for record in &records {
            violations.extend(self.dq_validator.validate_record(record, max_price));
        }

        let blocked_rows: HashSet<usize> = violations
            .iter()
            .filter(|v| v.level == DqLevel::Error)
            .map(|v| v.row_number)
            .collect();
        info!(
            violations = violations.len(),
            blocked = blocked_rows.len(),
            "DQ 校验完成"
        );

        // === 步骤 5: 主数据解析 + 冲突检测 ===
        debug!("步骤 5: 主数据解析与冲突检测");
        let candidates: Vec<&RawPricingRecord> = records
            .iter()
            .filter(|r| !blocked_rows.contains(&r.row_number))
            .collect();

        let codes: Vec<String> = candidates
            .iter()
            .filter_map(|r| r.variant_code.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let code_map = self
            .variant_repo
            .batch_resolve_codes(&codes)
            .map_err(|e| format!("物料编码解析失败: {}", e))?;
        let known_codes: HashSet<String> = code_map.keys().cloned().collect();

        let candidate_records: Vec<RawPricingRecord> =
            candidates.into_iter().cloned().collect();
        let unknown = self
            .conflict_handler
            .detect_unknown_codes(&candidate_records, &known_codes);
        let duplicates = self.conflict_handler.detect_duplicates(&candidate_records);

        let mut conflict_rows: HashSet<usize> = HashSet::new();
        let mut conflicts: Vec<ImportConflict> = Vec::new();

        for (row_number, code) in unknown {
            conflict_rows.insert(row_number);
            conflicts.push(self.make_conflict(
                &batch_id,
                &candidate_records,
                row_number,
                Some(code.clone()),
                ConflictType::UnknownVariantCode,
                format!("物料编码不存在于主数据: {}", code),
            ));
        }
        for (row_number, code) in duplicates {
            if conflict_rows.insert(row_number) {
                conflicts.push(self.make_conflict(
                    &batch_id,
                    &candidate_records,
                    row_number,
                    Some(code.clone()),
                    ConflictType::DuplicateInBatch,
                    format!("同批次内重复报价 (物料 {}, 同一供应商)", code),
                ));
            }
        }

        for conflict in &conflicts {
            violations.push(DqViolation {
                row_number: conflict.row_number,
                variant_code: conflict.variant_code.clone(),
                level: DqLevel::Conflict,
                field: "variant_code".to_string(),
                message: conflict.reason.clone(),
            });
        }
        info!(conflicts = conflicts.len(), "冲突检测完成");

        // === 步骤 6: 组装并落库（单事务 upsert）===
        debug!("步骤 6: 报价落库");
        let now = Utc::now();
        let pricings: Vec<SupplierPricing> = candidate_records
            .iter()
            .filter(|r| !conflict_rows.contains(&r.row_number))
            .filter_map(|r| {
                let code = r.variant_code.as_ref()?;
                let variant_id = code_map.get(code)?.clone();
                Some(SupplierPricing {
                    pricing_id: Uuid::new_v4().to_string(),
                    variant_id,
                    supplier_name: r.supplier_name.clone()?,
                    unit_price: r.unit_price?,
                    lead_time_days: r.lead_time_days.unwrap_or(0),
                    status: r.status.unwrap_or(PricingStatus::Active),
                    created_at: now,
                    updated_at: now,
                })
            })
            .collect();

        let success_count = self
            .variant_repo
            .batch_upsert_pricing(pricings)
            .map_err(|e| format!("报价落库失败: {}", e))?;
        info!(count = success_count, "报价落库完成");

        // === 步骤 7: DQ 报告 + 批次记录 ===
        let dq_report = self.dq_validator.generate_dq_report(
            batch_id.clone(),
            total_rows,
            success_count,
            violations,
        );

        let elapsed_time = start_time.elapsed();
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            file_name: Some(
                Path::new(file_path_str)
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            ),
            file_path: Some(file_path_str.to_string()),
            total_rows: total_rows as i32,
            success_rows: success_count as i32,
            blocked_rows: dq_report.summary.blocked as i32,
            warning_rows: dq_report.summary.warning as i32,
            conflict_rows: dq_report.summary.conflict as i32,
            imported_at: Some(Utc::now()),
            imported_by: Some(imported_by.to_string()),
            elapsed_ms: Some(elapsed_time.as_millis() as i32),
            dq_report_json: Some(serde_json::to_string(&dq_report)?),
        };

        // 冲突行外键指向批次记录,必须先落批次再落冲突
        self.import_repo
            .insert_batch(&batch)
            .map_err(|e| format!("批次记录写入失败: {}", e))?;
        if !conflicts.is_empty() {
            self.import_repo
                .insert_conflicts(&conflicts)
                .map_err(|e| format!("冲突记录写入失败: {}", e))?;
        }

        info!(
            batch_id = %batch_id,
            total = total_rows,
            success = success_count,
            blocked = dq_report.summary.blocked,
            conflicts = dq_report.summary.conflict,
            elapsed_ms = elapsed_time.as_millis(),
            "供应商报价导入完成"
        );

        Ok(PricingImportResult {
            batch,
            summary: dq_report.summary,
            violations: dq_report.violations,
            elapsed_time,
        })
    }

    /// 批量导入多个文件（并发执行）
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        imported_by: &str,
    ) -> Result<Vec<Result<PricingImportResult, String>>, Box<dyn Error>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入报价单");

        // 为每个文件创建导入任务
        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().to_str().unwrap_or("unknown").to_string();
            async move {
                info!(file = %path_str, "开始导入文件");
                match self.import_file(path, imported_by).await {
                    Ok(result) => {
                        info!(
                            file = %path_str,
                            success = result.summary.success,
                            "文件导入成功"
                        );
                        Ok(result)
                    }
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            }
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        Ok(results)
    }
}

// 辅助方法
impl<C> PricingImporterImpl<C>
where
    C: ImportConfigReader,
{
    /// 清洗单条记录
    ///
    /// - 物料编码: TRIM + UPPER（主数据编码统一大写口径）
    /// - 供应商: TRIM（保留原大小写）
    /// - 状态: 标准化为 PricingStatus（缺失时默认 ACTIVE）
    fn clean_record(&self, record: &mut RawPricingRecord) {
        record.variant_code = record
            .variant_code
            .as_ref()
            .map(|v| self.data_cleaner.clean_text(v, true))
            .and_then(|v| self.data_cleaner.normalize_null(Some(v)));

        record.supplier_name = record
            .supplier_name
            .as_ref()
            .map(|v| self.data_cleaner.clean_text(v, false))
            .and_then(|v| self.data_cleaner.normalize_null(Some(v)));

        record.status = match &record.status_raw {
            Some(raw) => self.data_cleaner.clean_status(Some(raw)),
            None => Some(PricingStatus::Active), // 缺失默认有效
        };
    }

    /// 构造冲突记录（原始行序列化进 raw_data 供人工排查）
    fn make_conflict(
        &self,
        batch_id: &str,
        records: &[RawPricingRecord],
        row_number: usize,
        variant_code: Option<String>,
        conflict_type: ConflictType,
        reason: String,
    ) -> ImportConflict {
        let raw_data = records
            .iter()
            .find(|r| r.row_number == row_number)
            .map(|r| {
                json!({
                    "variant_code": r.variant_code,
                    "supplier_name": r.supplier_name,
                    "unit_price": r.unit_price_raw,
                    "lead_time_days": r.lead_time_days_raw,
                    "status": r.status_raw,
                })
                .to_string()
            })
            .unwrap_or_else(|| "{}".to_string());

        ImportConflict {
            conflict_id: Uuid::new_v4().to_string(),
            batch_id: batch_id.to_string(),
            row_number,
            variant_code,
            conflict_type,
            raw_data,
            reason,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
            created_at: Utc::now(),
        }
    }
}
