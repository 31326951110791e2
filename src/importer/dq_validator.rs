// ==========================================
// 制造追踪与成本核算系统 - 数据质量校验器实现
// ==========================================
// 职责: 报价记录必填/类型/范围校验 + DQ 报告生成（阶段 3）
// 红线: ERROR 阻断该行导入, WARNING 放行但必须进报告
// ==========================================

use crate::domain::import::{DqLevel, DqReport, DqSummary, DqViolation, RawPricingRecord};
use crate::importer::pricing_importer_trait::DqValidator as DqValidatorTrait;
use rust_decimal::Decimal;
use std::collections::HashSet;

pub struct PricingDqValidator;

impl DqValidatorTrait for PricingDqValidator {
    /// 校验单条记录
    ///
    /// ERROR 规则:
    /// - variant_code / supplier_name 缺失
    /// - unit_price 缺失或无法解析或为负
    /// - lead_time_days 无法解析或为负
    ///
    /// WARNING 规则:
    /// - unit_price 超过合理性上限（疑似单位错误）
    /// - lead_time_days 缺失（默认 0）
    /// - status 无法识别（默认 ACTIVE）
    fn validate_record(&self, record: &RawPricingRecord, max_price: Decimal) -> Vec<DqViolation> {
        let mut violations = Vec::new();
        let row = record.row_number;
        let code = record.variant_code.clone();

        if record.variant_code.is_none() {
            violations.push(DqViolation {
                row_number: row,
                variant_code: None,
                level: DqLevel::Error,
                field: "variant_code".to_string(),
                message: "物料编码缺失".to_string(),
            });
        }

        if record.supplier_name.is_none() {
            violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "supplier_name".to_string(),
                message: "供应商名称缺失".to_string(),
            });
        }

        match (&record.unit_price_raw, record.unit_price) {
            (None, _) => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "unit_price".to_string(),
                message: "单价缺失".to_string(),
            }),
            (Some(raw), None) => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "unit_price".to_string(),
                message: format!("单价无法解析: {}", raw),
            }),
            (Some(_), Some(price)) if price < Decimal::ZERO => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "unit_price".to_string(),
                message: format!("单价不得为负: {}", price),
            }),
            (Some(_), Some(price)) if price > max_price => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Warning,
                field: "unit_price".to_string(),
                message: format!("单价 {} 超过上限 {}, 疑似单位错误", price, max_price),
            }),
            _ => {}
        }

        match (&record.lead_time_days_raw, record.lead_time_days) {
            (None, _) => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Warning,
                field: "lead_time_days".to_string(),
                message: "供货周期缺失, 默认 0 天".to_string(),
            }),
            (Some(raw), None) => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "lead_time_days".to_string(),
                message: format!("供货周期无法解析: {}", raw),
            }),
            (Some(_), Some(days)) if days < 0 => violations.push(DqViolation {
                row_number: row,
                variant_code: code.clone(),
                level: DqLevel::Error,
                field: "lead_time_days".to_string(),
                message: format!("供货周期不得为负: {}", days),
            }),
            _ => {}
        }

        if let Some(raw) = &record.status_raw {
            if record.status.is_none() {
                violations.push(DqViolation {
                    row_number: row,
                    variant_code: code,
                    level: DqLevel::Warning,
                    field: "status".to_string(),
                    message: format!("报价状态无法识别: {}, 默认 ACTIVE", raw),
                });
            }
        }

        violations
    }

    fn generate_dq_report(
        &self,
        batch_id: String,
        total_rows: usize,
        success: usize,
        violations: Vec<DqViolation>,
    ) -> DqReport {
        let blocked: HashSet<usize> = violations
            .iter()
            .filter(|v| v.level == DqLevel::Error)
            .map(|v| v.row_number)
            .collect();
        let conflict: HashSet<usize> = violations
            .iter()
            .filter(|v| v.level == DqLevel::Conflict)
            .map(|v| v.row_number)
            .collect();
        let warning: HashSet<usize> = violations
            .iter()
            .filter(|v| v.level == DqLevel::Warning)
            .map(|v| v.row_number)
            .filter(|row| !blocked.contains(row) && !conflict.contains(row))
            .collect();

        DqReport {
            batch_id,
            summary: DqSummary {
                total_rows,
                success,
                blocked: blocked.len(),
                warning: warning.len(),
                conflict: conflict.len(),
            },
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PricingStatus;
    use rust_decimal_macros::dec;

    fn valid_record() -> RawPricingRecord {
        RawPricingRecord {
            variant_code: Some("V-001".to_string()),
            supplier_name: Some("华东钢材".to_string()),
            unit_price_raw: Some("12.50".to_string()),
            lead_time_days_raw: Some("7".to_string()),
            status_raw: Some("ACTIVE".to_string()),
            unit_price: Some(dec!(12.50)),
            lead_time_days: Some(7),
            status: Some(PricingStatus::Active),
            variant_id: None,
            row_number: 1,
        }
    }

    #[test]
    fn test_valid_record_no_violations() {
        let validator = PricingDqValidator;
        assert!(validator.validate_record(&valid_record(), dec!(1000000)).is_empty());
    }

    #[test]
    fn test_missing_required_fields_are_errors() {
        let validator = PricingDqValidator;
        let mut record = valid_record();
        record.variant_code = None;
        record.supplier_name = None;

        let violations = validator.validate_record(&record, dec!(1000000));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().all(|v| v.level == DqLevel::Error));
    }

    #[test]
    fn test_unparseable_price_is_error() {
        let validator = PricingDqValidator;
        let mut record = valid_record();
        record.unit_price_raw = Some("abc".to_string());
        record.unit_price = None;

        let violations = validator.validate_record(&record, dec!(1000000));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Error);
        assert_eq!(violations[0].field, "unit_price");
    }

    #[test]
    fn test_negative_price_is_error() {
        let validator = PricingDqValidator;
        let mut record = valid_record();
        record.unit_price = Some(dec!(-1));

        let violations = validator.validate_record(&record, dec!(1000000));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Error);
    }

    #[test]
    fn test_price_over_limit_is_warning() {
        let validator = PricingDqValidator;
        let mut record = valid_record();
        record.unit_price = Some(dec!(2000000));

        let violations = validator.validate_record(&record, dec!(1000000));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Warning);
    }

    #[test]
    fn test_missing_lead_time_is_warning() {
        let validator = PricingDqValidator;
        let mut record = valid_record();
        record.lead_time_days_raw = None;
        record.lead_time_days = None;

        let violations = validator.validate_record(&record, dec!(1000000));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].level, DqLevel::Warning);
        assert_eq!(violations[0].field, "lead_time_days");
    }

    #[test]
    fn test_report_counts_rows_not_violations() {
        // 同一行多条 ERROR 只计一次 blocked; 同行 WARNING 不重复计
        let validator = PricingDqValidator;
        let mut bad = valid_record();
        bad.variant_code = None;
        bad.supplier_name = None;
        bad.unit_price = Some(dec!(2000000));

        let violations = validator.validate_record(&bad, dec!(1000000));
        let report = validator.generate_dq_report("B1".to_string(), 5, 4, violations);

        assert_eq!(report.summary.total_rows, 5);
        assert_eq!(report.summary.success, 4);
        assert_eq!(report.summary.blocked, 1);
        assert_eq!(report.summary.warning, 0);
    }
}
