// ==========================================
// 制造追踪与成本核算系统 - 冲突检测器实现
// ==========================================
// 职责: 检测批内 (物料编码, 供应商) 重复与主数据未命中编码（阶段 4）
// 约束: 重复保留首行, 后出现的行进冲突队列
// ==========================================

use crate::domain::import::RawPricingRecord;
use crate::importer::pricing_importer_trait::ConflictHandler as ConflictHandlerTrait;
use std::collections::{HashMap, HashSet};

pub struct PricingConflictHandler;

impl ConflictHandlerTrait for PricingConflictHandler {
    /// 检测同批次内 (物料编码, 供应商) 重复
    ///
    /// # 返回
    /// - Vec<(行号, 物料编码)>: 重复记录列表（不包括第一次出现）
    fn detect_duplicates(&self, records: &[RawPricingRecord]) -> Vec<(usize, String)> {
        let mut first_occurrence: HashMap<(String, String), usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for record in records {
            let (code, supplier) = match (&record.variant_code, &record.supplier_name) {
                (Some(c), Some(s)) => (c.clone(), s.clone()),
                _ => continue, // 缺关键字段的行由 DQ 校验阻断
            };

            let key = (code.clone(), supplier);
            match first_occurrence.get(&key) {
                Some(_) => duplicates.push((record.row_number, code)),
                None => {
                    first_occurrence.insert(key, record.row_number);
                }
            }
        }

        duplicates
    }

    /// 检测主数据未命中的物料编码
    fn detect_unknown_codes(
        &self,
        records: &[RawPricingRecord],
        known_codes: &HashSet<String>,
    ) -> Vec<(usize, String)> {
        records
            .iter()
            .filter_map(|record| {
                let code = record.variant_code.as_ref()?;
                if known_codes.contains(code) {
                    None
                } else {
                    Some((record.row_number, code.clone()))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(row: usize, code: &str, supplier: &str) -> RawPricingRecord {
        RawPricingRecord {
            variant_code: Some(code.to_string()),
            supplier_name: Some(supplier.to_string()),
            row_number: row,
            ..Default::default()
        }
    }

    #[test]
    fn test_detect_duplicates_keeps_first() {
        let handler = PricingConflictHandler;
        let records = vec![
            make_record(1, "V-001", "华东钢材"),
            make_record(2, "V-001", "北方金属"), // 同编码不同供应商, 不算重复
            make_record(3, "V-001", "华东钢材"), // 重复
            make_record(4, "V-002", "华东钢材"),
        ];

        let duplicates = handler.detect_duplicates(&records);
        assert_eq!(duplicates, vec![(3, "V-001".to_string())]);
    }

    #[test]
    fn test_detect_duplicates_skips_incomplete_rows() {
        let handler = PricingConflictHandler;
        let mut incomplete = make_record(2, "V-001", "华东钢材");
        incomplete.supplier_name = None;

        let records = vec![make_record(1, "V-001", "华东钢材"), incomplete];
        assert!(handler.detect_duplicates(&records).is_empty());
    }

    #[test]
    fn test_detect_unknown_codes() {
        let handler = PricingConflictHandler;
        let records = vec![
            make_record(1, "V-001", "华东钢材"),
            make_record(2, "V-999", "北方金属"),
        ];
        let known: HashSet<String> = ["V-001".to_string()].into_iter().collect();

        let unknown = handler.detect_unknown_codes(&records, &known);
        assert_eq!(unknown, vec![(2, "V-999".to_string())]);
    }
}
