// ==========================================
// 制造追踪与成本核算系统 - 数据清洗器实现
// ==========================================
// 职责: TRIM / UPPER / NULL 标准化 / 报价状态标准化（阶段 2）
// ==========================================

use crate::domain::types::PricingStatus;
use crate::importer::pricing_importer_trait::DataCleaner as DataCleanerTrait;

pub struct PricingDataCleaner;

impl DataCleanerTrait for PricingDataCleaner {
    fn clean_text(&self, value: &str, uppercase: bool) -> String {
        let trimmed = value.trim();
        if uppercase {
            trimmed.to_uppercase()
        } else {
            trimmed.to_string()
        }
    }

    fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    fn clean_status(&self, value: Option<&str>) -> Option<PricingStatus> {
        let raw = value?.trim();
        if raw.is_empty() {
            return None;
        }

        match raw.to_uppercase().as_str() {
            "ACTIVE" | "有效" | "启用" | "1" | "Y" | "TRUE" => Some(PricingStatus::Active),
            "INACTIVE" | "停用" | "失效" | "0" | "N" | "FALSE" => Some(PricingStatus::Inactive),
            _ => None, // 无法识别，由 DQ 校验定级
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = PricingDataCleaner;
        assert_eq!(cleaner.clean_text("  v-001  ", false), "v-001");
        assert_eq!(cleaner.clean_text("  v-001  ", true), "V-001");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = PricingDataCleaner;
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(cleaner.normalize_null(Some("".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_clean_status_aliases() {
        let cleaner = PricingDataCleaner;
        assert_eq!(cleaner.clean_status(Some("ACTIVE")), Some(PricingStatus::Active));
        assert_eq!(cleaner.clean_status(Some("有效")), Some(PricingStatus::Active));
        assert_eq!(cleaner.clean_status(Some("y")), Some(PricingStatus::Active));
        assert_eq!(cleaner.clean_status(Some("停用")), Some(PricingStatus::Inactive));
        assert_eq!(cleaner.clean_status(Some("0")), Some(PricingStatus::Inactive));
        assert_eq!(cleaner.clean_status(Some("未知状态")), None);
        assert_eq!(cleaner.clean_status(None), None);
    }

}
