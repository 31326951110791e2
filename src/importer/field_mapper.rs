// ==========================================
// 制造追踪与成本核算系统 - 字段映射器实现
// ==========================================
// 职责: 报价单源字段 → 标准字段映射 + 类型转换（阶段 1）
// 红线: 类型转换失败不阻断映射,保留原始值交由 DQ 定级
// ==========================================

use crate::domain::import::RawPricingRecord;
use crate::importer::pricing_importer_trait::FieldMapper as FieldMapperTrait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

pub struct PricingFieldMapper;

impl FieldMapperTrait for PricingFieldMapper {
    fn map_to_raw_pricing(
        &self,
        row: HashMap<String, String>,
        row_number: usize,
    ) -> RawPricingRecord {
        let variant_code = self.get_string(&row, "variant_code");
        let supplier_name = self.get_string(&row, "supplier_name");
        let unit_price_raw = self.get_string(&row, "unit_price");
        let lead_time_days_raw = self.get_string(&row, "lead_time_days");
        let status_raw = self.get_string(&row, "status");

        // 类型转换: 失败保持 None, 原始串保留给 DQ 报告
        let unit_price = unit_price_raw
            .as_deref()
            .and_then(|v| Decimal::from_str(v).ok());
        let lead_time_days = lead_time_days_raw
            .as_deref()
            .and_then(|v| v.parse::<i32>().ok());

        RawPricingRecord {
            variant_code,
            supplier_name,
            unit_price_raw,
            lead_time_days_raw,
            status_raw,
            unit_price,
            lead_time_days,
            status: None, // 状态标准化在清洗阶段完成
            variant_id: None, // 主数据解析在冲突检测阶段完成
            row_number,
        }
    }
}

impl PricingFieldMapper {
    /// 提取字符串字段（返回 Option），支持多个可能的列名（别名）
    fn get_string(&self, row: &HashMap<String, String>, key: &str) -> Option<String> {
        // 定义列名别名映射
        let aliases: Vec<&str> = match key {
            "variant_code" => vec!["variant_code", "物料编码", "编码"],
            "supplier_name" => vec!["supplier_name", "供应商", "供应商名称"],
            "unit_price" => vec!["unit_price", "单价", "报价"],
            "lead_time_days" => vec!["lead_time_days", "供货周期", "供货周期(天)", "交期天数"],
            "status" => vec!["status", "状态", "报价状态"],
            _ => vec![key],
        };

        // 尝试所有可能的列名
        for alias in aliases {
            if let Some(v) = row.get(alias) {
                let trimmed = v.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }
}
