// ==========================================
// 制造追踪与成本核算系统 - 最坏情况成本引擎
// ==========================================
// 红线: 金额一律 Decimal, 报出口径统一 2 位小数
// 红线: 替代组取"最贵成员"口径; 只消费 ACTIVE 报价
// 红线: 缺活跃报价的组/用料按 0 计入且必须进 warnings
// ==========================================
// 职责: 工艺最坏情况成本报告 + 批次成本快照
// 输入: API 层装配好的工艺结构与活跃报价 (引擎不查库)
// 输出: ProcessCostReport / LotCostSnapshot
// ==========================================

use crate::domain::costing::{
    CostItemLine, CostingWarning, GroupCostLine, OverheadCostLine, ProcessCostReport,
    SubprocessCostLine, UsageCostLine,
};
use crate::domain::lot::LotCostSnapshot;
use crate::domain::process::{
    CostItem, OverheadItem, Process, ProcessSubprocessLink, Subprocess, SubstituteGroup,
    VariantUsage,
};
use crate::domain::types::CostCategory;
use crate::domain::variant::SupplierPricing;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// 金额报出口径: 2 位小数, 四舍五入远离零
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

// ==========================================
// 引擎输入
// ==========================================

/// 单个工序的结构切片（按挂接顺序装配）
pub struct SubprocessSection {
    pub link: ProcessSubprocessLink,
    pub subprocess: Subprocess,
    pub usages: Vec<VariantUsage>,
    pub groups: Vec<SubstituteGroup>,
    pub cost_items: Vec<CostItem>,
}

/// 工艺成本计算输入
///
/// - pricing: variant_id -> 活跃报价行（INACTIVE 行不得混入）
/// - variant_codes: variant_id -> variant_code（行明细与告警解释用）
pub struct ProcessCostInput {
    pub process: Process,
    pub sections: Vec<SubprocessSection>,
    pub overheads: Vec<OverheadItem>,
    pub pricing: HashMap<String, Vec<SupplierPricing>>,
    pub variant_codes: HashMap<String, String>,
}

// ==========================================
// CostingEngine - 最坏情况成本引擎
// ==========================================
pub struct CostingEngine;

impl CostingEngine {
    /// 创建新的成本引擎
    pub fn new() -> Self {
        Self
    }

    // ==========================================
    // 工艺最坏情况成本报告
    // ==========================================

    /// 计算工艺的最坏情况成本报告
    ///
    /// 口径:
    /// - 替代组: 取成员候选成本的最大值, 候选 = MAX(活跃单价) × 成员用量
    /// - 非替代组用料: MAX(活跃单价) × 用量
    /// - 工序小计 = 物料成本 + 固定成本项
    /// - 工艺总成本 = Σ 工序小计 + Σ 工艺费用项
    #[instrument(skip(self, input), fields(process_id = %input.process.process_id))]
    pub fn build_process_report(&self, input: &ProcessCostInput) -> ProcessCostReport {
        let mut subprocess_lines = Vec::with_capacity(input.sections.len());
        let mut warnings = Vec::new();

        let mut material_total = Decimal::ZERO;
        let mut labor_total = Decimal::ZERO;
        let mut other_item_total = Decimal::ZERO;

        for section in &input.sections {
            let line = self.build_subprocess_line(section, input, &mut warnings);

            material_total += line.material_cost;
            for item in &section.cost_items {
                if item.category == CostCategory::Labor {
                    labor_total += item.amount;
                } else {
                    other_item_total += item.amount;
                }
            }

            subprocess_lines.push(line);
        }

        let overhead_lines: Vec<OverheadCostLine> = input
            .overheads
            .iter()
            .map(|o| OverheadCostLine {
                overhead_id: o.overhead_id.clone(),
                item_name: o.item_name.clone(),
                amount: round_money(o.amount),
            })
            .collect();
        let overhead_total: Decimal = input.overheads.iter().map(|o| o.amount).sum();

        let material_cost = round_money(material_total);
        let labor_cost = round_money(labor_total);
        let other_item_cost = round_money(other_item_total);
        let overhead_cost = round_money(overhead_total);
        let total_cost =
            round_money(material_total + labor_total + other_item_total + overhead_total);

        debug!(
            total = %total_cost,
            warnings = warnings.len(),
            "最坏情况成本报告生成完成"
        );

        ProcessCostReport {
            process_id: input.process.process_id.clone(),
            process_code: input.process.process_code.clone(),
            process_name: input.process.process_name.clone(),
            subprocess_lines,
            overhead_lines,
            material_cost,
            labor_cost,
            other_item_cost,
            overhead_cost,
            total_cost,
            warnings,
            generated_at: chrono::Utc::now(),
        }
    }

    fn build_subprocess_line(
        &self,
        section: &SubprocessSection,
        input: &ProcessCostInput,
        warnings: &mut Vec<CostingWarning>,
    ) -> SubprocessCostLine {
        let mut material = Decimal::ZERO;

        // 替代组: 每组取最坏成员
        let mut group_lines = Vec::with_capacity(section.groups.len());
        for group in &section.groups {
            let members: Vec<&VariantUsage> = section
                .usages
                .iter()
                .filter(|u| u.group_id.as_deref() == Some(group.group_id.as_str()))
                .collect();

            let line = self.build_group_line(group, &members, input);
            if !line.has_active_pricing {
                warnings.push(CostingWarning {
                    subprocess_id: section.subprocess.subprocess_id.clone(),
                    group_id: Some(group.group_id.clone()),
                    variant_id: None,
                    message: format!("替代组 {} 无任何活跃报价, 组成本按 0 计入", group.group_name),
                });
            }
            material += line.cost;
            group_lines.push(line);
        }

        // 非替代组用料
        let mut usage_lines = Vec::new();
        for usage in section.usages.iter().filter(|u| u.group_id.is_none()) {
            let max_price = max_active_price(&input.pricing, &usage.variant_id);
            let variant_code = input
                .variant_codes
                .get(&usage.variant_id)
                .cloned()
                .unwrap_or_else(|| usage.variant_id.clone());

            let cost = match max_price {
                Some(price) => round_money(price * usage.quantity),
                None => {
                    warnings.push(CostingWarning {
                        subprocess_id: section.subprocess.subprocess_id.clone(),
                        group_id: None,
                        variant_id: Some(usage.variant_id.clone()),
                        message: format!("物料 {} 无活跃报价, 行成本按 0 计入", variant_code),
                    });
                    Decimal::ZERO
                }
            };

            material += cost;
            usage_lines.push(UsageCostLine {
                usage_id: usage.usage_id.clone(),
                variant_id: usage.variant_id.clone(),
                variant_code,
                quantity: usage.quantity,
                max_unit_price: max_price,
                cost,
            });
        }

        let item_lines: Vec<CostItemLine> = section
            .cost_items
            .iter()
            .map(|item| CostItemLine {
                item_id: item.item_id.clone(),
                item_name: item.item_name.clone(),
                category: item.category,
                amount: round_money(item.amount),
            })
            .collect();
        let item_total: Decimal = section.cost_items.iter().map(|i| i.amount).sum();

        let material_cost = round_money(material);
        let item_cost = round_money(item_total);

        SubprocessCostLine {
            subprocess_id: section.subprocess.subprocess_id.clone(),
            subprocess_code: section.subprocess.subprocess_code.clone(),
            subprocess_name: section.subprocess.subprocess_name.clone(),
            seq_no: section.link.seq_no,
            group_lines,
            usage_lines,
            item_lines,
            material_cost,
            item_cost,
            subtotal: round_money(material + item_total),
        }
    }

    /// 替代组成本行: 候选 = MAX(成员活跃单价) × 成员用量, 组成本取候选最大值
    ///
    /// 无报价成员的候选为 0; 全组无报价时组成本为 0 且 has_active_pricing=false。
    fn build_group_line(
        &self,
        group: &SubstituteGroup,
        members: &[&VariantUsage],
        input: &ProcessCostInput,
    ) -> GroupCostLine {
        let mut worst: Option<(&VariantUsage, Decimal)> = None;
        let mut has_active_pricing = false;

        for member in members {
            let candidate = match max_active_price(&input.pricing, &member.variant_id) {
                Some(price) => {
                    has_active_pricing = true;
                    price * member.quantity
                }
                None => Decimal::ZERO,
            };

            match worst {
                Some((_, best)) if candidate <= best => {}
                _ => worst = Some((member, candidate)),
            }
        }

        let (worst_variant_id, worst_variant_code, cost) = match (has_active_pricing, worst) {
            (true, Some((member, candidate))) => (
                Some(member.variant_id.clone()),
                input.variant_codes.get(&member.variant_id).cloned(),
                round_money(candidate),
            ),
            _ => (None, None, Decimal::ZERO),
        };

        GroupCostLine {
            group_id: group.group_id.clone(),
            group_name: group.group_name.clone(),
            member_count: members.len(),
            worst_variant_id,
            worst_variant_code,
            cost,
            has_active_pricing,
        }
    }

    // ==========================================
    // 批次成本快照
    // ==========================================

    /// 计算批次成本快照
    ///
    /// 口径:
    /// - 已定型的替代组按选定成员计价（MAX 活跃单价 × 该成员用量）
    /// - 未定型的替代组退回组最坏情况（PLANNING 期间的保守口径）
    /// - 单件成本 × 批次数量, 各分项 2 位小数
    #[instrument(skip(self, input, selections), fields(lot_quantity = %lot_quantity))]
    pub fn build_lot_snapshot(
        &self,
        input: &ProcessCostInput,
        selections: &HashMap<String, String>,
        lot_quantity: Decimal,
    ) -> LotCostSnapshot {
        let mut material_unit = Decimal::ZERO;
        let mut labor_unit = Decimal::ZERO;
        let mut other_unit = Decimal::ZERO;

        for section in &input.sections {
            for group in &section.groups {
                let members: Vec<&VariantUsage> = section
                    .usages
                    .iter()
                    .filter(|u| u.group_id.as_deref() == Some(group.group_id.as_str()))
                    .collect();

                material_unit += match selections.get(&group.group_id) {
                    Some(variant_id) => {
                        // 选定成员计价; 选型指向的成员若已被移出组, 退回最坏情况
                        match members.iter().find(|m| &m.variant_id == variant_id) {
                            Some(member) => max_active_price(&input.pricing, &member.variant_id)
                                .map(|price| price * member.quantity)
                                .unwrap_or(Decimal::ZERO),
                            None => self.build_group_line(group, &members, input).cost,
                        }
                    }
                    None => self.build_group_line(group, &members, input).cost,
                };
            }

            for usage in section.usages.iter().filter(|u| u.group_id.is_none()) {
                if let Some(price) = max_active_price(&input.pricing, &usage.variant_id) {
                    material_unit += price * usage.quantity;
                }
            }

            for item in &section.cost_items {
                if item.category == CostCategory::Labor {
                    labor_unit += item.amount;
                } else {
                    other_unit += item.amount;
                }
            }
        }

        let overhead_unit: Decimal = input.overheads.iter().map(|o| o.amount).sum();

        let material_cost = round_money(material_unit * lot_quantity);
        let labor_cost = round_money(labor_unit * lot_quantity);
        let other_item_cost = round_money(other_unit * lot_quantity);
        let overhead_cost = round_money(overhead_unit * lot_quantity);
        let total_cost = round_money(
            (material_unit + labor_unit + other_unit + overhead_unit) * lot_quantity,
        );

        LotCostSnapshot {
            material_cost,
            labor_cost,
            other_item_cost,
            overhead_cost,
            total_cost,
            refreshed_at: chrono::Utc::now(),
        }
    }
}

impl Default for CostingEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 某物料活跃报价的最高单价
fn max_active_price(
    pricing: &HashMap<String, Vec<SupplierPricing>>,
    variant_id: &str,
) -> Option<Decimal> {
    pricing
        .get(variant_id)
        .and_then(|rows| rows.iter().map(|p| p.unit_price).max())
}
