//! Rule tree compilation — a pure fold from a typed tree to one
//! [`CustomerFilter`], independent of any store.
//!
//! Activity thresholds (INACTIVE_DAYS / ACTIVE_DAYS) are anchored to the
//! `eval_time` passed in, which a resolver pass fixes once, so every customer
//! in the pass is measured against the same instant.

use chrono::{DateTime, Duration, Utc};

use crm_core::filter::{CompareOp, CustomerFilter};
use crm_core::CrmResult;

use crate::rules::{parse_rule_tree, LogicalOperator, RuleCondition, SegmentNode, SegmentRule, SegmentRuleGroup};

/// Parses loose JSON and compiles it in one step. Structural defects reject
/// the whole tree before any filter is produced.
pub fn compile_tree(value: &serde_json::Value, eval_time: DateTime<Utc>) -> CrmResult<CustomerFilter> {
    let group = parse_rule_tree(value)?;
    Ok(compile(&group, eval_time))
}

/// Compiles a group node. Empty fragments from unrecognized conditions are
/// dropped before combining; when nothing remains, an AND group degenerates
/// to match-all (the `{}` query of the legacy implementation, preserved on
/// purpose) and an OR group to match-none.
pub fn compile(group: &SegmentRuleGroup, eval_time: DateTime<Utc>) -> CustomerFilter {
    let mut fragments: Vec<CustomerFilter> = group
        .rules
        .iter()
        .filter_map(|node| compile_node(node, eval_time))
        .collect();

    if fragments.len() == 1 {
        return fragments.remove(0);
    }

    match (group.operator, fragments.is_empty()) {
        (LogicalOperator::And, true) => CustomerFilter::MatchAll,
        (LogicalOperator::Or, true) => CustomerFilter::MatchNone,
        (LogicalOperator::And, false) => CustomerFilter::And(fragments),
        (LogicalOperator::Or, false) => CustomerFilter::Or(fragments),
    }
}

fn compile_node(node: &SegmentNode, eval_time: DateTime<Utc>) -> Option<CustomerFilter> {
    match node {
        // A nested group always contributes a fragment, even a degenerate one.
        SegmentNode::Group(group) => Some(compile(group, eval_time)),
        SegmentNode::Rule(rule) => compile_rule(rule, eval_time),
    }
}

/// Compiles one leaf predicate. `None` is the empty fragment: an unrecognized
/// condition (or an activity threshold that does not parse as a day count)
/// constrains nothing and is dropped by the enclosing group — it must never
/// silently match the whole population.
pub fn compile_rule(rule: &SegmentRule, eval_time: DateTime<Utc>) -> Option<CustomerFilter> {
    let ordering = |op: CompareOp| CustomerFilter::Compare {
        field: rule.field.clone(),
        op,
        value: rule.value.clone(),
    };

    match rule.condition {
        RuleCondition::Eq => Some(ordering(CompareOp::Eq)),
        RuleCondition::Ne => Some(ordering(CompareOp::Ne)),
        RuleCondition::Gt => Some(ordering(CompareOp::Gt)),
        RuleCondition::Lt => Some(ordering(CompareOp::Lt)),
        RuleCondition::Gte => Some(ordering(CompareOp::Gte)),
        RuleCondition::Lte => Some(ordering(CompareOp::Lte)),
        RuleCondition::Contains => Some(CustomerFilter::ContainsCi {
            field: rule.field.clone(),
            needle: needle_of(&rule.value),
            negate: false,
        }),
        RuleCondition::NoContains => Some(CustomerFilter::ContainsCi {
            field: rule.field.clone(),
            needle: needle_of(&rule.value),
            negate: true,
        }),
        RuleCondition::InactiveDays => {
            day_count(&rule.value).map(|days| CustomerFilter::LastActivityBefore(eval_time - Duration::days(days)))
        }
        RuleCondition::ActiveDays => {
            day_count(&rule.value).map(|days| CustomerFilter::LastActivitySince(eval_time - Duration::days(days)))
        }
        RuleCondition::Unknown => None,
    }
}

fn needle_of(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

fn day_count(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    value.as_str().and_then(|s| s.trim().parse().ok())
}
