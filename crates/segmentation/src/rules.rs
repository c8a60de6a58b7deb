//! Rule tree model and structural parsing.
//!
//! Rule trees arrive as loose JSON from two sources: the segment builder UI
//! and the natural-language translator. Both produce the same shape — leaves
//! carry `field`/`condition`/`value`, groups carry `operator`/`rules` — and
//! [`parse_rule_tree`] is the single entry point that turns that JSON into a
//! typed tree. The tagged [`SegmentNode`] makes the "exactly one shape" rule
//! unrepresentable after parsing; the parser rejects ambiguous nodes (both
//! shapes, or neither) atomically, so a tree is never half-compiled.

use serde::{Deserialize, Serialize};

use crm_core::{CrmError, CrmResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Leaf condition. Unrecognized strings parse to `Unknown`, which compiles to
/// an empty fragment — a malformed condition must never select the whole
/// population.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleCondition {
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "NE")]
    Ne,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "GTE")]
    Gte,
    #[serde(rename = "LTE")]
    Lte,
    #[serde(rename = "CONTAINS")]
    Contains,
    #[serde(rename = "NOCONTAINS")]
    NoContains,
    #[serde(rename = "INACTIVE_DAYS")]
    InactiveDays,
    #[serde(rename = "ACTIVE_DAYS")]
    ActiveDays,
    #[serde(other)]
    Unknown,
}

impl RuleCondition {
    fn parse(s: &str) -> Self {
        match s {
            "EQ" => Self::Eq,
            "NE" => Self::Ne,
            "GT" => Self::Gt,
            "LT" => Self::Lt,
            "GTE" => Self::Gte,
            "LTE" => Self::Lte,
            "CONTAINS" => Self::Contains,
            "NOCONTAINS" => Self::NoContains,
            "INACTIVE_DAYS" => Self::InactiveDays,
            "ACTIVE_DAYS" => Self::ActiveDays,
            _ => Self::Unknown,
        }
    }
}

/// A leaf predicate. Immutable once compiled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentRule {
    pub field: String,
    pub condition: RuleCondition,
    pub value: serde_json::Value,
}

/// A boolean combination of leaves and nested groups. Depth is unbounded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentRuleGroup {
    pub operator: LogicalOperator,
    pub rules: Vec<SegmentNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SegmentNode {
    Group(SegmentRuleGroup),
    Rule(SegmentRule),
}

/// Parses and structurally validates a loose-JSON rule tree. The whole tree
/// is rejected on the first malformed node; there is no partial result.
pub fn parse_rule_tree(value: &serde_json::Value) -> CrmResult<SegmentRuleGroup> {
    parse_group(value, "$")
}

fn parse_group(value: &serde_json::Value, path: &str) -> CrmResult<SegmentRuleGroup> {
    let obj = value
        .as_object()
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: group node must be an object")))?;

    let operator = match obj.get("operator").and_then(|v| v.as_str()) {
        Some("AND") => LogicalOperator::And,
        Some("OR") => LogicalOperator::Or,
        Some(other) => {
            return Err(CrmError::RuleTree(format!(
                "{path}: unsupported logical operator {other:?} (expected AND or OR)"
            )))
        }
        None => {
            return Err(CrmError::RuleTree(format!(
                "{path}: group node is missing a string \"operator\""
            )))
        }
    };

    let rules = obj
        .get("rules")
        .and_then(|v| v.as_array())
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: group node is missing a \"rules\" array")))?;

    let mut children = Vec::with_capacity(rules.len());
    for (idx, child) in rules.iter().enumerate() {
        children.push(parse_node(child, &format!("{path}.rules[{idx}]"))?);
    }

    Ok(SegmentRuleGroup {
        operator,
        rules: children,
    })
}

fn parse_node(value: &serde_json::Value, path: &str) -> CrmResult<SegmentNode> {
    let obj = value
        .as_object()
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: node must be an object")))?;

    let group_shaped = obj.contains_key("operator") || obj.contains_key("rules");
    let leaf_shaped =
        obj.contains_key("field") || obj.contains_key("condition") || obj.contains_key("value");

    match (group_shaped, leaf_shaped) {
        (true, true) => Err(CrmError::RuleTree(format!(
            "{path}: node mixes group fields (operator/rules) with leaf fields (field/condition/value)"
        ))),
        (false, false) => Err(CrmError::RuleTree(format!(
            "{path}: node is neither a group nor a leaf"
        ))),
        (true, false) => Ok(SegmentNode::Group(parse_group(value, path)?)),
        (false, true) => Ok(SegmentNode::Rule(parse_leaf(obj, path)?)),
    }
}

fn parse_leaf(
    obj: &serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> CrmResult<SegmentRule> {
    let field = obj
        .get("field")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: leaf is missing a string \"field\"")))?;
    let condition = obj
        .get("condition")
        .and_then(|v| v.as_str())
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: leaf is missing a string \"condition\"")))?;
    let value = obj
        .get("value")
        .ok_or_else(|| CrmError::RuleTree(format!("{path}: leaf is missing a \"value\"")))?;

    Ok(SegmentRule {
        field: field.to_string(),
        condition: RuleCondition::parse(condition),
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_tree() {
        let tree = json!({
            "operator": "AND",
            "rules": [
                { "field": "totalSpend", "condition": "GT", "value": 5000 },
                { "operator": "OR", "rules": [
                    { "field": "totalVisits", "condition": "LT", "value": 3 },
                    { "field": "lastActivity", "condition": "INACTIVE_DAYS", "value": 90 }
                ]}
            ]
        });
        let parsed = parse_rule_tree(&tree).unwrap();
        assert_eq!(parsed.operator, LogicalOperator::And);
        assert_eq!(parsed.rules.len(), 2);
        match &parsed.rules[1] {
            SegmentNode::Group(g) => {
                assert_eq!(g.operator, LogicalOperator::Or);
                assert_eq!(g.rules.len(), 2);
            }
            SegmentNode::Rule(_) => panic!("expected nested group"),
        }
    }

    #[test]
    fn unrecognized_condition_parses_to_unknown() {
        let tree = json!({
            "operator": "AND",
            "rules": [{ "field": "email", "condition": "SOUNDS_LIKE", "value": "x" }]
        });
        let parsed = parse_rule_tree(&tree).unwrap();
        match &parsed.rules[0] {
            SegmentNode::Rule(r) => assert_eq!(r.condition, RuleCondition::Unknown),
            SegmentNode::Group(_) => panic!("expected leaf"),
        }
    }

    #[test]
    fn rejects_node_with_both_shapes() {
        let tree = json!({
            "operator": "AND",
            "rules": [{
                "operator": "OR", "rules": [],
                "field": "email", "condition": "EQ", "value": "x"
            }]
        });
        assert!(matches!(parse_rule_tree(&tree), Err(CrmError::RuleTree(_))));
    }

    #[test]
    fn rejects_node_with_neither_shape() {
        let tree = json!({ "operator": "OR", "rules": [{ "comment": "??" }] });
        assert!(matches!(parse_rule_tree(&tree), Err(CrmError::RuleTree(_))));
    }

    #[test]
    fn rejects_unsupported_operator_and_missing_rules() {
        let tree = json!({ "operator": "XOR", "rules": [] });
        assert!(matches!(parse_rule_tree(&tree), Err(CrmError::RuleTree(_))));

        let tree = json!({ "operator": "AND" });
        assert!(matches!(parse_rule_tree(&tree), Err(CrmError::RuleTree(_))));
    }

    #[test]
    fn rejection_is_atomic_for_deep_defects() {
        // A defect three levels down rejects the whole tree.
        let tree = json!({
            "operator": "AND",
            "rules": [
                { "field": "totalSpend", "condition": "GT", "value": 1 },
                { "operator": "OR", "rules": [
                    { "operator": "AND", "rules": [ { } ] }
                ]}
            ]
        });
        assert!(matches!(parse_rule_tree(&tree), Err(CrmError::RuleTree(_))));
    }
}
