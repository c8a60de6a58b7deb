//! Segmentation engine — rule tree model, filter compilation, and audience
//! resolution for campaign targeting.

pub mod compiler;
pub mod resolver;
pub mod rules;

pub use compiler::{compile, compile_tree};
pub use resolver::{AudiencePreview, AudienceResolver};
pub use rules::{parse_rule_tree, LogicalOperator, RuleCondition, SegmentNode, SegmentRule, SegmentRuleGroup};
