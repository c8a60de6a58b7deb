//! Audience resolution — runs a compiled filter against the customer store.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crm_core::config::SegmentationConfig;
use crm_core::stores::CustomerStore;
use crm_core::types::AudienceMember;
use crm_core::CrmResult;

use crate::compiler::compile;
use crate::rules::{parse_rule_tree, SegmentRuleGroup};

/// Size estimate plus a handful of sample emails, for the campaign builder's
/// "who would this reach?" view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudiencePreview {
    pub audience_size: u64,
    pub sample_emails: Vec<String>,
}

pub struct AudienceResolver {
    customers: Arc<dyn CustomerStore>,
    config: SegmentationConfig,
}

impl AudienceResolver {
    pub fn new(customers: Arc<dyn CustomerStore>, config: SegmentationConfig) -> Self {
        Self { customers, config }
    }

    /// Resolves the audience for a rule tree: one store query with the
    /// compiled filter, deduplicated by customer id, order as returned by the
    /// store (stable for a fixed store state). Zero matches is an empty
    /// audience, not an error; a store failure yields no partial audience.
    pub fn resolve(&self, group: &SegmentRuleGroup) -> CrmResult<Vec<AudienceMember>> {
        let eval_time = Utc::now();
        let filter = compile(group, eval_time);
        debug!(?filter, "Compiled segment filter");

        let matched = self.customers.find_matching(&filter)?;

        let mut seen = HashSet::new();
        let audience: Vec<AudienceMember> = matched
            .into_iter()
            .filter(|c| seen.insert(c.customer_id.clone()))
            .map(|c| AudienceMember {
                customer_id: c.customer_id,
                email: c.email,
            })
            .collect();

        info!(audience_size = audience.len(), "Audience resolved");
        Ok(audience)
    }

    /// Parses loose JSON (UI or translator output) and resolves it.
    pub fn resolve_json(&self, rules: &serde_json::Value) -> CrmResult<Vec<AudienceMember>> {
        let group = parse_rule_tree(rules)?;
        self.resolve(&group)
    }

    /// Audience size and a few sample emails, without persisting anything.
    pub fn preview(&self, rules: &serde_json::Value) -> CrmResult<AudiencePreview> {
        let audience = self.resolve_json(rules)?;
        let sample_emails = audience
            .iter()
            .take(self.config.preview_sample_size)
            .map(|m| m.email.clone())
            .collect();
        Ok(AudiencePreview {
            audience_size: audience.len() as u64,
            sample_emails,
        })
    }
}
