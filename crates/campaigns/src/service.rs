//! Campaign lifecycle service.
//!
//! The write path the HTTP layer calls into: validates rule trees before any
//! store access, snapshots audience size, and triggers dispatch exactly once
//! per campaign. Rule trees are kept as loose JSON on the campaign record and
//! re-parsed where needed — the structural parser is the gatekeeper.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crm_core::stores::{CampaignStore, DeliveryRecordStore};
use crm_core::types::{AudienceMember, Campaign, CampaignStatus};
use crm_core::{CrmError, CrmResult};
use crm_delivery::{DeliveryDispatcher, DispatchOutcome};
use crm_segmentation::{parse_rule_tree, AudiencePreview, AudienceResolver};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub segment_rules: serde_json::Value,
    pub message_template: String,
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub segment_rules: Option<serde_json::Value>,
    #[serde(default)]
    pub message_template: Option<String>,
    #[serde(default)]
    pub status: Option<CampaignStatus>,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
}

pub struct CampaignService {
    campaigns: Arc<dyn CampaignStore>,
    records: Arc<dyn DeliveryRecordStore>,
    resolver: AudienceResolver,
    dispatcher: DeliveryDispatcher,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        records: Arc<dyn DeliveryRecordStore>,
        resolver: AudienceResolver,
        dispatcher: DeliveryDispatcher,
    ) -> Self {
        Self {
            campaigns,
            records,
            resolver,
            dispatcher,
        }
    }

    /// Creates a campaign. The rule tree is validated and the audience
    /// resolved before anything is persisted. A campaign created directly as
    /// Scheduled or Sent is dispatched immediately; the returned outcome
    /// carries the transport handles.
    pub async fn create_campaign(
        &self,
        req: CreateCampaignRequest,
    ) -> CrmResult<(Campaign, Option<DispatchOutcome>)> {
        validate_rules_shape(&req.segment_rules)?;
        let group = parse_rule_tree(&req.segment_rules)?;
        let audience = self.resolver.resolve(&group)?;

        let status = req.status.unwrap_or(CampaignStatus::Draft);
        let now = Utc::now();
        let mut campaign = Campaign {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            segment_rules: req.segment_rules,
            message_template: req.message_template,
            audience_size: audience.len() as u64,
            delivery_stats: Default::default(),
            status,
            scheduled_at: (status == CampaignStatus::Scheduled)
                .then_some(req.scheduled_at)
                .flatten(),
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        self.campaigns.save(&campaign)?;
        info!(campaign_id = %campaign.id, name = %campaign.name, audience_size = campaign.audience_size, "Campaign created");

        let outcome = if matches!(status, CampaignStatus::Scheduled | CampaignStatus::Sent) {
            Some(self.send(&mut campaign, &audience).await?)
        } else {
            None
        };
        Ok((campaign, outcome))
    }

    /// Partial update. The audience snapshot is re-resolved only when the
    /// segment rules actually changed. Moving a never-sent campaign into
    /// Scheduled or Sent triggers dispatch; a campaign that already has a
    /// `sent_at` is never dispatched again, whatever is edited.
    pub async fn update_campaign(
        &self,
        id: Uuid,
        req: UpdateCampaignRequest,
    ) -> CrmResult<(Campaign, Option<DispatchOutcome>)> {
        let mut campaign = self
            .campaigns
            .load(id)?
            .ok_or(CrmError::CampaignNotFound(id))?;

        if let Some(rules) = req.segment_rules {
            if rules != campaign.segment_rules {
                validate_rules_shape(&rules)?;
                let group = parse_rule_tree(&rules)?;
                campaign.audience_size = self.resolver.resolve(&group)?.len() as u64;
                campaign.segment_rules = rules;
            }
        }
        if let Some(name) = req.name {
            campaign.name = name;
        }
        if let Some(description) = req.description {
            campaign.description = Some(description);
        }
        if let Some(template) = req.message_template {
            campaign.message_template = template;
        }
        if let Some(status) = req.status {
            campaign.status = status;
            if status == CampaignStatus::Scheduled {
                campaign.scheduled_at = req.scheduled_at;
            }
        }
        campaign.updated_at = Utc::now();
        self.campaigns.save(&campaign)?;

        let wants_send = matches!(
            campaign.status,
            CampaignStatus::Scheduled | CampaignStatus::Sent
        );
        let outcome = if wants_send && campaign.sent_at.is_none() {
            let group = parse_rule_tree(&campaign.segment_rules)?;
            let audience = self.resolver.resolve(&group)?;
            Some(self.send(&mut campaign, &audience).await?)
        } else {
            None
        };
        Ok((campaign, outcome))
    }

    async fn send(&self, campaign: &mut Campaign, audience: &[AudienceMember]) -> CrmResult<DispatchOutcome> {
        info!(campaign_id = %campaign.id, audience_size = audience.len(), "Triggering campaign send");
        self.dispatcher.dispatch(campaign, audience).await
    }

    pub fn get_campaign(&self, id: Uuid) -> CrmResult<Campaign> {
        self.campaigns.load(id)?.ok_or(CrmError::CampaignNotFound(id))
    }

    pub fn list_campaigns(&self) -> CrmResult<Vec<Campaign>> {
        self.campaigns.list()
    }

    /// Removes a campaign and its delivery history.
    pub fn delete_campaign(&self, id: Uuid) -> CrmResult<()> {
        if !self.campaigns.delete(id)? {
            return Err(CrmError::CampaignNotFound(id));
        }
        let removed = self.records.delete_by_campaign(id)?;
        info!(campaign_id = %id, delivery_records_removed = removed, "Campaign deleted");
        Ok(())
    }

    /// Audience size plus sample emails for a rule tree, persisting nothing.
    pub fn audience_preview(&self, rules: &serde_json::Value) -> CrmResult<AudiencePreview> {
        validate_rules_shape(rules)?;
        self.resolver.preview(rules)
    }

    pub fn delivery_log(&self, campaign_id: Uuid) -> CrmResult<Vec<crm_core::types::DeliveryRecord>> {
        // Surfacing the log for a missing campaign is a lookup error, not an
        // empty list.
        self.get_campaign(campaign_id)?;
        self.records.find_by_campaign(campaign_id)
    }
}

/// The cheap shape check the API layer relied on before handing rules to the
/// compiler: an object with an `operator` and a `rules` array. Deeper
/// structural defects are the parser's job.
fn validate_rules_shape(rules: &serde_json::Value) -> CrmResult<()> {
    let shaped = rules.get("operator").is_some()
        && rules.get("rules").map_or(false, |r| r.is_array());
    if !shaped {
        return Err(CrmError::Validation("Invalid segment rules format.".into()));
    }
    Ok(())
}
