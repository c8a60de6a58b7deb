//! Campaign dispatch — fans a campaign out to its resolved audience.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crm_core::stores::{CampaignStore, DeliveryRecordStore};
use crm_core::types::{AudienceMember, Campaign, CampaignStatus, DeliveryRecord, DeliveryStatus};
use crm_core::CrmResult;
use uuid::Uuid;

use crate::template::render_message;
use crate::transport::TransportSimulator;

/// What a dispatch produced. Transport task handles are exposed so a caller
/// (tests, the demo binary) can await quiescence; the dispatcher itself never
/// blocks on them — real vendors resolve on their own schedule.
pub struct DispatchOutcome {
    pub campaign_id: Uuid,
    pub records_created: usize,
    pub transport_tasks: Vec<JoinHandle<()>>,
}

impl DispatchOutcome {
    fn skipped(campaign_id: Uuid) -> Self {
        Self {
            campaign_id,
            records_created: 0,
            transport_tasks: Vec::new(),
        }
    }

    /// Waits for every issued simulation to resolve. Test/demo convenience.
    pub async fn await_transport(self) {
        for task in self.transport_tasks {
            let _ = task.await;
        }
    }
}

pub struct DeliveryDispatcher {
    records: Arc<dyn DeliveryRecordStore>,
    campaigns: Arc<dyn CampaignStore>,
    transport: Arc<TransportSimulator>,
}

impl DeliveryDispatcher {
    pub fn new(
        records: Arc<dyn DeliveryRecordStore>,
        campaigns: Arc<dyn CampaignStore>,
        transport: Arc<TransportSimulator>,
    ) -> Self {
        Self {
            records,
            campaigns,
            transport,
        }
    }

    /// Creates one pending delivery record per audience member in a single
    /// bulk write, marks the campaign sent (status, `sent_at`, `pending`
    /// counter — persisted together), then issues an independent simulated
    /// send for each record. Ordering matters twice over: every record exists
    /// before any transport starts, and the campaign's pending count is
    /// durable before the first receipt can arrive to decrement it. The
    /// audience was resolved once by the caller and is not re-queried here,
    /// so concurrent customer mutations cannot change an in-flight delivery
    /// set.
    ///
    /// Idempotent at the campaign level: a campaign already sent (status plus
    /// `sent_at`) produces zero new records no matter how often it is
    /// re-submitted.
    pub async fn dispatch(&self, campaign: &mut Campaign, audience: &[AudienceMember]) -> CrmResult<DispatchOutcome> {
        if campaign.is_dispatched() {
            warn!(campaign_id = %campaign.id, "Campaign already sent; dispatch skipped");
            return Ok(DispatchOutcome::skipped(campaign.id));
        }

        let now = Utc::now();
        let dispatch_instant = now.timestamp_millis();

        // campaign + recipient + dispatch instant: unique for the system's
        // lifetime because a campaign is dispatched at most once and the
        // audience is deduplicated by customer id.
        let records: Vec<DeliveryRecord> = audience
            .iter()
            .map(|member| DeliveryRecord {
                campaign_id: campaign.id,
                customer_id: member.customer_id.clone(),
                message_content: render_message(&campaign.message_template, &member.email),
                delivery_status: DeliveryStatus::Pending,
                vendor_message_id: format!("{}-{}-{}", campaign.id, member.customer_id, dispatch_instant),
                delivery_attempted_at: now,
                delivery_updated_at: None,
                failure_reason: None,
                created_at: now,
            })
            .collect();

        let vendor_message_ids: Vec<String> = records.iter().map(|r| r.vendor_message_id.clone()).collect();

        self.records.create_many(records)?;
        metrics::counter!("delivery.records_created").increment(vendor_message_ids.len() as u64);

        campaign.delivery_stats.pending += audience.len() as u64;
        campaign.status = CampaignStatus::Sent;
        campaign.sent_at = Some(now);
        campaign.updated_at = now;
        self.campaigns.save(campaign)?;

        let transport_tasks = vendor_message_ids
            .into_iter()
            .map(|id| self.transport.simulate(id))
            .collect::<Vec<_>>();

        info!(
            campaign_id = %campaign.id,
            records_created = audience.len(),
            "Campaign dispatched"
        );

        Ok(DispatchOutcome {
            campaign_id: campaign.id,
            records_created: audience.len(),
            transport_tasks,
        })
    }
}
