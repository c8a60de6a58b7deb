//! Delivery status aggregation.
//!
//! Receipts arrive asynchronously and in any order. Each one updates exactly
//! one delivery record (keyed by `vendor_message_id`) and then folds into the
//! owning campaign's counters under a per-campaign lock, so concurrent
//! receipts for the same campaign never lose updates.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crm_core::stores::{CampaignStore, DeliveryRecordStore};
use crm_core::types::DeliveryStatus;
use crm_core::{CrmError, CrmResult};

/// The wire payload a vendor posts back for one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub vendor_message_id: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// Receipt ingestion boundary. The transport simulator posts through this;
/// a real vendor webhook handler would do the same.
pub trait ReceiptSink: Send + Sync {
    fn apply_receipt(&self, receipt: DeliveryReceipt) -> CrmResult<()>;
}

pub struct StatusAggregator {
    records: Arc<dyn DeliveryRecordStore>,
    campaigns: Arc<dyn CampaignStore>,
    /// Serializes the read-modify-write of one campaign's delivery stats.
    stat_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl StatusAggregator {
    pub fn new(records: Arc<dyn DeliveryRecordStore>, campaigns: Arc<dyn CampaignStore>) -> Self {
        Self {
            records,
            campaigns,
            stat_locks: DashMap::new(),
        }
    }

    fn campaign_lock(&self, campaign_id: Uuid) -> Arc<Mutex<()>> {
        self.stat_locks
            .entry(campaign_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl ReceiptSink for StatusAggregator {
    /// Applies one receipt. An untracked `vendor_message_id` is an
    /// `UnknownReceipt` error — the record is considered lost or foreign and
    /// the receipt is dropped by the caller, never retried.
    ///
    /// A duplicate receipt overwrites the record's status and re-increments
    /// the counter for its outcome; `pending` is clamped at zero so
    /// duplicates and out-of-order receipts can never drive it negative.
    fn apply_receipt(&self, receipt: DeliveryReceipt) -> CrmResult<()> {
        let mut record = self
            .records
            .find_by_vendor_message_id(&receipt.vendor_message_id)?
            .ok_or_else(|| CrmError::UnknownReceipt(receipt.vendor_message_id.clone()))?;

        record.delivery_status = receipt.status;
        record.delivery_updated_at = Some(chrono::Utc::now());
        if let Some(reason) = receipt.failure_reason {
            record.failure_reason = Some(reason);
        }
        self.records.update(&record)?;

        let lock = self.campaign_lock(record.campaign_id);
        let _guard = lock.lock();

        let Some(mut campaign) = self.campaigns.load(record.campaign_id)? else {
            // Campaign deleted while receipts were in flight; the record
            // update above is all we can do.
            warn!(
                campaign_id = %record.campaign_id,
                vendor_message_id = %receipt.vendor_message_id,
                "Receipt for a record whose campaign no longer exists"
            );
            return Ok(());
        };

        match receipt.status {
            DeliveryStatus::Sent | DeliveryStatus::Delivered => {
                campaign.delivery_stats.sent += 1;
                campaign.delivery_stats.pending = campaign.delivery_stats.pending.saturating_sub(1);
            }
            DeliveryStatus::Failed => {
                campaign.delivery_stats.failed += 1;
                campaign.delivery_stats.pending = campaign.delivery_stats.pending.saturating_sub(1);
            }
            DeliveryStatus::Pending => {}
        }
        campaign.updated_at = chrono::Utc::now();
        self.campaigns.save(&campaign)?;

        metrics::counter!(
            "delivery.receipts_applied",
            "status" => format!("{:?}", receipt.status)
        )
        .increment(1);
        debug!(
            vendor_message_id = %receipt.vendor_message_id,
            status = ?receipt.status,
            "Delivery receipt applied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crm_core::types::{Campaign, CampaignStatus, DeliveryRecord, DeliveryStats};
    use crm_store::{InMemoryCampaignStore, InMemoryDeliveryRecordStore};

    fn setup(pending: u64) -> (Arc<InMemoryCampaignStore>, Arc<InMemoryDeliveryRecordStore>, StatusAggregator, Uuid, String) {
        let campaigns = Arc::new(InMemoryCampaignStore::new());
        let records = Arc::new(InMemoryDeliveryRecordStore::new());
        let now = Utc::now();
        let campaign_id = Uuid::new_v4();

        campaigns
            .save(&Campaign {
                id: campaign_id,
                name: "receipts".into(),
                description: None,
                segment_rules: serde_json::json!({}),
                message_template: "hi".into(),
                audience_size: pending,
                delivery_stats: DeliveryStats {
                    sent: 0,
                    failed: 0,
                    pending,
                },
                status: CampaignStatus::Sent,
                scheduled_at: None,
                sent_at: Some(now),
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let vendor_id = format!("{campaign_id}-c-1-0");
        records
            .create_many(vec![DeliveryRecord {
                campaign_id,
                customer_id: "c-1".into(),
                message_content: "hi".into(),
                delivery_status: DeliveryStatus::Pending,
                vendor_message_id: vendor_id.clone(),
                delivery_attempted_at: now,
                delivery_updated_at: None,
                failure_reason: None,
                created_at: now,
            }])
            .unwrap();

        let aggregator = StatusAggregator::new(records.clone(), campaigns.clone());
        (campaigns, records, aggregator, campaign_id, vendor_id)
    }

    #[test]
    fn delivered_receipt_moves_pending_to_sent() {
        let (campaigns, records, aggregator, campaign_id, vendor_id) = setup(1);
        aggregator
            .apply_receipt(DeliveryReceipt {
                vendor_message_id: vendor_id.clone(),
                status: DeliveryStatus::Delivered,
                failure_reason: None,
            })
            .unwrap();

        let stats = campaigns.load(campaign_id).unwrap().unwrap().delivery_stats;
        assert_eq!((stats.sent, stats.failed, stats.pending), (1, 0, 0));

        let record = records.find_by_vendor_message_id(&vendor_id).unwrap().unwrap();
        assert_eq!(record.delivery_status, DeliveryStatus::Delivered);
        assert!(record.delivery_updated_at.is_some());
        assert!(record.failure_reason.is_none());
    }

    #[test]
    fn failed_receipt_records_reason() {
        let (campaigns, records, aggregator, campaign_id, vendor_id) = setup(1);
        aggregator
            .apply_receipt(DeliveryReceipt {
                vendor_message_id: vendor_id.clone(),
                status: DeliveryStatus::Failed,
                failure_reason: Some("mailbox full".into()),
            })
            .unwrap();

        let stats = campaigns.load(campaign_id).unwrap().unwrap().delivery_stats;
        assert_eq!((stats.sent, stats.failed, stats.pending), (0, 1, 0));
        let record = records.find_by_vendor_message_id(&vendor_id).unwrap().unwrap();
        assert_eq!(record.failure_reason.as_deref(), Some("mailbox full"));
    }

    #[test]
    fn duplicate_receipt_never_drives_pending_negative() {
        let (campaigns, _records, aggregator, campaign_id, vendor_id) = setup(1);
        let receipt = DeliveryReceipt {
            vendor_message_id: vendor_id,
            status: DeliveryStatus::Delivered,
            failure_reason: None,
        };
        aggregator.apply_receipt(receipt.clone()).unwrap();
        aggregator.apply_receipt(receipt).unwrap();

        let stats = campaigns.load(campaign_id).unwrap().unwrap().delivery_stats;
        assert_eq!(stats.pending, 0);
        // The duplicate re-incremented sent; the clamp only protects pending.
        assert_eq!(stats.sent, 2);
    }

    #[test]
    fn unknown_vendor_message_id_is_rejected() {
        let (_campaigns, _records, aggregator, _campaign_id, _vendor_id) = setup(1);
        let err = aggregator
            .apply_receipt(DeliveryReceipt {
                vendor_message_id: "not-a-real-id".into(),
                status: DeliveryStatus::Delivered,
                failure_reason: None,
            })
            .unwrap_err();
        assert!(matches!(err, CrmError::UnknownReceipt(_)));
    }

    #[test]
    fn receipt_for_deleted_campaign_still_updates_record() {
        let (campaigns, records, aggregator, campaign_id, vendor_id) = setup(1);
        campaigns.delete(campaign_id).unwrap();

        aggregator
            .apply_receipt(DeliveryReceipt {
                vendor_message_id: vendor_id.clone(),
                status: DeliveryStatus::Delivered,
                failure_reason: None,
            })
            .unwrap();
        let record = records.find_by_vendor_message_id(&vendor_id).unwrap().unwrap();
        assert_eq!(record.delivery_status, DeliveryStatus::Delivered);
    }
}
