//! Store trait boundary.
//!
//! The core never talks to persistence directly; it goes through these
//! traits. `crm-store` ships DashMap-backed implementations for development
//! and tests; production would back them with MongoDB or PostgreSQL without
//! touching the segmentation or delivery code.

use uuid::Uuid;

use crate::error::CrmResult;
use crate::filter::CustomerFilter;
use crate::types::{Campaign, Customer, DeliveryRecord};

pub trait CustomerStore: Send + Sync {
    /// Executes a compiled filter as one query against the population.
    fn find_matching(&self, filter: &CustomerFilter) -> CrmResult<Vec<Customer>>;

    fn find_by_id(&self, customer_id: &str) -> CrmResult<Option<Customer>>;

    /// Order-ingestion hook: bumps total_spend by `spend_delta`, increments
    /// total_visits when `visit_occurred`, and refreshes last_activity.
    fn apply_stats_delta(&self, customer_id: &str, spend_delta: f64, visit_occurred: bool) -> CrmResult<()>;
}

pub trait CampaignStore: Send + Sync {
    fn load(&self, id: Uuid) -> CrmResult<Option<Campaign>>;

    /// Upsert. Status and delivery stats are persisted together — a campaign
    /// is never observable with new counters but a stale status.
    fn save(&self, campaign: &Campaign) -> CrmResult<()>;

    fn delete(&self, id: Uuid) -> CrmResult<bool>;

    fn list(&self) -> CrmResult<Vec<Campaign>>;
}

pub trait DeliveryRecordStore: Send + Sync {
    /// Bulk insert for one dispatch. All records land before any transport
    /// simulation starts.
    fn create_many(&self, records: Vec<DeliveryRecord>) -> CrmResult<()>;

    fn find_by_vendor_message_id(&self, vendor_message_id: &str) -> CrmResult<Option<DeliveryRecord>>;

    fn update(&self, record: &DeliveryRecord) -> CrmResult<()>;

    fn find_by_campaign(&self, campaign_id: Uuid) -> CrmResult<Vec<DeliveryRecord>>;

    fn delete_by_campaign(&self, campaign_id: Uuid) -> CrmResult<usize>;
}
