//! DashMap-backed implementations of the store traits.

use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crm_core::error::{CrmError, CrmResult};
use crm_core::filter::CustomerFilter;
use crm_core::stores::{CampaignStore, CustomerStore, DeliveryRecordStore};
use crm_core::types::{Campaign, Customer, DeliveryRecord};

/// Thread-safe in-memory customer store, keyed by customer id.
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: DashMap<String, Customer>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self {
            customers: DashMap::new(),
        }
    }

    pub fn insert(&self, customer: Customer) {
        self.customers.insert(customer.customer_id.clone(), customer);
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

impl CustomerStore for InMemoryCustomerStore {
    fn find_matching(&self, filter: &CustomerFilter) -> CrmResult<Vec<Customer>> {
        // The filter scan is the store's query execution; callers never
        // iterate customers themselves. Sorted by id for a stable order
        // across identical store states.
        let mut matched: Vec<Customer> = self
            .customers
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
        Ok(matched)
    }

    fn find_by_id(&self, customer_id: &str) -> CrmResult<Option<Customer>> {
        Ok(self.customers.get(customer_id).map(|c| c.value().clone()))
    }

    fn apply_stats_delta(&self, customer_id: &str, spend_delta: f64, visit_occurred: bool) -> CrmResult<()> {
        let mut entry = self
            .customers
            .get_mut(customer_id)
            .ok_or_else(|| CrmError::UnknownCustomer(customer_id.to_string()))?;
        let customer = entry.value_mut();
        customer.total_spend += spend_delta;
        if visit_occurred {
            customer.total_visits += 1;
        }
        customer.last_activity = Utc::now();
        customer.updated_at = Utc::now();
        Ok(())
    }
}

/// Thread-safe in-memory campaign store.
#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: DashMap<Uuid, Campaign>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
        }
    }
}

impl CampaignStore for InMemoryCampaignStore {
    fn load(&self, id: Uuid) -> CrmResult<Option<Campaign>> {
        Ok(self.campaigns.get(&id).map(|c| c.value().clone()))
    }

    fn save(&self, campaign: &Campaign) -> CrmResult<()> {
        // Whole-document upsert: status and delivery stats land together.
        self.campaigns.insert(campaign.id, campaign.clone());
        Ok(())
    }

    fn delete(&self, id: Uuid) -> CrmResult<bool> {
        Ok(self.campaigns.remove(&id).is_some())
    }

    fn list(&self) -> CrmResult<Vec<Campaign>> {
        let mut campaigns: Vec<Campaign> = self.campaigns.iter().map(|c| c.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(campaigns)
    }
}

/// Thread-safe in-memory delivery record store, keyed by vendor message id —
/// the receipt lookup path is the hot one.
#[derive(Default)]
pub struct InMemoryDeliveryRecordStore {
    records: DashMap<String, DeliveryRecord>,
}

impl InMemoryDeliveryRecordStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl DeliveryRecordStore for InMemoryDeliveryRecordStore {
    fn create_many(&self, records: Vec<DeliveryRecord>) -> CrmResult<()> {
        let count = records.len();
        for record in records {
            self.records.insert(record.vendor_message_id.clone(), record);
        }
        info!(count, "Delivery records created");
        Ok(())
    }

    fn find_by_vendor_message_id(&self, vendor_message_id: &str) -> CrmResult<Option<DeliveryRecord>> {
        Ok(self.records.get(vendor_message_id).map(|r| r.value().clone()))
    }

    fn update(&self, record: &DeliveryRecord) -> CrmResult<()> {
        self.records.insert(record.vendor_message_id.clone(), record.clone());
        Ok(())
    }

    fn find_by_campaign(&self, campaign_id: Uuid) -> CrmResult<Vec<DeliveryRecord>> {
        let mut records: Vec<DeliveryRecord> = self
            .records
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));
        Ok(records)
    }

    fn delete_by_campaign(&self, campaign_id: Uuid) -> CrmResult<usize> {
        let ids: Vec<String> = self
            .records
            .iter()
            .filter(|r| r.value().campaign_id == campaign_id)
            .map(|r| r.key().clone())
            .collect();
        let count = ids.len();
        for id in ids {
            self.records.remove(&id);
        }
        Ok(count)
    }
}
