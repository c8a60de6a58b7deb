//! Domain types shared across the CRM core.
//!
//! Wire format is camelCase to stay compatible with rule-tree field names
//! produced by the segment builder UI and the NL translator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer profile. Mutated only by order ingestion; the segmentation and
/// delivery core treats it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub total_spend: f64,
    pub total_visits: u64,
    pub last_activity: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(customer_id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            customer_id: customer_id.into(),
            name: name.into(),
            email: email.into().to_lowercase(),
            phone: None,
            address: None,
            total_spend: 0.0,
            total_visits: 0,
            last_activity: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Looks up a rule-tree field on this customer. Field names match the
    /// wire format (`totalSpend`, not `total_spend`). Unknown fields return
    /// `None`, which no comparison matches.
    pub fn attribute(&self, field: &str) -> Option<serde_json::Value> {
        match field {
            "customerId" => Some(serde_json::Value::String(self.customer_id.clone())),
            "name" => Some(serde_json::Value::String(self.name.clone())),
            "email" => Some(serde_json::Value::String(self.email.clone())),
            "phone" => self.phone.clone().map(serde_json::Value::String),
            "address" => self.address.clone().map(serde_json::Value::String),
            "totalSpend" => serde_json::Number::from_f64(self.total_spend).map(serde_json::Value::Number),
            "totalVisits" => Some(serde_json::Value::Number(self.total_visits.into())),
            "lastActivity" => Some(serde_json::Value::String(self.last_activity.to_rfc3339())),
            _ => None,
        }
    }
}

/// One line item on an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
    Shipped,
    Delivered,
}

/// An ingested order. References its customer loosely by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: f64,
    pub items: Vec<OrderItem>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sent,
    Completed,
    Failed,
}

/// Per-campaign delivery counters. The invariant `sent + failed + pending ==
/// records ever created` holds once all receipts have been applied.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryStats {
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
}

/// A campaign with its owned segment rule tree (stored as loose JSON — the
/// structural parse happens in the segmentation crate) and delivery counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub segment_rules: serde_json::Value,
    pub message_template: String,
    pub audience_size: u64,
    #[serde(default)]
    pub delivery_stats: DeliveryStats,
    pub status: CampaignStatus,
    #[serde(default)]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// A campaign that has been sent (status plus timestamp) is terminal for
    /// dispatch: it must never be fanned out a second time.
    pub fn is_dispatched(&self) -> bool {
        self.status == CampaignStatus::Sent && self.sent_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
}

/// One message to one recipient. `vendor_message_id` is the idempotency key
/// for delivery receipts; `customer_id` is a loose reference since customers
/// may be deleted independently of their delivery history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    pub campaign_id: Uuid,
    pub customer_id: String,
    pub message_content: String,
    pub delivery_status: DeliveryStatus,
    pub vendor_message_id: String,
    pub delivery_attempted_at: DateTime<Utc>,
    #[serde(default)]
    pub delivery_updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of a resolved audience — just enough to address a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AudienceMember {
    pub customer_id: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup_known_and_unknown_fields() {
        let mut c = Customer::new("c-1", "Ada", "Ada@Example.com");
        c.total_spend = 120.5;
        c.total_visits = 3;

        assert_eq!(c.attribute("email"), Some(serde_json::json!("ada@example.com")));
        assert_eq!(c.attribute("totalSpend"), Some(serde_json::json!(120.5)));
        assert_eq!(c.attribute("totalVisits"), Some(serde_json::json!(3)));
        assert_eq!(c.attribute("loyaltyTier"), None);
        assert_eq!(c.attribute("phone"), None);
    }

    #[test]
    fn dispatched_requires_status_and_timestamp() {
        let now = Utc::now();
        let mut campaign = Campaign {
            id: Uuid::new_v4(),
            name: "welcome".into(),
            description: None,
            segment_rules: serde_json::json!({}),
            message_template: "hi".into(),
            audience_size: 0,
            delivery_stats: DeliveryStats::default(),
            status: CampaignStatus::Sent,
            scheduled_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        // Status alone is not enough; an edited draft could carry it.
        assert!(!campaign.is_dispatched());
        campaign.sent_at = Some(now);
        assert!(campaign.is_dispatched());
    }
}
