//! Order ingestion — the only writer of customer stats.
//!
//! Each accepted order bumps the customer's total spend, visit count, and
//! last-activity timestamp through `CustomerStore::apply_stats_delta`, which
//! is what segmentation rules like INACTIVE_DAYS ultimately observe.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use crm_core::stores::CustomerStore;
use crm_core::types::{Order, OrderItem, OrderStatus};
use crm_core::{CrmError, CrmResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub order_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub total_amount: f64,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
}

pub struct OrderIngest {
    customers: Arc<dyn CustomerStore>,
    orders: DashMap<String, Order>,
}

impl OrderIngest {
    pub fn new(customers: Arc<dyn CustomerStore>) -> Self {
        Self {
            customers,
            orders: DashMap::new(),
        }
    }

    /// Records one order. Duplicate order ids and unknown customers are
    /// rejected before any mutation.
    pub fn record_order(&self, req: NewOrder) -> CrmResult<Order> {
        if self.orders.contains_key(&req.order_id) {
            return Err(CrmError::DuplicateOrder(req.order_id));
        }
        if self.customers.find_by_id(&req.customer_id)?.is_none() {
            return Err(CrmError::UnknownCustomer(req.customer_id));
        }

        let now = Utc::now();
        let order = Order {
            order_id: req.order_id,
            customer_id: req.customer_id,
            order_date: req.order_date.unwrap_or(now),
            total_amount: req.total_amount,
            items: req.items,
            status: req.status.unwrap_or(OrderStatus::Completed),
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.order_id.clone(), order.clone());

        self.customers
            .apply_stats_delta(&order.customer_id, order.total_amount, true)?;

        info!(
            order_id = %order.order_id,
            customer_id = %order.customer_id,
            total_amount = order.total_amount,
            "Order recorded"
        );
        Ok(order)
    }

    pub fn get_order(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|o| o.value().clone())
    }

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|o| o.value().clone()).collect();
        orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
        orders
    }
}
