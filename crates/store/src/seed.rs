//! Demo data for development and the demo binary.

use chrono::{Duration, Utc};
use tracing::info;

use crm_core::types::Customer;

use crate::memory::InMemoryCustomerStore;

/// Seeds a small customer population spanning the interesting segmentation
/// axes: high/low spend, frequent/rare visitors, recent/stale activity.
pub fn seed_demo_customers(store: &InMemoryCustomerStore) {
    let now = Utc::now();
    let profiles: [(&str, &str, &str, f64, u64, i64); 6] = [
        ("cust-001", "Meera Iyer", "meera@example.com", 12500.0, 24, 3),
        ("cust-002", "Arjun Rao", "arjun@example.com", 6200.0, 11, 200),
        ("cust-003", "Sara Khan", "sara@example.com", 480.0, 3, 45),
        ("cust-004", "Liam Chen", "liam@example.com", 9100.0, 18, 95),
        ("cust-005", "Nina Petrov", "nina@example.com", 75.0, 1, 400),
        ("cust-006", "Omar Haddad", "omar@example.com", 5400.0, 9, 10),
    ];

    for (id, name, email, spend, visits, days_since_activity) in profiles {
        let mut customer = Customer::new(id, name, email);
        customer.total_spend = spend;
        customer.total_visits = visits;
        customer.last_activity = now - Duration::days(days_since_activity);
        store.insert(customer);
    }

    info!(count = store.len(), "Demo customers seeded");
}
