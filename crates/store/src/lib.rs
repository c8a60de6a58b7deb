//! In-memory store implementations backed by DashMap.
//!
//! Production: replace with MongoDB or PostgreSQL behind the same trait
//! surface. These exist for development, tests, and the demo binary.

pub mod memory;
pub mod seed;

pub use memory::{InMemoryCampaignStore, InMemoryCustomerStore, InMemoryDeliveryRecordStore};
pub use seed::seed_demo_customers;
