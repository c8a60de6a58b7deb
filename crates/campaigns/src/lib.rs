//! Campaign lifecycle orchestration — create/update/delete, audience
//! preview, send triggering — plus order ingestion feeding customer stats.

pub mod orders;
pub mod service;

pub use orders::{NewOrder, OrderIngest};
pub use service::{CampaignService, CreateCampaignRequest, UpdateCampaignRequest};
