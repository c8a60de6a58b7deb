//! CRM segmentation & delivery core — demo entry point.
//!
//! Seeds an in-memory customer population, creates a win-back campaign from a
//! rule tree, dispatches it through the simulated vendor transport, and waits
//! for the delivery stats to converge.

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crm_campaigns::{CampaignService, CreateCampaignRequest};
use crm_core::config::CrmConfig;
use crm_core::types::CampaignStatus;
use crm_delivery::{DeliveryDispatcher, StatusAggregator, TransportSimulator};
use crm_segmentation::AudienceResolver;
use crm_store::{seed_demo_customers, InMemoryCampaignStore, InMemoryCustomerStore, InMemoryDeliveryRecordStore};

#[derive(Parser, Debug)]
#[command(name = "crm-server")]
#[command(about = "CRM segmentation and campaign delivery core")]
#[command(version)]
struct Cli {
    /// Minimum spend for the demo win-back segment
    #[arg(long, default_value_t = 5000)]
    min_spend: u64,

    /// Inactivity window in days for the demo win-back segment
    #[arg(long, default_value_t = 90)]
    inactive_days: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_server=info,crm_delivery=info,crm_segmentation=info,crm_store=info,crm_campaigns=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = CrmConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        CrmConfig::default()
    });
    info!(
        success_rate = config.delivery.success_rate,
        "CRM core starting"
    );

    let customers = Arc::new(InMemoryCustomerStore::new());
    let campaigns = Arc::new(InMemoryCampaignStore::new());
    let records = Arc::new(InMemoryDeliveryRecordStore::new());
    seed_demo_customers(&customers);

    let aggregator = Arc::new(StatusAggregator::new(records.clone(), campaigns.clone()));
    let transport = Arc::new(TransportSimulator::new(config.delivery.clone(), aggregator));
    let dispatcher = DeliveryDispatcher::new(records.clone(), campaigns.clone(), transport);
    let resolver = AudienceResolver::new(customers.clone(), config.segmentation.clone());
    let service = CampaignService::new(campaigns.clone(), records.clone(), resolver, dispatcher);

    let rules = serde_json::json!({
        "operator": "AND",
        "rules": [
            { "field": "totalSpend", "condition": "GT", "value": cli.min_spend },
            { "field": "lastActivity", "condition": "INACTIVE_DAYS", "value": cli.inactive_days }
        ]
    });

    let preview = service.audience_preview(&rules)?;
    info!(
        audience_size = preview.audience_size,
        samples = ?preview.sample_emails,
        "Win-back audience preview"
    );

    let (campaign, outcome) = service
        .create_campaign(CreateCampaignRequest {
            name: "Win-back high spenders".into(),
            description: Some("Demo campaign for lapsed high-value customers".into()),
            segment_rules: rules,
            message_template: "Hi {{customer_email}}, here's 10% off on your next order!".into(),
            status: Some(CampaignStatus::Sent),
            scheduled_at: None,
        })
        .await?;

    if let Some(outcome) = outcome {
        info!(
            campaign_id = %campaign.id,
            records_created = outcome.records_created,
            "Dispatch issued, waiting for receipts"
        );
        outcome.await_transport().await;
    }

    let settled = service.get_campaign(campaign.id)?;
    info!(
        campaign_id = %settled.id,
        sent = settled.delivery_stats.sent,
        failed = settled.delivery_stats.failed,
        pending = settled.delivery_stats.pending,
        "Campaign delivery settled"
    );

    Ok(())
}
