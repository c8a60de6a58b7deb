//! Simulated vendor transport.
//!
//! Each send is an independent task: a bounded random delay, a weighted
//! coin flip, then a receipt posted back through the [`ReceiptSink`]. This is
//! the boundary a real message-vendor integration would replace — nothing
//! outside this module knows deliveries are simulated.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crm_core::config::DeliveryConfig;
use crm_core::types::DeliveryStatus;
use crm_core::CrmError;

use crate::aggregator::{DeliveryReceipt, ReceiptSink};

pub struct TransportSimulator {
    config: DeliveryConfig,
    sink: Arc<dyn ReceiptSink>,
}

impl TransportSimulator {
    pub fn new(config: DeliveryConfig, sink: Arc<dyn ReceiptSink>) -> Self {
        Self { config, sink }
    }

    /// Fires one simulated send. Returns immediately with the task handle;
    /// the outcome reaches the aggregator as a receipt. Receipt failures are
    /// logged and dropped here — one bad record never disturbs its siblings.
    pub fn simulate(&self, vendor_message_id: String) -> JoinHandle<()> {
        let sink = Arc::clone(&self.sink);
        let config = self.config.clone();

        tokio::spawn(async move {
            let max_delay = config.max_delay_ms.max(config.min_delay_ms);
            let (delay_ms, success) = {
                let mut rng = rand::thread_rng();
                (
                    rng.gen_range(config.min_delay_ms..=max_delay),
                    rng.gen_bool(config.success_rate.clamp(0.0, 1.0)),
                )
            };
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;

            let receipt = if success {
                DeliveryReceipt {
                    vendor_message_id: vendor_message_id.clone(),
                    status: DeliveryStatus::Delivered,
                    failure_reason: None,
                }
            } else {
                DeliveryReceipt {
                    vendor_message_id: vendor_message_id.clone(),
                    status: DeliveryStatus::Failed,
                    failure_reason: Some(config.failure_reason.clone()),
                }
            };

            match sink.apply_receipt(receipt) {
                Ok(()) => {
                    debug!(vendor_message_id = %vendor_message_id, success, "Simulated send resolved")
                }
                Err(CrmError::UnknownReceipt(id)) => {
                    metrics::counter!("delivery.receipts_dropped").increment(1);
                    warn!(vendor_message_id = %id, "Receipt for untracked message dropped");
                }
                Err(e) => {
                    warn!(vendor_message_id = %vendor_message_id, error = %e, "Failed to apply receipt");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Captures receipts for assertions, in place of the real aggregator.
    #[derive(Default)]
    struct CaptureSink {
        receipts: Mutex<Vec<DeliveryReceipt>>,
    }

    impl ReceiptSink for CaptureSink {
        fn apply_receipt(&self, receipt: DeliveryReceipt) -> crm_core::CrmResult<()> {
            self.receipts.lock().push(receipt);
            Ok(())
        }
    }

    fn fast_config(success_rate: f64) -> DeliveryConfig {
        DeliveryConfig {
            success_rate,
            min_delay_ms: 1,
            max_delay_ms: 2,
            failure_reason: "down".into(),
        }
    }

    #[tokio::test]
    async fn certain_success_posts_delivered() {
        let sink = Arc::new(CaptureSink::default());
        let transport = TransportSimulator::new(fast_config(1.0), sink.clone());
        transport.simulate("vm-1".into()).await.unwrap();

        let receipts = sink.receipts.lock();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].status, DeliveryStatus::Delivered);
        assert!(receipts[0].failure_reason.is_none());
    }

    #[tokio::test]
    async fn certain_failure_posts_failed_with_reason() {
        let sink = Arc::new(CaptureSink::default());
        let transport = TransportSimulator::new(fast_config(0.0), sink.clone());
        transport.simulate("vm-2".into()).await.unwrap();

        let receipts = sink.receipts.lock();
        assert_eq!(receipts[0].status, DeliveryStatus::Failed);
        assert_eq!(receipts[0].failure_reason.as_deref(), Some("down"));
    }

    #[tokio::test]
    async fn sink_error_is_swallowed_per_record() {
        struct FailingSink;
        impl ReceiptSink for FailingSink {
            fn apply_receipt(&self, receipt: DeliveryReceipt) -> crm_core::CrmResult<()> {
                Err(CrmError::UnknownReceipt(receipt.vendor_message_id))
            }
        }

        let transport = TransportSimulator::new(fast_config(1.0), Arc::new(FailingSink));
        // The task must complete cleanly despite the sink rejecting the receipt.
        transport.simulate("vm-3".into()).await.unwrap();
    }
}
