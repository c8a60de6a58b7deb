//! Campaign delivery pipeline — dispatch fan-out, simulated vendor
//! transport, and receipt-driven status aggregation.

pub mod aggregator;
pub mod dispatcher;
pub mod template;
pub mod transport;

pub use aggregator::{DeliveryReceipt, ReceiptSink, StatusAggregator};
pub use dispatcher::{DeliveryDispatcher, DispatchOutcome};
pub use template::render_message;
pub use transport::TransportSimulator;
