pub mod config;
pub mod error;
pub mod filter;
pub mod stores;
pub mod types;

pub use config::CrmConfig;
pub use error::{CrmError, CrmResult};
