use serde::Deserialize;

/// Root configuration. Loaded from environment variables with the `CRM__`
/// prefix, e.g. `CRM__DELIVERY__SUCCESS_RATE=0.95`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrmConfig {
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Probability that a simulated send resolves to delivered.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    /// Bounds on the simulated vendor round-trip, in milliseconds.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_failure_reason")]
    pub failure_reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SegmentationConfig {
    /// Number of sample emails returned by an audience preview.
    #[serde(default = "default_preview_sample_size")]
    pub preview_sample_size: usize,
}

fn default_success_rate() -> f64 {
    0.9
}

fn default_min_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    600
}

fn default_failure_reason() -> String {
    "Simulated network error or recipient unavailable.".to_string()
}

fn default_preview_sample_size() -> usize {
    5
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            failure_reason: default_failure_reason(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            preview_sample_size: default_preview_sample_size(),
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryConfig::default(),
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl CrmConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CRM")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
