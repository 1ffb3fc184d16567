//! Pipeline configuration.

/// Default interval between trigger sweep passes.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 900;

/// Pipeline configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Evaluate every rule against every item regardless of activity
    /// kind. Escape hatch for migrations and test environments; leave off
    /// in production.
    pub ignore_kind: bool,
    /// Seconds between sweep passes.
    pub sweep_interval_secs: u64,
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable               | Required | Default |
    /// |------------------------|----------|---------|
    /// | `TRIGGERS_IGNORE_KIND` | no       | `false` |
    /// | `SWEEP_INTERVAL_SECS`  | no       | `900`   |
    pub fn from_env() -> Self {
        Self {
            ignore_kind: std::env::var("TRIGGERS_IGNORE_KIND")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            sweep_interval_secs: std::env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ignore_kind: false,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}
