//! # Unified Application Configuration
//!
//! Bundles the scan pipeline settings and the observability settings into a
//! single configuration object loaded once at startup.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::scan_config::ScanConfig;
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Scan pipeline configuration
    pub scan: ScanConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// When `OMR_CONFIG_FILE` names a JSON file, the scan settings come from
    /// that file instead of the individual `OMR_*` variables.
    pub fn from_env() -> AppResult<Self> {
        let scan = match env::var("OMR_CONFIG_FILE") {
            Ok(path) if !path.trim().is_empty() => {
                ScanConfig::from_json_file(Path::new(path.trim()))?
            }
            _ => ScanConfig::from_env(),
        };

        let config = Self {
            scan,
            observability: ObservabilityConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the scan settings with the contents of a JSON file
    pub fn with_scan_file(mut self, path: &Path) -> AppResult<Self> {
        self.scan = ScanConfig::from_json_file(path)?;
        Ok(self)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.scan.validate()?;
        self.observability
            .validate()
            .map_err(|e| AppError::Config(format!("Observability configuration invalid: {}", e)))?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: environment={}, log_format={}, canny={}/{}, options_per_row={}, expected_questions={:?}, reference_width={:?}",
            self.observability.environment,
            self.observability.log_format,
            self.scan.edges.canny_low,
            self.scan.edges.canny_high,
            self.scan.grid.options_per_row,
            self.scan.grid.expected_questions,
            self.scan.bubbles.reference_width
        )
    }
}
