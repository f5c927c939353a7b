//! Observability module for centralized tracing, logging and metrics setup.
//!
//! This module provides:
//! - Structured logging with configurable levels and formats
//! - Tracing spans for scan operations
//! - Metrics recording through the `metrics` facade

pub mod metrics;
pub mod tracing_mod;

use anyhow::Result;

use crate::observability_config::ObservabilityConfig;

pub use self::metrics::{record_error_metrics, record_scan_metrics, record_stage_metrics};
pub use self::tracing_mod::{init_tracing_with_config, scan_span, stage_span};

/// Initialize the observability stack with custom configuration
pub fn init_observability_with_config(config: &ObservabilityConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    init_tracing_with_config(config)?;

    tracing::info!(
        environment = %config.environment,
        log_format = %config.log_format,
        "Observability stack initialized successfully"
    );
    Ok(())
}
