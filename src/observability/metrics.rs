//! Metrics recording module.
//!
//! Recording goes through the `metrics` facade; without an installed recorder
//! every call is a no-op, so the library never depends on an exporter.

use std::time::Duration;

/// Record the outcome of a complete scan
pub fn record_scan_metrics(success: bool, duration: Duration, questions: usize) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("scan_operations_total", "result" => result).increment(1);
    ::metrics::histogram!("scan_duration_seconds").record(duration.as_secs_f64());
    if success {
        ::metrics::histogram!("scan_questions_detected").record(questions as f64);
    }
}

/// Record the duration of a single pipeline stage
pub fn record_stage_metrics(stage: &'static str, duration: Duration) {
    ::metrics::histogram!("scan_stage_duration_seconds", "stage" => stage)
        .record(duration.as_secs_f64());
}

/// Record an error by kind and component
pub fn record_error_metrics(kind: &'static str, component: &'static str) {
    ::metrics::counter!("scan_errors_total", "kind" => kind, "component" => component).increment(1);
}
