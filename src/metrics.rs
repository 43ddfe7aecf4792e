//! Metric names and recording helpers for CMS traffic and normalization.
//!
//! Recording is a no-op until a recorder is installed; the CLI installs the
//! Prometheus one behind `--metrics`.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Every metric the crate records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Requests
    RequestsSuccess,
    RequestsError,
    RequestDuration,
    UpstreamErrors,

    // Normalize
    EntriesNormalized,
    EnvelopesPassthrough,
    MalformedEnvelopes,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RequestsSuccess => "womencypedia_cms_requests_success_total",
            MetricName::RequestsError => "womencypedia_cms_requests_error_total",
            MetricName::RequestDuration => "womencypedia_cms_request_duration_seconds",
            MetricName::UpstreamErrors => "womencypedia_cms_upstream_errors_total",
            MetricName::EntriesNormalized => "womencypedia_cms_entries_normalized_total",
            MetricName::EnvelopesPassthrough => "womencypedia_cms_envelopes_passthrough_total",
            MetricName::MalformedEnvelopes => "womencypedia_cms_envelopes_malformed_total",
        }
    }
}

impl std::fmt::Display for MetricName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the global Prometheus recorder and returns its handle for rendering.
pub fn init() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))
}

// ============================================================================
// Request Metrics
// ============================================================================

pub mod requests {
    use super::MetricName;

    pub fn success(method: &'static str) {
        ::metrics::counter!(MetricName::RequestsSuccess.as_str(), "method" => method).increment(1);
    }

    pub fn error(method: &'static str) {
        ::metrics::counter!(MetricName::RequestsError.as_str(), "method" => method).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::RequestDuration.as_str()).record(secs);
    }

    /// The CMS answered with an `error` envelope
    pub fn upstream_error(status: u16) {
        ::metrics::counter!(MetricName::UpstreamErrors.as_str(), "status" => status.to_string())
            .increment(1);
    }
}

// ============================================================================
// Normalize Metrics
// ============================================================================

pub mod normalize {
    use super::MetricName;

    pub fn entries(count: usize) {
        ::metrics::counter!(MetricName::EntriesNormalized.as_str()).increment(count as u64);
    }

    pub fn passthrough() {
        ::metrics::counter!(MetricName::EnvelopesPassthrough.as_str()).increment(1);
    }

    pub fn malformed() {
        ::metrics::counter!(MetricName::MalformedEnvelopes.as_str()).increment(1);
    }
}
