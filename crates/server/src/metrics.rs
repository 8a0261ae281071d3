//! Prometheus exposition for the HTTP layer and the catalog scanner.

use std::sync::Arc;
use std::time::Duration;

use matcher::{set_scan_metrics, ScanMetrics};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::error::ServerError;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the process-wide Prometheus recorder and route scanner metrics
/// into it. Later calls return the handle installed by the first one.
pub fn install() -> Result<&'static PrometheusHandle, ServerError> {
    PROMETHEUS.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| ServerError::Config(format!("metrics recorder: {e}")))?;
        set_scan_metrics(Some(Arc::new(PrometheusScanMetrics)));
        Ok(handle)
    })
}

/// Rendered text, or `None` when no recorder has been installed.
pub fn render() -> Option<String> {
    PROMETHEUS.get().map(PrometheusHandle::render)
}

/// Forwards scan reports from the matcher to the `metrics` facade.
struct PrometheusScanMetrics;

impl ScanMetrics for PrometheusScanMetrics {
    fn record_scan(&self, candidates: usize, failures: usize, matched: bool, latency: Duration) {
        let outcome = if matched { "match" } else { "no_match" };
        ::metrics::counter!("dex_scans_total", "outcome" => outcome).increment(1);
        ::metrics::counter!("dex_scan_candidates_total").increment(candidates as u64);
        ::metrics::counter!("dex_scan_failures_total").increment(failures as u64);
        ::metrics::histogram!("dex_scan_duration_seconds").record(latency.as_secs_f64());
    }
}

/// Count one finished HTTP request.
pub fn record_request(method: &str, status: u16, latency: Duration) {
    ::metrics::counter!(
        "dex_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!("dex_http_request_duration_seconds").record(latency.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_recorder_renders_scan_and_request_metrics() {
        let handle = install().unwrap();
        assert!(std::ptr::eq(handle, install().unwrap()));

        PrometheusScanMetrics.record_scan(3, 1, true, Duration::from_millis(5));
        record_request("GET", 200, Duration::from_millis(2));

        let text = render().unwrap();
        assert!(text.contains("dex_scans_total"));
        assert!(text.contains("dex_scan_failures_total"));
        assert!(text.contains("dex_http_requests_total"));
    }
}
