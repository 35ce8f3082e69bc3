use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

pub(crate) const METRIC_PREFIX: &str = "ridgeline";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Default, Clone, Copy)]
struct RouteLatency {
    count: u64,
    total_ns: u128,
    max_ns: u128,
}

#[derive(Default)]
pub(crate) struct RequestMetrics {
    counts: Mutex<BTreeMap<(String, u16), u64>>,
    latency: Mutex<BTreeMap<String, RouteLatency>>,
    pub uploads_total: AtomicU64,
    pub upload_failures_total: AtomicU64,
    pub inquiries_total: AtomicU64,
    pub spam_rejected_total: AtomicU64,
    pub rate_limited_total: AtomicU64,
    pub revalidations_total: AtomicU64,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut lat = self.latency.lock().await;
        let entry = lat.entry(route.to_string()).or_default();
        let ns = latency.as_nanos();
        entry.count += 1;
        entry.total_ns += ns;
        entry.max_ns = entry.max_ns.max(ns);
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) async fn requests_total(&self) -> u64 {
        self.counts.lock().await.values().sum()
    }

    /// Request counters and latency summaries in Prometheus text format.
    pub(crate) async fn render_requests(&self, out: &mut String) {
        let _ = writeln!(
            out,
            "# TYPE {METRIC_PREFIX}_http_requests_total counter"
        );
        for ((route, status), count) in self.counts.lock().await.iter() {
            let _ = writeln!(
                out,
                "{METRIC_PREFIX}_http_requests_total{{route=\"{route}\",status=\"{status}\",version=\"{METRIC_VERSION}\"}} {count}"
            );
        }
        let _ = writeln!(
            out,
            "# TYPE {METRIC_PREFIX}_http_request_duration_seconds summary"
        );
        for (route, lat) in self.latency.lock().await.iter() {
            let sum = lat.total_ns as f64 / 1e9;
            let max = lat.max_ns as f64 / 1e9;
            let _ = writeln!(
                out,
                "{METRIC_PREFIX}_http_request_duration_seconds_sum{{route=\"{route}\"}} {sum:.6}"
            );
            let _ = writeln!(
                out,
                "{METRIC_PREFIX}_http_request_duration_seconds_count{{route=\"{route}\"}} {}",
                lat.count
            );
            let _ = writeln!(
                out,
                "{METRIC_PREFIX}_http_request_duration_seconds_max{{route=\"{route}\"}} {max:.6}"
            );
        }
        for (name, counter) in [
            ("uploads_total", &self.uploads_total),
            ("upload_failures_total", &self.upload_failures_total),
            ("inquiries_total", &self.inquiries_total),
            ("spam_rejected_total", &self.spam_rejected_total),
            ("rate_limited_total", &self.rate_limited_total),
            ("revalidations_total", &self.revalidations_total),
        ] {
            let _ = writeln!(
                out,
                "{METRIC_PREFIX}_{name} {}",
                counter.load(Ordering::Relaxed)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_are_grouped_by_route_and_status() {
        let m = RequestMetrics::default();
        m.observe_request("/:locale", StatusCode::OK, Duration::from_millis(3))
            .await;
        m.observe_request("/:locale", StatusCode::OK, Duration::from_millis(5))
            .await;
        m.observe_request("/:locale", StatusCode::NOT_FOUND, Duration::from_millis(1))
            .await;
        RequestMetrics::bump(&m.uploads_total);
        let mut text = String::new();
        m.render_requests(&mut text).await;
        assert!(text.contains("route=\"/:locale\",status=\"200\""));
        assert!(text.contains("ridgeline_http_request_duration_seconds_count{route=\"/:locale\"} 3"));
        assert!(text.contains("ridgeline_uploads_total 1"));
        assert_eq!(m.requests_total().await, 3);
    }
}
