use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use notehub_domain::ConnectionMetrics;

#[derive(Debug, Default)]
pub struct Metrics {
    active_connections: AtomicI64,
    published: AtomicU64,
    immediate_deliveries: AtomicU64,
    broadcast_sweeps: AtomicU64,
    send_failures: AtomicU64,
    store_failures: AtomicU64,
}

impl Metrics {
    pub fn active_connections(&self) -> i64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let connections = self.active_connections.load(Ordering::Relaxed);
        let published = self.published.load(Ordering::Relaxed);
        let deliveries = self.immediate_deliveries.load(Ordering::Relaxed);
        let sweeps = self.broadcast_sweeps.load(Ordering::Relaxed);
        let send_failures = self.send_failures.load(Ordering::Relaxed);
        let store_failures = self.store_failures.load(Ordering::Relaxed);

        format!(
            "# TYPE notehub_active_connections gauge\n\
notehub_active_connections {}\n\
# TYPE notehub_published_total counter\n\
notehub_published_total {}\n\
# TYPE notehub_immediate_deliveries_total counter\n\
notehub_immediate_deliveries_total {}\n\
# TYPE notehub_broadcast_sweeps_total counter\n\
notehub_broadcast_sweeps_total {}\n\
# TYPE notehub_send_failures_total counter\n\
notehub_send_failures_total {}\n\
# TYPE notehub_store_failures_total counter\n\
notehub_store_failures_total {}\n",
            connections, published, deliveries, sweeps, send_failures, store_failures
        )
    }
}

impl ConnectionMetrics for Metrics {
    fn increase_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    fn decrease_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    fn record_publish(&self, delivered: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.immediate_deliveries
            .fetch_add(delivered as u64, Ordering::Relaxed);
    }

    fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    fn record_sweep(&self) {
        self.broadcast_sweeps.fetch_add(1, Ordering::Relaxed);
    }
}
