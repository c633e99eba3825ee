/// Sink for hub gauges and counters.
pub trait ConnectionMetrics: Send + Sync {
    fn increase_connections(&self);
    fn decrease_connections(&self);

    fn record_publish(&self, _delivered: usize) {}
    fn record_send_failure(&self) {}
    fn record_store_failure(&self) {}
    fn record_sweep(&self) {}
}
