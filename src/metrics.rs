use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own HTTP listener and register all
/// application metrics.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;

    // Pre-register counters so they appear even before the first increment.
    counter!("positions_opened_total").absolute(0);
    counter!("positions_closed_total").absolute(0);
    counter!("reviews_completed_total").absolute(0);
    counter!("reviews_failed_total").absolute(0);
    counter!("drafts_staged_total").absolute(0);
    counter!("drafts_confirmed_total").absolute(0);
    counter!("drafts_discarded_total").absolute(0);

    gauge!("open_positions").set(0.0);

    Ok(())
}
