//! Pricing metrics: provider fetches, aggregation, selection and sync.

use metrics::{counter, gauge, histogram};
use std::time::Instant;

/// Pricing metrics recorder
pub struct PricingMetrics;

impl PricingMetrics {
    // =========================================================================
    // Provider Metrics
    // =========================================================================

    /// Record a successful provider fetch
    pub fn record_provider_fetch(provider: &str, plans: usize, duration_secs: f64) {
        counter!(
            "pricing_provider_fetches_total",
            "provider" => provider.to_string(),
            "outcome" => "success"
        )
        .increment(1);
        histogram!("pricing_provider_fetch_duration_seconds", "provider" => provider.to_string())
            .record(duration_secs);
        gauge!("pricing_provider_plans", "provider" => provider.to_string()).set(plans as f64);
    }

    /// Record a provider that contributed nothing.
    ///
    /// `reason` is one of `not_configured`, `error` or `timeout`.
    pub fn record_provider_failure(provider: &str, reason: &str) {
        counter!(
            "pricing_provider_fetches_total",
            "provider" => provider.to_string(),
            "outcome" => reason.to_string()
        )
        .increment(1);
        gauge!("pricing_provider_plans", "provider" => provider.to_string()).set(0.0);
    }

    // =========================================================================
    // Aggregation and Selection
    // =========================================================================

    /// Record a live aggregation across `providers` adapters
    pub fn record_aggregation(providers: usize, plans: usize, duration_secs: f64) {
        histogram!("pricing_aggregation_duration_seconds").record(duration_secs);

        tracing::debug!(
            providers = providers,
            plans = plans,
            duration_secs = duration_secs,
            "Aggregated live plans"
        );
    }

    /// Record a served pricing request by plan source (`database` or `live`)
    pub fn record_request(source: &str, candidates: usize) {
        counter!("pricing_requests_total", "source" => source.to_string()).increment(1);

        tracing::debug!(source = source, candidates = candidates, "Served pricing request");
    }

    /// Record a recommendation pass
    pub fn record_selection(policy: &str, recommended: usize) {
        counter!("pricing_selections_total", "policy" => policy.to_string()).increment(1);
        gauge!("pricing_recommended_plans", "policy" => policy.to_string())
            .set(recommended as f64);
    }

    // =========================================================================
    // Sync Metrics
    // =========================================================================

    /// Record a committed sync run
    pub fn record_sync_completed(fetched: usize, inserted: usize, duration_secs: f64) {
        counter!("pricing_sync_runs_total", "status" => "completed").increment(1);
        histogram!("pricing_sync_duration_seconds").record(duration_secs);
        gauge!("pricing_plans_synced_last_run").set(inserted as f64);

        tracing::info!(
            fetched = fetched,
            inserted = inserted,
            duration_secs = duration_secs,
            "Sync run completed"
        );
    }

    /// Record a sync run that found nothing to write
    pub fn record_sync_skipped() {
        counter!("pricing_sync_runs_total", "status" => "skipped").increment(1);
    }

    /// Record a rolled back sync run
    pub fn record_sync_failed(error: &str) {
        counter!("pricing_sync_runs_total", "status" => "failed").increment(1);

        tracing::error!(error = error, "Sync run failed");
    }
}

/// Timer guard for automatic duration recording.
///
/// Records the duration when `stop()` is called or when dropped.
pub struct PricingTimer {
    start: Instant,
    operation: &'static str,
    stopped: bool,
}

impl PricingTimer {
    /// Start a new timer for an operation
    pub fn new(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
            stopped: false,
        }
    }

    /// Stop the timer and record the duration. Returns duration in milliseconds.
    pub fn stop(&mut self) -> u64 {
        if self.stopped {
            return 0;
        }
        self.stopped = true;

        let duration = self.start.elapsed();
        histogram!("pricing_operation_duration_seconds", "operation" => self.operation)
            .record(duration.as_secs_f64());

        duration.as_millis() as u64
    }
}

impl Drop for PricingTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}
