use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Lightweight rolling counters used to derive runtime metrics.
#[derive(Default, Debug)]
pub struct Telemetry {
    queries_submitted: AtomicU64,
    queries_completed: AtomicU64,
    jobs_dispatched: AtomicU64,
    responses_received: AtomicU64,
    provider_errors: AtomicU64,
    validation_failures: AtomicU64,
    jobs_expired: AtomicU64,
    worker_crashes: AtomicU64,
    worker_respawns: AtomicU64,
    pending_queries: AtomicUsize,
}

impl Telemetry {
    pub fn record_query_submitted(&self) {
        self.queries_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_completed(&self) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_jobs_dispatched(&self, count: u64) {
        if count == 0 {
            return;
        }
        self.jobs_dispatched.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_response(&self) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_error(&self) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validation_failure(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_job_expired(&self) {
        self.jobs_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_crash(&self) {
        self.worker_crashes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_worker_respawn(&self) {
        self.worker_respawns.fetch_add(1, Ordering::Relaxed);
    }

    /// Updates the pending-queries gauge to the routing loop's current table size.
    pub fn record_pending_queries(&self, count: usize) {
        self.pending_queries.store(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            queries_submitted: self.queries_submitted.load(Ordering::Relaxed),
            queries_completed: self.queries_completed.load(Ordering::Relaxed),
            jobs_dispatched: self.jobs_dispatched.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            provider_errors: self.provider_errors.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            jobs_expired: self.jobs_expired.load(Ordering::Relaxed),
            worker_crashes: self.worker_crashes.load(Ordering::Relaxed),
            worker_respawns: self.worker_respawns.load(Ordering::Relaxed),
            pending_queries: self.pending_queries.load(Ordering::Relaxed),
        }
    }

    pub fn queries_submitted(&self) -> u64 {
        self.queries_submitted.load(Ordering::Relaxed)
    }

    pub fn queries_completed(&self) -> u64 {
        self.queries_completed.load(Ordering::Relaxed)
    }

    pub fn jobs_dispatched(&self) -> u64 {
        self.jobs_dispatched.load(Ordering::Relaxed)
    }

    pub fn responses_received(&self) -> u64 {
        self.responses_received.load(Ordering::Relaxed)
    }

    pub fn provider_errors(&self) -> u64 {
        self.provider_errors.load(Ordering::Relaxed)
    }

    pub fn validation_failures(&self) -> u64 {
        self.validation_failures.load(Ordering::Relaxed)
    }

    pub fn jobs_expired(&self) -> u64 {
        self.jobs_expired.load(Ordering::Relaxed)
    }

    pub fn worker_crashes(&self) -> u64 {
        self.worker_crashes.load(Ordering::Relaxed)
    }

    pub fn worker_respawns(&self) -> u64 {
        self.worker_respawns.load(Ordering::Relaxed)
    }

    pub fn pending_queries(&self) -> usize {
        self.pending_queries.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TelemetrySnapshot {
    pub queries_submitted: u64,
    pub queries_completed: u64,
    pub jobs_dispatched: u64,
    pub responses_received: u64,
    pub provider_errors: u64,
    pub validation_failures: u64,
    pub jobs_expired: u64,
    pub worker_crashes: u64,
    pub worker_respawns: u64,
    pub pending_queries: usize,
}

/// Spawns a background task that periodically logs query throughput, pending depth, and failures.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "domainprobe::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let completed_delta = current_snapshot
                        .queries_completed
                        .saturating_sub(last_snapshot.queries_completed);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        completed_delta as f64 / elapsed
                    };

                    tracing::info!(
                        target: "domainprobe::metrics",
                        throughput = format!("{throughput:.2}"),
                        queries = current_snapshot.queries_completed,
                        pending = current_snapshot.pending_queries,
                        jobs = current_snapshot.jobs_dispatched,
                        responses = current_snapshot.responses_received,
                        provider_errors = current_snapshot.provider_errors,
                        validation_failures = current_snapshot.validation_failures,
                        jobs_expired = current_snapshot.jobs_expired,
                        worker_crashes = current_snapshot.worker_crashes,
                        worker_respawns = current_snapshot.worker_respawns,
                        "runtime metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test]
    async fn telemetry_records_counters() {
        let telemetry = Telemetry::default();
        telemetry.record_query_submitted();
        telemetry.record_jobs_dispatched(2);
        telemetry.record_jobs_dispatched(0);
        telemetry.record_response();
        telemetry.record_response();
        telemetry.record_provider_error();
        telemetry.record_validation_failure();
        telemetry.record_job_expired();
        telemetry.record_worker_crash();
        telemetry.record_worker_respawn();
        telemetry.record_query_completed();
        telemetry.record_pending_queries(3);

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.queries_submitted, 1);
        assert_eq!(snapshot.queries_completed, 1);
        assert_eq!(snapshot.jobs_dispatched, 2);
        assert_eq!(snapshot.responses_received, 2);
        assert_eq!(snapshot.provider_errors, 1);
        assert_eq!(snapshot.validation_failures, 1);
        assert_eq!(snapshot.jobs_expired, 1);
        assert_eq!(snapshot.worker_crashes, 1);
        assert_eq!(snapshot.worker_respawns, 1);
        assert_eq!(snapshot.pending_queries, 3);
        assert_eq!(telemetry.pending_queries(), 3);
    }

    #[tokio::test]
    async fn metrics_reporter_logs_until_shutdown() {
        let telemetry = Arc::new(Telemetry::default());
        telemetry.record_query_submitted();
        telemetry.record_query_completed();

        let shutdown = CancellationToken::new();
        let handle = spawn_metrics_reporter(telemetry, shutdown.clone(), Duration::from_millis(10));

        shutdown.cancel();
        timeout(Duration::from_secs(1), handle)
            .await
            .expect("reporter should stop promptly")
            .expect("task should not panic");
    }
}
