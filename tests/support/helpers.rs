use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{bail, Result};
use domainprobe::Telemetry;
use once_cell::sync::Lazy;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub async fn wait_for_worker_respawns(
    telemetry: &Arc<Telemetry>,
    expected: u64,
    timeout: Duration,
) -> Result<()> {
    let start = Instant::now();
    loop {
        let current = telemetry.worker_respawns();
        if current >= expected {
            return Ok(());
        }

        if start.elapsed() > timeout {
            bail!(
                "worker pool did not record {expected} respawns within {:?} (respawns: {current}, crashes: {})",
                timeout,
                telemetry.worker_crashes()
            );
        }

        sleep(Duration::from_millis(50)).await;
    }
}

pub async fn wait_for_completed_queries(
    telemetry: &Arc<Telemetry>,
    expected: u64,
    timeout: Duration,
) -> Result<()> {
    let start = Instant::now();
    loop {
        let current = telemetry.queries_completed();
        if current >= expected {
            return Ok(());
        }

        if start.elapsed() > timeout {
            bail!(
                "dispatcher did not complete {expected} queries within {:?} (completed: {current}, pending: {})",
                timeout,
                telemetry.pending_queries()
            );
        }

        sleep(Duration::from_millis(50)).await;
    }
}
