use crate::dispatch::query::{LookupQuery, ServiceResponse};
use crate::dispatch::routing::{
    dispatch_command_channel, DispatchCommand, DispatchCommandSender, RoutingLoop,
    RoutingLoopParams,
};
use crate::providers::registry::ProviderRegistry;
use crate::runtime::config::DispatchConfig;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use crate::workers::messages::dispatch_event_channel;
use anyhow::{anyhow, bail, Context, Result};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Entry point for domain and IP lookups.
///
/// Owns the routing loop and its worker pool for one run at a time. `start`
/// and `stop` may be called repeatedly; queries are only accepted in
/// between. Dropping the dispatcher without `stop` cancels the run token and
/// detaches the background tasks.
pub struct Dispatcher {
    config: DispatchConfig,
    registry: Arc<ProviderRegistry>,
    telemetry: Arc<Telemetry>,
    shutdown_root: CancellationToken,
    run_token: Option<CancellationToken>,
    commands: Option<DispatchCommandSender>,
    routing_handle: Option<JoinHandle<()>>,
    metrics_handle: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Creates a dispatcher over an explicit provider registry.
    ///
    /// The dispatcher creates its own root cancellation token. Use
    /// [`Self::with_cancellation_token`] to integrate with an existing
    /// shutdown mechanism.
    pub fn new(config: DispatchConfig, registry: ProviderRegistry) -> Self {
        Self::with_cancellation_token(config, registry, CancellationToken::new())
    }

    /// Creates a dispatcher whose per-run cancellation tokens derive from
    /// `shutdown_token`.
    pub fn with_cancellation_token(
        config: DispatchConfig,
        registry: ProviderRegistry,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
            telemetry: Arc::new(Telemetry::default()),
            shutdown_root: shutdown_token,
            run_token: None,
            commands: None,
            routing_handle: None,
            metrics_handle: None,
        }
    }

    /// Creates a dispatcher with the providers the configuration enables.
    pub fn from_config(config: DispatchConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config)?;
        Ok(Self::new(config, registry))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Returns a clone of the telemetry handle for observability.
    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    pub fn is_running(&self) -> bool {
        self.commands.is_some()
    }

    /// Spawns the routing loop, its worker pool, and the metrics reporter.
    ///
    /// Returns an error if the dispatcher is already running.
    pub async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            bail!("dispatcher already running");
        }

        debug_assert!(
            self.config.validate().is_ok(),
            "DispatchConfig should have been validated at construction time"
        );

        let run_token = self.shutdown_root.child_token();
        let (command_tx, command_rx) = dispatch_command_channel();
        let event_capacity = self.config.pool_size().max(1).saturating_mul(4).max(8);
        let (event_tx, event_rx) = dispatch_event_channel(event_capacity);

        tracing::info!(
            pool = self.config.pool_size(),
            services = ?self.registry.service_names(),
            "starting dispatcher"
        );

        let routing = RoutingLoop::new(RoutingLoopParams {
            pool_size: self.config.pool_size(),
            job_timeout: self.config.job_timeout(),
            registry: self.registry.clone(),
            telemetry: self.telemetry.clone(),
            commands: command_rx,
            events: event_rx,
            event_tx,
            run_token: run_token.clone(),
        });
        let routing_handle = routing.spawn();
        let metrics_handle = spawn_metrics_reporter(
            self.telemetry.clone(),
            run_token.clone(),
            self.config.metrics_interval(),
        );

        self.run_token = Some(run_token);
        self.commands = Some(command_tx);
        self.routing_handle = Some(routing_handle);
        self.metrics_handle = Some(metrics_handle);

        Ok(())
    }

    /// Resolves one lookup, fanning out to every requested service.
    ///
    /// The returned vector holds one entry per distinct requested service,
    /// each carrying either provider data or the error that service produced.
    /// Returns an error only when the dispatcher itself is not available;
    /// per-service failures are part of the result.
    pub async fn submit_query(&self, lookup: LookupQuery) -> Result<Vec<ServiceResponse>> {
        let Some(commands) = &self.commands else {
            bail!("dispatcher is not running");
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        commands
            .send(DispatchCommand::Submit {
                lookup,
                reply: reply_tx,
            })
            .await
            .map_err(|_| anyhow!("dispatcher is shutting down"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("dispatcher stopped before the query completed"))
    }

    /// Stops the current run gracefully.
    ///
    /// Cancels the run token, drains the routing loop, and joins the
    /// background tasks. Stopping an idle dispatcher is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        tracing::info!("stopping dispatcher");

        self.commands = None;
        if let Some(run_token) = self.run_token.take() {
            run_token.cancel();
        }

        if let Some(handle) = self.routing_handle.take() {
            handle
                .await
                .context("failed to join the routing loop task")?;
        }
        if let Some(handle) = self.metrics_handle.take() {
            handle
                .await
                .context("failed to join the metrics reporter task")?;
        }

        tracing::info!("dispatcher stopped");
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(run_token) = self.run_token.take() {
            run_token.cancel();
        }
    }
}
