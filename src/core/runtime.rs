//! Main runtime orchestration.
//!
//! The runtime coordinates component lifecycle:
//! - Start order: store → guard manager → HTTP listener
//! - Shutdown order: HTTP listener → store

use crate::core::config::Config;
use crate::core::time::{Clock, SystemClock};
use crate::guard::{GuardManager, GuardPolicy, IdGenerator, UuidGenerator};
use crate::http;
use crate::store::{open_store, GuardStore};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long `stop` waits for in-flight requests to drain.
const HTTP_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Component health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentHealth {
    /// Component is starting.
    Starting,
    /// Component is healthy and operational.
    Healthy,
    /// Component has failed.
    Failed,
    /// Component is stopping.
    Stopping,
    /// Component has stopped.
    Stopped,
}

/// Health status aggregated from all components.
#[derive(Debug, Clone)]
pub struct RuntimeHealth {
    /// Guard store health.
    pub store: ComponentHealth,
    /// HTTP listener health.
    pub http: ComponentHealth,
}

impl Default for RuntimeHealth {
    fn default() -> Self {
        Self {
            store: ComponentHealth::Starting,
            http: ComponentHealth::Starting,
        }
    }
}

impl RuntimeHealth {
    /// Check if the runtime is ready to serve requests.
    pub fn is_ready(&self) -> bool {
        self.store == ComponentHealth::Healthy && self.http == ComponentHealth::Healthy
    }
}

/// Requests runtime shutdown; cloneable across tasks.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.0.send(true);
    }
}

/// Guardhouse runtime holding all component handles.
pub struct Runtime {
    /// Configuration.
    config: Arc<Config>,

    /// Time source for expiries.
    clock: Arc<dyn Clock>,

    /// Guard id source.
    ids: Arc<dyn IdGenerator>,

    /// Opened store.
    store: Option<Arc<dyn GuardStore>>,

    /// Guard manager built over the store.
    manager: Option<GuardManager>,

    /// Address the HTTP listener actually bound.
    local_addr: Option<SocketAddr>,

    /// Runtime health status.
    health: RuntimeHealth,

    /// Whether the runtime is running.
    running: Arc<AtomicBool>,

    /// Shutdown signal sender.
    shutdown_tx: Arc<watch::Sender<bool>>,

    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,

    /// HTTP server task handle.
    http_handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl Runtime {
    /// Create a new runtime with the given configuration.
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            store: None,
            manager: None,
            local_addr: None,
            health: RuntimeHealth::default(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            http_handle: None,
        })
    }

    /// Replace the clock. Takes effect on the next `start`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the id generator. Takes effect on the next `start`.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the guard manager (if started).
    pub fn manager(&self) -> Option<&GuardManager> {
        self.manager.as_ref()
    }

    /// Address the HTTP listener is bound to (if started).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Get the current health status.
    pub fn health(&self) -> &RuntimeHealth {
        &self.health
    }

    /// Check if the runtime is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Get a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Get a handle that can request shutdown from another task.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Open the store, build the manager and start serving HTTP.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!(
            backend = %self.config.store.backend,
            bind = %self.config.http.bind,
            "starting guardhouse runtime"
        );

        self.init_store().await?;
        self.start_http().await?;

        self.running.store(true, Ordering::Release);
        tracing::info!("guardhouse runtime started");
        Ok(())
    }

    /// Open the store and build the guard manager over it.
    async fn init_store(&mut self) -> Result<()> {
        tracing::debug!("opening guard store");

        let store = match open_store(&self.config.store, self.clock.clone()).await {
            Ok(store) => store,
            Err(e) => {
                self.health.store = ComponentHealth::Failed;
                return Err(e).context("failed to open guard store");
            }
        };

        let policy = GuardPolicy::from(&self.config.guards);
        self.manager = Some(GuardManager::new(
            store.clone(),
            self.clock.clone(),
            self.ids.clone(),
            policy,
        ));
        self.store = Some(store);
        self.health.store = ComponentHealth::Healthy;

        tracing::info!(
            lifetime_seconds = policy.lifetime.as_secs(),
            max_per_user = policy.max_per_user,
            "guard manager ready"
        );
        Ok(())
    }

    /// Bind the listener and spawn the server task.
    async fn start_http(&mut self) -> Result<()> {
        let Some(manager) = self.manager.clone() else {
            anyhow::bail!("guard manager is not initialized");
        };

        let router = http::create_router(manager, &self.config.http)?;
        let listener = TcpListener::bind(&self.config.http.bind)
            .await
            .with_context(|| format!("failed to bind {}", self.config.http.bind))?;
        let local_addr = listener
            .local_addr()
            .context("failed to read listener address")?;

        let shutdown_rx = self.shutdown_rx.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(wait_for_signal(shutdown_rx))
                .await
        });

        self.local_addr = Some(local_addr);
        self.http_handle = Some(handle);
        self.health.http = ComponentHealth::Healthy;

        tracing::info!(bind = %local_addr, "HTTP listener started");
        Ok(())
    }

    /// Trigger graceful shutdown.
    pub fn shutdown(&self) {
        tracing::info!("shutdown requested");
        let _ = self.shutdown_tx.send(true);
    }

    /// Run the runtime until SIGINT, a shutdown request or a server failure.
    pub async fn run(&mut self) -> Result<()> {
        self.start().await?;

        let shutdown_rx = self.shutdown_rx.clone();
        let server_exit = match self.http_handle.as_mut() {
            Some(handle) => tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("shutdown signal received (SIGINT)");
                    None
                }
                _ = wait_for_signal(shutdown_rx) => {
                    tracing::info!("shutdown requested by component");
                    None
                }
                result = handle => Some(result),
            },
            None => None,
        };

        if let Some(result) = server_exit {
            self.http_handle = None;
            self.health.http = ComponentHealth::Failed;
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task panicked"),
            }
        }

        self.stop().await
    }

    /// Stop all runtime components.
    ///
    /// The listener drains first so that no request sees a closed store.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("stopping guardhouse runtime");
        self.running.store(false, Ordering::Release);

        // Signal shutdown to all components
        let _ = self.shutdown_tx.send(true);

        self.stop_http().await;
        self.stop_store().await;

        tracing::info!("guardhouse runtime stopped");
        Ok(())
    }

    async fn stop_http(&mut self) {
        tracing::debug!("stopping HTTP listener");
        self.health.http = ComponentHealth::Stopping;

        if let Some(handle) = self.http_handle.take() {
            match tokio::time::timeout(HTTP_DRAIN_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => tracing::info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => tracing::warn!(error = %e, "HTTP server stopped with error"),
                Ok(Err(e)) => tracing::warn!(error = %e, "HTTP server task panicked"),
                Err(_) => tracing::warn!("HTTP server stop timed out"),
            }
        }

        self.health.http = ComponentHealth::Stopped;
    }

    async fn stop_store(&mut self) {
        tracing::debug!("closing guard store");
        self.health.store = ComponentHealth::Stopping;
        self.manager = None;

        if let Some(store) = self.store.take() {
            if let Err(e) = store.close().await {
                tracing::warn!(error = %e, "failed to close guard store");
            }
        }

        self.health.store = ComponentHealth::Stopped;
    }
}

/// Resolve once the shutdown flag is set or the sender is gone.
async fn wait_for_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
