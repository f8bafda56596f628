//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every subsystem from configuration, in dependency order
//! - Restore persisted health history before traffic
//! - Start background tasks (health monitor, admin API)
//! - Stop them again on shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - No globals: the service is an explicit value callers own
//! - Transport and history store are injectable for tests and embedding

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::cache::ResponseCache;
use crate::config::loader::ConfigError;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::{HistoryBackend, HistoryConfig, RouterConfig};
use crate::dispatch::{Dispatcher, RequestOptions, RouteResult};
use crate::health::{FileHistoryStore, HealthHistoryStore, HealthMonitor, HistoryRecorder, MemoryHistoryStore};
use crate::lifecycle::Shutdown;
use crate::registry::{Capability, EndpointRegistry, RegistryError};
use crate::resilience::ConcurrencyGate;
use crate::transport::{HttpTransport, Transport, TransportError};

/// How long `shutdown` waits for background tasks to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to build HTTP transport: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to bind admin API on {address}: {source}")]
    AdminBind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// A fully wired router: registry, cache, gate, transport, history and
/// dispatcher, plus the background tasks started by [`RouterService::start`].
pub struct RouterService {
    config: RouterConfig,
    registry: Arc<EndpointRegistry>,
    cache: Arc<ResponseCache>,
    gate: Arc<ConcurrencyGate>,
    transport: Arc<dyn Transport>,
    recorder: Arc<HistoryRecorder>,
    dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
    admin_address: Option<SocketAddr>,
}

impl RouterService {
    /// Validate `config` and build the service with the reqwest transport and
    /// the configured history backend.
    pub fn build(config: RouterConfig) -> Result<Self, StartupError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.dispatch.client_id)?);
        let store = history_store(&config.history)?;
        Self::with_parts(config, transport, store)
    }

    /// Build the service around an injected transport and history store.
    pub fn with_parts(
        config: RouterConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn HealthHistoryStore>,
    ) -> Result<Self, StartupError> {
        let registry = Arc::new(EndpointRegistry::from_config(
            &config.endpoints,
            &config.health_check,
        )?);
        let cache = Arc::new(ResponseCache::new(&config.cache));
        let gate = Arc::new(ConcurrencyGate::new(config.dispatch.max_concurrent_requests));
        let recorder = Arc::new(HistoryRecorder::new(store, config.history.capacity));

        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            cache.clone(),
            gate.clone(),
            transport.clone(),
            recorder.clone(),
            config.dispatch.clone(),
        ));
        let shutdown = Shutdown::new().with_gate(gate.clone());

        tracing::info!(
            endpoints = registry.len(),
            max_concurrent_requests = gate.limit(),
            cache_enabled = config.cache.enabled,
            history_backend = ?config.history.backend,
            "Router initialized"
        );

        Ok(Self {
            config,
            registry,
            cache,
            gate,
            transport,
            recorder,
            dispatcher,
            shutdown,
            tasks: Vec::new(),
            admin_address: None,
        })
    }

    /// Load persisted success rates into the endpoints. Returns how many
    /// endpoints had history; read errors are logged and skipped.
    pub async fn restore_history(&self) -> usize {
        let mut restored = 0;
        for endpoint in self.registry.all_endpoints() {
            match self.recorder.restore(endpoint).await {
                Ok(Some(_)) => restored += 1,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint.name, error = %e, "Failed to restore health history")
                }
            }
        }
        tracing::info!(restored, "Health history restored");
        restored
    }

    /// Restore history, then start the health monitor and (if enabled) the
    /// admin API.
    pub async fn start(&mut self) -> Result<(), StartupError> {
        self.restore_history().await;

        let monitor = self.health_monitor();
        let rx = self.shutdown.subscribe();
        self.tasks.push(tokio::spawn(monitor.run(rx)));

        if self.config.admin.enabled {
            let address = self.config.admin.bind_address.clone();
            let listener = TcpListener::bind(&address)
                .await
                .map_err(|source| StartupError::AdminBind {
                    address: address.clone(),
                    source,
                })?;
            self.admin_address = listener.local_addr().ok();

            let state = self.admin_state();
            let rx = self.shutdown.subscribe();
            self.tasks.push(tokio::spawn(async move {
                if let Err(e) = admin::serve(listener, state, rx).await {
                    tracing::error!(error = %e, "Admin API failed");
                }
            }));
        }

        Ok(())
    }

    /// Route one logical request. See [`Dispatcher::route`].
    pub async fn route(&self, capability: &Capability, path: &str, options: &RequestOptions) -> RouteResult {
        self.dispatcher.route(capability, path, options).await
    }

    /// Signal every background task to stop, close the gate, wait for the
    /// tasks to exit and flush pending history writes.
    pub async fn shutdown(mut self) {
        tracing::info!("Router shutting down");
        self.shutdown.trigger();

        for task in self.tasks.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                tracing::warn!("Background task did not stop in time");
            }
        }
        self.flush_history().await;
        tracing::info!("Router stopped");
    }

    /// Wait for recorded outcomes to reach the history store. Call before
    /// the runtime is dropped, or in-flight writes are lost.
    pub async fn flush_history(&self) {
        if tokio::time::timeout(SHUTDOWN_GRACE, self.recorder.flush())
            .await
            .is_err()
        {
            tracing::warn!(
                pending = self.recorder.pending(),
                "Health history writes did not finish in time"
            );
        }
    }

    /// A health monitor over this service's endpoints.
    pub fn health_monitor(&self) -> HealthMonitor {
        HealthMonitor::new(
            self.registry.clone(),
            self.recorder.clone(),
            self.transport.clone(),
            self.config.health_check.clone(),
        )
    }

    pub fn admin_state(&self) -> AdminState {
        AdminState {
            registry: self.registry.clone(),
            cache: self.cache.clone(),
            gate: self.gate.clone(),
            api_key: Arc::from(self.config.admin.api_key.as_str()),
        }
    }

    /// Address the admin API is bound to, once started.
    pub fn admin_address(&self) -> Option<SocketAddr> {
        self.admin_address
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn gate(&self) -> &Arc<ConcurrencyGate> {
        &self.gate
    }

    pub fn recorder(&self) -> &Arc<HistoryRecorder> {
        &self.recorder
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

impl std::fmt::Debug for RouterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterService")
            .field("endpoints", &self.registry.len())
            .field("tasks", &self.tasks.len())
            .field("admin_address", &self.admin_address)
            .finish()
    }
}

fn history_store(config: &HistoryConfig) -> Result<Arc<dyn HealthHistoryStore>, StartupError> {
    match config.backend {
        HistoryBackend::Memory => Ok(Arc::new(MemoryHistoryStore::new())),
        HistoryBackend::File => {
            let directory = config.directory.clone().ok_or_else(|| {
                ConfigError::Validation(vec![ValidationError::MissingHistoryDirectory])
            })?;
            tracing::info!(directory = %directory.display(), "Persisting health history to disk");
            Ok(Arc::new(FileHistoryStore::new(directory)))
        }
    }
}
