use crate::config::Config;
use crate::error::{AppError, Result};
use crate::external::ComputeBackend;
use crate::registry::{Registry, RegistryError};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all request handlers.
pub struct AppState {
    pub registry: Arc<Registry>,
    pub backend: Arc<dyn ComputeBackend>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Initialize the registry from `config` and wrap it with `backend`.
    ///
    /// Any resource that fails to load fails the whole call; the caller is
    /// expected to abort startup.
    pub fn new(
        config: Config,
        backend: Arc<dyn ComputeBackend>,
    ) -> std::result::Result<Self, RegistryError> {
        let registry = Registry::new();
        registry.initialize(&config)?;

        Ok(Self::with_registry(Arc::new(registry), backend, config))
    }

    pub fn with_registry(
        registry: Arc<Registry>,
        backend: Arc<dyn ComputeBackend>,
        config: Config,
    ) -> Self {
        Self {
            registry,
            backend,
            config: Arc::new(config),
        }
    }

    /// Check if the service is ready to handle requests.
    pub fn is_ready(&self) -> bool {
        self.registry.is_ready()
    }

    /// Run a backend call on the blocking pool, bounded by the configured timeout.
    ///
    /// Callers must not hold any store lock across this await.
    pub async fn run_compute<T, F>(&self, service: &'static str, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ComputeBackend) -> Result<T> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let timeout_secs = self.config.compute_timeout_secs;
        let start = std::time::Instant::now();

        let outcome = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            tokio::task::spawn_blocking(move || job(backend.as_ref())),
        )
        .await
        .map_err(|_| AppError::ExternalService {
            service,
            message: format!("no response within {}s; retry or use a smaller input", timeout_secs),
            retryable: true,
        })?
        .map_err(|e| AppError::Internal(format!("{} task join error: {}", service, e)))?;

        tracing::debug!(
            service,
            elapsed_ms = start.elapsed().as_millis() as u64,
            ok = outcome.is_ok(),
            "Backend call finished"
        );

        outcome
    }
}
