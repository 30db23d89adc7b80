//! ServerBuilder for fluent API to build HTTP servers

use super::registry::ResourceRegistry;
use super::resource::{Resource, ResourceConfig, ResourceRoutes};
use super::router::build_router;
use super::state::AppState;
use crate::config::ServerConfig;
use crate::core::audit::AuditLog;
use crate::core::auth::TokenVerifier;
use crate::core::store::Store;
use crate::models::{history_resource, user_resource};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for creating HTTP servers with auto-registered routes
///
/// The audit history resource is always registered. Without an explicit
/// store an [`InMemoryStore`](crate::storage::InMemoryStore) is used.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_token_verifier(verifier)
///     .with_user_resource()?
///     .register(ResourceConfig::new::<BlogPost>().permissions(perms))?
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn Store>>,
    verifier: Option<Arc<dyn TokenVerifier>>,
    registry: ResourceRegistry,
    resources: Vec<(Arc<Resource>, ResourceRoutes)>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            store: None,
            verifier: None,
            registry: ResourceRegistry::new(),
            resources: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the record store
    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set the identity provider used to verify bearer tokens
    ///
    /// Without one every request is anonymous.
    pub fn with_token_verifier(mut self, verifier: impl TokenVerifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    /// Register a resource
    ///
    /// Fails when the model or any of its derived names is already taken.
    pub fn register(mut self, config: ResourceConfig) -> Result<Self> {
        let (resource, routes) = config.build()?;
        let resource = self.registry.register(resource)?;
        tracing::debug!(
            resource = resource.name(),
            path = %resource.names.kebab_plural,
            "registered resource"
        );
        self.resources.push((resource, routes));
        Ok(self)
    }

    /// Register the built-in [`User`](crate::models::User) resource
    pub fn with_user_resource(self) -> Result<Self> {
        self.register(user_resource())
    }

    /// Add custom routes to the server
    ///
    /// Custom routes are merged outside the API prefix and run behind the
    /// same request context middleware, so handlers can extract a
    /// [`RequestContext`](crate::core::auth::RequestContext).
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Validate the configuration and assemble the shared state
    ///
    /// Registers the history resource if it is not registered yet.
    pub fn build_state(&mut self) -> Result<AppState> {
        self.config.validate()?;

        if self
            .registry
            .lookup::<crate::core::audit::HistoryEntry>()
            .is_err()
        {
            let (resource, routes) = history_resource().build()?;
            let resource = self.registry.register(resource)?;
            self.resources.push((resource, routes));
        }
        let history = self
            .registry
            .lookup::<crate::core::audit::HistoryEntry>()?;

        let store = match &self.store {
            Some(store) => store.clone(),
            None => default_store()?,
        };

        Ok(AppState {
            registry: Arc::new(std::mem::take(&mut self.registry)),
            audit: AuditLog::new(store.clone(), history.collection.clone()),
            store,
            verifier: self.verifier.clone(),
            config: Arc::new(self.config.clone()),
        })
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;
        let resources = std::mem::take(&mut self.resources);
        let custom_routes = std::mem::take(&mut self.custom_routes);
        tracing::info!(
            resources = state.registry.len(),
            prefix = %state.config.api_prefix,
            "router built"
        );
        Ok(build_router(state, resources, custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds to `addr`, or to the configured `bind_address` when `None`, and
    /// stops on SIGTERM or Ctrl+C.
    pub async fn serve(self, addr: Option<&str>) -> Result<()> {
        let addr = addr.unwrap_or(self.config.bind_address.as_str()).to_string();
        let app = self.build()?;
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "in-memory")]
fn default_store() -> Result<Arc<dyn Store>> {
    let store = crate::storage::InMemoryStore::new().with_unique("users", "email");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "in-memory"))]
fn default_store() -> Result<Arc<dyn Store>> {
    anyhow::bail!("no store configured. Call .with_store()")
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
