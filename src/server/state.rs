//! Shared application state handed to every handler

use crate::config::ServerConfig;
use crate::core::audit::AuditLog;
use crate::core::auth::TokenVerifier;
use crate::core::store::Store;
use crate::server::registry::ResourceRegistry;
use std::sync::Arc;

/// Cheap to clone; everything behind an `Arc`
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ResourceRegistry>,
    pub store: Arc<dyn Store>,
    pub audit: AuditLog,
    pub verifier: Option<Arc<dyn TokenVerifier>>,
    pub config: Arc<ServerConfig>,
}
