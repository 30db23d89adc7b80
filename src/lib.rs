//! # Warden
//!
//! A generic, permission-gated and audit-logged CRUD engine for building
//! RESTful APIs in Rust.
//!
//! ## Features
//!
//! - **Declarative Resources**: register a model with its permissions,
//!   validators and ownership policy, get the full route set
//! - **Role-Based Permissions**: per-resource role → operation maps, denied
//!   by default
//! - **Ownership Binding**: non-admins only see and change their own records
//! - **Forgery-Proof Bodies**: identity, timestamp and authorship fields are
//!   stripped from client input in any casing
//! - **Partial Updates with Diffs**: no-op updates are detected and skipped
//! - **Audit Trail**: every mutation appends a history entry, queryable as a
//!   per-record timeline
//! - **Soft and Hard Delete**: soft by default, permanent removal for admins
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! resource_model!(BlogPost, "BlogPost", {
//!     title: String,
//!     body: String,
//! });
//!
//! let app = ServerBuilder::new()
//!     .with_token_verifier(verifier)
//!     .with_user_resource()?
//!     .register(
//!         ResourceConfig::new::<BlogPost>()
//!             .permissions(
//!                 PermissionMap::new()
//!                     .grant_all(Role::admin())
//!                     .grant(Role::visitor(), [Operation::Read, Operation::Create]),
//!             )
//!             .validate("title", validators::required()),
//!     )?
//!     .build()?;
//! ```

pub mod config;
pub mod core;
pub mod crud;
pub mod entities;
pub mod models;
pub mod server;
pub mod storage;
pub mod telemetry;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        audit::{AuditAction, AuditLog, HistoryEntry},
        auth::{AuthError, Claims, RequestContext, StaticTokenVerifier, TokenVerifier},
        error::ApiError,
        naming::ResourceNames,
        permission::{Operation, PermissionMap, Role},
        principal::{Principal, RoleSet},
        query::{Filter, ListParams, OrderTerm, Pagination, Window},
        record::{Fields, Model, Record, SystemData},
        store::{Store, StoreError},
        validation::{FieldValidators, ValidationErrors, validators},
    };

    // === Macros ===
    pub use crate::resource_model;

    // === Models ===
    pub use crate::models::{User, history_resource, user_resource};

    // === Storage ===
    #[cfg(feature = "in-memory")]
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{PaginationConfig, ServerConfig};

    // === Server ===
    pub use crate::server::{
        ApiResponse, AppState, OwnershipPolicy, ResourceConfig, ServerBuilder, StandardHandler,
    };
    pub use crate::telemetry::init_tracing;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::{
        Router,
        extract::{Path, State},
        routing::{delete, get, post, put},
    };
}
