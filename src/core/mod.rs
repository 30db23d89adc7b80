//! Core types of the pipeline: permissions, principals, records, queries,
//! storage and audit

pub mod audit;
pub mod auth;
pub mod error;
pub mod naming;
pub mod permission;
pub mod principal;
pub mod query;
pub mod record;
pub mod store;
pub mod validation;

pub use audit::{AuditAction, AuditLog, HistoryEntry};
pub use auth::{Claims, RequestContext, StaticTokenVerifier, TokenVerifier};
pub use error::ApiError;
pub use naming::ResourceNames;
pub use permission::{Operation, PermissionMap, Role};
pub use principal::{Principal, RoleSet};
pub use record::{Fields, Model, Record, SystemData};
pub use store::{Store, StoreError};
pub use validation::{FieldValidators, ValidationErrors};
