//! HTTP server assembly
//!
//! [`ServerBuilder`] collects resource configurations into a
//! [`ResourceRegistry`], builds the shared [`AppState`] and generates the
//! routes of every resource.

pub mod builder;
pub mod context;
pub mod registry;
pub mod resource;
pub mod response;
pub mod router;
pub mod state;

pub use builder::ServerBuilder;
pub use registry::{RegistryError, ResourceRegistry};
pub use resource::{OwnershipPolicy, Resource, ResourceConfig, ResourceRoutes, StandardHandler};
pub use response::ApiResponse;
pub use state::AppState;
