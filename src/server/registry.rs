//! Resource registry
//!
//! Built once while wiring the server, then shared read-only. Lookups go
//! through a name index (every derived name form) and a type index.

use crate::core::error::ApiError;
use crate::core::record::Model;
use crate::server::resource::Resource;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("resource name '{name}' is already used by {existing}")]
    NameCollision { name: String, existing: String },

    #[error("model {0} is already registered")]
    DuplicateModel(String),

    #[error("resource not known: {0}")]
    UnknownResource(String),
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownResource(name) => ApiError::UnknownResource(name),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

/// Registry of all resources in the application
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Arc<Resource>>,
    by_name: HashMap<String, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource
    ///
    /// Fails when the model is already registered or when any of its name
    /// forms is already taken by another resource.
    pub fn register(&mut self, resource: Resource) -> Result<Arc<Resource>, RegistryError> {
        if self.by_type.contains_key(&resource.vtable.type_id) {
            return Err(RegistryError::DuplicateModel(resource.name().to_string()));
        }
        for form in resource.names.all() {
            if let Some(&index) = self.by_name.get(form) {
                return Err(RegistryError::NameCollision {
                    name: form.to_string(),
                    existing: self.resources[index].name().to_string(),
                });
            }
        }

        let index = self.resources.len();
        for form in resource.names.all() {
            self.by_name.insert(form.to_string(), index);
        }
        self.by_type.insert(resource.vtable.type_id, index);

        let resource = Arc::new(resource);
        self.resources.push(resource.clone());
        Ok(resource)
    }

    pub fn lookup<M: Model>(&self) -> Result<Arc<Resource>, RegistryError> {
        self.by_type
            .get(&TypeId::of::<M>())
            .map(|&index| self.resources[index].clone())
            .ok_or_else(|| RegistryError::UnknownResource(M::NAME.to_string()))
    }

    /// Look up by any derived name form (`BlogPost`, `blog_posts`, `blog-posts`, ...)
    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<Resource>, RegistryError> {
        self.by_name
            .get(name)
            .map(|&index| self.resources[index].clone())
            .ok_or_else(|| RegistryError::UnknownResource(name.to_string()))
    }

    /// Registered resources in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
