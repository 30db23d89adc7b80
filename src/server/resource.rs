//! Resource descriptors
//!
//! A [`ResourceConfig`] is the fluent, mutable description written at wiring
//! time. Registering it produces an immutable [`Resource`] owned by the
//! registry, plus the route customizations the router needs.

use crate::core::naming::ResourceNames;
use crate::core::permission::PermissionMap;
use crate::core::principal::Principal;
use crate::core::record::{Model, ModelVTable, RecordError};
use crate::core::validation::FieldValidators;
use crate::server::state::AppState;
use axum::routing::MethodRouter;
use std::fmt;

/// How non-admin principals are restricted to their own records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipPolicy {
    /// Records whose `created_by_id` is the principal
    #[default]
    CreatedBy,
    /// No restriction
    Skip,
    /// Only the record whose identity is the principal's own (the user resource)
    SelfIdentity,
}

/// The five standard handlers of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardHandler {
    List,
    Detail,
    Create,
    Update,
    Delete,
}

/// Replacement handlers and extra routes for one resource
#[derive(Default)]
pub struct ResourceRoutes {
    pub(crate) overrides: Vec<(StandardHandler, MethodRouter<AppState>)>,
    /// Paths relative to the resource base path, e.g. `/{id}/publish`
    pub(crate) extra: Vec<(String, MethodRouter<AppState>)>,
}

impl ResourceRoutes {
    pub fn override_for(&self, handler: StandardHandler) -> Option<&MethodRouter<AppState>> {
        self.overrides
            .iter()
            .find(|(h, _)| *h == handler)
            .map(|(_, router)| router)
    }
}

/// Registered, immutable description of a resource
pub struct Resource {
    pub names: ResourceNames,
    pub vtable: ModelVTable,
    pub permissions: PermissionMap,
    pub validators: FieldValidators,
    pub ownership: OwnershipPolicy,
    /// Fields non-admin principals may not write
    pub admin_only_fields: Vec<String>,
    /// Store collection, the snake_case plural
    pub collection: String,
    /// Records are never purged and no purge route is mounted
    pub append_only: bool,
    field_names: Vec<String>,
}

impl Resource {
    /// Canonical (singular) name
    pub fn name(&self) -> &str {
        &self.names.singular
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    /// Whether `principal` bypasses ownership binding on this resource
    pub fn is_exempt(&self, principal: &Principal) -> bool {
        self.ownership == OwnershipPolicy::Skip || principal.is_admin()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.names.singular)
            .field("collection", &self.collection)
            .field("ownership", &self.ownership)
            .finish()
    }
}

/// Fluent description of a resource to register
///
/// # Example
///
/// ```rust,ignore
/// let posts = ResourceConfig::new::<BlogPost>()
///     .permissions(
///         PermissionMap::new()
///             .grant_all(Role::admin())
///             .grant(Role::visitor(), [Operation::Read, Operation::Create]),
///     )
///     .validate("title", validators::required());
/// ```
pub struct ResourceConfig {
    vtable: ModelVTable,
    permissions: PermissionMap,
    validators: FieldValidators,
    ownership: OwnershipPolicy,
    admin_only_fields: Vec<String>,
    append_only: bool,
    routes: ResourceRoutes,
}

impl ResourceConfig {
    pub fn new<M: Model>() -> Self {
        Self {
            vtable: ModelVTable::of::<M>(),
            permissions: PermissionMap::new(),
            validators: FieldValidators::new(),
            ownership: OwnershipPolicy::default(),
            admin_only_fields: Vec::new(),
            append_only: false,
            routes: ResourceRoutes::default(),
        }
    }

    pub fn permissions(mut self, permissions: PermissionMap) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn validators(mut self, validators: FieldValidators) -> Self {
        self.validators = validators;
        self
    }

    /// Append one validator to the chain of `field`
    pub fn validate<F>(mut self, field: &str, validator: F) -> Self
    where
        F: Fn(&str, &crate::core::record::Fields) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validators = self.validators.add(field, validator);
        self
    }

    /// Disable ownership binding
    pub fn skip_user_binding(self) -> Self {
        self.ownership(OwnershipPolicy::Skip)
    }

    pub fn ownership(mut self, ownership: OwnershipPolicy) -> Self {
        self.ownership = ownership;
        self
    }

    /// Fields dropped from request bodies sent by non-admin principals
    pub fn admin_only_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.admin_only_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Forbid permanent removal of the resource's records
    pub fn append_only(mut self) -> Self {
        self.append_only = true;
        self
    }

    /// Replace one of the standard handlers
    pub fn handler(mut self, which: StandardHandler, router: MethodRouter<AppState>) -> Self {
        self.routes.overrides.retain(|(h, _)| *h != which);
        self.routes.overrides.push((which, router));
        self
    }

    /// Mount an extra route under the resource base path
    pub fn route(mut self, path: impl Into<String>, router: MethodRouter<AppState>) -> Self {
        self.routes.extra.push((path.into(), router));
        self
    }

    /// Derive names and freeze the descriptor
    pub fn build(self) -> Result<(Resource, ResourceRoutes), RecordError> {
        let names = ResourceNames::derive(self.vtable.type_name);
        let field_names = self.vtable.field_names()?;
        let resource = Resource {
            collection: names.snake_plural.clone(),
            names,
            vtable: self.vtable,
            permissions: self.permissions,
            validators: self.validators,
            ownership: self.ownership,
            admin_only_fields: self.admin_only_fields,
            append_only: self.append_only,
            field_names,
        };
        Ok((resource, self.routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::permission::{Operation, Role};
    use crate::core::principal::RoleSet;
    use crate::core::validation::validators::required;

    crate::resource_model!(BlogCategory, "BlogCategory", {
        title: String,
    });

    #[test]
    fn test_build_derives_names_and_collection() {
        let (resource, routes) = ResourceConfig::new::<BlogCategory>()
            .permissions(PermissionMap::new().grant(Role::visitor(), [Operation::Read]))
            .validate("title", required())
            .build()
            .unwrap();

        assert_eq!(resource.name(), "BlogCategory");
        assert_eq!(resource.collection, "blog_categories");
        assert_eq!(resource.names.kebab_plural, "blog-categories");
        assert!(resource.field_names().contains(&"title".to_string()));
        assert_eq!(resource.validators.fields().collect::<Vec<_>>(), vec!["title"]);
        assert!(routes.overrides.is_empty());
    }

    #[test]
    fn test_exemption() {
        let visitor = Principal::new(2, "v@example.com", RoleSet::parse_list("visitor"));
        let admin = Principal::new(1, "a@example.com", RoleSet::parse_list("admin"));

        let (bound, _) = ResourceConfig::new::<BlogCategory>().build().unwrap();
        assert!(!bound.is_exempt(&visitor));
        assert!(bound.is_exempt(&admin));

        let (open, _) = ResourceConfig::new::<BlogCategory>()
            .skip_user_binding()
            .build()
            .unwrap();
        assert!(open.is_exempt(&visitor));
    }

    #[test]
    fn test_handler_override_replaces_previous() {
        async fn noop() {}
        let (_, routes) = ResourceConfig::new::<BlogCategory>()
            .handler(StandardHandler::List, axum::routing::get(noop))
            .handler(StandardHandler::List, axum::routing::get(noop))
            .build()
            .unwrap();
        assert_eq!(routes.overrides.len(), 1);
        assert!(routes.override_for(StandardHandler::List).is_some());
        assert!(routes.override_for(StandardHandler::Delete).is_none());
    }
}
