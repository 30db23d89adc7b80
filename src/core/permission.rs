//! Role-based permission model
//!
//! A [`PermissionMap`] grants each role a set of [`Operation`]s. A principal
//! holding several roles is allowed an operation as soon as one of its roles
//! grants it. Unknown roles are simply absent keys and are denied.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// The four operations a permission map can grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    /// Every operation, in CRUD order
    pub const ALL: [Operation; 4] = [
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    /// Lowercase name used in messages and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named role held by a principal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const VISITOR: &'static str = "visitor";
    pub const SCHEDULER: &'static str = "scheduler";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn visitor() -> Self {
        Self::new(Self::VISITOR)
    }

    pub fn scheduler() -> Self {
        Self::new(Self::SCHEDULER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Mapping from role to the operations it may perform
///
/// # Example
///
/// ```
/// use warden::core::permission::{Operation, PermissionMap, Role};
///
/// let permissions = PermissionMap::new()
///     .grant_all(Role::admin())
///     .grant(Role::visitor(), [Operation::Read]);
///
/// assert!(permissions.is_allowed([&Role::visitor()], Operation::Read));
/// assert!(!permissions.is_allowed([&Role::visitor()], Operation::Delete));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(HashMap<Role, HashSet<Operation>>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add operations to a role, keeping the ones it already had
    pub fn grant(
        mut self,
        role: impl Into<Role>,
        operations: impl IntoIterator<Item = Operation>,
    ) -> Self {
        self.0.entry(role.into()).or_default().extend(operations);
        self
    }

    /// Grant every operation to a role
    pub fn grant_all(self, role: impl Into<Role>) -> Self {
        self.grant(role, Operation::ALL)
    }

    /// Operations granted to a single role
    pub fn operations(&self, role: &Role) -> Option<&HashSet<Operation>> {
        self.0.get(role)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when at least one of `roles` grants `operation`
    pub fn is_allowed<'a>(
        &self,
        roles: impl IntoIterator<Item = &'a Role>,
        operation: Operation,
    ) -> bool {
        roles.into_iter().any(|role| {
            self.0
                .get(role)
                .is_some_and(|granted| granted.contains(&operation))
        })
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.0
    }
}

/// Free-function form of [`PermissionMap::is_allowed`]
pub fn is_allowed<'a>(
    permissions: &PermissionMap,
    roles: impl IntoIterator<Item = &'a Role>,
    operation: Operation,
) -> bool {
    permissions.is_allowed(roles, operation)
}

/// Permission check that records denials in the log
pub fn user_is_allowed<'a>(
    permissions: &PermissionMap,
    roles: impl IntoIterator<Item = &'a Role> + Clone,
    operation: Operation,
    resource: &str,
) -> bool {
    let allowed = permissions.is_allowed(roles.clone(), operation);
    if !allowed {
        let held: Vec<&str> = roles.into_iter().map(Role::as_str).collect();
        tracing::debug!(
            resource = resource,
            operation = %operation,
            roles = ?held,
            "permission denied"
        );
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blog_permissions() -> PermissionMap {
        PermissionMap::new()
            .grant_all(Role::admin())
            .grant(Role::visitor(), [Operation::Read])
            .grant(Role::scheduler(), [Operation::Read, Operation::Update])
    }

    #[test]
    fn test_single_role_grants() {
        let perms = blog_permissions();
        assert!(perms.is_allowed([&Role::visitor()], Operation::Read));
        assert!(!perms.is_allowed([&Role::visitor()], Operation::Create));
    }

    #[test]
    fn test_roles_are_or_combined() {
        let perms = blog_permissions();
        let roles = [Role::visitor(), Role::scheduler()];
        assert!(perms.is_allowed(&roles, Operation::Update));
        assert!(!perms.is_allowed(&roles, Operation::Delete));
    }

    #[test]
    fn test_role_order_is_irrelevant() {
        let perms = blog_permissions();
        let forward = [Role::visitor(), Role::admin()];
        let backward = [Role::admin(), Role::visitor()];
        for op in Operation::ALL {
            assert_eq!(perms.is_allowed(&forward, op), perms.is_allowed(&backward, op));
        }
    }

    #[test]
    fn test_no_roles_is_denied() {
        let perms = blog_permissions();
        let roles: [Role; 0] = [];
        for op in Operation::ALL {
            assert!(!perms.is_allowed(&roles, op));
        }
    }

    #[test]
    fn test_empty_map_denies_everything() {
        let perms = PermissionMap::new();
        assert!(perms.is_empty());
        assert!(!perms.is_allowed([&Role::admin()], Operation::Read));
    }

    #[test]
    fn test_unknown_role_is_denied() {
        let perms = blog_permissions();
        assert!(!perms.is_allowed([&Role::new("guest")], Operation::Read));
    }

    #[test]
    fn test_grant_accumulates() {
        let perms = PermissionMap::new()
            .grant(Role::visitor(), [Operation::Read])
            .grant(Role::visitor(), [Operation::Update]);
        let ops = perms.operations(&Role::visitor()).unwrap();
        assert_eq!(ops.len(), 2);
    }

    #[test]
    fn test_free_functions_agree() {
        let perms = blog_permissions();
        let roles = [Role::scheduler()];
        assert!(is_allowed(&perms, &roles, Operation::Update));
        assert!(!user_is_allowed(&perms, &roles, Operation::Delete, "Post"));
    }

    #[test]
    fn test_operation_serializes_lowercase() {
        let json = serde_json::to_string(&Operation::Delete).unwrap();
        assert_eq!(json, "\"delete\"");
        assert_eq!(Operation::Create.to_string(), "create");
    }
}
