//! The identity resource
//!
//! Users are ordinary records with one twist: ownership binding compares the
//! target's own identity with the principal's, so non-admins can only see
//! and edit themselves.

use crate::core::permission::{Operation, PermissionMap, Role};
use crate::core::principal::{Principal, RoleError, RoleSet};
use crate::core::record::Model;
use crate::core::validation::validators::{email, required};
use crate::server::resource::{OwnershipPolicy, ResourceConfig};

crate::resource_model!(User, "User", {
    name: String,
    email: String,
    /// Subject identifier at the identity provider
    external_id: String,
    roles: RoleSet,
});

impl User {
    /// Assign a role; fails if the user already holds it
    pub fn set_role(&mut self, role: impl Into<Role>) -> Result<(), RoleError> {
        self.roles.add(role)
    }

    /// Remove a role; a no-op if the user does not hold it
    pub fn remove_role(&mut self, role: &Role) {
        self.roles.remove(role)
    }

    pub fn principal(&self) -> Principal {
        Principal::from(self)
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal::new(user.id(), user.email.clone(), user.roles.clone())
    }
}

/// Resource configuration of [`User`]
///
/// Admins have full access; visitors may read and update their own record.
/// Role and identity-provider fields can only be written by admins.
pub fn user_resource() -> ResourceConfig {
    ResourceConfig::new::<User>()
        .permissions(
            PermissionMap::new()
                .grant_all(Role::admin())
                .grant(Role::visitor(), [Operation::Read, Operation::Update]),
        )
        .validate("name", required())
        .validate("email", required())
        .validate("email", email())
        .ownership(OwnershipPolicy::SelfIdentity)
        .admin_only_fields(["roles", "external_id"])
}
