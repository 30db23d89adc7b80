//! The actor behind a request and the roles it holds

use super::permission::Role;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Errors raised when mutating a [`RoleSet`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("role '{0}' is already assigned")]
    AlreadyAssigned(String),
}

/// A set of roles
///
/// Serialized as an array. Deserialization also accepts the legacy
/// comma-joined form (`"admin,visitor"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-joined role list, skipping blank entries
    pub fn parse_list(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Role::new)
                .collect(),
        )
    }

    pub fn to_list_string(&self) -> String {
        self.0
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Assign a role; assigning one that is already held is an error
    pub fn add(&mut self, role: impl Into<Role>) -> Result<(), RoleError> {
        let role = role.into();
        if self.0.contains(&role) {
            return Err(RoleError::AlreadyAssigned(role.to_string()));
        }
        self.0.insert(role);
        Ok(())
    }

    /// Remove a role; removing an absent role is a no-op
    pub fn remove(&mut self, role: &Role) {
        self.0.remove(role);
    }

    pub fn contains(&self, role: &Role) -> bool {
        self.0.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> + Clone {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_set::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_list_string())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleSetRepr {
    List(Vec<String>),
    Joined(String),
    Missing(()),
}

impl<'de> Deserialize<'de> for RoleSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RoleSetRepr::deserialize(deserializer)? {
            RoleSetRepr::List(items) => items
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Role::new(s.as_str()))
                .collect(),
            RoleSetRepr::Joined(raw) => Self::parse_list(&raw),
            RoleSetRepr::Missing(()) => Self::new(),
        })
    }
}

/// The resolved actor of a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Numeric identity of the stored user; 0 for anonymous
    pub id: u64,
    /// Human readable label recorded in audit entries (the email)
    pub label: String,
    pub roles: RoleSet,
}

impl Principal {
    pub fn new(id: u64, label: impl Into<String>, roles: RoleSet) -> Self {
        Self {
            id,
            label: label.into(),
            roles,
        }
    }

    /// A principal with no identity and no roles
    pub fn anonymous() -> Self {
        Self::new(0, "anonymous", RoleSet::new())
    }

    /// Actor of writes the server performs on its own, such as first-login
    /// registration
    pub fn system() -> Self {
        Self::new(0, "system", RoleSet::new())
    }

    pub fn is_anonymous(&self) -> bool {
        self.id == 0 && self.label == "anonymous"
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}
