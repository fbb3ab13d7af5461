//! Host permission and session boundary.
//!
//! The query compiler consults these collaborators to decide whether results
//! must be filtered by the current user's principals.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// An access right on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Right {
    Read,
    Write,
    Grant,
}

/// The user a query is compiled for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// User identifier.
    pub id: String,
    /// Role identifiers held by the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    /// Creates a user with roles.
    pub fn new(id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the user identifier followed by every role identifier.
    pub fn principals(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.roles.iter().map(String::as_str))
    }
}

/// Permission provider of the host application.
pub trait PermissionProvider: Send + Sync {
    /// Returns the rights `user` holds on each of `resource_ids`.
    ///
    /// Identifiers with no rights may be absent from the returned map.
    fn get_permissions(&self, user: &User, resource_ids: &[String]) -> HashMap<String, HashSet<Right>>;

    /// Whether the provider can list resources by principal.
    ///
    /// Only such providers maintain the read-access field on indexed
    /// documents, so only they can be enforced at query time.
    fn supports_reverse_lookup(&self) -> bool {
        false
    }
}

/// Session service of the host application.
pub trait SessionProvider: Send + Sync {
    /// Returns the user of the current session.
    fn current_user(&self) -> User;
}

/// A permission provider granting every right on everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeAccess;

impl PermissionProvider for FreeAccess {
    fn get_permissions(&self, _user: &User, resource_ids: &[String]) -> HashMap<String, HashSet<Right>> {
        resource_ids
            .iter()
            .map(|id| (id.clone(), HashSet::from([Right::Read, Right::Write, Right::Grant])))
            .collect()
    }
}

/// A session provider that always returns the same user.
#[derive(Debug, Clone, Default)]
pub struct StaticSession(pub User);

impl SessionProvider for StaticSession {
    fn current_user(&self) -> User {
        self.0.clone()
    }
}
