//! Read-access filtering of compiled queries.

use std::sync::Arc;

use uuid::Uuid;

use crate::access::{PermissionProvider, Right, SessionProvider, User};
use crate::document::READ_ACCESS_FIELD;
use crate::routing::RoutingTable;

/// Decides whether a query against an index must be filtered by principal.
///
/// Filtering applies when all of the following hold:
/// - the index is access-controlled,
/// - the permission provider supports reverse lookup (and therefore keeps the
///   read-access field of indexed documents up to date),
/// - the user does not hold blanket read access.
#[derive(Debug, Clone, Copy, Default)]
pub struct UseAcl;

impl UseAcl {
    /// Returns true when results from `index` must be filtered for `user`.
    pub fn is_satisfied_by(
        &self,
        routing: &RoutingTable,
        index: &str,
        permissions: &dyn PermissionProvider,
        user: &User,
    ) -> bool {
        routing.is_access_controlled(index)
            && permissions.supports_reverse_lookup()
            && !Self::has_full_access(permissions, user)
    }

    /// Checks read access on an identifier that cannot exist.
    ///
    /// Only a user with read access on everything is granted read on it.
    fn has_full_access(permissions: &dyn PermissionProvider, user: &User) -> bool {
        let sentinel = format!("urn:uuid:{}", Uuid::new_v4());
        let ids = [sentinel];
        permissions
            .get_permissions(user, &ids)
            .get(&ids[0])
            .is_some_and(|rights| rights.contains(&Right::Read))
    }
}

/// Builds the clause restricting results to documents readable by `user`.
pub fn access_clause(user: &User) -> String {
    let principals: Vec<&str> = user.principals().collect();
    format!(
        "({}:(\"{}\"))",
        READ_ACCESS_FIELD,
        principals.join("\" OR \"")
    )
}

/// Permission and session collaborators used for query-time filtering.
#[derive(Clone)]
pub struct AccessControl {
    pub permissions: Arc<dyn PermissionProvider>,
    pub session: Arc<dyn SessionProvider>,
}

impl std::fmt::Debug for AccessControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControl")
            .field(
                "reverse_lookup",
                &self.permissions.supports_reverse_lookup(),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use super::*;
    use crate::routing::{DELIVERIES_INDEX, ITEMS_INDEX};

    struct SentinelPermissions {
        reverse_lookup: bool,
        rights: Vec<Right>,
    }

    impl PermissionProvider for SentinelPermissions {
        fn get_permissions(
            &self,
            _user: &User,
            resource_ids: &[String],
        ) -> HashMap<String, HashSet<Right>> {
            resource_ids
                .iter()
                .map(|id| (id.clone(), self.rights.iter().copied().collect()))
                .collect()
        }

        fn supports_reverse_lookup(&self) -> bool {
            self.reverse_lookup
        }
    }

    fn check(index: &str, reverse_lookup: bool, rights: Vec<Right>) -> bool {
        let permissions = SentinelPermissions {
            reverse_lookup,
            rights,
        };
        UseAcl.is_satisfied_by(
            &RoutingTable::default(),
            index,
            &permissions,
            &User::new("urn:user", Vec::<String>::new()),
        )
    }

    #[test]
    fn test_applies_when_user_has_no_access() {
        assert!(check(ITEMS_INDEX, true, vec![]));
    }

    #[test]
    fn test_applies_when_user_lacks_read() {
        assert!(check(ITEMS_INDEX, true, vec![Right::Write]));
    }

    #[test]
    fn test_skipped_without_reverse_lookup() {
        assert!(!check(ITEMS_INDEX, false, vec![]));
    }

    #[test]
    fn test_skipped_for_index_without_acl() {
        assert!(!check(DELIVERIES_INDEX, true, vec![]));
    }

    #[test]
    fn test_skipped_when_user_has_read() {
        assert!(!check(ITEMS_INDEX, true, vec![Right::Read]));
    }

    #[test]
    fn test_access_clause_lists_user_then_roles() {
        let user = User::new("urn:u", ["urn:r1", "urn:r2"]);
        assert_eq!(
            access_clause(&user),
            r#"(read_access:("urn:u" OR "urn:r1" OR "urn:r2"))"#
        );
    }
}
