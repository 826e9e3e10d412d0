use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::{Permission, Role};

/// Startup-time configuration failure.
///
/// Any of these aborts initialization: the process must never serve requests
/// over an inconsistent policy table. Request-time denials are never errors;
/// they are [`Decision`](crate::Decision) values.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("unknown role {0:?} in policy table")]
    UnknownRole(String),
    #[error("permission {token:?} granted to {role} is not in the catalog")]
    UnknownPermission { role: Role, token: String },
    #[error("role {0} declared twice in policy table")]
    DuplicateRole(Role),
    #[error("role {0} is structural and cannot carry explicit grants")]
    SuperAdminGrant(Role),
    #[error("operation {0:?} registered twice")]
    DuplicateOperation(&'static str),
}

/// The authoritative role → permission-set mapping.
///
/// Immutable once built; shared behind an `Arc` by any number of concurrent
/// evaluations. Roles without an entry are granted nothing. Reloading policy
/// from an external source means building a fresh table and swapping the
/// `Arc`, never mutating in place.
#[derive(Debug)]
pub struct PolicyTable {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::default()
    }

    /// Permissions granted to `role`.
    ///
    /// `super_admin` is computed from the current catalog on every call, never
    /// from a stored copy, so a new catalog entry reaches it without a table
    /// edit. A role with no entry yields the empty set.
    pub fn granted(&self, role: Role) -> BTreeSet<Permission> {
        match role {
            Role::SuperAdmin => Permission::catalog().iter().copied().collect(),
            _ => self.grants.get(&role).cloned().unwrap_or_default(),
        }
    }

    pub fn is_granted(&self, role: Role, permission: Permission) -> bool {
        match role {
            Role::SuperAdmin => true,
            _ => self
                .grants
                .get(&role)
                .is_some_and(|set| set.contains(&permission)),
        }
    }
}

/// Validating constructor for [`PolicyTable`].
///
/// Grants are declared as string tokens so that configuration mistakes fail
/// here, at startup, rather than turning into checks that never fire.
#[derive(Debug, Default)]
pub struct PolicyTableBuilder {
    grants: HashMap<Role, BTreeSet<Permission>>,
}

impl PolicyTableBuilder {
    pub fn grant(mut self, role: &str, tokens: &[&str]) -> Result<Self, PolicyError> {
        let role =
            Role::from_str(role).ok_or_else(|| PolicyError::UnknownRole(role.to_string()))?;
        if role == Role::SuperAdmin {
            return Err(PolicyError::SuperAdminGrant(role));
        }
        if self.grants.contains_key(&role) {
            return Err(PolicyError::DuplicateRole(role));
        }
        let mut set = BTreeSet::new();
        for token in tokens {
            let permission =
                Permission::from_str(token).ok_or_else(|| PolicyError::UnknownPermission {
                    role,
                    token: (*token).to_string(),
                })?;
            set.insert(permission);
        }
        self.grants.insert(role, set);
        Ok(self)
    }

    pub fn build(self) -> PolicyTable {
        PolicyTable {
            grants: self.grants,
        }
    }
}

/// The production policy shipped with the server.
///
/// `super_admin` carries the whole catalog structurally and is absent here.
/// Closing deals and assigning leads stay with managers; deletes stay with
/// admins.
pub fn default_table() -> Result<PolicyTable, PolicyError> {
    Ok(PolicyTable::builder()
        .grant(
            "admin",
            &[
                "contacts:view",
                "contacts:create",
                "contacts:edit",
                "contacts:delete",
                "companies:view",
                "companies:create",
                "companies:edit",
                "companies:delete",
                "leads:view",
                "leads:create",
                "leads:edit",
                "leads:delete",
                "leads:assign",
                "leads:convert",
                "deals:view",
                "deals:create",
                "deals:edit",
                "deals:delete",
                "deals:close",
                "reports:view",
                "jobs:run",
                "users:manage",
            ],
        )?
        .grant(
            "manager",
            &[
                "contacts:view",
                "contacts:create",
                "contacts:edit",
                "companies:view",
                "companies:create",
                "companies:edit",
                "leads:view",
                "leads:create",
                "leads:edit",
                "leads:assign",
                "leads:convert",
                "deals:view",
                "deals:create",
                "deals:edit",
                "deals:close",
                "reports:view",
                "jobs:run",
            ],
        )?
        .grant(
            "sales_rep",
            &[
                "contacts:view",
                "contacts:create",
                "contacts:edit",
                "companies:view",
                "leads:view",
                "leads:create",
                "leads:edit",
                "leads:convert",
                "deals:view",
                "deals:create",
                "deals:edit",
            ],
        )?
        .grant(
            "viewer",
            &[
                "contacts:view",
                "companies:view",
                "leads:view",
                "deals:view",
                "reports:view",
            ],
        )?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_builds() {
        let table = default_table().expect("shipped policy must be valid");
        for role in Role::ALL {
            if role != Role::SuperAdmin {
                assert!(
                    !table.granted(role).is_empty(),
                    "shipped table leaves {} without grants",
                    role
                );
            }
        }
    }

    #[test]
    fn unknown_permission_token_fails_construction() {
        let err = PolicyTable::builder()
            .grant("viewer", &["contacts:delete_everything"])
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::UnknownPermission {
                role: Role::Viewer,
                ..
            }
        ));
    }

    #[test]
    fn unknown_role_token_fails_construction() {
        let err = PolicyTable::builder()
            .grant("intern", &["contacts:view"])
            .unwrap_err();
        assert!(matches!(err, PolicyError::UnknownRole(_)));
    }

    #[test]
    fn duplicate_role_fails_construction() {
        let err = PolicyTable::builder()
            .grant("viewer", &["contacts:view"])
            .unwrap()
            .grant("viewer", &["deals:view"])
            .unwrap_err();
        assert!(matches!(err, PolicyError::DuplicateRole(Role::Viewer)));
    }

    #[test]
    fn super_admin_cannot_be_granted_explicitly() {
        let err = PolicyTable::builder()
            .grant("super_admin", &["contacts:view"])
            .unwrap_err();
        assert!(matches!(err, PolicyError::SuperAdminGrant(Role::SuperAdmin)));
    }

    #[test]
    fn super_admin_tracks_the_catalog_dynamically() {
        // An empty table still yields the full catalog for the top role.
        let table = PolicyTable::builder().build();
        let granted = table.granted(Role::SuperAdmin);
        assert_eq!(granted.len(), Permission::catalog().len());
        for permission in Permission::catalog() {
            assert!(table.is_granted(Role::SuperAdmin, *permission));
        }
    }

    #[test]
    fn role_without_entry_is_denied_by_default() {
        let table = PolicyTable::builder()
            .grant("viewer", &["contacts:view"])
            .unwrap()
            .build();
        assert!(table.granted(Role::SalesRep).is_empty());
        assert!(!table.is_granted(Role::SalesRep, Permission::CONTACTS_VIEW));
    }

    #[test]
    fn grants_are_membership_not_order() {
        let table = PolicyTable::builder()
            .grant("viewer", &["deals:view", "contacts:view"])
            .unwrap()
            .build();
        assert!(table.is_granted(Role::Viewer, Permission::CONTACTS_VIEW));
        assert!(table.is_granted(Role::Viewer, Permission::DEALS_VIEW));
        assert!(!table.is_granted(Role::Viewer, Permission::DEALS_CLOSE));
    }
}
