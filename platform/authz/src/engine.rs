use std::collections::BTreeSet;

use crate::{default_table, Permission, PolicyError, PolicyTable, Role};

/// Pure policy evaluator over an immutable [`PolicyTable`].
///
/// All checks take the role as a string token because that is what arrives on
/// a request. A token outside the role catalog evaluates to deny; the
/// evaluator never errors at request time (fail-closed, not fail-open through
/// a swallowed exception).
#[derive(Debug)]
pub struct PolicyEngine {
    table: PolicyTable,
}

impl PolicyEngine {
    pub fn new(table: PolicyTable) -> Self {
        Self { table }
    }

    /// Engine over the shipped production grants.
    pub fn with_default_policy() -> Result<Self, PolicyError> {
        Ok(Self::new(default_table()?))
    }

    /// True iff `permission` is in the set granted to `role`.
    pub fn can(&self, role: &str, permission: Permission) -> bool {
        match Role::from_str(role) {
            Some(role) => self.table.is_granted(role, permission),
            None => false,
        }
    }

    /// True iff at least one listed permission is granted. False on an empty
    /// list.
    pub fn has_any(&self, role: &str, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.can(role, *p))
    }

    /// True iff every listed permission is granted.
    ///
    /// An empty list is vacuously satisfied, whatever the role: an operation
    /// declaring zero required permissions has opted out of authorization and
    /// is open to any authenticated caller.
    pub fn has_all(&self, role: &str, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.can(role, *p))
    }

    /// Introspection over the table, e.g. for the `policy print` CLI.
    pub fn granted(&self, role: Role) -> BTreeSet<Permission> {
        self.table.granted(role)
    }
}
