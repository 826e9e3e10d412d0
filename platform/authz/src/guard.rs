use std::collections::HashMap;
use std::fmt;

use crate::{Permission, PolicyEngine, PolicyError, Principal};

/// Declarative side table mapping operation identifiers to the permission
/// they require, populated once at startup.
///
/// Operations absent from the table are admitted: checks are opt-in per
/// operation. The sharp edge is that forgetting to register a sensitive
/// operation silently leaves it open, which is why the server logs the table
/// at boot and the registration lives next to the route definitions.
#[derive(Debug, Default)]
pub struct OperationRequirements {
    requirements: HashMap<&'static str, Permission>,
}

impl OperationRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(
        mut self,
        operation: &'static str,
        permission: Permission,
    ) -> Result<Self, PolicyError> {
        if self.requirements.insert(operation, permission).is_some() {
            return Err(PolicyError::DuplicateOperation(operation));
        }
        Ok(self)
    }

    /// The permission `operation` requires, if it declared one.
    pub fn required(&self, operation: &str) -> Option<Permission> {
        self.requirements.get(operation).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Permission)> + '_ {
        self.requirements.iter().map(|(op, perm)| (*op, *perm))
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Outcome of one guard evaluation.
///
/// Denials are values, not errors: the caller maps them onto its transport
/// (401 for `MissingIdentity`, 403 for `Forbidden`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decision {
    Admit,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_admit(self) -> bool {
        matches!(self, Decision::Admit)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DenyReason {
    /// No principal (or no role) on a permission-guarded operation.
    /// Recoverable by re-authenticating.
    MissingIdentity,
    /// The principal's role lacks the required permission. The message names
    /// the missing permission only, never which roles would have sufficed.
    Forbidden { required: Permission },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingIdentity => f.write_str("authentication required"),
            DenyReason::Forbidden { required } => {
                write!(f, "forbidden: {} required", required)
            }
        }
    }
}

/// Stateless admit/deny decision for one operation invocation.
///
/// Idempotent over (requirement, principal) as long as the policy table is
/// unchanged; performs no I/O and never retries.
pub fn authorize(
    engine: &PolicyEngine,
    required: Option<Permission>,
    principal: Option<&Principal>,
) -> Decision {
    let Some(required) = required else {
        return Decision::Admit;
    };
    let Some(principal) = principal else {
        return Decision::Deny(DenyReason::MissingIdentity);
    };
    if principal.role.is_empty() {
        return Decision::Deny(DenyReason::MissingIdentity);
    }
    if engine.can(&principal.role, required) {
        Decision::Admit
    } else {
        Decision::Deny(DenyReason::Forbidden { required })
    }
}
