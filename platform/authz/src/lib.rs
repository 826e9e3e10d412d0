//! Role-based access control core for the CRM API.
//!
//! The permission and role catalogs are closed at build time. The policy
//! table is validated at construction, immutable afterwards, and shared
//! lock-free across request handlers. Enforcement is a stateless admit/deny
//! decision taken before the handler body runs; the HTTP layer maps denials
//! onto transport responses.

mod engine;
mod guard;
mod permission;
mod policy;
mod principal;
mod role;

pub use engine::PolicyEngine;
pub use guard::{authorize, Decision, DenyReason, OperationRequirements};
pub use permission::Permission;
pub use policy::{default_table, PolicyError, PolicyTable, PolicyTableBuilder};
pub use principal::Principal;
pub use role::Role;
