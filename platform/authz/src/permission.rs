use std::fmt;

use serde::Serialize;

/// An atomic capability token of the form `<resource>:<action>`.
///
/// The catalog is closed at build time: values outside [`Permission::catalog`]
/// cannot be constructed, and [`Permission::from_str`] is the only way to turn
/// a free-form token into a `Permission`. A typo in a configured token
/// therefore fails the lookup instead of becoming an unenforced check.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Permission(&'static str);

impl Permission {
    pub const CONTACTS_VIEW: Permission = Permission("contacts:view");
    pub const CONTACTS_CREATE: Permission = Permission("contacts:create");
    pub const CONTACTS_EDIT: Permission = Permission("contacts:edit");
    pub const CONTACTS_DELETE: Permission = Permission("contacts:delete");
    pub const COMPANIES_VIEW: Permission = Permission("companies:view");
    pub const COMPANIES_CREATE: Permission = Permission("companies:create");
    pub const COMPANIES_EDIT: Permission = Permission("companies:edit");
    pub const COMPANIES_DELETE: Permission = Permission("companies:delete");
    pub const LEADS_VIEW: Permission = Permission("leads:view");
    pub const LEADS_CREATE: Permission = Permission("leads:create");
    pub const LEADS_EDIT: Permission = Permission("leads:edit");
    pub const LEADS_DELETE: Permission = Permission("leads:delete");
    pub const LEADS_ASSIGN: Permission = Permission("leads:assign");
    pub const LEADS_CONVERT: Permission = Permission("leads:convert");
    pub const DEALS_VIEW: Permission = Permission("deals:view");
    pub const DEALS_CREATE: Permission = Permission("deals:create");
    pub const DEALS_EDIT: Permission = Permission("deals:edit");
    pub const DEALS_DELETE: Permission = Permission("deals:delete");
    pub const DEALS_CLOSE: Permission = Permission("deals:close");
    pub const REPORTS_VIEW: Permission = Permission("reports:view");
    pub const JOBS_RUN: Permission = Permission("jobs:run");
    pub const USERS_MANAGE: Permission = Permission("users:manage");
    pub const ORG_MANAGE: Permission = Permission("org:manage");

    const ALL: &'static [Permission] = &[
        Permission::CONTACTS_VIEW,
        Permission::CONTACTS_CREATE,
        Permission::CONTACTS_EDIT,
        Permission::CONTACTS_DELETE,
        Permission::COMPANIES_VIEW,
        Permission::COMPANIES_CREATE,
        Permission::COMPANIES_EDIT,
        Permission::COMPANIES_DELETE,
        Permission::LEADS_VIEW,
        Permission::LEADS_CREATE,
        Permission::LEADS_EDIT,
        Permission::LEADS_DELETE,
        Permission::LEADS_ASSIGN,
        Permission::LEADS_CONVERT,
        Permission::DEALS_VIEW,
        Permission::DEALS_CREATE,
        Permission::DEALS_EDIT,
        Permission::DEALS_DELETE,
        Permission::DEALS_CLOSE,
        Permission::REPORTS_VIEW,
        Permission::JOBS_RUN,
        Permission::USERS_MANAGE,
        Permission::ORG_MANAGE,
    ];

    /// The full permission catalog, in declaration order.
    pub fn catalog() -> &'static [Permission] {
        Permission::ALL
    }

    /// Resolve a token against the catalog.
    pub fn from_str(token: &str) -> Option<Permission> {
        Permission::ALL.iter().copied().find(|p| p.0 == token)
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Namespace half of the token, e.g. `deals` for `deals:close`.
    pub fn resource(self) -> &'static str {
        self.0.split_once(':').map(|(r, _)| r).unwrap_or(self.0)
    }

    /// Action half of the token, e.g. `close` for `deals:close`.
    pub fn action(self) -> &'static str {
        self.0.split_once(':').map(|(_, a)| a).unwrap_or("")
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
