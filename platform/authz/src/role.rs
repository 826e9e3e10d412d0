use std::fmt;

use serde::{Deserialize, Serialize};

/// A named bundle of permissions assignable to a principal.
///
/// The catalog is a small closed set. `SuperAdmin` is the designated top role:
/// it always carries the whole permission catalog (see
/// [`PolicyTable::granted`](crate::PolicyTable::granted)) and never appears in
/// configured grants.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    SalesRep,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SuperAdmin,
        Role::Admin,
        Role::Manager,
        Role::SalesRep,
        Role::Viewer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::SalesRep => "sales_rep",
            Role::Viewer => "viewer",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "super_admin" => Some(Role::SuperAdmin),
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "sales_rep" => Some(Role::SalesRep),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_tokens_do_not_resolve() {
        assert_eq!(Role::from_str("intern"), None);
        assert_eq!(Role::from_str("ADMIN"), None);
        assert_eq!(Role::from_str(""), None);
    }
}
