//! Identity-context extraction for the API boundary.
//!
//! Authentication itself happens upstream: the edge gateway verifies the
//! caller and attaches identity headers before the request reaches this
//! process. This crate turns that trusted header set into a
//! [`Principal`]. It does no credential verification of its own.

use axum::http::HeaderMap;
use platform_authz::Principal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("identity header {0} missing from authenticated request")]
    MissingHeader(String),
    #[error("identity header {header} is not valid: {value:?}")]
    MalformedHeader { header: String, value: String },
}

/// Names of the headers the gateway uses to forward the verified identity.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct IdentityHeaders {
    pub user: String,
    pub role: String,
    pub org: String,
}

impl Default for IdentityHeaders {
    fn default() -> Self {
        Self {
            user: "x-auth-user".into(),
            role: "x-auth-role".into(),
            org: "x-auth-org".into(),
        }
    }
}

/// Read the gateway identity headers into a [`Principal`].
///
/// No identity headers at all means an unauthenticated request (`Ok(None)`).
/// A partial or unparseable set is a contract violation by the gateway and
/// surfaces as an error, which the boundary maps to 401 rather than letting
/// a half-formed identity through.
pub fn principal_from_headers(
    headers: &HeaderMap,
    names: &IdentityHeaders,
) -> Result<Option<Principal>, AuthnError> {
    let user = header_value(headers, &names.user)?;
    let role = header_value(headers, &names.role)?;
    let org = header_value(headers, &names.org)?;

    let (user, role, org) = match (user, role, org) {
        (None, None, None) => return Ok(None),
        (Some(user), Some(role), Some(org)) => (user, role, org),
        (user, role, _) => {
            let missing = if user.is_none() {
                &names.user
            } else if role.is_none() {
                &names.role
            } else {
                &names.org
            };
            return Err(AuthnError::MissingHeader(missing.clone()));
        }
    };

    let user_id = parse_uuid(&names.user, user)?;
    let org_id = parse_uuid(&names.org, org)?;
    if role.is_empty() {
        return Err(AuthnError::MalformedHeader {
            header: names.role.clone(),
            value: role.to_string(),
        });
    }

    Ok(Some(Principal {
        user_id,
        role: role.to_string(),
        org_id,
    }))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthnError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.trim()))
            .map_err(|_| AuthnError::MalformedHeader {
                header: name.to_string(),
                value: "<non-ascii>".to_string(),
            }),
    }
}

fn parse_uuid(header: &str, value: &str) -> Result<Uuid, AuthnError> {
    Uuid::parse_str(value).map_err(|_| AuthnError::MalformedHeader {
        header: header.to_string(),
        value: value.to_string(),
    })
}
