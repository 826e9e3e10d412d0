//! Boundary handlers for the CRM resources.
//!
//! These are intentionally thin: the interesting work happens in the
//! middlewares in [`crate::http`] before a handler body runs. Handlers serve
//! demo payloads until the data layer lands; the authorization contract they
//! sit behind is final.

use axum::{Extension, Json, extract::Path, http::StatusCode, response::IntoResponse};
use platform_authz::Principal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::RequestIdentity;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeResponse {
    authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    org_id: Option<Uuid>,
}

/// Declares no required permission on purpose: any caller may ask who they
/// are, including anonymous ones.
pub async fn me(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    let response = match identity.0 {
        Some(Principal {
            user_id,
            role,
            org_id,
        }) => MeResponse {
            authenticated: true,
            user_id: Some(user_id),
            role: Some(role),
            org_id: Some(org_id),
        },
        None => MeResponse {
            authenticated: false,
            user_id: None,
            role: None,
            org_id: None,
        },
    };
    Json(response)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactRecord {
    id: Uuid,
    name: String,
    email: Option<String>,
    org_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContactRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn list_contacts(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    let org_id = org_of(&identity);
    Json(vec![
        ContactRecord {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".into(),
            email: Some("ada@acme.test".into()),
            org_id,
        },
        ContactRecord {
            id: Uuid::new_v4(),
            name: "Grace Hopper".into(),
            email: Some("grace@acme.test".into()),
            org_id,
        },
    ])
}

pub async fn create_contact(
    Extension(identity): Extension<RequestIdentity>,
    Json(request): Json<CreateContactRequest>,
) -> impl IntoResponse {
    let record = ContactRecord {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        org_id: org_of(&identity),
    };
    (StatusCode::CREATED, Json(record))
}

pub async fn delete_contact(Path(_id): Path<Uuid>) -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRecord {
    id: Uuid,
    name: String,
    website: Option<String>,
    org_id: Uuid,
}

pub async fn list_companies(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    Json(vec![CompanyRecord {
        id: Uuid::new_v4(),
        name: "ACME, Inc.".into(),
        website: Some("https://acme.test".into()),
        org_id: org_of(&identity),
    }])
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeadRecord {
    id: Uuid,
    name: String,
    status: &'static str,
    assigned_user_id: Option<Uuid>,
    org_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignLeadRequest {
    pub user_id: Uuid,
}

pub async fn list_leads(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    Json(vec![LeadRecord {
        id: Uuid::new_v4(),
        name: "Inbound from webinar".into(),
        status: "NEW",
        assigned_user_id: None,
        org_id: org_of(&identity),
    }])
}

pub async fn assign_lead(
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<Uuid>,
    Json(request): Json<AssignLeadRequest>,
) -> impl IntoResponse {
    Json(LeadRecord {
        id,
        name: "Inbound from webinar".into(),
        status: "ASSIGNED",
        assigned_user_id: Some(request.user_id),
        org_id: org_of(&identity),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DealRecord {
    id: Uuid,
    title: String,
    stage: &'static str,
    amount_cents: i64,
    org_id: Uuid,
}

pub async fn list_deals(Extension(identity): Extension<RequestIdentity>) -> impl IntoResponse {
    Json(vec![DealRecord {
        id: Uuid::new_v4(),
        title: "ACME Pilot".into(),
        stage: "NEGOTIATE",
        amount_cents: 500_000,
        org_id: org_of(&identity),
    }])
}

pub async fn close_deal(
    Extension(identity): Extension<RequestIdentity>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    Json(DealRecord {
        id,
        title: "ACME Pilot".into(),
        stage: "WON",
        amount_cents: 500_000,
        org_id: org_of(&identity),
    })
}

/// Tenant scope for response payloads. Guarded operations always carry a
/// principal by the time a handler runs; the nil fallback only shows up on
/// unguarded demo routes.
fn org_of(identity: &RequestIdentity) -> Uuid {
    identity
        .0
        .as_ref()
        .map(|principal| principal.org_id)
        .unwrap_or_default()
}
