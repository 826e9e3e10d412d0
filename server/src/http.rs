use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{MatchedPath, Request, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use platform_authn::principal_from_headers;
use platform_authz::{
    Decision, DenyReason, OperationRequirements, Permission, PolicyEngine, PolicyError, Principal,
    authorize,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{api, config::AppConfig};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PolicyEngine>,
    pub requirements: Arc<OperationRequirements>,
    pub config: Arc<AppConfig>,
}

/// Identity attached by the gateway, as seen by this request. `None` means
/// the request is unauthenticated.
#[derive(Clone)]
pub struct RequestIdentity(pub Option<Principal>);

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

/// Required permission per operation, declared next to the routes in
/// [`build_router`]. An operation left out of this table is open to any
/// caller, so additions to the router belong here in the same change.
pub fn operation_requirements() -> Result<OperationRequirements, PolicyError> {
    OperationRequirements::new()
        .require("GET /contacts", Permission::CONTACTS_VIEW)?
        .require("POST /contacts", Permission::CONTACTS_CREATE)?
        .require("DELETE /contacts/{id}", Permission::CONTACTS_DELETE)?
        .require("GET /companies", Permission::COMPANIES_VIEW)?
        .require("GET /leads", Permission::LEADS_VIEW)?
        .require("POST /leads/{id}/assign", Permission::LEADS_ASSIGN)?
        .require("GET /deals", Permission::DEALS_VIEW)?
        .require("POST /deals/{id}/close", Permission::DEALS_CLOSE)
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "crm server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(api::health))
        .route("/me", get(api::me))
        .route("/contacts", get(api::list_contacts).post(api::create_contact))
        .route("/contacts/{id}", delete(api::delete_contact))
        .route("/companies", get(api::list_companies))
        .route("/leads", get(api::list_leads))
        .route("/leads/{id}/assign", post(api::assign_lead))
        .route("/deals", get(api::list_deals))
        .route("/deals/{id}/close", post(api::close_deal))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    identity_middleware,
                ))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    enforce_middleware,
                )),
        )
        .with_state(state)
}

/// Turn the gateway identity headers into a [`RequestIdentity`] extension.
/// Runs before enforcement; a malformed header set is rejected outright
/// rather than treated as anonymous.
async fn identity_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match principal_from_headers(request.headers(), &state.config.identity_headers) {
        Ok(principal) => {
            request.extensions_mut().insert(RequestIdentity(principal));
            next.run(request).await
        }
        Err(err) => {
            warn!(error = %err, "rejected request with malformed identity headers");
            error_response(StatusCode::UNAUTHORIZED, "invalid identity headers")
        }
    }
}

/// Consult the operation side-table and the policy engine before the handler
/// body runs. Operations without a declared requirement pass through.
async fn enforce_middleware(
    State(state): State<AppState>,
    matched: MatchedPath,
    request: Request,
    next: Next,
) -> Response {
    let operation = format!("{} {}", request.method(), matched.as_str());
    let required = state.requirements.required(&operation);
    let identity = request
        .extensions()
        .get::<RequestIdentity>()
        .cloned()
        .unwrap_or(RequestIdentity(None));

    match authorize(&state.engine, required, identity.0.as_ref()) {
        Decision::Admit => next.run(request).await,
        Decision::Deny(reason) => {
            let role = identity
                .0
                .map(|principal| principal.role)
                .unwrap_or_else(|| "<anonymous>".to_string());
            warn!(%operation, role = %role, reason = %reason, "request denied");
            deny_response(reason)
        }
    }
}

fn deny_response(reason: DenyReason) -> Response {
    let status = match reason {
        DenyReason::MissingIdentity => StatusCode::UNAUTHORIZED,
        DenyReason::Forbidden { .. } => StatusCode::FORBIDDEN,
    };
    error_response(status, &reason.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use platform_authn::IdentityHeaders;

    fn test_state() -> AppState {
        AppState {
            engine: Arc::new(PolicyEngine::with_default_policy().unwrap()),
            requirements: Arc::new(operation_requirements().unwrap()),
            config: Arc::new(AppConfig {
                cors_allowed_origins: vec![],
                identity_headers: IdentityHeaders::default(),
            }),
        }
    }

    fn request(method: &str, uri: &str, role: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(method).uri(uri);
        if let Some(role) = role {
            builder = builder
                .header("x-auth-user", Uuid::new_v4().to_string())
                .header("x-auth-role", role)
                .header("x-auth-org", Uuid::new_v4().to_string());
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_open_to_anonymous_callers() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn me_has_no_declared_requirement_and_admits_anonymous() {
        let router = build_router(test_state());
        let response = router.oneshot(request("GET", "/me", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("false"));
    }

    #[tokio::test]
    async fn guarded_operation_without_identity_is_unauthorized() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request("GET", "/contacts", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_string(response).await.contains("authentication required"));
    }

    #[tokio::test]
    async fn viewer_can_list_contacts() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request("GET", "/contacts", Some("viewer")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn viewer_cannot_delete_contacts() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request(
                "DELETE",
                &format!("/contacts/{}", Uuid::new_v4()),
                Some("viewer"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn sales_rep_cannot_close_deals_and_the_body_names_no_roles() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request(
                "POST",
                &format!("/deals/{}/close", Uuid::new_v4()),
                Some("sales_rep"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_string(response).await;
        assert!(body.contains("deals:close"));
        for role in ["super_admin", "admin", "manager"] {
            assert!(!body.contains(role), "deny body leaks role {}", role);
        }
    }

    #[tokio::test]
    async fn manager_can_close_deals() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request(
                "POST",
                &format!("/deals/{}/close", Uuid::new_v4()),
                Some("manager"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_role_is_forbidden_not_an_error() {
        let router = build_router(test_state());
        let response = router
            .oneshot(request("GET", "/deals", Some("intern")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_identity_headers_are_rejected() {
        let router = build_router(test_state());
        let response = router
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/contacts")
                    .header("x-auth-user", "not-a-uuid")
                    .header("x-auth-role", "viewer")
                    .header("x-auth-org", Uuid::new_v4().to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn super_admin_reaches_every_guarded_operation() {
        let assignee = Uuid::new_v4();
        for (method, uri, body) in [
            ("GET", "/contacts".to_string(), None),
            (
                "POST",
                "/contacts".to_string(),
                Some(r#"{"name":"Ada Lovelace","email":"ada@acme.test"}"#.to_string()),
            ),
            ("DELETE", format!("/contacts/{}", Uuid::new_v4()), None),
            ("GET", "/companies".to_string(), None),
            ("GET", "/leads".to_string(), None),
            (
                "POST",
                format!("/leads/{}/assign", Uuid::new_v4()),
                Some(format!(r#"{{"userId":"{}"}}"#, assignee)),
            ),
            ("GET", "/deals".to_string(), None),
            ("POST", format!("/deals/{}/close", Uuid::new_v4()), None),
        ] {
            let router = build_router(test_state());
            let mut req = request(method, &uri, Some("super_admin"));
            if let Some(body) = body {
                req.headers_mut().insert(
                    http::header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                *req.body_mut() = Body::from(body);
            }
            let response = router.oneshot(req).await.unwrap();
            assert!(
                response.status().is_success(),
                "super_admin denied on {} {}",
                method,
                uri
            );
        }
    }
}
