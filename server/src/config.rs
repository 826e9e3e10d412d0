use anyhow::{Context, Result};
use axum::http::HeaderName;
use platform_authn::IdentityHeaders;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub cors_allowed_origins: Vec<String>,
    pub identity_headers: IdentityHeaders,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .filter_map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
            .collect::<Vec<_>>();

        let defaults = IdentityHeaders::default();
        let identity_headers = IdentityHeaders {
            user: identity_header("AUTH_USER_HEADER", defaults.user)?,
            role: identity_header("AUTH_ROLE_HEADER", defaults.role)?,
            org: identity_header("AUTH_ORG_HEADER", defaults.org)?,
        };

        Ok(Self {
            cors_allowed_origins,
            identity_headers,
        })
    }
}

fn identity_header(env_key: &str, default: String) -> Result<String> {
    let name = std::env::var(env_key).unwrap_or(default);
    HeaderName::from_bytes(name.as_bytes())
        .with_context(|| format!("{} is not a valid header name: {:?}", env_key, name))?;
    Ok(name.to_ascii_lowercase())
}
