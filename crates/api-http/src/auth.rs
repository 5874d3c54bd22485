//! Bearer auth for the research endpoints
//!
//! When enabled, the token is compared against the configured secret in
//! constant time. Health endpoints are never gated (they live outside the
//! route layer carrying this middleware).

use crate::server::ApiState;
use crate::types::ErrorResponse;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub secret: String,
}

impl AuthConfig {
    /// Read `API_AUTH_ENABLED` / `API_SECRET_KEY` from the environment.
    pub fn from_env() -> Self {
        let enabled = std::env::var("API_AUTH_ENABLED")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let secret = std::env::var("API_SECRET_KEY").unwrap_or_default();
        Self { enabled, secret }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            secret: String::new(),
        }
    }
}

fn forbidden(message: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(ErrorResponse {
            error: message.to_string(),
            code: "FORBIDDEN".to_string(),
        }),
    )
        .into_response()
}

pub async fn auth_middleware(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth.enabled {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token)
            if bool::from(token.as_bytes().ct_eq(state.auth.secret.as_bytes())) =>
        {
            next.run(request).await
        }
        Some(_) => {
            tracing::warn!("Authentication failed: invalid token");
            forbidden("Invalid API key")
        }
        None => forbidden("Missing bearer token"),
    }
}
