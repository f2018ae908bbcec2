use super::AdminAuthConfig;
use crate::errors::{ErrorCode, error_response};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::convert::Infallible;
use std::sync::Arc;

/// Who passed the admin gate; inserted into request extensions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminIdentity(pub String);

/// Actor for audit lines: the [`AdminIdentity`] if the gate ran.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor(pub Option<String>);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Actor(
            parts
                .extensions
                .get::<AdminIdentity>()
                .map(|identity| identity.0.clone()),
        ))
    }
}

/// Credentials as presented in the `Authorization` header
#[derive(Debug, PartialEq, Eq)]
enum Credentials {
    Basic { username: String, password: String },
    Bearer(String),
}

fn extract_credentials(headers: &HeaderMap) -> Option<Credentials> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, rest) = value.split_once(' ')?;
    let rest = rest.trim();

    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = STANDARD.decode(rest).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Credentials::Basic {
            username: username.to_string(),
            password: password.to_string(),
        })
    } else if scheme.eq_ignore_ascii_case("bearer") {
        Some(Credentials::Bearer(rest.to_string()))
    } else {
        None
    }
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn authenticate(config: &AdminAuthConfig, credentials: &Credentials) -> Option<AdminIdentity> {
    match credentials {
        Credentials::Basic { username, password } => {
            // Evaluate both so timing does not reveal which one matched.
            let user_ok = constant_time_eq(username.as_bytes(), config.username.as_bytes());
            let pass_ok = constant_time_eq(password.as_bytes(), config.password.as_bytes());
            (user_ok & pass_ok).then(|| AdminIdentity(username.clone()))
        }
        Credentials::Bearer(token) => config
            .token
            .as_ref()
            .filter(|expected| constant_time_eq(token.as_bytes(), expected.as_bytes()))
            .map(|_| AdminIdentity("token".to_string())),
    }
}

fn unauthorized(message: &str) -> Response {
    let mut response = error_response(
        StatusCode::UNAUTHORIZED,
        message.to_string(),
        ErrorCode::Unauthorized,
    );
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"admin\""),
    );
    response
}

/// Reject requests without valid admin credentials.
///
/// Accepts `Authorization: Basic` with the configured username and password,
/// or `Authorization: Bearer` with `ADMIN_TOKEN` when one is configured.
/// Inserts [`AdminIdentity`] into request extensions on success.
pub async fn admin_auth_middleware(
    State(config): State<Arc<AdminAuthConfig>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(credentials) = extract_credentials(&headers) else {
        tracing::debug!("No admin credentials in Authorization header");
        return unauthorized("Authentication required");
    };

    match authenticate(&config, &credentials) {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        None => {
            tracing::warn!(
                target: "audit",
                action = "admin.login",
                outcome = "denied",
                path = %request.uri().path(),
                "Rejected admin credentials"
            );
            unauthorized("Invalid credentials")
        }
    }
}
