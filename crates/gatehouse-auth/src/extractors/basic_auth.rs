//! HTTP Basic authentication against configured credentials.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use subtle::ConstantTimeEq;

use crate::config::BasicAuthConfig;

/// State container for Basic Auth.
#[derive(Clone, Debug)]
pub struct BasicAuthState {
    pub credentials: Arc<BasicAuthConfig>,
}

impl BasicAuthState {
    #[must_use]
    pub fn new(credentials: BasicAuthConfig) -> Self {
        Self {
            credentials: Arc::new(credentials),
        }
    }
}

/// A request authenticated with Basic credentials.
#[derive(Debug, Clone)]
pub struct BasicAuth {
    pub username: String,
}

/// Error returned when Basic Auth fails.
#[derive(Debug, Clone, Serialize)]
pub struct BasicAuthError {
    pub error: &'static str,
}

impl BasicAuthError {
    const UNAUTHORIZED: Self = Self {
        error: "unauthorized",
    };
}

impl IntoResponse for BasicAuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(r#"Basic realm="gatehouse", charset="UTF-8""#),
            )],
            Json(self),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for BasicAuth
where
    S: Send + Sync,
    BasicAuthState: FromRef<S>,
{
    type Rejection = BasicAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = BasicAuthState::from_ref(state);

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(BasicAuthError::UNAUTHORIZED)?;

        let (username, password) = parse_basic_auth(auth_header).map_err(|e| {
            tracing::debug!(error = %e, "Malformed Basic credentials");
            BasicAuthError::UNAUTHORIZED
        })?;

        if !credentials_match(&state.credentials, &username, &password) {
            tracing::warn!(
                endpoint = %parts.uri.path(),
                method = %parts.method,
                "Basic authentication failed"
            );
            return Err(BasicAuthError::UNAUTHORIZED);
        }

        Ok(BasicAuth { username })
    }
}

/// Constant-time comparison of both fields. Neither comparison short-circuits.
fn credentials_match(expected: &BasicAuthConfig, username: &str, password: &str) -> bool {
    let user = username.as_bytes().ct_eq(expected.username.as_bytes());
    let pass = password.as_bytes().ct_eq(expected.password.as_bytes());
    (user & pass).into()
}

/// Parse Basic Auth header.
///
/// Extracts credentials from "Basic <base64>" format. The decoded value must
/// contain a `:` separating user and password.
fn parse_basic_auth(header: &str) -> Result<(String, String), String> {
    let credentials = header
        .strip_prefix("Basic ")
        .ok_or_else(|| "Authorization header must start with 'Basic '".to_string())?;

    let decoded = STANDARD
        .decode(credentials)
        .map_err(|_| "Invalid base64 encoding in Authorization header".to_string())?;

    let credentials_str = String::from_utf8(decoded)
        .map_err(|_| "Invalid UTF-8 in decoded credentials".to_string())?;

    let (username, password) = credentials_str
        .split_once(':')
        .ok_or_else(|| "Credentials must be in format 'user:password'".to_string())?;

    Ok((username.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn header_for(credentials: &str) -> String {
        format!("Basic {}", STANDARD.encode(credentials))
    }

    fn ops() -> BasicAuthConfig {
        BasicAuthConfig {
            username: "ops".to_string(),
            password: "s3cret".to_string(),
        }
    }

    async fn extract(header: Option<String>) -> Result<BasicAuth, BasicAuthError> {
        let state = BasicAuthState::new(ops());
        let mut builder = Request::builder().uri("/v1/health");
        if let Some(header) = header {
            builder = builder.header(header::AUTHORIZATION, header);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        BasicAuth::from_request_parts(&mut parts, &state).await
    }

    #[test]
    fn test_parse_basic_auth_valid() {
        let (user, pass) = parse_basic_auth(&header_for("ops:s3cret")).unwrap();
        assert_eq!(user, "ops");
        assert_eq!(pass, "s3cret");
    }

    #[test]
    fn test_parse_basic_auth_password_may_contain_colon() {
        let (user, pass) = parse_basic_auth(&header_for("ops:a:b")).unwrap();
        assert_eq!(user, "ops");
        assert_eq!(pass, "a:b");
    }

    #[test]
    fn test_parse_basic_auth_invalid_prefix() {
        let result = parse_basic_auth("Bearer token");
        assert!(result.unwrap_err().contains("Basic"));
    }

    #[test]
    fn test_parse_basic_auth_missing_colon() {
        let result = parse_basic_auth(&header_for("no-colon-here"));
        assert!(result.unwrap_err().contains("user:password"));
    }

    #[test]
    fn test_credentials_match_requires_both_fields() {
        let expected = ops();
        assert!(credentials_match(&expected, "ops", "s3cret"));
        assert!(!credentials_match(&expected, "ops", "s3creT"));
        assert!(!credentials_match(&expected, "opz", "s3cret"));
        assert!(!credentials_match(&expected, "ops", "s3cret\0"));
        assert!(!credentials_match(&expected, "", ""));
    }

    #[tokio::test]
    async fn test_exact_credentials_accepted() {
        let auth = extract(Some(header_for("ops:s3cret"))).await.unwrap();
        assert_eq!(auth.username, "ops");
    }

    #[tokio::test]
    async fn test_near_miss_credentials_rejected() {
        for credentials in ["ops:s3cre", "ops:s3cret!", "op:s3cret", "ops:", ":s3cret"] {
            assert!(extract(Some(header_for(credentials))).await.is_err(), "{credentials}");
        }
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let response = extract(None).await.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            response.headers()[header::WWW_AUTHENTICATE]
                .to_str()
                .unwrap()
                .starts_with("Basic")
        );
    }
}
