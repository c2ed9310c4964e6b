//! Error responses for gate rejections.
//!
//! Bodies carry only the kind-level code, e.g. `{"error": "unauthorized"}`.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::pipeline::{Challenge, GateRejection};

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();

        match self {
            Self::RateLimited { .. } => {
                if let Some(secs) = self.retry_after_secs() {
                    headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
                }
            }
            Self::Unauthorized { challenge } => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(www_authenticate(challenge)),
                );
            }
            Self::Forbidden | Self::Internal => {}
        }

        (
            self.status_code(),
            headers,
            Json(json!({ "error": self.code() })),
        )
            .into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        GateRejection::from(self).into_response()
    }
}

fn www_authenticate(challenge: Challenge) -> &'static str {
    match challenge {
        Challenge::MissingCredentials => r#"Bearer realm="gatehouse""#,
        Challenge::InvalidToken => r#"Bearer realm="gatehouse", error="invalid_token""#,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::to_bytes;
    use axum::http::StatusCode;

    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rate_limited_response() {
        let response = GateRejection::RateLimited {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
        assert_eq!(body_json(response).await["error"], "rate_limited");
    }

    #[tokio::test]
    async fn test_unauthorized_response_hides_sub_kind() {
        let response = AuthError::TokenExpired.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response.headers()[header::WWW_AUTHENTICATE]
            .to_str()
            .unwrap()
            .to_string();
        assert!(challenge.contains("invalid_token"));

        let body = body_json(response).await;
        assert_eq!(body, json!({ "error": "unauthorized" }));
    }

    #[tokio::test]
    async fn test_missing_credentials_challenge() {
        let response = AuthError::MissingCredentials.into_response();
        let challenge = response.headers()[header::WWW_AUTHENTICATE].to_str().unwrap();
        assert!(challenge.starts_with("Bearer"));
        assert!(!challenge.contains("error="));
    }

    #[tokio::test]
    async fn test_internal_response() {
        let response = AuthError::role_not_found("superuser").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "internal_error" })
        );
    }
}
