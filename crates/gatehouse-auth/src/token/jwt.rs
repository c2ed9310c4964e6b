//! HS256 bearer token generation and validation.
//!
//! Tokens are signed with a shared HMAC secret. Validation is strict: the
//! header must name `HS256`, the signature must verify, `exp` must be present
//! and in the future with zero leeway, `nbf` is honoured, and both `iss` and
//! `aud` must equal configuration.
//!
//! ## Example
//!
//! ```ignore
//! use gatehouse_auth::token::TokenAuthenticator;
//!
//! let authenticator = TokenAuthenticator::from_config(&config.token)?;
//! let token = authenticator.issue_for(42)?;
//! let claims = authenticator.validate_token(&token)?;
//! assert_eq!(claims.sub, 42);
//! ```

use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use gatehouse_core::PrincipalId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

const ALGORITHM: Algorithm = Algorithm::HS256;
const ALGORITHM_NAME: &str = "HS256";

// ============================================================================
// Error Mapping
// ============================================================================

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidSignature => Self::TokenInvalidSignature,
            ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::algorithm_mismatch(err.to_string()),
            ErrorKind::InvalidAudience | ErrorKind::InvalidIssuer => {
                Self::audience_or_issuer(err.to_string())
            }
            ErrorKind::ImmatureSignature => Self::malformed("token not yet valid"),
            _ => Self::malformed(err.to_string()),
        }
    }
}

// ============================================================================
// Claims
// ============================================================================

/// Registered claims carried by a gate token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal id.
    pub sub: PrincipalId,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Not before (Unix seconds).
    pub nbf: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl TokenClaims {
    /// Builds claims for `sub` valid from now for `lifetime`.
    #[must_use]
    pub fn new(
        sub: PrincipalId,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        Self {
            sub,
            iat: now,
            nbf: now,
            exp: now.saturating_add(lifetime),
            iss: issuer.into(),
            aud: audience.into(),
        }
    }
}

#[derive(Deserialize)]
struct RawHeader {
    alg: Option<String>,
}

// ============================================================================
// Token Authenticator
// ============================================================================

/// Issues and validates HS256 tokens.
///
/// Holds only immutable key material and expected claim values, so it is
/// `Send + Sync` and shared freely across requests.
#[derive(Clone)]
pub struct TokenAuthenticator {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenAuthenticator {
    /// Creates an authenticator for the given secret and expected claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is empty.
    pub fn new(
        secret: &[u8],
        issuer: impl Into<String>,
        audience: impl Into<String>,
        lifetime: Duration,
    ) -> AuthResult<Self> {
        if secret.is_empty() {
            return Err(AuthError::configuration("token secret cannot be empty"));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            audience: audience.into(),
            lifetime,
        })
    }

    /// Creates an authenticator from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the secret is empty.
    pub fn from_config(config: &TokenConfig) -> AuthResult<Self> {
        Self::new(
            config.secret.as_bytes(),
            config.issuer.clone(),
            config.audience.clone(),
            config.lifetime,
        )
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Signs the given claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if serialization or signing fails.
    pub fn generate_token(&self, claims: &TokenClaims) -> AuthResult<String> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign token: {e}")))
    }

    /// Issues a token for `principal_id` using the configured issuer,
    /// audience and lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if signing fails.
    pub fn issue_for(&self, principal_id: PrincipalId) -> AuthResult<String> {
        let claims = TokenClaims::new(
            principal_id,
            self.issuer.clone(),
            self.audience.clone(),
            self.lifetime,
        );
        self.generate_token(&claims)
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// - `TokenMalformed` if the token does not parse or `exp` is missing
    /// - `TokenAlgorithmMismatch` if the header algorithm is not `HS256`
    /// - `TokenInvalidSignature` if the signature does not verify
    /// - `TokenExpired` if `exp` is not in the future
    /// - `TokenAudienceOrIssuerMismatch` if `iss` or `aud` differ from configuration
    pub fn validate_token(&self, token: &str) -> AuthResult<TokenClaims> {
        check_header_algorithm(token)?;

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let claims = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AuthError::from)?;

        // `exp` is exclusive: the token is invalid from that second on.
        if claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticator")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

/// Rejects any token whose header does not name `HS256`, including `none`.
fn check_header_algorithm(token: &str) -> AuthResult<()> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::malformed("token must have three segments"));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| AuthError::malformed("token header is not base64url"))?;
    let header: RawHeader = serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::malformed("token header is not valid JSON"))?;

    match header.alg.as_deref() {
        Some(ALGORITHM_NAME) => Ok(()),
        Some(other) => Err(AuthError::algorithm_mismatch(other)),
        None => Err(AuthError::algorithm_mismatch("missing")),
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value.
///
/// # Errors
///
/// Returns `MissingCredentials` if no header was sent and `TokenMalformed` if
/// the value is not exactly two space-separated parts with a `Bearer` scheme.
pub fn parse_bearer(header: Option<&str>) -> AuthResult<&str> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    match header.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Ok(token),
        _ => Err(AuthError::malformed("authorization header must be 'Bearer <token>'")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    fn authenticator() -> TokenAuthenticator {
        TokenAuthenticator::new(SECRET, "gatehouse", "gatehouse", Duration::from_secs(3600))
            .unwrap()
    }

    fn now() -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }

    fn encode_raw(header: &str, payload: &str, signature: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            signature
        )
    }

    #[test]
    fn test_roundtrip_returns_equal_claims() {
        let service = authenticator();
        let claims = TokenClaims::new(42, "gatehouse", "gatehouse", Duration::from_secs(600));

        let token = service.generate_token(&claims).unwrap();
        let decoded = service.validate_token(&token).unwrap();

        assert_eq!(decoded, claims);
    }

    #[test]
    fn test_issue_for_uses_configuration() {
        let service = authenticator();
        let token = service.issue_for(7).unwrap();
        let claims = service.validate_token(&token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.iss, "gatehouse");
        assert_eq!(claims.aud, "gatehouse");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.nbf, claims.iat);
    }

    #[test]
    fn test_other_secret_rejected() {
        let other = TokenAuthenticator::new(
            b"another-secret",
            "gatehouse",
            "gatehouse",
            Duration::from_secs(3600),
        )
        .unwrap();
        let token = other.issue_for(1).unwrap();

        let err = authenticator().validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenInvalidSignature));
    }

    #[test]
    fn test_expired_rejected() {
        let service = authenticator();
        let mut claims = TokenClaims::new(1, "gatehouse", "gatehouse", Duration::from_secs(60));
        claims.exp = now() - 1;

        let token = service.generate_token(&claims).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_exp_equal_to_now_rejected() {
        let service = authenticator();
        let mut claims = TokenClaims::new(1, "gatehouse", "gatehouse", Duration::from_secs(60));
        claims.exp = now();

        let token = service.generate_token(&claims).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn test_not_yet_valid_rejected() {
        let service = authenticator();
        let mut claims = TokenClaims::new(1, "gatehouse", "gatehouse", Duration::from_secs(600));
        claims.nbf = now() + 300;

        let token = service.generate_token(&claims).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenMalformed { .. }));
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let service = authenticator();
        let claims = TokenClaims::new(1, "gatehouse", "someone-else", Duration::from_secs(60));

        let token = service.generate_token(&claims).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenAudienceOrIssuerMismatch { .. }));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let service = authenticator();
        let claims = TokenClaims::new(1, "impostor", "gatehouse", Duration::from_secs(60));

        let token = service.generate_token(&claims).unwrap();
        let err = service.validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenAudienceOrIssuerMismatch { .. }));
    }

    #[test]
    fn test_alg_none_rejected() {
        let payload = format!(
            r#"{{"sub":1,"iat":{n},"nbf":{n},"exp":{e},"iss":"gatehouse","aud":"gatehouse"}}"#,
            n = now(),
            e = now() + 600
        );
        let token = encode_raw(r#"{"alg":"none","typ":"JWT"}"#, &payload, "");

        let err = authenticator().validate_token(&token).unwrap_err();
        assert!(matches!(
            err,
            AuthError::TokenAlgorithmMismatch { ref algorithm } if algorithm == "none"
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let claims = TokenClaims::new(1, "gatehouse", "gatehouse", Duration::from_secs(60));
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let err = authenticator().validate_token(&token).unwrap_err();
        assert!(matches!(
            err,
            AuthError::TokenAlgorithmMismatch { ref algorithm } if algorithm == "HS512"
        ));
    }

    #[test]
    fn test_missing_exp_rejected() {
        let payload = r#"{"sub":1,"iat":0,"nbf":0,"iss":"gatehouse","aud":"gatehouse"}"#;
        let header = Header::new(ALGORITHM);
        let token = encode(
            &header,
            &serde_json::from_str::<serde_json::Value>(payload).unwrap(),
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let err = authenticator().validate_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::TokenMalformed { .. }));
    }

    #[test]
    fn test_garbage_rejected_as_malformed() {
        let service = authenticator();
        for token in ["", "abc", "a.b", "a.b.c.d", "!!!.e30.sig"] {
            let err = service.validate_token(token).unwrap_err();
            assert!(matches!(err, AuthError::TokenMalformed { .. }), "{token}");
        }
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        let err =
            TokenAuthenticator::new(b"", "gatehouse", "gatehouse", Duration::from_secs(1))
                .unwrap_err();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert!(matches!(
            parse_bearer(None).unwrap_err(),
            AuthError::MissingCredentials
        ));
        for header in ["Basic abc", "Bearer", "Bearer ", "bearer abc", "Bearer a b"] {
            assert!(
                matches!(parse_bearer(Some(header)).unwrap_err(), AuthError::TokenMalformed { .. }),
                "{header}"
            );
        }
    }

    #[test]
    fn test_debug_hides_keys() {
        let debug = format!("{:?}", authenticator());
        assert!(debug.contains("gatehouse"));
        assert!(!debug.contains("test-secret"));
    }
}
