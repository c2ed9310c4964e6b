//! Gate error types.
//!
//! Every failure the gate can produce is an [`AuthError`]. Internally the
//! variants stay distinct so logs can tell an expired token from a forged
//! one; at the HTTP boundary they collapse to four kind-level codes via
//! [`AuthError::external_code`].

use std::fmt;
use std::time::Duration;

use gatehouse_core::{ContextError, PrincipalId};
use gatehouse_storage::StorageError;

/// Errors that can occur while gating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client exhausted its request budget for the current window.
    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded {
        /// Time until the current window closes.
        retry_after: Duration,
    },

    /// No credentials were presented.
    #[error("Missing credentials")]
    MissingCredentials,

    /// The token or authorization header could not be parsed.
    #[error("Malformed token: {message}")]
    TokenMalformed {
        /// Description of the parse failure.
        message: String,
    },

    /// The token header names an algorithm other than the configured one.
    #[error("Unexpected token algorithm: {algorithm}")]
    TokenAlgorithmMismatch {
        /// The algorithm found in the token header.
        algorithm: String,
    },

    /// The token signature does not verify under the configured secret.
    #[error("Invalid token signature")]
    TokenInvalidSignature,

    /// The token `exp` claim is in the past.
    #[error("Token expired")]
    TokenExpired,

    /// The token `iss` or `aud` claim does not match configuration.
    #[error("Token audience or issuer mismatch: {message}")]
    TokenAudienceOrIssuerMismatch {
        /// Which claim failed.
        message: String,
    },

    /// The token subject does not resolve to an active principal.
    #[error("Principal not found: {id}")]
    PrincipalNotFound {
        /// The subject id from the token.
        id: PrincipalId,
    },

    /// A required role name is not defined in role storage.
    #[error("Role not found: {role}")]
    RoleNotFound {
        /// The missing role name.
        role: String,
    },

    /// The principal is authenticated but not permitted.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Description of why access is forbidden.
        message: String,
    },

    /// A cache write requested by a mutating caller failed.
    #[error("Cache unavailable: {message}")]
    CacheUnavailable {
        /// Description of the cache failure.
        message: String,
    },

    /// The persistent store failed or timed out.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the store failure.
        message: String,
    },

    /// The gate was configured with invalid values.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// An unexpected internal failure.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

/// Result type for gate operations.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    #[must_use]
    pub fn rate_limited(retry_after: Duration) -> Self {
        Self::RateLimitExceeded { retry_after }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::TokenMalformed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn algorithm_mismatch(algorithm: impl Into<String>) -> Self {
        Self::TokenAlgorithmMismatch {
            algorithm: algorithm.into(),
        }
    }

    #[must_use]
    pub fn audience_or_issuer(message: impl Into<String>) -> Self {
        Self::TokenAudienceOrIssuerMismatch {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn role_not_found(role: impl Into<String>) -> Self {
        Self::RoleNotFound { role: role.into() }
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn cache_unavailable(message: impl Into<String>) -> Self {
        Self::CacheUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the error is attributable to the caller (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !self.is_server_error()
    }

    /// Returns `true` if the error is attributable to the gate or its dependencies (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::RoleNotFound { .. }
                | Self::CacheUnavailable { .. }
                | Self::StoreUnavailable { .. }
                | Self::Configuration { .. }
                | Self::Internal { .. }
        )
    }

    /// Returns `true` if this is a token validation failure.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::TokenMalformed { .. }
                | Self::TokenAlgorithmMismatch { .. }
                | Self::TokenInvalidSignature
                | Self::TokenExpired
                | Self::TokenAudienceOrIssuerMismatch { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimit,
            Self::MissingCredentials | Self::PrincipalNotFound { .. } => {
                ErrorCategory::Authentication
            }
            Self::TokenMalformed { .. }
            | Self::TokenAlgorithmMismatch { .. }
            | Self::TokenInvalidSignature
            | Self::TokenExpired
            | Self::TokenAudienceOrIssuerMismatch { .. } => ErrorCategory::Token,
            Self::Forbidden { .. } => ErrorCategory::Authorization,
            Self::CacheUnavailable { .. } | Self::StoreUnavailable { .. } => {
                ErrorCategory::Infrastructure
            }
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::RoleNotFound { .. } | Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the kind-level code exposed to callers.
    ///
    /// Token failure sub-kinds all map to `unauthorized` so responses never
    /// reveal which check rejected a token.
    #[must_use]
    pub fn external_code(&self) -> &'static str {
        match self.category() {
            ErrorCategory::RateLimit => "rate_limited",
            ErrorCategory::Authentication | ErrorCategory::Token => "unauthorized",
            ErrorCategory::Authorization => "forbidden",
            ErrorCategory::Infrastructure
            | ErrorCategory::Configuration
            | ErrorCategory::Internal => "internal_error",
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        Self::store_unavailable(err.to_string())
    }
}

impl From<ContextError> for AuthError {
    fn from(err: ContextError) -> Self {
        Self::store_unavailable(err.to_string())
    }
}

/// Categories of gate errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request budget exhausted.
    RateLimit,
    /// Identity could not be established.
    Authentication,
    /// Token validation failures.
    Token,
    /// Permission checks.
    Authorization,
    /// Cache or store failures.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Authorization => write!(f, "authorization"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
