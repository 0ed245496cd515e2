//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: extract or generate a request correlation id
//! - [`AuthUser`]: validate the `Authorization: Bearer <jwt>` header
//!   and expose the caller's identity
//!
//! # Examples
//!
//! ```ignore
//! async fn book(
//!     State(state): State<AppState>,
//!     user: AuthUser,
//!     correlation_id: CorrelationId,
//!     Json(body): Json<BookRequest>,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(user_id = %user.user_id, correlation_id = %correlation_id.0, "booking");
//!     // ...
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use fairgate_core::UserId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Correlation ID for request tracing.
///
/// Extracted from the `X-Correlation-ID` header, or generated fresh.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Prefer the value the middleware stored; fall back to header.
        if let Some(id) = parts.extensions.get::<Uuid>() {
            return Ok(Self(*id));
        }

        let correlation_id = parts
            .headers
            .get("X-Correlation-ID")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// JWT claims issued by the external auth system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: String,
    /// User's email address.
    pub email: String,
    /// Whether the user holds the admin role.
    #[serde(default)]
    pub admin: bool,
    /// Expiry, seconds since the epoch.
    pub exp: usize,
}

/// Shared JWT verifier, installed into the router as an extension.
///
/// Auth itself (signup, login, token issuance) is an external system;
/// this is the minimal interface the booking core consumes: HS256
/// verification against `JWT_SECRET`.
#[derive(Clone)]
pub struct JwtDecoder {
    key: Arc<DecodingKey>,
    validation: Validation,
}

impl JwtDecoder {
    /// Create a decoder from the shared signing secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns an unauthorized [`AppError`] for expired, malformed or
    /// wrongly-signed tokens.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::unauthorized("invalid or expired token"))
    }
}

/// The authenticated caller.
///
/// Use as a handler parameter to require authentication; rejects with
/// 401 when the bearer token is missing or invalid.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Authenticated user id.
    pub user_id: UserId,
    /// Email from the token claims, used for notifications.
    pub email: String,
    /// Admin role flag.
    pub is_admin: bool,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let decoder = parts
            .extensions
            .get::<JwtDecoder>()
            .cloned()
            .ok_or_else(|| AppError::internal("JWT decoder not installed"))?;

        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("expected 'Bearer <token>'"))?;

        if token.is_empty() {
            return Err(AppError::unauthorized("empty bearer token"));
        }

        let claims = decoder.decode(token)?;
        let user_id = UserId::parse(&claims.sub)
            .map_err(|_| AppError::unauthorized("malformed subject claim"))?;

        Ok(Self {
            user_id,
            email: claims.email,
            is_admin: claims.admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("encodable claims")
    }

    fn parts_with(headers: &[(&str, String)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, value);
        }
        let (mut parts, ()) = builder.body(()).expect("valid request").into_parts();
        parts.extensions.insert(JwtDecoder::new("test-secret"));
        parts
    }

    fn valid_claims() -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            email: "fan@example.com".to_string(),
            admin: false,
            exp: usize::try_from(chrono::Utc::now().timestamp() + 3600).unwrap(),
        }
    }

    #[tokio::test]
    async fn auth_user_accepts_valid_token() {
        let claims = valid_claims();
        let token = token_for(&claims, "test-secret");
        let mut parts = parts_with(&[("authorization", format!("Bearer {token}"))]);

        let user = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect("valid token accepted");
        assert_eq!(user.user_id.to_string(), claims.sub);
        assert_eq!(user.email, "fan@example.com");
        assert!(!user.is_admin);
    }

    #[tokio::test]
    async fn auth_user_rejects_wrong_secret() {
        let token = token_for(&valid_claims(), "other-secret");
        let mut parts = parts_with(&[("authorization", format!("Bearer {token}"))]);

        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("wrong signature rejected");
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_user_rejects_expired_token() {
        let mut claims = valid_claims();
        claims.exp = 1_000_000; // long past
        let token = token_for(&claims, "test-secret");
        let mut parts = parts_with(&[("authorization", format!("Bearer {token}"))]);

        assert!(AuthUser::from_request_parts(&mut parts, &()).await.is_err());
    }

    #[tokio::test]
    async fn auth_user_rejects_missing_header() {
        let mut parts = parts_with(&[]);
        let err = AuthUser::from_request_parts(&mut parts, &())
            .await
            .expect_err("missing header rejected");
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn correlation_id_prefers_header() {
        let id = Uuid::new_v4();
        let mut parts = parts_with(&[("X-Correlation-ID", id.to_string())]);
        let extracted = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_eq!(extracted.0, id);
    }

    #[tokio::test]
    async fn correlation_id_generated_when_absent() {
        let mut parts = parts_with(&[]);
        let extracted = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("infallible");
        assert_ne!(extracted.0, Uuid::nil());
    }
}
