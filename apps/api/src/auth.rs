//! JWT authentication module.
//!
//! Tokens are issued elsewhere; this module validates them and turns their
//! claims into the [`RequestContext`] every handler works with.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use mercantil_core::{RequestContext, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::AppState;

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (employee id)
    pub sub: String,

    /// Caller role
    pub role: Role,

    /// Branch the employee works at
    pub branch_id: String,

    /// Department the employee belongs to
    #[serde(default)]
    pub department_id: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,
}

impl From<Claims> for RequestContext {
    fn from(claims: Claims) -> Self {
        RequestContext {
            employee_id: claims.sub,
            role: claims.role,
            branch_id: claims.branch_id,
            department_id: claims.department_id,
        }
    }
}

/// JWT token manager.
pub struct JwtManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for JwtManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtManager").finish_non_exhaustive()
    }
}

impl JwtManager {
    /// Create a new JWT manager.
    pub fn new(secret: &str) -> Self {
        JwtManager {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Signs a token for `ctx`, valid for `lifetime_secs`.
    ///
    /// Used by tooling and tests; the production issuer lives outside this
    /// service.
    pub fn issue(&self, ctx: &RequestContext, lifetime_secs: i64) -> Result<String, ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(lifetime_secs);

        let claims = Claims {
            sub: ctx.employee_id.clone(),
            role: ctx.role,
            branch_id: ctx.branch_id.clone(),
            department_id: ctx.department_id.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(|e| {
            ApiError::internal(
                crate::error::ErrorCode::Internal,
                "Failed to generate token",
                e.to_string(),
            )
        })
    }

    /// Validate and decode a token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ApiError> {
        let token_data: TokenData<Claims> = decode(token, &self.decoding, &Validation::default())
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The authenticated caller of a request.
///
/// Usage in handlers: `async fn handler(Caller(ctx): Caller) -> Response`
#[derive(Debug, Clone)]
pub struct Caller(pub RequestContext);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| ApiError::unauthorized("Missing bearer token"))?;

        let claims = state.jwt.validate_token(token)?;
        tracing::debug!(employee_id = %claims.sub, role = ?claims.role, "Caller authenticated");

        Ok(Caller(claims.into()))
    }
}
