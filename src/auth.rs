//! Bearer-token authentication.
//!
//! Account management lives with the external auth provider; this module only
//! validates the JWTs it issues and exposes the authenticated user to
//! handlers for ownership checks.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    /// Check if the user has a specific role
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Check if the user is an admin
    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

/// Validates bearer tokens and (for tests and tooling) issues them.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a token for a user id. Used by tests and operational tooling;
    /// production tokens come from the auth provider sharing the same secret.
    pub fn issue_token(&self, user_id: Uuid, roles: Vec<String>) -> Result<String, ServiceError> {
        let now = Utc::now();
        let exp = now
            + chrono::Duration::from_std(self.config.access_token_expiration)
                .map_err(|_| ServiceError::InternalError("invalid token duration".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            email: None,
            name: None,
            roles,
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::AuthError(format!("failed to issue token: {}", e)))
    }

    /// Validates a bearer token and returns its claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

        Ok(data.claims)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The auth service is injected into request extensions by a layer in main.rs
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| {
                ServiceError::InternalError("authentication service not available".to_string())
            })?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing Authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| ServiceError::Unauthorized("expected bearer token".to_string()))?;

        let claims = auth_service.validate_token(token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("token subject is not a user id".to_string()))?;

        Ok(AuthUser {
            user_id,
            email: claims.email,
            name: claims.name,
            roles: claims.roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "herbloom-api".to_string(),
            "herbloom-storefront".to_string(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn issued_token_round_trips() {
        let svc = service();
        let user_id = Uuid::new_v4();
        let token = svc.issue_token(user_id, vec!["admin".to_string()]).unwrap();

        let claims = svc.validate_token(&token).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.roles, vec!["admin".to_string()]);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let svc = service();
        let token = svc.issue_token(Uuid::new_v4(), vec![]).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('x');

        assert!(svc.validate_token(&tampered).is_err());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let svc = service();
        let other = AuthService::new(AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            "herbloom-api".to_string(),
            "someone-else".to_string(),
            Duration::from_secs(3600),
        ));
        let token = other.issue_token(Uuid::new_v4(), vec![]).unwrap();
        assert!(svc.validate_token(&token).is_err());
    }
}
