//! Bearer-token authentication.
//!
//! Sessions are issued by the platform's identity service, which signs HS256 JWTs with the shared secret in
//! [`AuthConfig`]. This server only validates them. The subject (`sub`) is the courier id for couriers, and the
//! operator id for operators.
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use cod_ledger_engine::db_types::{CourierId, OperatorId, Role};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub roles: Vec<Role>,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(subject: i64, roles: Vec<Role>, lifetime: Duration) -> Self {
        Self { sub: subject.to_string(), roles, exp: (Utc::now() + lifetime).timestamp() }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    fn subject(&self) -> Result<i64, AuthError> {
        self.sub.parse::<i64>().map_err(|e| AuthError::ValidationError(format!("Invalid subject '{}'. {e}", self.sub)))
    }

    /// The calling courier. Only meaningful on routes that require [`Role::Courier`].
    pub fn courier_id(&self) -> Result<CourierId, AuthError> {
        self.subject().map(CourierId)
    }

    /// The calling operator. Only meaningful on routes that require [`Role::Operator`].
    pub fn operator_id(&self) -> Result<OperatorId, AuthError> {
        self.subject().map(OperatorId)
    }
}

/// Claims are placed in the request extensions by [`crate::middleware::JwtAuthFactory`].
impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned();
        ready(claims.ok_or(ServerError::AuthenticationError(AuthError::MissingToken)))
    }
}

#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig) -> Self {
        let key = DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        Self { key, validation }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::PoorlyFormattedToken(e.to_string())
            },
            _ => AuthError::ValidationError(e.to_string()),
        })?;
        let claims = data.claims;
        claims.subject()?;
        debug!("Access token validated for {} with roles {:?}", claims.sub, claims.roles);
        Ok(claims)
    }
}

/// Signs access tokens with the shared secret, the way the identity service does.
#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let key = EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes());
        Self { key, lifetime: config.token_lifetime }
    }

    pub fn issue_token(&self, subject: i64, roles: Vec<Role>) -> Result<String, AuthError> {
        self.sign(&JwtClaims::new(subject, roles, self.lifetime))
    }

    pub fn sign(&self, claims: &JwtClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key).map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}
