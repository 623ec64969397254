//! HS256 JWT token service.

use super::{AuthError, TokenService};
use crate::config::AuthConfig;
use crate::models::{Principal, Role};
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Principal id as a string
    pub sub: String,
    pub role: Role,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Clone)]
pub struct JwtTokenService {
    issuer: String,
    expiry: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("issuer", &self.issuer)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl JwtTokenService {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::ConfigurationError(
                "JWT secret not configured".to_string(),
            ));
        }

        Ok(Self {
            issuer: config.jwt_issuer.clone(),
            expiry: Duration::minutes(config.token_expiry_minutes as i64),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        })
    }

    /// Mint a token for `principal`, as a login flow would
    pub fn issue_token(&self, principal: &Principal) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: principal.id.to_string(),
            role: principal.role,
            iss: self.issuer.clone(),
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(format!("failed to sign token: {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => {
                    warn!(error = %e, "JWT validation failed");
                    AuthError::InvalidToken(e.to_string())
                }
            })
    }
}

impl TokenService for JwtTokenService {
    fn resolve(&self, bearer_token: &str) -> Result<Principal, AuthError> {
        let claims = self.validate(bearer_token)?;
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidToken(format!("non-numeric subject '{}'", claims.sub)))?;

        debug!(principal_id = id, role = %claims.role, "Principal resolved");
        Ok(Principal::new(id, claims.role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(expiry_minutes: u64) -> JwtTokenService {
        JwtTokenService::from_config(&AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "tasktrack".to_string(),
            token_expiry_minutes: expiry_minutes,
        })
        .unwrap()
    }

    #[test]
    fn test_issue_then_resolve() {
        let svc = service(30);
        let token = svc.issue_token(&Principal::admin(42)).unwrap();
        assert_eq!(svc.resolve(&token).unwrap(), Principal::admin(42));
    }

    #[test]
    fn test_expired_token_rejected() {
        let svc = service(0);
        let token = svc.issue_token(&Principal::user(1)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(matches!(svc.resolve(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let token = service(30).issue_token(&Principal::user(1)).unwrap();
        let other = JwtTokenService::from_config(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            ..AuthConfig::default()
        })
        .unwrap();
        assert!(matches!(other.resolve(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn test_missing_secret_is_configuration_error() {
        assert!(matches!(
            JwtTokenService::from_config(&AuthConfig::default()),
            Err(AuthError::ConfigurationError(_))
        ));
    }
}
