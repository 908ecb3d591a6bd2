//! # Access Gate
//!
//! JWT authentication and role gating for the API surface.
//!
//! Handlers declare their access requirement through the extractor they
//! take: [`AuthUser`] admits any authenticated role, [`CoordinatorUser`]
//! admits coordinators only. The role vocabulary is the closed enum from
//! `coachlink-core` — there are no string comparisons in handlers.
//!
//! Tokens are HS256 JWTs carrying `{sub, role, iat, exp}`. The extractor
//! accepts the token from the `Authorization: Bearer …` header or, for
//! EventSource clients that cannot set headers, from the `token` query
//! parameter. Missing, malformed, and expired tokens are all rejected
//! with 401 before any handler logic runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Utc;
use coachlink_core::Role;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::AppError;
use crate::state::AppState;

/// JWT claim set for access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Username the token was issued to.
    pub sub: String,
    /// Role at issuance time.
    pub role: Role,
    /// Issued-at (seconds since epoch).
    pub iat: i64,
    /// Expiry (seconds since epoch).
    pub exp: i64,
}

/// Sign a token for the given identity with the configured expiry.
pub fn mint_token(config: &AppConfig, username: &str, role: Role) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        role,
        iat: now,
        exp: now + config.token_expiry.as_secs() as i64,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
}

/// Verify a token and return its claims.
///
/// Expired tokens and tokens with bad signatures are distinguished in the
/// message but both map to 401.
pub fn verify_token(config: &AppConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Unauthorized("Token expired".to_string())
        }
        _ => AppError::Unauthorized("Invalid token".to_string()),
    })
}

/// Pull the raw token from the Authorization header or the `token` query
/// parameter. Header wins when both are present.
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get(AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    // Tokens are base64url — no percent-decoding needed here.
    parts.uri.query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("token=")
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
    })
}

/// An authenticated caller of either role.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
    pub role: Role,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)
            .ok_or_else(|| AppError::Unauthorized("No token provided".to_string()))?;
        let claims = verify_token(&state.config, &token)?;
        Ok(AuthUser {
            username: claims.sub,
            role: claims.role,
        })
    }
}

/// An authenticated caller holding the coordinator role.
#[derive(Debug, Clone)]
pub struct CoordinatorUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<AppState> for CoordinatorUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_mutate() {
            return Err(AppError::Forbidden(
                "Coordinator access required".to_string(),
            ));
        }
        Ok(CoordinatorUser(user))
    }
}

// ---------------------------------------------------------------------------
// Password hashing
// ---------------------------------------------------------------------------

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against a stored PHC hash string.
///
/// An unparseable stored hash counts as a mismatch — it is a server-side
/// data problem, but the caller only learns "invalid credentials".
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is unparseable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn config() -> AppConfig {
        AppConfig::for_tests("test-secret")
    }

    fn parts_for(uri: &str, auth_header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = auth_header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn mint_and_verify_round_trip() {
        let config = config();
        let token = mint_token(&config, "coordinator", Role::Coordinator).unwrap();
        let claims = verify_token(&config, &token).unwrap();
        assert_eq!(claims.sub, "coordinator");
        assert_eq!(claims.role, Role::Coordinator);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_token(&config(), "coordinator", Role::Coordinator).unwrap();
        let other = AppConfig::for_tests("different-secret");
        let err = verify_token(&other, &token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let config = config();
        // A token that expired an hour ago. Validation's default leeway
        // is 60 seconds, well below this.
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "coordinator".to_string(),
            role: Role::Coordinator,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();
        let err = verify_token(&config, &token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn token_extracted_from_bearer_header() {
        let parts = parts_for("/api/requests", Some("Bearer abc.def.ghi"));
        assert_eq!(token_from_parts(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn token_extracted_from_query_parameter() {
        let parts = parts_for("/api/events/requests?token=abc.def.ghi", None);
        assert_eq!(token_from_parts(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn header_wins_over_query() {
        let parts = parts_for("/api/events/requests?token=from-query", Some("Bearer from-header"));
        assert_eq!(token_from_parts(&parts).as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_token_is_none() {
        let parts = parts_for("/api/requests?page=1", None);
        assert!(token_from_parts(&parts).is_none());
        let parts = parts_for("/api/requests", Some("Basic dXNlcg=="));
        assert!(token_from_parts(&parts).is_none());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
        assert!(!verify_password("anything", "not-a-phc-hash"));
    }
}
