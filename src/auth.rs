//! Bearer-token authentication. Tokens are opaque random strings stored in
//! the `api_tokens` table; passwords are Argon2id PHC hashes.

use actix_web::{HttpRequest, HttpResponse};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{ApiResponse, User, UserType};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Invalid or revoked token")]
    InvalidToken,
    #[error("Account is suspended")]
    Suspended,
    #[error("{0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    pub fn to_response(&self) -> HttpResponse {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => {
                HttpResponse::Unauthorized().json(ApiResponse::<()>::error(self.to_string()))
            }
            AuthError::Suspended | AuthError::Forbidden(_) => {
                HttpResponse::Forbidden().json(ApiResponse::<()>::error(self.to_string()))
            }
            AuthError::Database(err) => {
                log::error!("Auth lookup failed: {err:?}");
                HttpResponse::InternalServerError()
                    .json(ApiResponse::<()>::error("Authentication failed".into()))
            }
        }
    }
}

/// New opaque bearer token (64 hex characters)
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Hash a password using Argon2id. Returns a PHC-format string.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a PHC-format hash string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Resolve the caller from the `Authorization: Bearer` header.
pub async fn authenticate(req: &HttpRequest, db: &Database) -> Result<User, AuthError> {
    let token = bearer_token(req)?;
    let user = db
        .get_user_by_token(token)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    if user.suspended {
        return Err(AuthError::Suspended);
    }
    Ok(user)
}

/// Resolve the caller and check their account type in one step.
pub async fn authenticate_as(
    req: &HttpRequest,
    db: &Database,
    allowed: &[UserType],
) -> Result<User, AuthError> {
    let user = authenticate(req, db).await?;
    require_account_type(&user, allowed)?;
    Ok(user)
}

pub fn require_account_type(user: &User, allowed: &[UserType]) -> Result<(), AuthError> {
    if allowed.contains(&user.user_type) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(
            "Insufficient permissions for this resource",
        ))
    }
}

/// The token presented on the current request, for logout.
pub fn presented_token(req: &HttpRequest) -> Result<String, AuthError> {
    bearer_token(req).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn tokens_are_opaque_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn account_type_gate() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: "Sam".into(),
            email: "sam@example.com".into(),
            password_hash: String::new(),
            user_type: UserType::Partner,
            suspended: false,
            created_at: now,
            updated_at: now,
        };

        assert!(require_account_type(&user, &[UserType::Partner, UserType::Admin]).is_ok());
        assert!(require_account_type(&user, &[UserType::Admin]).is_err());
    }
}
