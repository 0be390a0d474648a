//! Authentication service.
//!
//! Owns password hashing (argon2id) and the HS256 bearer tokens that are the
//! API's sole credential mechanism. There is no refresh or rotation endpoint;
//! tokens expire after [`TOKEN_TTL_DAYS`] days and clients log in again.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use bazaar_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Bearer token lifetime in days.
pub const TOKEN_TTL_DAYS: i64 = 30;

/// JWT claims: the user id and the standard expiry/issue times.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    exp: i64,
    iat: i64,
}

/// Authentication service.
///
/// Handles user registration, login, and bearer-token verification.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    jwt_secret: &'a SecretString,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt_secret: &'a SecretString) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt_secret,
        }
    }

    /// Register a new user and mint their first token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(name, &email, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = issue_token(self.jwt_secret, user.id)?;
        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = issue_token(self.jwt_secret, user.id)?;
        Ok((user, token))
    }

    /// Resolve a bearer token to a live user record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if the token is malformed, expired, or has
    /// a bad signature. Returns `AuthError::UserNotFound` if the embedded id
    /// no longer resolves to a user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let user_id = verify_token(self.jwt_secret, token)?;

        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Mint a signed bearer token for a user.
///
/// # Errors
///
/// Returns `AuthError::TokenCreation` if encoding fails.
pub fn issue_token(secret: &SecretString, user_id: UserId) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.as_i32(),
        iat: now.timestamp(),
        exp: (now + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|_| AuthError::TokenCreation)
}

/// Verify a bearer token's signature and expiry, returning the user id.
///
/// # Errors
///
/// Returns `AuthError::Token` for malformed, forged, or expired tokens.
pub fn verify_token(secret: &SecretString, token: &str) -> Result<UserId, AuthError> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )?;

    Ok(UserId::new(data.claims.sub))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("kX9#mP2$vL8@qR4!wN7&zT1*eH5^cJ3%")
    }

    #[test]
    fn test_token_roundtrip() {
        let secret = secret();
        let token = issue_token(&secret, UserId::new(42)).unwrap();
        let user_id = verify_token(&secret, &token).unwrap();
        assert_eq!(user_id, UserId::new(42));
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = issue_token(&secret(), UserId::new(1)).unwrap();
        let other = SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6!");
        assert!(matches!(
            verify_token(&other, &token),
            Err(AuthError::Token(_))
        ));
    }

    #[test]
    fn test_token_rejected_when_malformed() {
        assert!(matches!(
            verify_token(&secret(), "not-a-jwt"),
            Err(AuthError::Token(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Mint a token whose expiry is already in the past
        let now = Utc::now();
        let claims = Claims {
            sub: 1,
            iat: (now - chrono::Duration::days(2)).timestamp(),
            exp: (now - chrono::Duration::days(1)).timestamp(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret().expose_secret().as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            verify_token(&secret(), &token),
            Err(AuthError::Token(_))
        ));
    }

    #[test]
    fn test_validate_password_too_short() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_validate_password_ok() {
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a, b);
    }
}
