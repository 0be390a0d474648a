//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli admin create -e admin@example.com -n "Admin Name" -p "a strong password"
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use sqlx::PgPool;
use thiserror::Error;

use bazaar_api::services::auth::hash_password;
use bazaar_core::Email;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// Password hashing failed.
    #[error("Password hashing failed")]
    PasswordHash,
}

/// Create a new admin user, or promote an existing account to admin.
///
/// # Returns
///
/// The ID of the created or promoted user.
///
/// # Errors
///
/// Returns `AdminError` if the email is invalid, hashing fails, or the
/// database is unreachable.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<i32, AdminError> {
    dotenvy::dotenv().ok();

    let email = Email::parse(email)?;
    let password_hash = hash_password(password).map_err(|_| AdminError::PasswordHash)?;

    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Creating admin user: {}", email);

    let existing: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    let user_id = if let Some(id) = existing {
        sqlx::query("UPDATE users SET is_admin = TRUE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&pool)
            .await?;
        tracing::info!("Existing user promoted to admin. ID: {}", id);
        id
    } else {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash, is_admin)
             VALUES ($1, $2, $3, TRUE)
             RETURNING id",
        )
        .bind(name)
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&pool)
        .await?;
        tracing::info!("Admin user created successfully! ID: {}, Email: {}", id, email);
        id
    };

    Ok(user_id)
}

fn database_url() -> Result<String, AdminError> {
    std::env::var("BAZAAR_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| AdminError::MissingEnvVar("BAZAAR_DATABASE_URL"))
}
