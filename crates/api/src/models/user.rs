//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bazaar_core::{Email, UserId};

/// A registered user.
///
/// The password hash lives only in the `users` table and is never part of
/// this struct, so it cannot leak through any response serialization.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub is_admin: bool,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}
