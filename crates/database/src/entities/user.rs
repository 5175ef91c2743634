//! User entity definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::book::Genre;

text_enum! {
    /// Account role
    pub enum Role {
        User => "user",
        Admin => "admin",
        Moderator => "moderator",
        System => "system",
    }
}

/// User entity representing an account on the exchange platform
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub phone_verified_at: Option<DateTime<Utc>>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub role: Role,
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preferred_genres: Vec<Genre>,
}

/// 1:1 extension of a user
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// WKT point, e.g. `POINT(-122.41 37.77)`
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub country_id: Option<i64>,
    pub state_id: Option<i64>,
    pub city_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
