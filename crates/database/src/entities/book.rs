//! Book catalogue entities

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

use super::user::User;

text_enum! {
    /// Physical condition of a listed book
    pub enum BookCondition {
        New => "new",
        LikeNew => "like_new",
        Good => "good",
        Acceptable => "acceptable",
    }
}

impl Default for BookCondition {
    fn default() -> Self {
        BookCondition::Good
    }
}

text_enum! {
    /// Language a book is written in
    pub enum Language {
        English => "EN",
        French => "FR",
        German => "DE",
        Spanish => "ES",
        Italian => "IT",
        Portuguese => "PT",
        Japanese => "JA",
        Chinese => "ZH",
        Hindi => "HI",
        Arabic => "AR",
        Amharic => "AM",
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Genre {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A book listed for exchange by its owner
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Book {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub author_id: Option<i64>,
    pub isbn: Option<String>,
    pub description: Option<String>,
    pub language: Language,
    pub condition: BookCondition,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
    pub location_city: Option<String>,
    pub location_state: Option<String>,
    pub location_country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub active: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub preferred_titles: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Box<User>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<Genre>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<BookImage>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<BookReview>,
}


#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookImage {
    pub id: i64,
    pub book_id: i64,
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub is_primary: bool,
    pub uploaded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookReview {
    pub id: i64,
    pub book_id: i64,
    pub reviewer_id: i64,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
