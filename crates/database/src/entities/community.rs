//! Community group chat aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::user::User;

text_enum! {
    pub enum CommunityRole {
        Member => "member",
        Admin => "admin",
        Moderator => "moderator",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub creator_id: i64,
    pub require_paid_chat: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<CommunityMember>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunityMember {
    pub id: i64,
    pub community_id: i64,
    pub user_id: i64,
    pub community_role: CommunityRole,
    pub joined_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunityThread {
    pub id: i64,
    pub community_id: i64,
    pub created_by: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<CommunityMessage>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CommunityMessage {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
}
