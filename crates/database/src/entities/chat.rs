//! Per-exchange chat threads

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

use super::user::User;

text_enum! {
    pub enum MessageKind {
        Text => "text",
        Image => "image",
        File => "file",
        System => "system",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ChatThread {
    pub id: i64,
    pub exchange_id: i64,
    pub created_by: i64,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<User>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub thread_id: i64,
    pub sender_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub body: String,
    /// JSON array of attachment URLs
    pub attachments: Option<Json<serde_json::Value>>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<User>,
}
