//! Reports, moderation actions and user notifications

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

text_enum! {
    pub enum NotificationType {
        ExchangeRequestReceived => "exchange_request_received",
        ExchangeRequestAccepted => "exchange_request_accepted",
        ExchangeRequestDeclined => "exchange_request_declined",
        ExchangeShipped => "exchange_shipped",
        ExchangeDelivered => "exchange_delivered",
        ExchangeCompleted => "exchange_completed",
        NewMessageInExchange => "new_message_in_exchange",
        NewCommunityMessage => "new_community_message",
        BookReviewReceived => "book_review_received",
        SubscriptionExpiringSoon => "subscription_expiring_soon",
        SubscriptionRenewed => "subscription_renewed",
        GeneralAnnouncement => "general_announcement",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub reason: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub handled_by: Option<i64>,
    pub handled_at: Option<DateTime<Utc>>,
    pub resolution: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ModerationAction {
    pub id: i64,
    pub target_type: String,
    pub target_id: i64,
    pub action: String,
    pub performed_by: Option<i64>,
    pub performed_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub payload: Option<Json<serde_json::Value>>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
