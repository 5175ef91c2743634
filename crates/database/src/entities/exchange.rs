//! Exchanges between two users and the ratings they leave afterwards

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

use super::{book::Book, user::User};

text_enum! {
    /// Lifecycle of an exchange.
    ///
    /// No transition table is enforced; any status may follow any other.
    pub enum ExchangeStatus {
        Requested => "requested",
        Accepted => "accepted",
        Declined => "declined",
        Shipped => "shipped",
        InTransit => "in_transit",
        Delivered => "delivered",
        Completed => "completed",
        Canceled => "canceled",
        Disputed => "disputed",
        Archived => "archived",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Exchange {
    pub id: i64,
    pub requester_id: i64,
    pub responder_id: Option<i64>,
    pub requester_book_id: Option<i64>,
    pub responder_book_id: Option<i64>,
    pub status: ExchangeStatus,
    pub requested_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,
    pub agreed_start_date: Option<DateTime<Utc>>,
    pub agreed_end_date: Option<DateTime<Utc>>,
    pub shipping_required: bool,
    pub shipping_provider: Option<String>,
    pub shipping_tracking_number: Option<String>,
    pub shipping_cost_cents: i64,
    pub shipping_payer_user_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub dispute_reason: Option<String>,
    pub dispute_opened_at: Option<DateTime<Utc>>,
    pub archived: bool,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester: Option<Box<User>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder: Option<Box<User>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requester_book: Option<Box<Book>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responder_book: Option<Box<Book>>,
}

impl Exchange {
    /// Ids of both books taking part, skipping the ones that were removed.
    pub fn book_ids(&self) -> Vec<i64> {
        self.requester_book_id
            .into_iter()
            .chain(self.responder_book_id)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRating {
    pub id: i64,
    pub rater_id: i64,
    pub rated_user_id: i64,
    pub exchange_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
