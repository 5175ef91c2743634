//! Audit trail and usage counters

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

text_enum! {
    pub enum ActivityAction {
        Create => "create",
        Update => "update",
        Delete => "delete",
        Login => "login",
        Logout => "logout",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: ActivityAction,
    pub object_type: Option<String>,
    pub object_id: Option<i64>,
    pub payload: Option<Json<serde_json::Value>>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Messages sent by one user within one calendar period
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MessageQuotaUsage {
    pub id: i64,
    pub user_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub messages_sent: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
