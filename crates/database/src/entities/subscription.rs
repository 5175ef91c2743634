//! Subscription plans, subscriptions and their payments

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use sqlx::{types::Json, FromRow};

use super::user::User;

text_enum! {
    /// Billing period of a plan
    pub enum BillingInterval {
        Month => "month",
        ThreeMonths => "3_month",
        Year => "year",
    }
}

impl BillingInterval {
    pub fn months(&self) -> u32 {
        match self {
            BillingInterval::Month => 1,
            BillingInterval::ThreeMonths => 3,
            BillingInterval::Year => 12,
        }
    }

    /// End of a billing period starting at `start`.
    ///
    /// Month arithmetic clamps to the last day of shorter months.
    ///
    /// ```
    /// use bookswap_database::BillingInterval;
    /// use chrono::{TimeZone, Utc};
    ///
    /// let start = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
    /// let end = BillingInterval::Month.period_end(start).unwrap();
    /// assert_eq!(end, Utc.with_ymd_and_hms(2025, 2, 28, 12, 0, 0).unwrap());
    /// ```
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        start.checked_add_months(Months::new(self.months()))
    }
}

text_enum! {
    pub enum SubscriptionStatus {
        Active => "active",
        PastDue => "past_due",
        Canceled => "canceled",
        Trialing => "trialing",
        Expired => "expired",
    }
}

text_enum! {
    pub enum PaymentStatus {
        Pending => "pending",
        Succeeded => "succeeded",
        Failed => "failed",
        Refunded => "refunded",
        Canceled => "canceled",
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub interval: BillingInterval,
    pub features: Option<Json<serde_json::Value>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub plan_id: Option<i64>,
    pub provider_subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<SubscriptionPlan>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub subscription_id: i64,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub metadata: Option<Json<serde_json::Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}
