//! Domain entities for the database layer
//!
//! Every entity maps one table row through `sqlx::FromRow`. Related rows are
//! not part of the table; they are attached after the fact by the eager-load
//! helpers and skipped when empty on serialisation.

/// Declares a string-backed enum stored as TEXT.
///
/// The generated type round-trips through serde and sqlx using the given
/// wire names and exposes `ALL`, `as_str`, `Display` and `FromStr`.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:tt ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde::Serialize,
            serde::Deserialize,
            sqlx::Type,
        )]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                #[sqlx(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::types::DatabaseError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::types::DatabaseError::ValidationError(format!(
                        "invalid {} value: {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

pub mod activity;
pub mod book;
pub mod chat;
pub mod community;
pub mod exchange;
pub mod location;
pub mod moderation;
pub mod subscription;
pub mod user;

pub use activity::{ActivityAction, ActivityLog, MessageQuotaUsage};
pub use book::{Author, Book, BookCondition, BookImage, BookReview, Genre, Language};
pub use chat::{ChatThread, Message, MessageKind};
pub use community::{Community, CommunityMember, CommunityMessage, CommunityRole, CommunityThread};
pub use exchange::{Exchange, ExchangeStatus, UserRating};
pub use location::{City, Country, State};
pub use moderation::{ModerationAction, Notification, NotificationType, Report};
pub use subscription::{
    BillingInterval, Payment, PaymentStatus, Subscription, SubscriptionPlan, SubscriptionStatus,
};
pub use user::{Role, User, UserProfile};

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn enum_names_round_trip_through_from_str() {
        for status in ExchangeStatus::ALL {
            assert_eq!(ExchangeStatus::from_str(status.as_str()).unwrap(), *status);
        }
        for interval in BillingInterval::ALL {
            assert_eq!(BillingInterval::from_str(interval.as_str()).unwrap(), *interval);
        }
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let error = BookCondition::from_str("mint").unwrap_err();
        assert!(error.to_string().contains("BookCondition"));
    }

    #[test]
    fn enums_serialise_with_wire_names() {
        let json = serde_json::to_string(&BillingInterval::ThreeMonths).unwrap();
        assert_eq!(json, "\"3_month\"");
        let json = serde_json::to_string(&ExchangeStatus::InTransit).unwrap();
        assert_eq!(json, "\"in_transit\"");
        assert_eq!(Language::Amharic.to_string(), "AM");
    }

    #[test]
    fn exchange_status_has_ten_values() {
        assert_eq!(ExchangeStatus::ALL.len(), 10);
        assert_eq!(NotificationType::ALL.len(), 12);
    }
}
