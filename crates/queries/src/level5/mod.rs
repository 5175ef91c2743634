//! Level 5: aggregations and rankings

pub mod aggregate_advanced;

pub use aggregate_advanced::{
    get_exchange_status_breakdown, get_top5_users_by_books_owned, get_top_rated_users,
    get_top_users_by_books_owned, StatusCount, UserBookTotal, UserRatingSummary,
};
