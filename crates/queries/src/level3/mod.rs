//! Level 3: transactions, soft deletes and lifecycle changes

pub mod tx_lifecycle;

pub use tx_lifecycle::{
    cancel_subscription, complete_exchange, create_subscription, get_book_unscoped, purge_book,
    report_user, soft_delete_book, CompletedExchange, ExchangeRatings, RatingInput,
    ReportOutcome, SoftDeleteReport, SubscriptionReceipt, UserReport,
};
