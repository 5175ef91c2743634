//! Level 2: querying and filtering

pub mod query_filter;

pub use query_filter::{
    get_active_subscriptions_with_plan, get_books_available_between, get_books_with_avg_review,
    get_exchanges_by_status, get_thread_messages_sorted, get_users_inactive_for_over_a_month,
    get_users_with_book_count, get_users_with_expired_subscription, BookReviewStats,
    UserBookCount,
};
