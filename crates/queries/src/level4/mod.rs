//! Level 4: relations across chat, communities and exchanges

pub mod relation_domain;

pub use relation_domain::{
    get_books_of_user_in_completed_exchanges, get_chat_threads_of_exchange,
    get_community_threads, get_exchanges_of_user, get_paid_communities,
    get_users_in_at_least_n_communities, UserCommunityCount,
};
