//! Named, runnable examples.
//!
//! Each [`Example`] wraps one query function with the parameters it is run
//! with. Parameters that identify seeded rows come from [`ExamplesConfig`];
//! payloads for writes are fixed here.

use std::fmt;
use std::str::FromStr;

use bookswap_config::ExamplesConfig;
use bookswap_database::{BillingInterval, BookCondition, ExchangeStatus};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};

use crate::error::QueryResult;
use crate::level1::{self, LocationFilter, NewBook, NewImage, NewPlan, NewUser, ProfileUpdate};
use crate::level2;
use crate::level3::{self, ExchangeRatings, RatingInput, UserReport};
use crate::level4;
use crate::level5;
use crate::output::pretty_print;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown example: {0}")]
pub struct UnknownExample(pub String);

macro_rules! examples {
    ( $( $variant:ident => ($name:literal, $level:literal) ),+ $(,)? ) => {
        /// Every runnable example.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Example {
            $( $variant, )+
        }

        impl Example {
            pub const ALL: &'static [Example] = &[$(Example::$variant),+];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Example::$variant => $name, )+
                }
            }

            pub fn level(&self) -> u8 {
                match self {
                    $( Example::$variant => $level, )+
                }
            }
        }

        impl FromStr for Example {
            type Err = UnknownExample;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $( $name => Ok(Example::$variant), )+
                    other => Err(UnknownExample(other.to_string())),
                }
            }
        }
    };
}

examples! {
    CreateUser => ("create-user", 1),
    GetUserByEmail => ("get-user-by-email", 1),
    UpdateUserProfile => ("update-user-profile", 1),
    DeleteUser => ("delete-user", 1),
    CreateAuthor => ("create-author", 1),
    CreateBook => ("create-book", 1),
    GetBooksOfUser => ("get-books-of-user", 1),
    GetBooksOfUserFlat => ("get-books-of-user-flat", 1),
    GetBooksOfUserWithGenreStr => ("get-books-of-user-with-genre-str", 1),
    GetBookById => ("get-book-by-id", 1),
    GetUsersByPreferredGenres => ("get-users-by-preferred-genres", 1),
    CreateSubscriptionPlan => ("create-subscription-plan", 1),
    GetFirstUserSummary => ("get-first-user-summary", 1),
    CreateUserWithGenres => ("create-user-with-genres", 1),
    CreateBookWithImages => ("create-book-with-images", 1),
    GetLikeNewBooksOfAuthor => ("get-like-new-books-of-author", 1),
    GetBooksByCity => ("get-books-by-city", 1),
    GetBooksByCountry => ("get-books-by-country", 1),
    GetGenresOfBook => ("get-genres-of-book", 1),
    AssignGenresToBook => ("assign-genres-to-book", 1),
    GetBooksAvailableBetween => ("get-books-available-between", 2),
    GetActiveSubscriptionsWithPlan => ("get-active-subscriptions-with-plan", 2),
    GetUsersWithExpiredSubscription => ("get-users-with-expired-subscription", 2),
    GetUsersWithBookCount => ("get-users-with-book-count", 2),
    GetBooksWithAvgReview => ("get-books-with-avg-review", 2),
    GetRequestedExchanges => ("get-requested-exchanges", 2),
    GetThreadMessagesSorted => ("get-thread-messages-sorted", 2),
    GetInactiveUsers => ("get-inactive-users", 2),
    CreateSubscription => ("create-subscription", 3),
    SoftDeleteBook => ("soft-delete-book", 3),
    GetBookUnscoped => ("get-book-unscoped", 3),
    PurgeBook => ("purge-book", 3),
    CompleteExchange => ("complete-exchange", 3),
    CancelSubscription => ("cancel-subscription", 3),
    ReportUser => ("report-user", 3),
    GetChatThreadsOfExchange => ("get-chat-threads-of-exchange", 4),
    GetCommunityThreads => ("get-community-threads", 4),
    GetUsersInCommunities => ("get-users-in-communities", 4),
    GetPaidCommunities => ("get-paid-communities", 4),
    GetExchangesOfUser => ("get-exchanges-of-user", 4),
    GetBooksInCompletedExchanges => ("get-books-in-completed-exchanges", 4),
    Top5UsersByBooksOwned => ("top5-users-by-books-owned", 5),
    ExchangeStatusBreakdown => ("exchange-status-breakdown", 5),
    TopRatedUsers => ("top-rated-users", 5),
}

impl fmt::Display for Example {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn amanuel() -> NewUser {
    NewUser {
        email: "jegna@gmail.com".to_string(),
        phone: "251963158999".to_string(),
        first_name: "Amanuel".to_string(),
        last_name: "Girma".to_string(),
        bio: Some(
            "I'm Amanuel Girma. I am a Software Developer with 4+ years of experience.".to_string(),
        ),
    }
}

fn chala() -> NewUser {
    NewUser {
        email: "chala@gmail.com".to_string(),
        phone: "2519631589991".to_string(),
        first_name: "Chala".to_string(),
        last_name: "Chelchesa".to_string(),
        bio: Some("I'm Chala Chelchesa.".to_string()),
    }
}

fn game_of_thrones(config: &ExamplesConfig) -> NewBook {
    NewBook {
        title: "A Game of Thrones".to_string(),
        description: Some(
            "A Game of Thrones is the first book in A Song of Ice and Fire, a series of fantasy \
             novels by American author George R. R. Martin."
                .to_string(),
        ),
        condition: BookCondition::LikeNew,
        active: false,
        author_name: Some(config.author_name.clone()),
        genre_names: config.book_genre_names.clone(),
    }
}

fn clash_of_kings(config: &ExamplesConfig) -> NewBook {
    NewBook {
        title: "A Clash of Kings".to_string(),
        description: Some("The second book in A Song of Ice and Fire.".to_string()),
        condition: BookCondition::Good,
        active: true,
        author_name: Some(config.author_name.clone()),
        genre_names: config.book_genre_names.clone(),
    }
}

fn cover_images() -> Vec<NewImage> {
    vec![
        NewImage {
            url: "https://img.example.com/clash-of-kings/cover.jpg".to_string(),
            width: 800,
            height: 1200,
            is_primary: true,
        },
        NewImage {
            url: "https://img.example.com/clash-of-kings/back.jpg".to_string(),
            width: 800,
            height: 1200,
            is_primary: false,
        },
    ]
}

fn pro_annual_plan() -> NewPlan {
    NewPlan {
        slug: "pro-annual".to_string(),
        name: "Pro Annual Plan".to_string(),
        description: Some(
            "Best for teams and professionals who need advanced features and annual savings."
                .to_string(),
        ),
        price_cents: 9900,
        currency: "USD".to_string(),
        interval: BillingInterval::Year,
        features: json!([
            "Unlimited Projects",
            "Priority Support",
            "Custom Branding",
            "Team Collaboration Tools",
            "Advanced Analytics Dashboard",
        ]),
        active: true,
    }
}

fn exchange_ratings() -> ExchangeRatings {
    let comment = "I had a great experience with this person. The book was great reading, \
                   and it was in a great condition.";
    ExchangeRatings {
        by_requester: RatingInput {
            rating: 4,
            comment: Some(comment.to_string()),
        },
        by_responder: RatingInput {
            rating: 5,
            comment: Some(comment.to_string()),
        },
    }
}

/// Runs one example, prints its result and returns the printed text.
pub async fn run_example(
    example: Example,
    pool: &SqlitePool,
    config: &ExamplesConfig,
) -> QueryResult<String> {
    let label = example.name();
    let now = Utc::now();

    match example {
        Example::CreateUser => pretty_print(label, &level1::create_user(pool, &amanuel()).await?),
        Example::GetUserByEmail => pretty_print(
            label,
            &level1::get_user_by_email(pool, &config.user_email).await?,
        ),
        Example::UpdateUserProfile => {
            let update = ProfileUpdate {
                first_name: "Amanuel Updated".to_string(),
                avatar_url: "https://example.com/new-avatar.jpg".to_string(),
            };
            pretty_print(
                label,
                &level1::update_user_profile(pool, config.profile_user_id, &update).await?,
            )
        }
        Example::DeleteUser => {
            let deleted = level1::delete_user(pool, config.deleted_user_id).await?;
            pretty_print(
                label,
                &json!({ "user_id": config.deleted_user_id, "rows_affected": deleted }),
            )
        }
        Example::CreateAuthor => pretty_print(
            label,
            &level1::create_author(pool, &config.author_name).await?,
        ),
        Example::CreateBook => pretty_print(
            label,
            &level1::create_book(pool, config.owner_id, &game_of_thrones(config)).await?,
        ),
        Example::GetBooksOfUser => pretty_print(
            label,
            &level1::get_books_of_user(pool, config.owner_id).await?,
        ),
        Example::GetBooksOfUserFlat => pretty_print(
            label,
            &level1::get_books_of_user_flat(pool, config.owner_id).await?,
        ),
        Example::GetBooksOfUserWithGenreStr => pretty_print(
            label,
            &level1::get_books_of_user_with_genre_str(pool, config.owner_id).await?,
        ),
        Example::GetBookById => {
            pretty_print(label, &level1::get_book_by_id(pool, config.book_id).await?)
        }
        Example::GetUsersByPreferredGenres => pretty_print(
            label,
            &level1::get_users_by_preferred_genres(pool, &config.preferred_genre_ids).await?,
        ),
        Example::CreateSubscriptionPlan => pretty_print(
            label,
            &level1::create_subscription_plan(pool, &pro_annual_plan()).await?,
        ),
        Example::GetFirstUserSummary => {
            pretty_print(label, &level1::get_first_user_summary(pool).await?)
        }
        Example::CreateUserWithGenres => pretty_print(
            label,
            &level1::create_user_with_genres(pool, &chala(), &[1, 2, 3]).await?,
        ),
        Example::CreateBookWithImages => pretty_print(
            label,
            &level1::create_book_with_images(
                pool,
                config.owner_id,
                &clash_of_kings(config),
                &cover_images(),
            )
            .await?,
        ),
        Example::GetLikeNewBooksOfAuthor => pretty_print(
            label,
            &level1::get_like_new_books_of_author(pool, config.author_id).await?,
        ),
        Example::GetBooksByCity => pretty_print(
            label,
            &level1::get_books_by_location(pool, &LocationFilter::City(config.city.clone()))
                .await?,
        ),
        Example::GetBooksByCountry => pretty_print(
            label,
            &level1::get_books_by_location(pool, &LocationFilter::Country(config.country.clone()))
                .await?,
        ),
        Example::GetGenresOfBook => pretty_print(
            label,
            &level1::get_genres_of_book(pool, config.genre_book_id).await?,
        ),
        Example::AssignGenresToBook => pretty_print(
            label,
            &level1::assign_genres_to_book(pool, config.book_id, &config.preferred_genre_ids)
                .await?,
        ),
        Example::GetBooksAvailableBetween => pretty_print(
            label,
            &level2::get_books_available_between(
                pool,
                start_of_day(config.available_from),
                start_of_day(config.available_until),
            )
            .await?,
        ),
        Example::GetActiveSubscriptionsWithPlan => pretty_print(
            label,
            &level2::get_active_subscriptions_with_plan(pool).await?,
        ),
        Example::GetUsersWithExpiredSubscription => pretty_print(
            label,
            &level2::get_users_with_expired_subscription(pool, now).await?,
        ),
        Example::GetUsersWithBookCount => {
            pretty_print(label, &level2::get_users_with_book_count(pool).await?)
        }
        Example::GetBooksWithAvgReview => {
            pretty_print(label, &level2::get_books_with_avg_review(pool).await?)
        }
        Example::GetRequestedExchanges => pretty_print(
            label,
            &level2::get_exchanges_by_status(pool, ExchangeStatus::Requested).await?,
        ),
        Example::GetThreadMessagesSorted => pretty_print(
            label,
            &level2::get_thread_messages_sorted(pool, config.thread_id).await?,
        ),
        Example::GetInactiveUsers => pretty_print(
            label,
            &level2::get_users_inactive_for_over_a_month(pool, now).await?,
        ),
        Example::CreateSubscription => pretty_print(
            label,
            &level3::create_subscription(pool, config.subscriber_id, config.plan_id, now).await?,
        ),
        Example::SoftDeleteBook => pretty_print(
            label,
            &level3::soft_delete_book(pool, config.soft_deleted_book_id, now).await?,
        ),
        Example::GetBookUnscoped => pretty_print(
            label,
            &level3::get_book_unscoped(pool, config.soft_deleted_book_id).await?,
        ),
        Example::PurgeBook => {
            let purged = level3::purge_book(pool, config.soft_deleted_book_id).await?;
            pretty_print(
                label,
                &json!({ "book_id": config.soft_deleted_book_id, "rows_affected": purged }),
            )
        }
        Example::CompleteExchange => pretty_print(
            label,
            &level3::complete_exchange(
                pool,
                config.completing_exchange_id,
                &exchange_ratings(),
                now,
            )
            .await?,
        ),
        Example::CancelSubscription => pretty_print(
            label,
            &level3::cancel_subscription(pool, config.canceled_subscription_id, now).await?,
        ),
        Example::ReportUser => {
            let report = UserReport {
                reporter_id: config.reporter_id,
                target_user_id: config.reported_user_id,
                reason: "Inappropriate behavior".to_string(),
                details: "User sent offensive messages.".to_string(),
            };
            pretty_print(label, &level3::report_user(pool, &report, now).await?)
        }
        Example::GetChatThreadsOfExchange => pretty_print(
            label,
            &level4::get_chat_threads_of_exchange(pool, config.chat_exchange_id).await?,
        ),
        Example::GetCommunityThreads => pretty_print(
            label,
            &level4::get_community_threads(pool, config.community_id).await?,
        ),
        Example::GetUsersInCommunities => pretty_print(
            label,
            &level4::get_users_in_at_least_n_communities(pool, config.min_communities).await?,
        ),
        Example::GetPaidCommunities => {
            pretty_print(label, &level4::get_paid_communities(pool).await?)
        }
        Example::GetExchangesOfUser => pretty_print(
            label,
            &level4::get_exchanges_of_user(pool, config.owner_id).await?,
        ),
        Example::GetBooksInCompletedExchanges => pretty_print(
            label,
            &level4::get_books_of_user_in_completed_exchanges(pool, config.owner_id).await?,
        ),
        Example::Top5UsersByBooksOwned => {
            pretty_print(label, &level5::get_top5_users_by_books_owned(pool).await?)
        }
        Example::ExchangeStatusBreakdown => {
            pretty_print(label, &level5::get_exchange_status_breakdown(pool).await?)
        }
        Example::TopRatedUsers => pretty_print(
            label,
            &level5::get_top_rated_users(pool, config.top_rated_limit).await?,
        ),
    }
}

/// Runs `examples` in order. Failures are logged and the run continues;
/// returns the number of examples that failed.
pub async fn run_logged(
    examples: &[Example],
    pool: &SqlitePool,
    config: &ExamplesConfig,
) -> usize {
    let mut failures = 0;
    for example in examples {
        info!(example = %example, level = example.level(), "running example");
        if let Err(err) = run_example(*example, pool, config).await {
            error!(example = %example, error = %err, "example failed");
            failures += 1;
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_parse_back() {
        let names: HashSet<&str> = Example::ALL.iter().map(Example::name).collect();
        assert_eq!(names.len(), Example::ALL.len());

        for example in Example::ALL {
            assert_eq!(example.name().parse::<Example>(), Ok(*example));
        }
    }

    #[test]
    fn every_level_has_examples() {
        for level in 1..=5 {
            assert!(
                Example::ALL.iter().any(|example| example.level() == level),
                "no example at level {level}"
            );
        }
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = "drop-all-tables".parse::<Example>().unwrap_err();
        assert_eq!(err.to_string(), "unknown example: drop-all-tables");
    }

    #[test]
    fn dates_start_at_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        assert_eq!(
            start_of_day(date).to_rfc3339(),
            "2025-10-10T00:00:00+00:00"
        );
    }
}
