//! Writes, transactions and the example catalogue

mod common;

use bookswap_config::ExamplesConfig;
use bookswap_database::{
    BookCondition, ExchangeStatus, NotificationType, PaymentStatus, SubscriptionStatus,
};
use bookswap_queries::level1::{NewBook, NewImage, NewUser, ProfileUpdate};
use bookswap_queries::level3::{ExchangeRatings, RatingInput, UserReport};
use bookswap_queries::{level1, level3, run_example, run_logged, Example, QueryError};
use chrono::{Duration, Utc};
use common::{count, seeded_database};

fn new_user(email: &str, phone: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        phone: phone.to_string(),
        first_name: "Test".to_string(),
        last_name: "Reader".to_string(),
        bio: Some("Reads everything".to_string()),
    }
}

fn ratings() -> ExchangeRatings {
    ExchangeRatings {
        by_requester: RatingInput {
            rating: 4,
            comment: Some("Smooth trade".to_string()),
        },
        by_responder: RatingInput {
            rating: 5,
            comment: None,
        },
    }
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (pool, _temp_dir) = seeded_database().await;

    let user = level1::create_user(&pool, &new_user("reader@example.com", "15550000001"))
        .await
        .unwrap();
    let profile = user.profile.as_ref().unwrap();
    assert_eq!(profile.first_name.as_deref(), Some("Test"));

    let update = ProfileUpdate {
        first_name: "Renamed".to_string(),
        avatar_url: "https://example.com/avatar.jpg".to_string(),
    };
    let profile = level1::update_user_profile(&pool, user.id, &update)
        .await
        .unwrap();
    assert_eq!(profile.first_name.as_deref(), Some("Renamed"));
    assert_eq!(profile.avatar_url.as_deref(), Some("https://example.com/avatar.jpg"));

    assert_eq!(level1::delete_user(&pool, user.id).await.unwrap(), 1);
    assert_eq!(level1::delete_user(&pool, user.id).await.unwrap(), 0);
    let error = level1::get_user_by_email(&pool, "reader@example.com")
        .await
        .unwrap_err();
    assert!(error.is_not_found());

    let duplicate = level1::create_user(&pool, &new_user("john.doe@example.com", "15550000002"))
        .await
        .unwrap_err();
    assert!(matches!(
        duplicate,
        QueryError::Database(bookswap_database::DatabaseError::Duplicate(_))
    ));
}

#[tokio::test]
async fn test_user_with_genres_and_book_with_images() {
    let (pool, _temp_dir) = seeded_database().await;

    let user = level1::create_user_with_genres(
        &pool,
        &new_user("genres@example.com", "15550000003"),
        &[1, 2, 3],
    )
    .await
    .unwrap();
    assert_eq!(user.preferred_genres.len(), 3);

    level1::create_author(&pool, "George RR Martin").await.unwrap();
    let again = level1::create_author(&pool, "George RR Martin").await.unwrap();
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM authors WHERE name = 'George RR Martin'").await,
        1
    );

    let new_book = NewBook {
        title: "A Clash of Kings".to_string(),
        description: None,
        condition: BookCondition::Good,
        active: true,
        author_name: Some("George RR Martin".to_string()),
        genre_names: vec!["Fantasy".to_string(), "Thriller".to_string()],
    };
    let images = [
        NewImage {
            url: "https://img.example.com/cover.jpg".to_string(),
            width: 800,
            height: 1200,
            is_primary: true,
        },
        NewImage {
            url: "https://img.example.com/back.jpg".to_string(),
            width: 800,
            height: 1200,
            is_primary: false,
        },
    ];
    let book = level1::create_book_with_images(&pool, user.id, &new_book, &images)
        .await
        .unwrap();
    assert_eq!(book.author_id, Some(again.id));
    assert_eq!(book.images.len(), 2);
    assert!(book.images[0].is_primary);
    assert_eq!(book.genres.len(), 2);
}

#[tokio::test]
async fn test_subscription_plan_is_created_once() {
    let (pool, _temp_dir) = seeded_database().await;

    let plan = level1::NewPlan {
        slug: "pro-annual".to_string(),
        name: "Pro Annual Plan".to_string(),
        description: None,
        price_cents: 9900,
        currency: "USD".to_string(),
        interval: bookswap_database::BillingInterval::Year,
        features: serde_json::json!(["Priority Support"]),
        active: true,
    };
    let first = level1::create_subscription_plan(&pool, &plan).await.unwrap();
    let second = level1::create_subscription_plan(&pool, &plan).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(
        first.features.as_ref().map(|features| features.0.clone()),
        Some(serde_json::json!(["Priority Support"]))
    );
}

#[tokio::test]
async fn test_create_subscription_records_payment() {
    let (pool, _temp_dir) = seeded_database().await;
    let now = Utc::now();

    let receipt = level3::create_subscription(&pool, 9, 2, now).await.unwrap();
    let subscription = &receipt.subscription;
    assert_eq!(subscription.user_id, 9);
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert!(subscription.current_period_end.unwrap() > now + Duration::days(27));
    assert_eq!(subscription.plan.as_ref().map(|p| p.id), Some(2));

    let payment = &receipt.payment;
    assert_eq!(payment.subscription_id, subscription.id);
    assert_eq!(payment.amount_cents, 999);
    assert_eq!(payment.status, PaymentStatus::Succeeded);
    let metadata = &payment.metadata.as_ref().unwrap().0;
    assert_eq!(metadata["payment_method"], "stripe");
    assert!(metadata["order_id"].is_string());

    let error = level3::create_subscription(&pool, 9, 2, now).await.unwrap_err();
    assert!(matches!(
        error,
        QueryError::ActiveSubscriptionExists { user_id: 9, .. }
    ));

    let missing = level3::create_subscription(&pool, 9_999, 2, now)
        .await
        .unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_concurrent_subscriptions_for_one_user() {
    let (pool, _temp_dir) = seeded_database().await;
    let now = Utc::now();

    let (first, second) = tokio::join!(
        level3::create_subscription(&pool, 9, 2, now),
        level3::create_subscription(&pool, 9, 3, now),
    );
    let results = [first, second];

    let succeeded = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results.iter().any(|result| matches!(
        result,
        Err(QueryError::ActiveSubscriptionExists { user_id: 9, .. })
    )));

    assert_eq!(
        count(
            &pool,
            "SELECT COUNT(*) FROM subscriptions WHERE user_id = 9 AND status = 'active'"
        )
        .await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM payments WHERE user_id = 9").await,
        1
    );
}

#[tokio::test]
async fn test_soft_delete_hides_book_but_unscoped_read_finds_it() {
    let (pool, _temp_dir) = seeded_database().await;

    let report = level3::soft_delete_book(&pool, 3, Utc::now()).await.unwrap();
    assert_eq!(report.genre_links_removed, 1);
    assert_eq!(report.images_deleted, 2);
    assert_eq!(report.reviews_deleted, 1);

    assert!(level1::get_book_by_id(&pool, 3).await.unwrap_err().is_not_found());
    let owned = level1::get_books_of_user(&pool, 3).await.unwrap();
    assert!(owned.iter().all(|book| book.id != 3));
    assert!(level1::get_genres_of_book(&pool, 3).await.unwrap().is_empty());

    let book = level3::get_book_unscoped(&pool, 3).await.unwrap();
    assert!(book.deleted_at.is_some());
    assert!(book.archived_at.is_some());
    assert!(!book.active);
    assert_eq!(book.images.len(), 2);
    assert_eq!(book.reviews.len(), 1);
    assert!(book.images.iter().all(|image| image.deleted_at.is_some()));

    let again = level3::soft_delete_book(&pool, 3, Utc::now()).await.unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn test_purge_removes_book_and_children() {
    let (pool, _temp_dir) = seeded_database().await;

    assert_eq!(level3::purge_book(&pool, 3).await.unwrap(), 1);
    assert!(level3::get_book_unscoped(&pool, 3)
        .await
        .unwrap_err()
        .is_not_found());
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM book_images WHERE book_id = 3").await,
        0
    );
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM book_reviews WHERE book_id = 3").await,
        0
    );
    assert!(level3::purge_book(&pool, 3).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_complete_exchange_retires_books_and_stores_ratings() {
    let (pool, _temp_dir) = seeded_database().await;

    let completed = level3::complete_exchange(&pool, 3, &ratings(), Utc::now())
        .await
        .unwrap();
    let exchange = &completed.exchange;
    assert_eq!(exchange.status, ExchangeStatus::Completed);
    assert!(exchange.completed_at.is_some());

    assert_eq!(completed.ratings.len(), 2);
    assert_eq!(completed.ratings[0].rater_id, exchange.requester_id);
    assert_eq!(Some(completed.ratings[0].rated_user_id), exchange.responder_id);
    assert_eq!(completed.ratings[1].rating, 5);

    for book_id in exchange.book_ids() {
        let book = level3::get_book_unscoped(&pool, book_id).await.unwrap();
        assert!(!book.active);
        assert!(book.available_from.is_none());
        assert!(book.available_until.is_none());
    }

    let error = level3::complete_exchange(&pool, 3, &ratings(), Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(error, QueryError::InvalidState(_)));
}

#[tokio::test]
async fn test_cancel_subscription_ends_period_now() {
    let (pool, _temp_dir) = seeded_database().await;
    let now = Utc::now();

    let subscription = level3::cancel_subscription(&pool, 2, now).await.unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Canceled);
    assert!(subscription.cancel_at_period_end);
    assert_eq!(subscription.current_period_end, Some(now));

    // A canceled subscription no longer blocks a new one.
    level3::create_subscription(&pool, subscription.user_id, 3, now)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_report_user_notifies_first_admin() {
    let (pool, _temp_dir) = seeded_database().await;

    let report = UserReport {
        reporter_id: 4,
        target_user_id: 5,
        reason: "Inappropriate behavior".to_string(),
        details: "User sent offensive messages.".to_string(),
    };
    let outcome = level3::report_user(&pool, &report, Utc::now()).await.unwrap();

    assert_eq!(outcome.admin.id, 6);
    assert_eq!(outcome.report.handled_by, Some(6));
    assert_eq!(outcome.report.target_type, "user");
    assert_eq!(outcome.report.target_id, 5);
    assert_eq!(outcome.notification.user_id, 6);
    assert_eq!(outcome.notification.kind, NotificationType::GeneralAnnouncement);
    let payload = &outcome.notification.payload.as_ref().unwrap().0;
    assert_eq!(payload["report_id"], outcome.report.id);

    let unknown = UserReport {
        target_user_id: 9_999,
        ..report
    };
    let error = level3::report_user(&pool, &unknown, Utc::now())
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_every_example_runs_against_fresh_seed() {
    let (pool, _temp_dir) = seeded_database().await;

    let failures = run_logged(Example::ALL, &pool, &ExamplesConfig::default()).await;
    assert_eq!(failures, 0);
}

#[tokio::test]
async fn test_failed_example_does_not_stop_the_run() {
    let (pool, _temp_dir) = seeded_database().await;
    let config = ExamplesConfig {
        book_id: 9_999,
        ..ExamplesConfig::default()
    };

    let failures = run_logged(
        &[Example::GetBookById, Example::Top5UsersByBooksOwned],
        &pool,
        &config,
    )
    .await;
    assert_eq!(failures, 1);

    let printed = run_example(Example::ExchangeStatusBreakdown, &pool, &config)
        .await
        .unwrap();
    assert!(printed.starts_with("exchange-status-breakdown: ["));
}
