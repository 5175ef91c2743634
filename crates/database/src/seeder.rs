//! Sample data for the query examples.
//!
//! Every row is written through [`Upsert`] keyed by a natural key, so seeding
//! an already seeded database refreshes rows in place instead of duplicating
//! them. The whole run happens in one transaction.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::entities::{
    ActivityAction, BillingInterval, BookCondition, CommunityRole, ExchangeStatus, Language,
    MessageKind, NotificationType, Role, SubscriptionStatus,
};
use crate::repos::{replace_book_genres, replace_preferred_genres, Upsert};
use crate::types::{DatabaseError, DatabaseResult};

/// Ids of every seeded row, in seeding order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedSummary {
    pub countries: Vec<i64>,
    pub states: Vec<i64>,
    pub cities: Vec<i64>,
    pub users: Vec<i64>,
    pub profiles: Vec<i64>,
    pub authors: Vec<i64>,
    pub genres: Vec<i64>,
    pub books: Vec<i64>,
    pub book_images: Vec<i64>,
    pub plans: Vec<i64>,
    pub subscriptions: Vec<i64>,
    pub communities: Vec<i64>,
    pub memberships: Vec<i64>,
    pub exchanges: Vec<i64>,
    pub chat_threads: Vec<i64>,
    pub messages: Vec<i64>,
    pub community_threads: Vec<i64>,
    pub community_messages: Vec<i64>,
    pub reviews: Vec<i64>,
    pub ratings: Vec<i64>,
    pub notifications: Vec<i64>,
    pub reports: Vec<i64>,
    pub moderation_actions: Vec<i64>,
    pub activity_logs: Vec<i64>,
    pub quota_usages: Vec<i64>,
}

impl SeedSummary {
    pub fn total_rows(&self) -> usize {
        [
            &self.countries,
            &self.states,
            &self.cities,
            &self.users,
            &self.profiles,
            &self.authors,
            &self.genres,
            &self.books,
            &self.book_images,
            &self.plans,
            &self.subscriptions,
            &self.communities,
            &self.memberships,
            &self.exchanges,
            &self.chat_threads,
            &self.messages,
            &self.community_threads,
            &self.community_messages,
            &self.reviews,
            &self.ratings,
            &self.notifications,
            &self.reports,
            &self.moderation_actions,
            &self.activity_logs,
            &self.quota_usages,
        ]
        .iter()
        .map(|ids| ids.len())
        .sum()
    }
}

/// Seeds every table. Safe to run repeatedly.
pub async fn seed_all(pool: &SqlitePool) -> DatabaseResult<SeedSummary> {
    seed_all_at(pool, Utc::now()).await
}

/// Seeds every table with relative timestamps anchored at `now`.
pub async fn seed_all_at(pool: &SqlitePool, now: DateTime<Utc>) -> DatabaseResult<SeedSummary> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    seed_locations(&mut tx, &mut summary).await?;
    seed_users(&mut tx, &mut summary, now).await?;
    seed_authors_and_genres(&mut tx, &mut summary).await?;
    seed_preferred_genres(&mut tx, &summary).await?;
    seed_books(&mut tx, &mut summary, now).await?;
    seed_subscriptions(&mut tx, &mut summary, now).await?;
    seed_communities(&mut tx, &mut summary, now).await?;
    seed_exchanges(&mut tx, &mut summary, now).await?;
    seed_messages(&mut tx, &mut summary).await?;
    seed_reviews_and_ratings(&mut tx, &mut summary).await?;
    seed_notifications(&mut tx, &mut summary).await?;
    seed_moderation(&mut tx, &mut summary, now).await?;
    seed_activity_logs(&mut tx, &mut summary, now).await?;
    seed_message_quota_usage(&mut tx, &mut summary, now).await?;

    tx.commit().await?;

    info!(
        users = summary.users.len(),
        books = summary.books.len(),
        exchanges = summary.exchanges.len(),
        rows = summary.total_rows(),
        "database seeded"
    );
    Ok(summary)
}

fn id_at(ids: &[i64], index: usize, what: &str) -> DatabaseResult<i64> {
    ids.get(index).copied().ok_or_else(|| {
        DatabaseError::InternalError(format!("seed data references missing {what} #{index}"))
    })
}

fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

fn days_ahead(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now + Duration::days(days)
}

fn utc_date(year: i32, month: u32, day: u32) -> DatabaseResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .ok_or_else(|| DatabaseError::InternalError(format!("invalid date {year}-{month}-{day}")))
}

async fn seed_locations(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
) -> DatabaseResult<()> {
    const COUNTRIES: &[(&str, &str)] = &[
        ("US", "United States"),
        ("CA", "Canada"),
        ("GB", "United Kingdom"),
        ("AU", "Australia"),
        ("DE", "Germany"),
        ("FR", "France"),
        ("JP", "Japan"),
        ("BR", "Brazil"),
        ("IN", "India"),
        ("MX", "Mexico"),
    ];
    // (name, country index)
    const STATES: &[(&str, usize)] = &[
        ("California", 0),
        ("New York", 0),
        ("Texas", 0),
        ("Florida", 0),
        ("Ontario", 1),
        ("Quebec", 1),
        ("New South Wales", 3),
        ("Victoria", 3),
        ("Maharashtra", 8),
        ("Karnataka", 8),
    ];
    // (name, state index)
    const CITIES: &[(&str, usize)] = &[
        ("San Francisco", 0),
        ("Los Angeles", 0),
        ("New York City", 1),
        ("Buffalo", 1),
        ("Houston", 2),
        ("Austin", 2),
        ("Miami", 3),
        ("Orlando", 3),
        ("Toronto", 4),
        ("Montreal", 5),
        ("Sydney", 6),
        ("Melbourne", 7),
        ("Mumbai", 8),
        ("Bangalore", 9),
    ];

    for (code, name) in COUNTRIES {
        let id = Upsert::into_table("countries")
            .key("code", *code)
            .set("name", *name)
            .execute(conn)
            .await?;
        summary.countries.push(id);
    }

    for (name, country) in STATES {
        let country_id = id_at(&summary.countries, *country, "country")?;
        let id = Upsert::into_table("states")
            .key("name", *name)
            .key("country_id", country_id)
            .execute(conn)
            .await?;
        summary.states.push(id);
    }

    for (name, state) in CITIES {
        let state_id = id_at(&summary.states, *state, "state")?;
        let id = Upsert::into_table("cities")
            .key("name", *name)
            .key("state_id", state_id)
            .execute(conn)
            .await?;
        summary.cities.push(id);
    }

    debug!(
        countries = summary.countries.len(),
        states = summary.states.len(),
        cities = summary.cities.len(),
        "seeded locations"
    );
    Ok(())
}

struct SeedUser {
    email: &'static str,
    phone: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    is_active: bool,
    role: Role,
    locale: &'static str,
    verified_days_ago: Option<i64>,
    display_name: &'static str,
    bio: &'static str,
    avatar: &'static str,
    linkedin: &'static str,
    // (country, state, city) indexes into the seeded location lists
    place: (usize, Option<usize>, Option<usize>),
}

const USERS: &[SeedUser] = &[
    SeedUser {
        email: "john.doe@example.com",
        phone: "15551230001",
        first_name: "John",
        last_name: "Doe",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: Some(30),
        display_name: "JohnDoe",
        bio: "Book lover and collector",
        avatar: "https://example.com/john.jpg",
        linkedin: "https://linkedin.com/in/johndoe",
        place: (0, Some(0), Some(0)),
    },
    SeedUser {
        email: "jane.smith@example.com",
        phone: "15551230002",
        first_name: "Jane",
        last_name: "Smith",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: Some(15),
        display_name: "JaneSmith",
        bio: "Sci-fi enthusiast",
        avatar: "https://example.com/jane.jpg",
        linkedin: "https://linkedin.com/in/janesmith",
        place: (0, Some(1), Some(2)),
    },
    SeedUser {
        email: "bob.wilson@example.com",
        phone: "15551230003",
        first_name: "Bob",
        last_name: "Wilson",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: Some(7),
        display_name: "BobWilson",
        bio: "Mystery novel fan",
        avatar: "https://example.com/bob.jpg",
        linkedin: "https://linkedin.com/in/bobwilson",
        place: (0, Some(2), Some(4)),
    },
    SeedUser {
        email: "alice.brown@example.com",
        phone: "15551230004",
        first_name: "Alice",
        last_name: "Brown",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: Some(45),
        display_name: "AliceBrown",
        bio: "Romance reader",
        avatar: "https://example.com/alice.jpg",
        linkedin: "https://linkedin.com/in/alicebrown",
        place: (0, Some(3), Some(6)),
    },
    SeedUser {
        email: "charlie.davis@example.com",
        phone: "15551230005",
        first_name: "Charlie",
        last_name: "Davis",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: Some(20),
        display_name: "CharlieDavis",
        bio: "Non-fiction reader",
        avatar: "https://example.com/charlie.jpg",
        linkedin: "https://linkedin.com/in/charliedavis",
        place: (1, Some(4), Some(8)),
    },
    SeedUser {
        email: "admin@example.com",
        phone: "15551230006",
        first_name: "Ada",
        last_name: "Admin",
        is_active: true,
        role: Role::Admin,
        locale: "en",
        verified_days_ago: Some(60),
        display_name: "AdaAdmin",
        bio: "Site administrator",
        avatar: "https://example.com/ada.jpg",
        linkedin: "https://linkedin.com/in/ada",
        place: (0, Some(0), Some(2)),
    },
    SeedUser {
        email: "moderator@example.com",
        phone: "15551230007",
        first_name: "Mike",
        last_name: "Moderator",
        is_active: true,
        role: Role::Moderator,
        locale: "en",
        verified_days_ago: Some(40),
        display_name: "MikeMod",
        bio: "Community moderator",
        avatar: "https://example.com/mike.jpg",
        linkedin: "https://linkedin.com/in/mike",
        place: (0, Some(0), Some(2)),
    },
    SeedUser {
        email: "inactive@example.com",
        phone: "15551230008",
        first_name: "Inactive",
        last_name: "User",
        is_active: false,
        role: Role::User,
        locale: "en",
        verified_days_ago: None,
        display_name: "InactiveUser",
        bio: "Former user",
        avatar: "https://example.com/inactive.jpg",
        linkedin: "https://linkedin.com/in/inactive",
        place: (0, Some(0), Some(0)),
    },
    SeedUser {
        email: "unverified@example.com",
        phone: "15551230009",
        first_name: "Unverified",
        last_name: "User",
        is_active: true,
        role: Role::User,
        locale: "en",
        verified_days_ago: None,
        display_name: "UnverifiedUser",
        bio: "New user",
        avatar: "https://example.com/unverified.jpg",
        linkedin: "https://linkedin.com/in/unverified",
        place: (0, Some(0), Some(0)),
    },
    SeedUser {
        email: "french.user@example.com",
        phone: "15551230010",
        first_name: "Pierre",
        last_name: "Dupont",
        is_active: true,
        role: Role::User,
        locale: "fr",
        verified_days_ago: Some(10),
        display_name: "PierreDupont",
        bio: "Lecteur français",
        avatar: "https://example.com/pierre.jpg",
        linkedin: "https://linkedin.com/in/pierre",
        place: (5, None, None),
    },
    SeedUser {
        email: "german.user@example.com",
        phone: "15551230011",
        first_name: "Hans",
        last_name: "Mueller",
        is_active: true,
        role: Role::User,
        locale: "de",
        verified_days_ago: Some(25),
        display_name: "HansMueller",
        bio: "Deutscher Leser",
        avatar: "https://example.com/hans.jpg",
        linkedin: "https://linkedin.com/in/hans",
        place: (4, None, None),
    },
];

async fn seed_users(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    for user in USERS {
        let verified_at = user.verified_days_ago.map(|days| days_ago(now, days));
        let id = Upsert::into_table("users")
            .key("email", user.email)
            .set("phone", user.phone)
            .set("password_hash", "password")
            .set("first_name", user.first_name)
            .set("last_name", user.last_name)
            .set("is_active", user.is_active)
            .set("role", user.role.as_str())
            .set("locale", user.locale)
            .set("email_verified_at", verified_at)
            .execute(conn)
            .await?;
        summary.users.push(id);

        let (country, state, city) = user.place;
        let state_id = state
            .map(|index| id_at(&summary.states, index, "state"))
            .transpose()?;
        let city_id = city
            .map(|index| id_at(&summary.cities, index, "city"))
            .transpose()?;
        let profile_id = Upsert::into_table("user_profiles")
            .key("user_id", id)
            .set("first_name", user.first_name)
            .set("last_name", user.last_name)
            .set("display_name", user.display_name)
            .set("bio", user.bio)
            .set("avatar_url", user.avatar)
            .set("linkedin", user.linkedin)
            .set("country_id", id_at(&summary.countries, country, "country")?)
            .set("state_id", state_id)
            .set("city_id", city_id)
            .execute(conn)
            .await?;
        summary.profiles.push(profile_id);
    }

    debug!(users = summary.users.len(), "seeded users and profiles");
    Ok(())
}

async fn seed_authors_and_genres(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
) -> DatabaseResult<()> {
    const AUTHORS: &[&str] = &[
        "Isaac Asimov",
        "George Orwell",
        "Mary Shelley",
        "J.K. Rowling",
        "Stephen King",
        "Agatha Christie",
        "Jane Austen",
        "Charles Dickens",
        "Mark Twain",
        "Ernest Hemingway",
        "F. Scott Fitzgerald",
        "Harper Lee",
        "Toni Morrison",
        "Gabriel García Márquez",
        "Milan Kundera",
        "Umberto Eco",
        "Salman Rushdie",
        "Margaret Atwood",
        "Neil Gaiman",
        "Terry Pratchett",
    ];
    const GENRES: &[(&str, &str)] = &[
        ("fiction", "Fiction"),
        ("non-fiction", "Non-Fiction"),
        ("sci-fi", "Science Fiction"),
        ("fantasy", "Fantasy"),
        ("mystery", "Mystery"),
        ("romance", "Romance"),
        ("thriller", "Thriller"),
        ("horror", "Horror"),
        ("biography", "Biography"),
        ("history", "History"),
        ("philosophy", "Philosophy"),
        ("poetry", "Poetry"),
        ("drama", "Drama"),
        ("comedy", "Comedy"),
        ("adventure", "Adventure"),
        ("young-adult", "Young Adult"),
        ("children", "Children's"),
        ("self-help", "Self Help"),
        ("business", "Business"),
        ("technology", "Technology"),
    ];

    for name in AUTHORS {
        let id = Upsert::into_table("authors")
            .key("name", *name)
            .execute(conn)
            .await?;
        summary.authors.push(id);
    }

    for (slug, name) in GENRES {
        let id = Upsert::into_table("genres")
            .key("slug", *slug)
            .set("name", *name)
            .execute(conn)
            .await?;
        summary.genres.push(id);
    }

    debug!(
        authors = summary.authors.len(),
        genres = summary.genres.len(),
        "seeded authors and genres"
    );
    Ok(())
}

async fn seed_preferred_genres(
    conn: &mut SqliteConnection,
    summary: &SeedSummary,
) -> DatabaseResult<()> {
    // (user index, genre indexes)
    const PREFERENCES: &[(usize, &[usize])] = &[
        (0, &[0, 3]),
        (1, &[2, 3, 19]),
        (2, &[4, 6]),
        (3, &[5, 0]),
        (4, &[1, 8, 9]),
    ];

    for (user, genres) in PREFERENCES {
        let user_id = id_at(&summary.users, *user, "user")?;
        let genre_ids = genres
            .iter()
            .map(|index| id_at(&summary.genres, *index, "genre"))
            .collect::<DatabaseResult<Vec<_>>>()?;
        replace_preferred_genres(conn, user_id, &genre_ids).await?;
    }
    Ok(())
}

struct SeedBook {
    owner: usize,
    title: &'static str,
    author: usize,
    condition: BookCondition,
    country: &'static str,
    state: &'static str,
    city: &'static str,
    archived_days_ago: Option<i64>,
    genres: &'static [usize],
}

const BOOKS: &[SeedBook] = &[
    SeedBook { owner: 0, title: "1984", author: 1, condition: BookCondition::LikeNew, country: "US", state: "California", city: "San Francisco", archived_days_ago: None, genres: &[0, 2] },
    SeedBook { owner: 1, title: "Foundation", author: 0, condition: BookCondition::Good, country: "US", state: "New York", city: "New York City", archived_days_ago: None, genres: &[1, 2] },
    SeedBook { owner: 2, title: "Frankenstein", author: 2, condition: BookCondition::Acceptable, country: "US", state: "Texas", city: "Houston", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 0, title: "Harry Potter and the Philosopher's Stone", author: 3, condition: BookCondition::New, country: "US", state: "California", city: "Los Angeles", archived_days_ago: None, genres: &[3] },
    SeedBook { owner: 1, title: "The Shining", author: 4, condition: BookCondition::LikeNew, country: "US", state: "Florida", city: "Miami", archived_days_ago: None, genres: &[7] },
    SeedBook { owner: 3, title: "Murder on the Orient Express", author: 5, condition: BookCondition::Good, country: "CA", state: "Ontario", city: "Toronto", archived_days_ago: None, genres: &[4] },
    SeedBook { owner: 4, title: "Pride and Prejudice", author: 6, condition: BookCondition::LikeNew, country: "AU", state: "New South Wales", city: "Sydney", archived_days_ago: None, genres: &[0, 5] },
    SeedBook { owner: 0, title: "Great Expectations", author: 7, condition: BookCondition::Acceptable, country: "US", state: "California", city: "San Francisco", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 2, title: "The Adventures of Tom Sawyer", author: 8, condition: BookCondition::Good, country: "US", state: "Texas", city: "Austin", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 1, title: "The Old Man and the Sea", author: 9, condition: BookCondition::LikeNew, country: "US", state: "New York", city: "Buffalo", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 3, title: "The Great Gatsby", author: 10, condition: BookCondition::New, country: "US", state: "Florida", city: "Orlando", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 4, title: "To Kill a Mockingbird", author: 11, condition: BookCondition::Good, country: "AU", state: "Victoria", city: "Melbourne", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 0, title: "Beloved", author: 12, condition: BookCondition::LikeNew, country: "US", state: "California", city: "San Francisco", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 2, title: "One Hundred Years of Solitude", author: 13, condition: BookCondition::Good, country: "US", state: "Texas", city: "Houston", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 1, title: "The Unbearable Lightness of Being", author: 14, condition: BookCondition::Acceptable, country: "US", state: "New York", city: "New York City", archived_days_ago: None, genres: &[0] },
    SeedBook { owner: 0, title: "Archived Book 1", author: 0, condition: BookCondition::Good, country: "US", state: "California", city: "San Francisco", archived_days_ago: Some(10), genres: &[] },
    SeedBook { owner: 1, title: "Archived Book 2", author: 1, condition: BookCondition::LikeNew, country: "US", state: "New York", city: "New York City", archived_days_ago: Some(5), genres: &[] },
];

async fn seed_books(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    let available_from = utc_date(2025, 10, 1)?;
    let available_until = utc_date(2025, 12, 31)?;

    for (index, book) in BOOKS.iter().enumerate() {
        let owner_id = id_at(&summary.users, book.owner, "user")?;
        let author_id = id_at(&summary.authors, book.author, "author")?;
        let archived_at = book.archived_days_ago.map(|days| days_ago(now, days));
        // Every other listed book has an open-ended availability window.
        let until = (archived_at.is_none() && index % 2 == 0).then_some(available_until);

        let id = Upsert::into_table("books")
            .key("owner_id", owner_id)
            .key("title", book.title)
            .set("author_id", author_id)
            .set("language", Language::English.as_str())
            .set("condition", book.condition.as_str())
            .set("available_from", available_from)
            .set("available_until", until)
            .set("location_country", book.country)
            .set("location_state", book.state)
            .set("location_city", book.city)
            .set("active", archived_at.is_none())
            .set("archived_at", archived_at)
            .execute(conn)
            .await?;
        summary.books.push(id);

        let cover = Upsert::into_table("book_images")
            .key("book_id", id)
            .key("is_primary", true)
            .set("url", format!("https://img.example.com/{id}/cover.jpg"))
            .set("width", 800_i64)
            .set("height", 1200_i64)
            .set("uploaded_at", now)
            .execute(conn)
            .await?;
        summary.book_images.push(cover);

        if id % 3 == 0 {
            let back = Upsert::into_table("book_images")
                .key("book_id", id)
                .key("is_primary", false)
                .set("url", format!("https://img.example.com/{id}/back.jpg"))
                .set("width", 800_i64)
                .set("height", 1200_i64)
                .set("uploaded_at", now)
                .execute(conn)
                .await?;
            summary.book_images.push(back);
        }

        if !book.genres.is_empty() {
            let genre_ids = book
                .genres
                .iter()
                .map(|genre| id_at(&summary.genres, *genre, "genre"))
                .collect::<DatabaseResult<Vec<_>>>()?;
            replace_book_genres(conn, id, &genre_ids).await?;
        }
    }

    debug!(
        books = summary.books.len(),
        images = summary.book_images.len(),
        "seeded books"
    );
    Ok(())
}

async fn seed_subscriptions(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    // (slug, name, price in cents, interval, active)
    const PLANS: &[(&str, &str, i64, BillingInterval, bool)] = &[
        ("free", "Free", 0, BillingInterval::Month, true),
        ("basic", "Basic", 999, BillingInterval::Month, true),
        ("premium", "Premium", 1999, BillingInterval::Month, true),
        ("enterprise", "Enterprise", 4999, BillingInterval::Month, true),
        ("annual-basic", "Basic Annual", 9999, BillingInterval::Year, true),
        ("annual-premium", "Premium Annual", 19999, BillingInterval::Year, true),
        ("inactive-plan", "Inactive Plan", 999, BillingInterval::Month, false),
    ];
    // (user index, plan index, status, period start days ago, period end offset, cancel at period end)
    const SUBSCRIPTIONS: &[(usize, usize, SubscriptionStatus, i64, i64, bool)] = &[
        (0, 1, SubscriptionStatus::Active, 15, 15, false),
        (1, 2, SubscriptionStatus::Active, 10, 20, false),
        (2, 0, SubscriptionStatus::Trialing, 5, 25, false),
        (3, 1, SubscriptionStatus::PastDue, 30, -5, false),
        (4, 2, SubscriptionStatus::Canceled, 60, -30, true),
        (5, 3, SubscriptionStatus::Active, 20, 10, false),
        (6, 1, SubscriptionStatus::Expired, 90, -60, false),
        (7, 0, SubscriptionStatus::Active, 45, 15, false),
    ];

    for (slug, name, price_cents, interval, active) in PLANS {
        let id = Upsert::into_table("subscription_plans")
            .key("slug", *slug)
            .set("name", *name)
            .set("price_cents", *price_cents)
            .set("currency", "USD")
            .set("interval", interval.as_str())
            .set("active", *active)
            .execute(conn)
            .await?;
        summary.plans.push(id);
    }

    for (user, plan, status, started, ends, cancel_at_period_end) in SUBSCRIPTIONS {
        let id = Upsert::into_table("subscriptions")
            .key("user_id", id_at(&summary.users, *user, "user")?)
            .set("plan_id", id_at(&summary.plans, *plan, "plan")?)
            .set("status", status.as_str())
            .set("current_period_start", days_ago(now, *started))
            .set("current_period_end", days_ahead(now, *ends))
            .set("cancel_at_period_end", *cancel_at_period_end)
            .execute(conn)
            .await?;
        summary.subscriptions.push(id);
    }

    debug!(
        plans = summary.plans.len(),
        subscriptions = summary.subscriptions.len(),
        "seeded subscriptions"
    );
    Ok(())
}

async fn seed_communities(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    // (name, slug, description, creator index, require paid chat)
    const COMMUNITIES: &[(&str, &str, &str, usize, bool)] = &[
        ("Book Lovers", "book-lovers", "A place for book lovers to discuss their favorite reads", 0, false),
        ("Sci-Fi Enthusiasts", "sci-fi-enthusiasts", "Science fiction book discussions and recommendations", 1, true),
        ("Mystery Readers", "mystery-readers", "Mystery and thriller book club", 2, false),
        ("Romance Book Club", "romance-book-club", "Romance novel discussions", 3, true),
        ("Non-Fiction Readers", "non-fiction-readers", "Non-fiction book discussions", 4, false),
        ("Classic Literature", "classic-literature", "Classic literature appreciation society", 5, true),
        ("Young Adult Books", "young-adult-books", "YA book discussions", 6, false),
        ("Local Book Exchange", "local-book-exchange", "Local book trading community", 0, false),
    ];
    // (community index, user index)
    const MEMBERSHIPS: &[(usize, usize)] = &[
        (0, 0),
        (0, 1),
        (0, 2),
        (1, 1),
        (1, 4),
        (2, 2),
        (2, 3),
        (3, 3),
        (3, 0),
        (4, 4),
        (4, 1),
        (5, 5),
        (5, 6),
        (6, 6),
        (6, 2),
        (7, 0),
        (7, 1),
        (7, 2),
        (7, 3),
    ];

    for (name, slug, description, creator, paid) in COMMUNITIES {
        let id = Upsert::into_table("communities")
            .key("slug", *slug)
            .set("name", *name)
            .set("description", *description)
            .set("creator_id", id_at(&summary.users, *creator, "user")?)
            .set("require_paid_chat", *paid)
            .execute(conn)
            .await?;
        summary.communities.push(id);
    }

    for (community, user) in MEMBERSHIPS {
        let community_id = id_at(&summary.communities, *community, "community")?;
        let user_id = id_at(&summary.users, *user, "user")?;
        let creator = COMMUNITIES
            .get(*community)
            .map(|(_, _, _, creator, _)| *creator);
        let role = if creator == Some(*user) {
            CommunityRole::Admin
        } else {
            CommunityRole::Member
        };

        let id = Upsert::into_table("community_members")
            .key("community_id", community_id)
            .key("user_id", user_id)
            .set("community_role", role.as_str())
            .set("joined_at", now)
            .execute(conn)
            .await?;
        summary.memberships.push(id);
    }

    debug!(
        communities = summary.communities.len(),
        memberships = summary.memberships.len(),
        "seeded communities"
    );
    Ok(())
}

struct SeedExchange {
    requester: usize,
    responder: usize,
    requester_book: usize,
    responder_book: usize,
    status: ExchangeStatus,
    requested_days_ago: i64,
    status_days_ago: i64,
    // (start, end) offsets relative to now; negative values lie in the past
    agreed: Option<(i64, i64)>,
}

const EXCHANGES: &[SeedExchange] = &[
    SeedExchange { requester: 0, responder: 1, requester_book: 0, responder_book: 1, status: ExchangeStatus::Requested, requested_days_ago: 5, status_days_ago: 5, agreed: None },
    SeedExchange { requester: 2, responder: 3, requester_book: 2, responder_book: 5, status: ExchangeStatus::Requested, requested_days_ago: 3, status_days_ago: 3, agreed: None },
    SeedExchange { requester: 1, responder: 4, requester_book: 3, responder_book: 6, status: ExchangeStatus::Accepted, requested_days_ago: 10, status_days_ago: 8, agreed: Some((-8, 7)) },
    SeedExchange { requester: 0, responder: 2, requester_book: 7, responder_book: 8, status: ExchangeStatus::Shipped, requested_days_ago: 15, status_days_ago: 2, agreed: Some((-12, 3)) },
    SeedExchange { requester: 3, responder: 1, requester_book: 9, responder_book: 10, status: ExchangeStatus::Completed, requested_days_ago: 30, status_days_ago: 5, agreed: Some((-25, -5)) },
    SeedExchange { requester: 4, responder: 0, requester_book: 11, responder_book: 12, status: ExchangeStatus::Completed, requested_days_ago: 45, status_days_ago: 20, agreed: Some((-40, -20)) },
    SeedExchange { requester: 2, responder: 4, requester_book: 13, responder_book: 14, status: ExchangeStatus::Canceled, requested_days_ago: 20, status_days_ago: 15, agreed: None },
    SeedExchange { requester: 1, responder: 3, requester_book: 1, responder_book: 2, status: ExchangeStatus::Disputed, requested_days_ago: 25, status_days_ago: 10, agreed: Some((-20, -10)) },
];

async fn seed_exchanges(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    for exchange in EXCHANGES {
        let requester_id = id_at(&summary.users, exchange.requester, "user")?;
        let status_at = days_ago(now, exchange.status_days_ago);

        let mut upsert = Upsert::into_table("exchanges")
            .key("requester_id", requester_id)
            .key("responder_id", id_at(&summary.users, exchange.responder, "user")?)
            .key(
                "requester_book_id",
                id_at(&summary.books, exchange.requester_book, "book")?,
            )
            .key(
                "responder_book_id",
                id_at(&summary.books, exchange.responder_book, "book")?,
            )
            .set("status", exchange.status.as_str())
            .set("requested_at", days_ago(now, exchange.requested_days_ago))
            .set("status_updated_at", status_at)
            .set("shipping_payer_user_id", requester_id)
            .set("metadata", json!({}))
            .set(
                "agreed_start_date",
                exchange.agreed.map(|(start, _)| days_ahead(now, start)),
            )
            .set(
                "agreed_end_date",
                exchange.agreed.map(|(_, end)| days_ahead(now, end)),
            );

        upsert = match exchange.status {
            ExchangeStatus::Shipped => upsert
                .set("shipping_provider", "UPS")
                .set("shipping_tracking_number", "1Z999AA1234567890")
                .set("shipping_cost_cents", 1299_i64),
            ExchangeStatus::Completed => upsert.set("completed_at", status_at),
            ExchangeStatus::Canceled => upsert.set("canceled_at", status_at),
            ExchangeStatus::Disputed => upsert
                .set("dispute_reason", "Book condition not as described")
                .set("dispute_opened_at", status_at),
            _ => upsert,
        };

        let id = upsert.execute(conn).await?;
        summary.exchanges.push(id);
    }

    debug!(exchanges = summary.exchanges.len(), "seeded exchanges");
    Ok(())
}

async fn seed_messages(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
) -> DatabaseResult<()> {
    const OPENING: &str = "Hi! I'm interested in trading this book.";
    const REPLY: &str = "Sounds good! What's the condition like?";
    const FOLLOW_UP: &str = "It's in excellent condition, barely read.";

    for (index, exchange) in EXCHANGES.iter().enumerate() {
        let exchange_id = id_at(&summary.exchanges, index, "exchange")?;
        let requester_id = id_at(&summary.users, exchange.requester, "user")?;
        let responder_id = id_at(&summary.users, exchange.responder, "user")?;

        let thread_id = Upsert::into_table("chat_threads")
            .key("exchange_id", exchange_id)
            .set("created_by", requester_id)
            .set("archived", index % 3 == 0)
            .execute(conn)
            .await?;
        summary.chat_threads.push(thread_id);

        for (sender_id, body) in [
            (requester_id, OPENING),
            (responder_id, REPLY),
            (requester_id, FOLLOW_UP),
        ] {
            let id = Upsert::into_table("messages")
                .key("thread_id", thread_id)
                .key("sender_id", sender_id)
                .key("body", body)
                .set("type", MessageKind::Text.as_str())
                .set("attachments", json!([]))
                .execute(conn)
                .await?;
            summary.messages.push(id);
        }
    }

    // (community index, creator index, title)
    const THREADS: &[(usize, usize, &str)] = &[
        (0, 0, "Welcome to Book Lovers!"),
        (0, 1, "What are you reading this week?"),
        (1, 1, "Best Sci-Fi books of 2023"),
        (2, 2, "Mystery recommendations"),
        (3, 3, "Romance novel discussions"),
    ];
    // (thread index, sender index, body)
    const COMMUNITY_MESSAGES: &[(usize, usize, &str)] = &[
        (0, 0, "Welcome everyone to our book community!"),
        (0, 1, "Thanks for creating this space!"),
        (1, 1, "I'm currently reading 'Dune' - amazing world-building!"),
        (1, 2, "I just finished 'The Martian' - highly recommend!"),
        (2, 1, "Foundation series by Asimov is a must-read!"),
        (3, 2, "Agatha Christie's Poirot series is fantastic!"),
        (4, 3, "Jane Austen's works are timeless classics!"),
    ];

    for (community, creator, title) in THREADS {
        let id = Upsert::into_table("community_threads")
            .key("community_id", id_at(&summary.communities, *community, "community")?)
            .key("title", *title)
            .set("created_by", id_at(&summary.users, *creator, "user")?)
            .execute(conn)
            .await?;
        summary.community_threads.push(id);
    }

    for (thread, sender, body) in COMMUNITY_MESSAGES {
        let id = Upsert::into_table("community_messages")
            .key(
                "thread_id",
                id_at(&summary.community_threads, *thread, "community thread")?,
            )
            .key("sender_id", id_at(&summary.users, *sender, "user")?)
            .key("body", *body)
            .execute(conn)
            .await?;
        summary.community_messages.push(id);
    }

    debug!(
        chat_messages = summary.messages.len(),
        community_messages = summary.community_messages.len(),
        "seeded messages"
    );
    Ok(())
}

async fn seed_reviews_and_ratings(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
) -> DatabaseResult<()> {
    // (book index, reviewer index, rating, comment)
    const REVIEWS: &[(usize, usize, i64, &str)] = &[
        (0, 1, 5, "A timeless classic that everyone should read!"),
        (0, 2, 4, "Thought-provoking and well-written."),
        (1, 0, 5, "Brilliant science fiction series!"),
        (2, 3, 3, "Interesting but a bit dated."),
        (3, 4, 5, "Magical world-building at its finest!"),
        (4, 0, 4, "Scary and atmospheric."),
        (5, 1, 5, "Perfect mystery with great characters."),
        (6, 2, 4, "Classic romance with strong characters."),
        (7, 3, 3, "Good but quite long."),
        (8, 4, 4, "Fun adventure story."),
        (9, 0, 5, "Hemingway at his best!"),
        (10, 1, 4, "Great American novel."),
        (11, 2, 5, "Powerful and moving story."),
        (12, 3, 4, "Beautifully written."),
        (13, 4, 5, "Magical realism at its finest!"),
    ];
    // (exchange index, requester rates responder, rating, comment)
    const RATINGS: &[(usize, bool, i64, &str)] = &[
        (4, true, 5, "Great trade, book arrived in perfect condition!"),
        (4, false, 4, "Smooth transaction, would trade again."),
        (5, true, 5, "Excellent communication and fast shipping!"),
        (5, false, 5, "Perfect trade, highly recommend!"),
    ];

    for (book, reviewer, rating, comment) in REVIEWS {
        let id = Upsert::into_table("book_reviews")
            .key("book_id", id_at(&summary.books, *book, "book")?)
            .key("reviewer_id", id_at(&summary.users, *reviewer, "user")?)
            .set("rating", *rating)
            .set("comment", *comment)
            .execute(conn)
            .await?;
        summary.reviews.push(id);
    }

    for (exchange, requester_rates, rating, comment) in RATINGS {
        let seed = EXCHANGES.get(*exchange).ok_or_else(|| {
            DatabaseError::InternalError(format!("seed data references missing exchange #{exchange}"))
        })?;
        let requester_id = id_at(&summary.users, seed.requester, "user")?;
        let responder_id = id_at(&summary.users, seed.responder, "user")?;
        let (rater_id, rated_user_id) = if *requester_rates {
            (requester_id, responder_id)
        } else {
            (responder_id, requester_id)
        };

        let id = Upsert::into_table("user_ratings")
            .key("exchange_id", id_at(&summary.exchanges, *exchange, "exchange")?)
            .key("rater_id", rater_id)
            .key("rated_user_id", rated_user_id)
            .set("rating", *rating)
            .set("comment", *comment)
            .execute(conn)
            .await?;
        summary.ratings.push(id);
    }

    debug!(
        reviews = summary.reviews.len(),
        ratings = summary.ratings.len(),
        "seeded reviews and ratings"
    );
    Ok(())
}

async fn seed_notifications(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
) -> DatabaseResult<()> {
    let notifications = [
        (1, NotificationType::ExchangeRequestReceived, json!({"message": "You have a new exchange request", "exchange_id": 1}), false),
        (1, NotificationType::ExchangeRequestAccepted, json!({"message": "Your exchange request was accepted", "exchange_id": 2}), true),
        (2, NotificationType::ExchangeShipped, json!({"message": "Your book has been shipped", "exchange_id": 3}), false),
        (3, NotificationType::ExchangeDelivered, json!({"message": "Your book has been delivered", "exchange_id": 4}), true),
        (4, NotificationType::ExchangeCompleted, json!({"message": "Exchange completed successfully", "exchange_id": 5}), false),
        (0, NotificationType::NewMessageInExchange, json!({"message": "You have a new message", "exchange_id": 1}), false),
        (1, NotificationType::NewCommunityMessage, json!({"message": "New message in Book Lovers community", "community_id": 1}), true),
        (2, NotificationType::BookReviewReceived, json!({"message": "Someone reviewed your book", "book_id": 1}), false),
        (3, NotificationType::SubscriptionExpiringSoon, json!({"message": "Your subscription expires in 3 days", "subscription_id": 1}), false),
        (4, NotificationType::SubscriptionRenewed, json!({"message": "Your subscription has been renewed", "subscription_id": 2}), true),
        (0, NotificationType::GeneralAnnouncement, json!({"message": "New features are now available!", "announcement_id": 1}), false),
    ];

    for (user, kind, payload, read) in notifications {
        let id = Upsert::into_table("notifications")
            .key("user_id", id_at(&summary.users, user, "user")?)
            .key("type", kind.as_str())
            .set("payload", payload)
            .set("read", read)
            .execute(conn)
            .await?;
        summary.notifications.push(id);
    }

    debug!(notifications = summary.notifications.len(), "seeded notifications");
    Ok(())
}

async fn seed_moderation(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    let reported_user = id_at(&summary.users, 2, "user")?;
    let first_book = id_at(&summary.books, 0, "book")?;
    let first_exchange = id_at(&summary.exchanges, 0, "exchange")?;
    let first_message = id_at(&summary.messages, 0, "message")?;
    let first_community_message = id_at(&summary.community_messages, 0, "community message")?;

    // (reporter index, target type, target id, reason, handler index)
    let reports = [
        (0, "message", first_message, "spam", 5),
        (1, "user", reported_user, "inappropriate_behavior", 6),
        (2, "book", first_book, "misleading_description", 5),
        (3, "exchange", first_exchange, "fraud", 6),
        (4, "community_message", first_community_message, "harassment", 5),
    ];

    for (reporter, target_type, target_id, reason, handler) in reports {
        let id = Upsert::into_table("reports")
            .key("reporter_id", id_at(&summary.users, reporter, "user")?)
            .key("target_type", target_type)
            .key("target_id", target_id)
            .set("reason", reason)
            .set("metadata", json!({}))
            .set("handled_by", id_at(&summary.users, handler, "user")?)
            .set("handled_at", now)
            .execute(conn)
            .await?;
        summary.reports.push(id);
    }

    let actions = [
        ("message", first_message, "review", "routine"),
        ("user", reported_user, "warn", "inappropriate_behavior"),
        ("book", first_book, "flag", "misleading_description"),
        ("exchange", first_exchange, "investigate", "fraud"),
        ("community_message", first_community_message, "remove", "harassment"),
    ];
    let moderator = id_at(&summary.users, 6, "user")?;

    for (target_type, target_id, action, reason) in actions {
        let id = Upsert::into_table("moderation_actions")
            .key("target_type", target_type)
            .key("target_id", target_id)
            .set("action", action)
            .set("performed_by", moderator)
            .set("performed_at", now)
            .set("reason", reason)
            .set("metadata", json!({}))
            .execute(conn)
            .await?;
        summary.moderation_actions.push(id);
    }

    debug!(
        reports = summary.reports.len(),
        actions = summary.moderation_actions.len(),
        "seeded moderation"
    );
    Ok(())
}

async fn seed_activity_logs(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    let book = |index: usize| id_at(&summary.books, index, "book");
    let user = |index: usize| id_at(&summary.users, index, "user");

    // (user, action, object type, object id, payload, days ago)
    let logs = [
        (user(0)?, ActivityAction::Create, "book", book(0)?, json!({"title": "1984"}), 2),
        (user(1)?, ActivityAction::Update, "user_profile", user(1)?, json!({"bio": "Updated bio"}), 4),
        (user(2)?, ActivityAction::Delete, "book", book(15)?, json!({"title": "Archived Book 1"}), 10),
        (user(3)?, ActivityAction::Create, "exchange", id_at(&summary.exchanges, 0, "exchange")?, json!({"exchange_id": 1}), 40),
        (user(4)?, ActivityAction::Update, "subscription", id_at(&summary.subscriptions, 0, "subscription")?, json!({"status": "active"}), 45),
        (user(0)?, ActivityAction::Create, "community", id_at(&summary.communities, 0, "community")?, json!({"name": "Book Lovers"}), 20),
        (user(1)?, ActivityAction::Update, "book", book(1)?, json!({"title": "Foundation"}), 1),
        (user(2)?, ActivityAction::Delete, "message", id_at(&summary.messages, 0, "message")?, json!({"message_id": 1}), 6),
    ];

    for (user_id, action, object_type, object_id, payload, age) in logs {
        let id = Upsert::into_table("activity_logs")
            .key("action", action.as_str())
            .key("object_type", object_type)
            .key("object_id", object_id)
            .set("user_id", user_id)
            .set("payload", payload)
            .set("created_at", days_ago(now, age))
            .execute(conn)
            .await?;
        summary.activity_logs.push(id);
    }

    debug!(logs = summary.activity_logs.len(), "seeded activity logs");
    Ok(())
}

/// First day of the month `back` months before the month containing `now`.
fn month_start(now: DateTime<Utc>, back: u32) -> DatabaseResult<NaiveDate> {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|first| first.checked_sub_months(Months::new(back)))
        .ok_or_else(|| DatabaseError::InternalError("quota period out of range".to_string()))
}

async fn seed_message_quota_usage(
    conn: &mut SqliteConnection,
    summary: &mut SeedSummary,
    now: DateTime<Utc>,
) -> DatabaseResult<()> {
    // (user index, months back, messages sent)
    const USAGE: &[(usize, u32, i64)] = &[
        (0, 1, 45),
        (1, 1, 32),
        (2, 1, 28),
        (3, 1, 15),
        (4, 1, 38),
        (5, 1, 12),
        (6, 1, 8),
        (0, 2, 52),
        (1, 2, 41),
        (2, 2, 35),
    ];

    for (user, back, sent) in USAGE {
        let period_start = month_start(now, *back)?;
        let period_end = month_start(now, back - 1)?
            .pred_opt()
            .ok_or_else(|| DatabaseError::InternalError("quota period out of range".to_string()))?;

        let id = Upsert::into_table("message_quota_usages")
            .key("user_id", id_at(&summary.users, *user, "user")?)
            .key("period_start", period_start)
            .set("period_end", period_end)
            .set("messages_sent", *sent)
            .execute(conn)
            .await?;
        summary.quota_usages.push(id);
    }

    debug!(usages = summary.quota_usages.len(), "seeded message quota usage");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_periods_cover_whole_calendar_months() {
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap();
        assert_eq!(
            month_start(now, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert_eq!(
            month_start(now, 0).unwrap().pred_opt().unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
        );
        assert_eq!(
            month_start(now, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }

    #[test]
    fn seed_tables_reference_valid_indexes() {
        for book in BOOKS {
            assert!(book.owner < USERS.len());
        }
        for exchange in EXCHANGES {
            assert!(exchange.requester < USERS.len());
            assert!(exchange.responder < USERS.len());
            assert!(exchange.requester_book < BOOKS.len());
            assert!(exchange.responder_book < BOOKS.len());
        }
    }

    #[test]
    fn completed_exchanges_are_the_rated_ones() {
        let completed: Vec<usize> = EXCHANGES
            .iter()
            .enumerate()
            .filter(|(_, exchange)| exchange.status == ExchangeStatus::Completed)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(completed, vec![4, 5]);
    }
}
