//! Basic reads and writes against single tables and their direct relations.

use std::collections::HashMap;

use bookswap_database::{
    replace_book_genres, Author, BillingInterval, Book, BookCondition, SubscriptionPlan, User,
    UserProfile,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{QueryError, QueryResult};
use crate::preload::{push_id_list, users_by_id, BookPreload, UserPreload};

/// Account and profile fields for a new user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
}

/// Profile fields changed by [`update_user_profile`].
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub avatar_url: String,
}

/// A book listing; the author and genres are referenced by name.
#[derive(Debug, Clone, Serialize)]
pub struct NewBook {
    pub title: String,
    pub description: Option<String>,
    pub condition: BookCondition,
    pub active: bool,
    pub author_name: Option<String>,
    pub genre_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewPlan {
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub interval: BillingInterval,
    pub features: serde_json::Value,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreSummary {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// One book of a joined read with its genres folded in.
#[derive(Debug, Clone, Serialize)]
pub struct BookWithGenres {
    pub id: i64,
    pub title: String,
    pub email: String,
    pub owner_avatar: Option<String>,
    pub author_name: Option<String>,
    pub genres: Vec<GenreSummary>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BookGenreNames {
    pub id: i64,
    pub title: String,
    pub author_name: Option<String>,
    /// Comma separated, alphabetical.
    pub genre_names: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileSummary {
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub phone: String,
    #[serde(rename = "userProfile")]
    pub user_profile: ProfileSummary,
}

/// Inserts the user row and its profile. The caller owns the transaction.
pub(crate) async fn insert_user(
    conn: &mut SqliteConnection,
    new_user: &NewUser,
    now: DateTime<Utc>,
) -> QueryResult<i64> {
    let user_id = sqlx::query(
        "INSERT INTO users (email, phone, password_hash, created_at, updated_at)
         VALUES (?, ?, '', ?, ?)",
    )
    .bind(&new_user.email)
    .bind(&new_user.phone)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    sqlx::query(
        "INSERT INTO user_profiles (user_id, first_name, last_name, bio, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.bio)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(user_id)
}

/// Loads one non-deleted user with the requested relations.
pub(crate) async fn load_user(
    pool: &SqlitePool,
    user_id: i64,
    preload: UserPreload,
) -> QueryResult<User> {
    users_by_id(pool, &[user_id], preload)
        .await?
        .remove(&user_id)
        .ok_or_else(|| QueryError::not_found("user", user_id))
}

/// Loads one non-deleted book with the requested relations.
pub(crate) async fn load_book(
    pool: &SqlitePool,
    book_id: i64,
    preload: &BookPreload,
) -> QueryResult<Book> {
    let mut book: Book =
        sqlx::query_as("SELECT * FROM books WHERE id = ? AND deleted_at IS NULL")
            .bind(book_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| QueryError::not_found("book", book_id))?;

    preload
        .apply(pool, std::slice::from_mut(&mut book))
        .await?;
    Ok(book)
}

/// Creates a user together with its profile in one transaction.
pub async fn create_user(pool: &SqlitePool, new_user: &NewUser) -> QueryResult<User> {
    let mut tx = pool.begin().await?;
    let user_id = insert_user(&mut tx, new_user, Utc::now()).await?;
    tx.commit().await?;

    info!(user_id, email = %new_user.email, "created user");
    load_user(pool, user_id, UserPreload::PROFILE).await
}

pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> QueryResult<User> {
    sqlx::query_as("SELECT * FROM users WHERE email = ? AND deleted_at IS NULL ORDER BY id LIMIT 1")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| QueryError::not_found("user", email))
}

/// Changes the first name and avatar on a user's profile.
pub async fn update_user_profile(
    pool: &SqlitePool,
    user_id: i64,
    update: &ProfileUpdate,
) -> QueryResult<UserProfile> {
    let updated = sqlx::query(
        "UPDATE user_profiles SET first_name = ?, avatar_url = ?, updated_at = ?
         WHERE user_id = ? AND deleted_at IS NULL",
    )
    .bind(&update.first_name)
    .bind(&update.avatar_url)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(QueryError::not_found("user profile", user_id));
    }

    Ok(
        sqlx::query_as("SELECT * FROM user_profiles WHERE user_id = ? AND deleted_at IS NULL")
            .bind(user_id)
            .fetch_one(pool)
            .await?,
    )
}

/// Soft deletes a user. Returns the number of rows affected.
pub async fn delete_user(pool: &SqlitePool, user_id: i64) -> QueryResult<u64> {
    let now = Utc::now();
    let affected = sqlx::query(
        "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await?
    .rows_affected();

    info!(user_id, affected, "soft deleted user");
    Ok(affected)
}

/// Returns the author with this name, creating it when missing.
pub async fn create_author(pool: &SqlitePool, name: &str) -> QueryResult<Author> {
    let existing: Option<Author> =
        sqlx::query_as("SELECT * FROM authors WHERE name = ? AND deleted_at IS NULL")
            .bind(name)
            .fetch_optional(pool)
            .await?;
    if let Some(author) = existing {
        return Ok(author);
    }

    let now = Utc::now();
    let author_id = sqlx::query("INSERT INTO authors (name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?
        .last_insert_rowid();

    debug!(author_id, name, "created author");
    Ok(sqlx::query_as("SELECT * FROM authors WHERE id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await?)
}

/// Resolves the author and genre names of a listing to ids.
pub(crate) async fn resolve_book_refs(
    pool: &SqlitePool,
    new_book: &NewBook,
) -> QueryResult<(Option<i64>, Vec<i64>)> {
    let author_id = match &new_book.author_name {
        Some(name) => Some(
            sqlx::query_scalar::<_, i64>(
                "SELECT id FROM authors WHERE name = ? AND deleted_at IS NULL",
            )
            .bind(name)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| QueryError::not_found("author", name))?,
        ),
        None => None,
    };

    if new_book.genre_names.is_empty() {
        return Ok((author_id, Vec::new()));
    }

    let mut query =
        QueryBuilder::<Sqlite>::new("SELECT id FROM genres WHERE deleted_at IS NULL AND name IN (");
    let mut separated = query.separated(", ");
    for name in &new_book.genre_names {
        separated.push_bind(name.clone());
    }
    separated.push_unseparated(") ORDER BY id");
    let genre_ids = query.build_query_scalar::<i64>().fetch_all(pool).await?;

    Ok((author_id, genre_ids))
}

/// Inserts the book row and its genre links. The caller owns the transaction.
pub(crate) async fn insert_book(
    conn: &mut SqliteConnection,
    owner_id: i64,
    new_book: &NewBook,
    author_id: Option<i64>,
    genre_ids: &[i64],
    now: DateTime<Utc>,
) -> QueryResult<i64> {
    let book_id = sqlx::query(
        "INSERT INTO books (owner_id, title, description, author_id, condition, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(owner_id)
    .bind(&new_book.title)
    .bind(&new_book.description)
    .bind(author_id)
    .bind(new_book.condition)
    .bind(new_book.active)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    replace_book_genres(conn, book_id, genre_ids).await?;
    Ok(book_id)
}

/// Creates a book for `owner_id`, resolving its author and genres by name.
pub async fn create_book(pool: &SqlitePool, owner_id: i64, new_book: &NewBook) -> QueryResult<Book> {
    let (author_id, genre_ids) = resolve_book_refs(pool, new_book).await?;

    let mut tx = pool.begin().await?;
    let book_id = insert_book(&mut tx, owner_id, new_book, author_id, &genre_ids, Utc::now()).await?;
    tx.commit().await?;

    info!(book_id, owner_id, genres = genre_ids.len(), "created book");
    let preload = BookPreload {
        author: true,
        genres: true,
        ..BookPreload::default()
    };
    load_book(pool, book_id, &preload).await
}

/// Books of an owner with author, owner profile, genres and images loaded.
pub async fn get_books_of_user(pool: &SqlitePool, owner_id: i64) -> QueryResult<Vec<Book>> {
    let mut books: Vec<Book> =
        sqlx::query_as("SELECT * FROM books WHERE owner_id = ? AND deleted_at IS NULL ORDER BY id")
            .bind(owner_id)
            .fetch_all(pool)
            .await?;

    let preload = BookPreload {
        owner: Some(UserPreload::PROFILE),
        author: true,
        genres: true,
        images: true,
        ..BookPreload::default()
    };
    preload.apply(pool, &mut books).await?;
    Ok(books)
}

#[derive(FromRow)]
struct FlatBookRow {
    book_id: i64,
    title: String,
    email: String,
    owner_avatar: Option<String>,
    author_name: Option<String>,
    genre_id: i64,
    genre_name: String,
    genre_slug: String,
}

/// Folds one-row-per-genre results into books, keeping first-seen order.
fn fold_book_rows(rows: Vec<FlatBookRow>) -> Vec<BookWithGenres> {
    let mut books: Vec<BookWithGenres> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for row in rows {
        let position = *positions.entry(row.book_id).or_insert_with(|| {
            books.push(BookWithGenres {
                id: row.book_id,
                title: row.title.clone(),
                email: row.email.clone(),
                owner_avatar: row.owner_avatar.clone(),
                author_name: row.author_name.clone(),
                genres: Vec::new(),
            });
            books.len() - 1
        });

        books[position].genres.push(GenreSummary {
            id: row.genre_id,
            name: row.genre_name,
            slug: row.genre_slug,
        });
    }

    books
}

/// Books of an owner from a single joined read. Books without genres are
/// left out by the inner join.
pub async fn get_books_of_user_flat(
    pool: &SqlitePool,
    owner_id: i64,
) -> QueryResult<Vec<BookWithGenres>> {
    let rows: Vec<FlatBookRow> = sqlx::query_as(
        r#"
        SELECT b.id AS book_id,
               b.title,
               u.email,
               p.avatar_url AS owner_avatar,
               a.name AS author_name,
               g.id AS genre_id,
               g.name AS genre_name,
               g.slug AS genre_slug
        FROM books b
        JOIN users u ON u.id = b.owner_id
        LEFT JOIN user_profiles p ON p.user_id = u.id AND p.deleted_at IS NULL
        LEFT JOIN authors a ON a.id = b.author_id
        JOIN book_genres bg ON bg.book_id = b.id
        JOIN genres g ON g.id = bg.genre_id AND g.deleted_at IS NULL
        WHERE b.owner_id = ? AND b.deleted_at IS NULL
        ORDER BY b.id, g.name
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(fold_book_rows(rows))
}

/// Books of an owner with their genre names joined into one string.
pub async fn get_books_of_user_with_genre_str(
    pool: &SqlitePool,
    owner_id: i64,
) -> QueryResult<Vec<BookGenreNames>> {
    Ok(sqlx::query_as(
        r#"
        SELECT b.id,
               b.title,
               a.name AS author_name,
               (SELECT GROUP_CONCAT(name, ', ')
                  FROM (SELECT DISTINCT g.name AS name
                          FROM book_genres bg
                          JOIN genres g ON g.id = bg.genre_id
                         WHERE bg.book_id = b.id AND g.deleted_at IS NULL
                         ORDER BY g.name)) AS genre_names
        FROM books b
        LEFT JOIN authors a ON a.id = b.author_id
        WHERE b.owner_id = ? AND b.deleted_at IS NULL
        ORDER BY b.id
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?)
}

/// A book with its owner (profile and preferred genres), author and genres.
pub async fn get_book_by_id(pool: &SqlitePool, book_id: i64) -> QueryResult<Book> {
    let preload = BookPreload {
        owner: Some(UserPreload::FULL),
        author: true,
        genres: true,
        ..BookPreload::default()
    };
    load_book(pool, book_id, &preload).await
}

/// Distinct users preferring any of `genre_ids`.
pub async fn get_users_by_preferred_genres(
    pool: &SqlitePool,
    genre_ids: &[i64],
) -> QueryResult<Vec<User>> {
    if genre_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT DISTINCT users.* FROM users
         JOIN user_preferred_genres pg ON pg.user_id = users.id
         WHERE users.deleted_at IS NULL AND pg.genre_id IN ",
    );
    push_id_list(&mut query, genre_ids);
    query.push(" ORDER BY users.id");

    let mut users = query.build_query_as::<User>().fetch_all(pool).await?;
    UserPreload::FULL.apply(pool, &mut users).await?;
    Ok(users)
}

/// Returns the plan with this slug, creating it when missing.
pub async fn create_subscription_plan(
    pool: &SqlitePool,
    plan: &NewPlan,
) -> QueryResult<SubscriptionPlan> {
    let existing: Option<SubscriptionPlan> =
        sqlx::query_as("SELECT * FROM subscription_plans WHERE slug = ? AND deleted_at IS NULL")
            .bind(&plan.slug)
            .fetch_optional(pool)
            .await?;
    if let Some(found) = existing {
        return Ok(found);
    }

    let now = Utc::now();
    let plan_id = sqlx::query(
        "INSERT INTO subscription_plans
            (slug, name, description, price_cents, currency, interval, features, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&plan.slug)
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(plan.price_cents)
    .bind(&plan.currency)
    .bind(plan.interval)
    .bind(plan.features.to_string())
    .bind(plan.active)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    info!(plan_id, slug = %plan.slug, "created subscription plan");
    Ok(sqlx::query_as("SELECT * FROM subscription_plans WHERE id = ?")
        .bind(plan_id)
        .fetch_one(pool)
        .await?)
}

#[derive(FromRow)]
struct UserSummaryRow {
    email: String,
    phone: String,
    bio: Option<String>,
    avatar_url: Option<String>,
}

/// Email and phone of the first user with a nested profile summary.
pub async fn get_first_user_summary(pool: &SqlitePool) -> QueryResult<UserSummary> {
    let row: UserSummaryRow = sqlx::query_as(
        "SELECT u.email, u.phone, p.bio, p.avatar_url
         FROM users u
         LEFT JOIN user_profiles p ON p.user_id = u.id AND p.deleted_at IS NULL
         WHERE u.deleted_at IS NULL
         ORDER BY u.id
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| QueryError::not_found("user", "first"))?;

    Ok(UserSummary {
        email: row.email,
        phone: row.phone,
        user_profile: ProfileSummary {
            bio: row.bio,
            avatar_url: row.avatar_url,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(book_id: i64, genre_id: i64, genre: &str) -> FlatBookRow {
        FlatBookRow {
            book_id,
            title: format!("book {book_id}"),
            email: "owner@example.com".to_string(),
            owner_avatar: None,
            author_name: Some("Author".to_string()),
            genre_id,
            genre_name: genre.to_string(),
            genre_slug: genre.to_lowercase(),
        }
    }

    #[test]
    fn folding_groups_genres_in_first_seen_order() {
        let books = fold_book_rows(vec![
            row(7, 1, "Fiction"),
            row(3, 4, "Fantasy"),
            row(7, 3, "Science Fiction"),
        ]);

        assert_eq!(books.len(), 2);
        assert_eq!(books[0].id, 7);
        assert_eq!(books[1].id, 3);
        let names: Vec<&str> = books[0].genres.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Fiction", "Science Fiction"]);
    }

    #[test]
    fn user_summary_nests_profile_under_camel_case_key() {
        let summary = UserSummary {
            email: "a@example.com".to_string(),
            phone: "1".to_string(),
            user_profile: ProfileSummary {
                bio: Some("bio".to_string()),
                avatar_url: None,
            },
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["userProfile"]["bio"], "bio");
    }
}
