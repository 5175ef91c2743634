//! Many-to-many writes, multi-row inserts and simple filters.

use bookswap_database::{replace_book_genres, replace_preferred_genres, Book, Genre, User};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use super::simple_tasks::{insert_book, insert_user, load_book, load_user, resolve_book_refs};
use super::{NewBook, NewUser};
use crate::error::{QueryError, QueryResult};
use crate::preload::{genres_by_book, BookPreload, UserPreload};

#[derive(Debug, Clone, Serialize)]
pub struct NewImage {
    pub url: String,
    pub width: i64,
    pub height: i64,
    pub is_primary: bool,
}

/// Where a listed book is located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFilter {
    City(String),
    Country(String),
}

/// Creates a user with a profile and a set of preferred genres.
pub async fn create_user_with_genres(
    pool: &SqlitePool,
    new_user: &NewUser,
    genre_ids: &[i64],
) -> QueryResult<User> {
    let mut tx = pool.begin().await?;
    let user_id = insert_user(&mut tx, new_user, Utc::now()).await?;
    replace_preferred_genres(&mut tx, user_id, genre_ids).await?;
    tx.commit().await?;

    info!(user_id, genres = genre_ids.len(), "created user with preferred genres");
    load_user(pool, user_id, UserPreload::FULL).await
}

/// Creates a book and its images in one transaction.
pub async fn create_book_with_images(
    pool: &SqlitePool,
    owner_id: i64,
    new_book: &NewBook,
    images: &[NewImage],
) -> QueryResult<Book> {
    let (author_id, genre_ids) = resolve_book_refs(pool, new_book).await?;
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    let book_id = insert_book(&mut tx, owner_id, new_book, author_id, &genre_ids, now).await?;
    for image in images {
        sqlx::query(
            "INSERT INTO book_images (book_id, url, width, height, is_primary, uploaded_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(book_id)
        .bind(&image.url)
        .bind(image.width)
        .bind(image.height)
        .bind(image.is_primary)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!(book_id, images = images.len(), "created book with images");
    let preload = BookPreload {
        author: true,
        genres: true,
        images: true,
        ..BookPreload::default()
    };
    load_book(pool, book_id, &preload).await
}

/// Books in `like_new` condition by an existing author.
pub async fn get_like_new_books_of_author(
    pool: &SqlitePool,
    author_id: i64,
) -> QueryResult<Vec<Book>> {
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM authors WHERE id = ? AND deleted_at IS NULL")
            .bind(author_id)
            .fetch_optional(pool)
            .await?;
    if exists.is_none() {
        return Err(QueryError::not_found("author", author_id));
    }

    Ok(sqlx::query_as(
        "SELECT * FROM books
         WHERE author_id = ? AND condition = 'like_new' AND deleted_at IS NULL
         ORDER BY id",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_books_by_location(
    pool: &SqlitePool,
    filter: &LocationFilter,
) -> QueryResult<Vec<Book>> {
    let (sql, value) = match filter {
        LocationFilter::City(city) => (
            "SELECT * FROM books WHERE location_city = ? AND deleted_at IS NULL ORDER BY id",
            city,
        ),
        LocationFilter::Country(country) => (
            "SELECT * FROM books WHERE location_country = ? AND deleted_at IS NULL ORDER BY id",
            country,
        ),
    };

    Ok(sqlx::query_as(sql).bind(value).fetch_all(pool).await?)
}

pub async fn get_genres_of_book(pool: &SqlitePool, book_id: i64) -> QueryResult<Vec<Genre>> {
    Ok(genres_by_book(pool, &[book_id])
        .await?
        .remove(&book_id)
        .unwrap_or_default())
}

/// Replaces the genre set of a book and returns the stored set.
pub async fn assign_genres_to_book(
    pool: &SqlitePool,
    book_id: i64,
    genre_ids: &[i64],
) -> QueryResult<Vec<Genre>> {
    let mut tx = pool.begin().await?;
    let exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM books WHERE id = ? AND deleted_at IS NULL")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?;
    if exists.is_none() {
        return Err(QueryError::not_found("book", book_id));
    }

    replace_book_genres(&mut tx, book_id, genre_ids).await?;
    tx.commit().await?;

    get_genres_of_book(pool, book_id).await
}
