//! Eager loading of related rows.
//!
//! Relations are loaded with one `IN (...)` query per relation and stitched
//! onto the parent rows in memory, so loading the genres of fifty books costs
//! one query, not fifty.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use bookswap_database::{
    Author, Book, BookImage, BookReview, Genre, SubscriptionPlan, User, UserProfile,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::QueryResult;

/// Whether soft-deleted rows take part in a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// Rows with `deleted_at` set are invisible.
    #[default]
    Default,
    /// Every row is visible.
    Unscoped,
}

impl Scope {
    pub(crate) fn push_filter(self, builder: &mut QueryBuilder<'_, Sqlite>, table: &str) {
        if self == Scope::Default {
            builder.push(" AND ").push(table).push(".deleted_at IS NULL");
        }
    }
}

/// Sorted, deduplicated ids.
pub(crate) fn unique_ids(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Pushes `(?, ?, ...)` binding every id.
pub(crate) fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    builder.push("(");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

fn group_by<K: Eq + Hash, V>(rows: impl IntoIterator<Item = (K, V)>) -> HashMap<K, Vec<V>> {
    let mut grouped: HashMap<K, Vec<V>> = HashMap::new();
    for (key, value) in rows {
        grouped.entry(key).or_default().push(value);
    }
    grouped
}

async fn fetch_where_in<T>(
    pool: &SqlitePool,
    select: &str,
    table: &str,
    column: &str,
    ids: &[i64],
    scope: Scope,
    order_by: &str,
) -> QueryResult<Vec<T>>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(select);
    query.push(" WHERE ").push(table).push(".").push(column).push(" IN ");
    push_id_list(&mut query, ids);
    scope.push_filter(&mut query, table);
    query.push(" ORDER BY ").push(order_by);

    Ok(query.build_query_as::<T>().fetch_all(pool).await?)
}

#[derive(FromRow)]
struct LinkedGenre {
    owner_id: i64,
    #[sqlx(flatten)]
    genre: Genre,
}

async fn linked_genres(
    pool: &SqlitePool,
    join_table: &str,
    owner_column: &str,
    owner_ids: &[i64],
) -> QueryResult<HashMap<i64, Vec<Genre>>> {
    let select = format!(
        "SELECT link.{owner_column} AS owner_id, genres.* FROM genres \
         JOIN {join_table} link ON link.genre_id = genres.id"
    );
    let rows: Vec<LinkedGenre> = fetch_where_in(
        pool,
        &select,
        "link",
        owner_column,
        owner_ids,
        Scope::Unscoped,
        "genres.name, genres.id",
    )
    .await?;

    Ok(group_by(
        rows.into_iter()
            .filter(|row| row.genre.deleted_at.is_none())
            .map(|row| (row.owner_id, row.genre)),
    ))
}

/// Genres of each book, ordered by name.
pub async fn genres_by_book(
    pool: &SqlitePool,
    book_ids: &[i64],
) -> QueryResult<HashMap<i64, Vec<Genre>>> {
    linked_genres(pool, "book_genres", "book_id", &unique_ids(book_ids.iter().copied())).await
}

/// Preferred genres of each user, ordered by name.
pub async fn preferred_genres_by_user(
    pool: &SqlitePool,
    user_ids: &[i64],
) -> QueryResult<HashMap<i64, Vec<Genre>>> {
    linked_genres(
        pool,
        "user_preferred_genres",
        "user_id",
        &unique_ids(user_ids.iter().copied()),
    )
    .await
}

pub async fn profiles_by_user(
    pool: &SqlitePool,
    user_ids: &[i64],
) -> QueryResult<HashMap<i64, UserProfile>> {
    let profiles: Vec<UserProfile> = fetch_where_in(
        pool,
        "SELECT user_profiles.* FROM user_profiles",
        "user_profiles",
        "user_id",
        &unique_ids(user_ids.iter().copied()),
        Scope::Default,
        "user_profiles.id",
    )
    .await?;

    Ok(profiles
        .into_iter()
        .map(|profile| (profile.user_id, profile))
        .collect())
}

pub async fn authors_by_id(
    pool: &SqlitePool,
    author_ids: &[i64],
) -> QueryResult<HashMap<i64, Author>> {
    let authors: Vec<Author> = fetch_where_in(
        pool,
        "SELECT authors.* FROM authors",
        "authors",
        "id",
        &unique_ids(author_ids.iter().copied()),
        Scope::Default,
        "authors.id",
    )
    .await?;

    Ok(authors.into_iter().map(|author| (author.id, author)).collect())
}

pub async fn plans_by_id(
    pool: &SqlitePool,
    plan_ids: &[i64],
) -> QueryResult<HashMap<i64, SubscriptionPlan>> {
    let plans: Vec<SubscriptionPlan> = fetch_where_in(
        pool,
        "SELECT subscription_plans.* FROM subscription_plans",
        "subscription_plans",
        "id",
        &unique_ids(plan_ids.iter().copied()),
        Scope::Default,
        "subscription_plans.id",
    )
    .await?;

    Ok(plans.into_iter().map(|plan| (plan.id, plan)).collect())
}

pub async fn images_by_book(
    pool: &SqlitePool,
    book_ids: &[i64],
    scope: Scope,
) -> QueryResult<HashMap<i64, Vec<BookImage>>> {
    let images: Vec<BookImage> = fetch_where_in(
        pool,
        "SELECT book_images.* FROM book_images",
        "book_images",
        "book_id",
        &unique_ids(book_ids.iter().copied()),
        scope,
        "book_images.is_primary DESC, book_images.id",
    )
    .await?;

    Ok(group_by(images.into_iter().map(|image| (image.book_id, image))))
}

pub async fn reviews_by_book(
    pool: &SqlitePool,
    book_ids: &[i64],
    scope: Scope,
) -> QueryResult<HashMap<i64, Vec<BookReview>>> {
    let reviews: Vec<BookReview> = fetch_where_in(
        pool,
        "SELECT book_reviews.* FROM book_reviews",
        "book_reviews",
        "book_id",
        &unique_ids(book_ids.iter().copied()),
        scope,
        "book_reviews.id",
    )
    .await?;

    Ok(group_by(reviews.into_iter().map(|review| (review.book_id, review))))
}

/// Relations attached to loaded users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPreload {
    pub profile: bool,
    pub preferred_genres: bool,
}

impl UserPreload {
    pub const NONE: UserPreload = UserPreload {
        profile: false,
        preferred_genres: false,
    };

    pub const PROFILE: UserPreload = UserPreload {
        profile: true,
        preferred_genres: false,
    };

    pub const FULL: UserPreload = UserPreload {
        profile: true,
        preferred_genres: true,
    };

    pub async fn apply(self, pool: &SqlitePool, users: &mut [User]) -> QueryResult<()> {
        let ids: Vec<i64> = users.iter().map(|user| user.id).collect();

        if self.profile {
            let mut profiles = profiles_by_user(pool, &ids).await?;
            for user in users.iter_mut() {
                user.profile = profiles.remove(&user.id);
            }
        }

        if self.preferred_genres {
            let genres = preferred_genres_by_user(pool, &ids).await?;
            for user in users.iter_mut() {
                user.preferred_genres = genres.get(&user.id).cloned().unwrap_or_default();
            }
        }

        Ok(())
    }
}

/// Loads non-deleted users by id with the requested relations.
pub async fn users_by_id(
    pool: &SqlitePool,
    user_ids: &[i64],
    preload: UserPreload,
) -> QueryResult<HashMap<i64, User>> {
    let mut users: Vec<User> = fetch_where_in(
        pool,
        "SELECT users.* FROM users",
        "users",
        "id",
        &unique_ids(user_ids.iter().copied()),
        Scope::Default,
        "users.id",
    )
    .await?;

    preload.apply(pool, &mut users).await?;
    Ok(users.into_iter().map(|user| (user.id, user)).collect())
}

/// Relations attached to loaded books.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookPreload {
    pub owner: Option<UserPreload>,
    pub author: bool,
    pub genres: bool,
    pub images: bool,
    pub reviews: bool,
    /// Scope applied to images and reviews.
    pub scope: Scope,
}

impl BookPreload {
    pub async fn apply(&self, pool: &SqlitePool, books: &mut [Book]) -> QueryResult<()> {
        let book_ids: Vec<i64> = books.iter().map(|book| book.id).collect();

        if let Some(owner_preload) = self.owner {
            let owner_ids: Vec<i64> = books.iter().map(|book| book.owner_id).collect();
            let owners = users_by_id(pool, &owner_ids, owner_preload).await?;
            for book in books.iter_mut() {
                book.owner = owners.get(&book.owner_id).cloned().map(Box::new);
            }
        }

        if self.author {
            let author_ids: Vec<i64> = books.iter().filter_map(|book| book.author_id).collect();
            let authors = authors_by_id(pool, &author_ids).await?;
            for book in books.iter_mut() {
                book.author = book.author_id.and_then(|id| authors.get(&id).cloned());
            }
        }

        if self.genres {
            let mut genres = genres_by_book(pool, &book_ids).await?;
            for book in books.iter_mut() {
                book.genres = genres.remove(&book.id).unwrap_or_default();
            }
        }

        if self.images {
            let mut images = images_by_book(pool, &book_ids, self.scope).await?;
            for book in books.iter_mut() {
                book.images = images.remove(&book.id).unwrap_or_default();
            }
        }

        if self.reviews {
            let mut reviews = reviews_by_book(pool, &book_ids, self.scope).await?;
            for book in books.iter_mut() {
                book.reviews = reviews.remove(&book.id).unwrap_or_default();
            }
        }

        Ok(())
    }
}

/// Loads books by id with the requested relations. Soft-deleted books are
/// skipped.
pub async fn books_by_id(
    pool: &SqlitePool,
    book_ids: &[i64],
    preload: &BookPreload,
) -> QueryResult<HashMap<i64, Book>> {
    let mut books: Vec<Book> = fetch_where_in(
        pool,
        "SELECT books.* FROM books",
        "books",
        "id",
        &unique_ids(book_ids.iter().copied()),
        Scope::Default,
        "books.id",
    )
    .await?;

    preload.apply(pool, &mut books).await?;
    Ok(books.into_iter().map(|book| (book.id, book)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_ids_sorts_and_deduplicates() {
        assert_eq!(unique_ids([3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(unique_ids(Vec::new()).is_empty());
    }

    #[test]
    fn id_lists_bind_every_id() {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT id FROM books WHERE id IN ");
        push_id_list(&mut builder, &[1, 2, 3]);
        assert_eq!(builder.sql(), "SELECT id FROM books WHERE id IN (?, ?, ?)");
    }

    #[test]
    fn default_scope_hides_deleted_rows() {
        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM books WHERE 1 = 1");
        Scope::Default.push_filter(&mut builder, "books");
        assert_eq!(
            builder.sql(),
            "SELECT * FROM books WHERE 1 = 1 AND books.deleted_at IS NULL"
        );

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM books WHERE 1 = 1");
        Scope::Unscoped.push_filter(&mut builder, "books");
        assert_eq!(builder.sql(), "SELECT * FROM books WHERE 1 = 1");
    }
}
