//! Many-to-many link maintenance for `book_genres` and `user_preferred_genres`.

use std::collections::BTreeSet;

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use crate::types::DatabaseResult;

/// Join table linking an owner row to genres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenreLink {
    Book,
    PreferredByUser,
}

impl GenreLink {
    fn table(&self) -> &'static str {
        match self {
            GenreLink::Book => "book_genres",
            GenreLink::PreferredByUser => "user_preferred_genres",
        }
    }

    fn owner_column(&self) -> &'static str {
        match self {
            GenreLink::Book => "book_id",
            GenreLink::PreferredByUser => "user_id",
        }
    }
}

/// Removes every genre link of the owner. Returns the number of links removed.
pub async fn clear_genres(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
) -> DatabaseResult<u64> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        link.table(),
        link.owner_column()
    );
    let removed = sqlx::query(&sql)
        .bind(owner_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    debug!(table = link.table(), owner_id, removed, "cleared genre links");
    Ok(removed)
}

/// Adds links without touching existing ones. Duplicate ids are ignored.
pub async fn append_genres(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
    genre_ids: &[i64],
) -> DatabaseResult<()> {
    let unique: BTreeSet<i64> = genre_ids.iter().copied().collect();
    if unique.is_empty() {
        return Ok(());
    }

    let mut insert = QueryBuilder::<Sqlite>::new("INSERT OR IGNORE INTO ");
    insert
        .push(link.table())
        .push(" (")
        .push(link.owner_column())
        .push(", genre_id) ");
    insert.push_values(unique, |mut row, genre_id| {
        row.push_bind(owner_id).push_bind(genre_id);
    });
    insert.build().execute(&mut *conn).await?;
    Ok(())
}

/// Replaces the owner's genre set with exactly `genre_ids`.
///
/// Order and duplicates in `genre_ids` do not matter. Run it inside a
/// transaction so readers never observe the cleared set.
pub async fn replace_genres(
    conn: &mut SqliteConnection,
    link: GenreLink,
    owner_id: i64,
    genre_ids: &[i64],
) -> DatabaseResult<()> {
    clear_genres(conn, link, owner_id).await?;
    append_genres(conn, link, owner_id, genre_ids).await
}

pub async fn replace_book_genres(
    conn: &mut SqliteConnection,
    book_id: i64,
    genre_ids: &[i64],
) -> DatabaseResult<()> {
    replace_genres(conn, GenreLink::Book, book_id, genre_ids).await
}

pub async fn clear_book_genres(conn: &mut SqliteConnection, book_id: i64) -> DatabaseResult<u64> {
    clear_genres(conn, GenreLink::Book, book_id).await
}

pub async fn replace_preferred_genres(
    conn: &mut SqliteConnection,
    user_id: i64,
    genre_ids: &[i64],
) -> DatabaseResult<()> {
    replace_genres(conn, GenreLink::PreferredByUser, user_id, genre_ids).await
}
