//! Get-existing-or-create keyed by a natural (non primary key) condition.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::trace;

use crate::types::DatabaseResult;

/// A column value bound into an upsert statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Null,
}

impl Value {
    fn push_bind(self, builder: &mut QueryBuilder<'_, Sqlite>) {
        match self {
            Value::Int(v) => builder.push_bind(v),
            Value::Real(v) => builder.push_bind(v),
            Value::Text(v) => builder.push_bind(v),
            Value::Bool(v) => builder.push_bind(v),
            Value::Timestamp(v) => builder.push_bind(v),
            Value::Date(v) => builder.push_bind(v),
            Value::Null => builder.push("NULL"),
        };
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Text(value.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Upsert of a single row.
///
/// The lookup ignores soft deletion. A matching row gets the assigned columns
/// overwritten, its `updated_at` refreshed and `deleted_at` cleared; otherwise
/// a row is inserted from the key and assigned columns. Running the same
/// upsert twice leaves exactly one row.
///
/// ```no_run
/// # async fn demo(conn: &mut sqlx::SqliteConnection) -> bookswap_database::DatabaseResult<()> {
/// use bookswap_database::Upsert;
///
/// let genre_id = Upsert::into_table("genres")
///     .key("slug", "fantasy")
///     .set("name", "Fantasy")
///     .execute(conn)
///     .await?;
/// # let _ = genre_id;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Upsert {
    table: &'static str,
    keys: Vec<(&'static str, Value)>,
    assignments: Vec<(&'static str, Value)>,
}

impl Upsert {
    pub fn into_table(table: &'static str) -> Self {
        Self {
            table,
            keys: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Adds a column to the natural key.
    pub fn key(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.keys.push((column, value.into()));
        self
    }

    /// Adds a column written on both insert and update.
    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    fn assigns(&self, column: &str) -> bool {
        self.assignments.iter().any(|(name, _)| *name == column)
    }

    /// Runs the upsert and returns the id of the matched or inserted row.
    pub async fn execute(self, conn: &mut SqliteConnection) -> DatabaseResult<i64> {
        let now = Utc::now();

        let mut lookup = QueryBuilder::<Sqlite>::new("SELECT id FROM ");
        lookup.push(self.table).push(" WHERE ");
        for (index, (column, value)) in self.keys.iter().enumerate() {
            if index > 0 {
                lookup.push(" AND ");
            }
            lookup.push(*column);
            if *value == Value::Null {
                lookup.push(" IS NULL");
            } else {
                lookup.push(" = ");
                value.clone().push_bind(&mut lookup);
            }
        }
        if self.keys.is_empty() {
            lookup.push("1 = 1");
        }
        lookup.push(" ORDER BY id LIMIT 1");

        let existing: Option<i64> = lookup
            .build_query_scalar()
            .fetch_optional(&mut *conn)
            .await?;

        if let Some(id) = existing {
            let mut update = QueryBuilder::<Sqlite>::new("UPDATE ");
            update.push(self.table).push(" SET ");
            for (column, value) in self.assignments {
                update.push(column).push(" = ");
                value.push_bind(&mut update);
                update.push(", ");
            }
            update.push("updated_at = ");
            update.push_bind(now);
            update.push(", deleted_at = NULL WHERE id = ");
            update.push_bind(id);
            update.build().execute(&mut *conn).await?;

            trace!(table = self.table, id, "upsert matched existing row");
            return Ok(id);
        }

        let stamp_created = !self.assigns("created_at");
        let table = self.table;
        let columns: Vec<(&'static str, Value)> =
            self.keys.into_iter().chain(self.assignments).collect();

        let mut insert = QueryBuilder::<Sqlite>::new("INSERT INTO ");
        insert.push(table).push(" (");
        for (column, _) in &columns {
            insert.push(*column).push(", ");
        }
        if stamp_created {
            insert.push("created_at, ");
        }
        insert.push("updated_at) VALUES (");
        for (_, value) in columns {
            value.push_bind(&mut insert);
            insert.push(", ");
        }
        if stamp_created {
            insert.push_bind(now);
            insert.push(", ");
        }
        insert.push_bind(now);
        insert.push(")");

        let id = insert
            .build()
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();

        trace!(table, id, "upsert inserted row");
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::{Connection, SqliteConnection};

    async fn scratch_connection() -> SqliteConnection {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE widgets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL,
                label TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn
    }

    #[tokio::test]
    async fn upsert_inserts_then_updates_in_place() {
        let mut conn = scratch_connection().await;

        let first = Upsert::into_table("widgets")
            .key("code", "w-1")
            .set("label", "first")
            .execute(&mut conn)
            .await
            .unwrap();
        let second = Upsert::into_table("widgets")
            .key("code", "w-1")
            .set("label", "second")
            .execute(&mut conn)
            .await
            .unwrap();

        assert_eq!(first, second);
        let (count, label): (i64, String) =
            sqlx::query_as("SELECT COUNT(*), MAX(label) FROM widgets")
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(count, 1);
        assert_eq!(label, "second");
    }

    #[tokio::test]
    async fn upsert_restores_soft_deleted_rows() {
        let mut conn = scratch_connection().await;

        let id = Upsert::into_table("widgets")
            .key("code", "w-2")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("UPDATE widgets SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut conn)
            .await
            .unwrap();

        let again = Upsert::into_table("widgets")
            .key("code", "w-2")
            .execute(&mut conn)
            .await
            .unwrap();

        assert_eq!(id, again);
        let deleted: Option<String> =
            sqlx::query_scalar("SELECT deleted_at FROM widgets WHERE id = ?")
                .bind(id)
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert!(deleted.is_none());
    }

    #[tokio::test]
    async fn null_keys_match_with_is_null() {
        let mut conn = scratch_connection().await;

        let first = Upsert::into_table("widgets")
            .key("code", "w-3")
            .key("label", Option::<String>::None)
            .execute(&mut conn)
            .await
            .unwrap();
        let second = Upsert::into_table("widgets")
            .key("code", "w-3")
            .key("label", Option::<String>::None)
            .execute(&mut conn)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn explicit_created_at_is_not_stamped_twice() {
        let mut conn = scratch_connection().await;
        let backdated = Utc::now() - chrono::Duration::days(40);

        let id = Upsert::into_table("widgets")
            .key("code", "w-4")
            .set("created_at", backdated)
            .execute(&mut conn)
            .await
            .unwrap();

        let created: DateTime<Utc> =
            sqlx::query_scalar("SELECT created_at FROM widgets WHERE id = ?")
                .bind(id)
                .fetch_one(&mut conn)
                .await
                .unwrap();
        assert_eq!(created, backdated);
    }
}
