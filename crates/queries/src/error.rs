//! Error types for the query examples

use bookswap_database::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("user {user_id} already has an active subscription (id={subscription_id})")]
    ActiveSubscriptionExists { user_id: i64, subscription_id: i64 },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        QueryError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            QueryError::NotFound { .. } => true,
            QueryError::Database(error) => error.is_not_found(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(error: sqlx::Error) -> Self {
        QueryError::Database(DatabaseError::from(error))
    }
}

pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_renders_entity_and_key() {
        let error = QueryError::not_found("book", 42);
        assert_eq!(error.to_string(), "book not found: 42");
        assert!(error.is_not_found());
    }

    #[test]
    fn sqlx_errors_are_wrapped() {
        let error = QueryError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, QueryError::Database(_)));
        assert!(error.is_not_found());
    }
}
