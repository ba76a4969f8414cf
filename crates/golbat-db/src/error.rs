use golbat_writebehind::{WriteError, MYSQL_DEADLOCK};
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to connect to database at {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("fence needs at least three points, got {0}")]
    InvalidFence(usize),
}

impl DbError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DbError {
        move |source| DbError::Query { operation, source }
    }
}

/// MySQL error number carried by a driver error, if any.
pub fn mysql_error_number(err: &sqlx::Error) -> Option<u16> {
    match err {
        sqlx::Error::Database(db) => db
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|e| e.number()),
        _ => None,
    }
}

/// Deadlocks are retried by the queue; everything else fails the batch.
pub fn classify_write_error(table: &str, err: sqlx::Error) -> WriteError {
    if mysql_error_number(&err) == Some(MYSQL_DEADLOCK) {
        return WriteError::Deadlock(format!("{}: {}", table, err));
    }
    WriteError::Other(anyhow::Error::new(err).context(format!("upsert into {}", table)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_terminal() {
        let err = classify_write_error("pokemon", sqlx::Error::PoolTimedOut);
        assert!(!err.is_deadlock());
        assert!(err.to_string().contains("upsert into pokemon"));
        assert_eq!(mysql_error_number(&sqlx::Error::RowNotFound), None);
    }
}
