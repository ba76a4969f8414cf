//! MySQL persistence.
//!
//! [`entity_writers`] builds the batch writers the write-behind queues flush
//! through; [`api`] holds the queries behind the HTTP API; [`cleanup`]
//! removes expired rows in the background.

pub mod api;
pub mod cleanup;
pub mod error;
pub mod pool;
pub mod writers;

pub use error::{classify_write_error, mysql_error_number, DbError};
pub use pool::connect;
pub use sqlx::MySqlPool;
pub use writers::{discard_writers, entity_writers, upsert_query, DiscardWriter, MySqlWriter, Upsert};
