//! Error type for `pubset-store-sqlite`.
//!
//! Any failure surfacing from [`crate::SqliteStore::apply_run`] is a
//! run-level write failure: the transaction has rolled back, the watermark is
//! unmoved, and the run is safe to retry.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
