//! Error types for the pubset-normalize crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The document carries neither a citation nor a delete discriminant.
  #[error("unrecognized document: expected MedlineCitation or DeleteCitation")]
  UnrecognizedDocument,

  /// No key could be extracted from an upsert or delete document.
  #[error("malformed record: {0}")]
  MalformedRecord(String),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
