//! Event normalizer for the pubset deduplication engine.
//!
//! Classifies one raw ingested document (PubMed XML already converted to
//! nested JSON upstream) as an upsert or a delete, extracts the natural key,
//! and — for upserts — projects the canonical field set. Pure synchronous;
//! no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use pubset_core::Provenance;
//! use pubset_normalize::normalize;
//!
//! let doc = serde_json::json!({"MedlineCitation": {"PMID": "123456"}});
//! let events = normalize(&doc, Provenance::new("pubmed24n0001.xml.gz", 1)).unwrap();
//! println!("{} event(s)", events.len());
//! ```

pub mod error;
mod normalize;

pub use error::{Error, Result};
use pubset_core::event::{Event, Provenance};
use serde::Deserialize;

// ─── Ingestion envelope ──────────────────────────────────────────────────────

/// The shape of one ingested record as it lands in the bronze layer: the raw
/// nested document plus its provenance fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
  /// Source file identifier; lexicographically sortable.
  pub file_name:    String,
  /// Monotonic load time.
  pub ingestion_ts: i64,
  /// The nested document, kept opaque.
  pub raw_data:     serde_json::Value,
}

impl Envelope {
  pub fn provenance(&self) -> Provenance {
    Provenance::new(self.file_name.clone(), self.ingestion_ts)
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Normalize one raw document into events.
///
/// A citation document yields one upsert event; a delete document yields one
/// delete event per referenced key (never collapsed). Returns
/// [`Error::MalformedRecord`] when no key can be extracted — the caller is
/// expected to skip and report such records without failing the batch.
pub fn normalize(
  doc: &serde_json::Value,
  provenance: Provenance,
) -> Result<Vec<Event>> {
  normalize::normalize_one(doc, &provenance)
}

/// Normalize one ingestion envelope.
pub fn normalize_envelope(envelope: &Envelope) -> Result<Vec<Event>> {
  normalize::normalize_one(&envelope.raw_data, &envelope.provenance())
}
