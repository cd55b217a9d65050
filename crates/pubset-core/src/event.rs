//! Event types — the fundamental unit of the ingestion stream.
//!
//! An event is an immutable observation about one citation at a point in
//! provenance. Multiple events may share a key; the conflict resolver decides
//! which one is authoritative.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Where and when an event entered the system.
///
/// Provenance totally orders events for one key: `batch_name` is the primary
/// key (lexicographic — a later-sorting source file carries more recent data),
/// `ingestion_ts` breaks ties. The [`Ord`] impl below is the single source
/// of truth for "newer"; the resolver and the staleness guard both use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
  /// Lexicographically sortable source file identifier.
  pub batch_name:   String,
  /// Monotonic load time; also the watermark cursor.
  pub ingestion_ts: i64,
}

impl Provenance {
  pub fn new(batch_name: impl Into<String>, ingestion_ts: i64) -> Self {
    Self {
      batch_name: batch_name.into(),
      ingestion_ts,
    }
  }
}

impl Ord for Provenance {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .batch_name
      .cmp(&other.batch_name)
      .then(self.ingestion_ts.cmp(&other.ingestion_ts))
  }
}

impl PartialOrd for Provenance {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

// ─── Payload sub-types ───────────────────────────────────────────────────────

/// One entry of an upsert's author list (source order preserved).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub last_name:   Option<String>,
  pub fore_name:   Option<String>,
  pub initials:    Option<String>,
  /// First affiliation if the source carries any (object or array form).
  pub affiliation: Option<String>,
}

/// One MeSH heading of an upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshTerm {
  pub descriptor_name: Option<String>,
  /// Stable MeSH code (`@UI` attribute), when the source carries one.
  pub descriptor_ui:   Option<String>,
}

// ─── CitationFields ──────────────────────────────────────────────────────────

/// The full extracted field set of an upsert event.
///
/// List-valued fields are always list-shaped: the normalizer wraps a single
/// source object in a singleton and maps absence to empty, so consumers never
/// branch on object-vs-array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationFields {
  pub title:              Option<String>,
  pub doi:                Option<String>,
  pub abstract_text:      Option<String>,
  /// Never absent — the normalizer's date policy guarantees a value
  /// (1900-01-01 in the worst case).
  pub publication_date:   NaiveDate,
  pub publication_status: Option<String>,
  pub authors:            Vec<Author>,
  pub mesh_terms:         Vec<MeshTerm>,
  pub languages:          Vec<String>,
  /// The original nested document, kept opaque.
  pub raw_document:       serde_json::Value,
  /// SHA-256 hex digest of the compact raw document serialization.
  pub content_hash:       String,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// The two observation kinds the engine understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "lowercase")]
pub enum EventKind {
  /// Asserts the record's full current field values.
  Upsert(Box<CitationFields>),
  /// Asserts the record should no longer exist. Only key and provenance
  /// matter; there is no payload.
  Delete,
}

impl EventKind {
  pub fn is_delete(&self) -> bool { matches!(self, Self::Delete) }
}

/// One immutable observation about a citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  /// Natural identifier (PMID) — treated as an opaque unique string.
  pub key:        String,
  pub provenance: Provenance,
  pub kind:       EventKind,
}
