//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Dates are ISO 8601 strings, list fields compact JSON, UUIDs hyphenated
//! lowercase strings, raw documents compact JSON text.

use chrono::NaiveDate;
use pubset_core::{
  event::{Author, CitationFields, MeshTerm, Provenance},
  record::RecordState,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── List fields ─────────────────────────────────────────────────────────────

pub fn encode_authors(authors: &[Author]) -> Result<String> {
  Ok(serde_json::to_string(authors)?)
}

pub fn decode_authors(s: &str) -> Result<Vec<Author>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_mesh_terms(terms: &[MeshTerm]) -> Result<String> {
  Ok(serde_json::to_string(terms)?)
}

pub fn decode_mesh_terms(s: &str) -> Result<Vec<MeshTerm>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_languages(languages: &[String]) -> Result<String> {
  Ok(serde_json::to_string(languages)?)
}

pub fn decode_languages(s: &str) -> Result<Vec<String>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Owned column values ready to bind into a `record_state` insert.
pub struct RecordRow {
  pub key:                String,
  pub derived_id:         String,
  pub title:              Option<String>,
  pub doi:                Option<String>,
  pub abstract_text:      Option<String>,
  pub publication_date:   String,
  pub publication_status: Option<String>,
  pub authors:            String,
  pub mesh_terms:         String,
  pub languages:          String,
  pub raw_document:       String,
  pub content_hash:       String,
  pub batch_name:         String,
  pub ingestion_ts:       i64,
}

impl RecordRow {
  pub fn from_record(record: &RecordState) -> Result<Self> {
    let f = &record.fields;
    Ok(Self {
      key:                record.key.clone(),
      derived_id:         encode_uuid(record.derived_id),
      title:              f.title.clone(),
      doi:                f.doi.clone(),
      abstract_text:      f.abstract_text.clone(),
      publication_date:   encode_date(f.publication_date),
      publication_status: f.publication_status.clone(),
      authors:            encode_authors(&f.authors)?,
      mesh_terms:         encode_mesh_terms(&f.mesh_terms)?,
      languages:          encode_languages(&f.languages)?,
      raw_document:       serde_json::to_string(&f.raw_document)?,
      content_hash:       f.content_hash.clone(),
      batch_name:         record.provenance.batch_name.clone(),
      ingestion_ts:       record.provenance.ingestion_ts,
    })
  }

  pub fn into_record(self) -> Result<RecordState> {
    Ok(RecordState {
      key:        self.key,
      derived_id: decode_uuid(&self.derived_id)?,
      fields:     CitationFields {
        title:              self.title,
        doi:                self.doi,
        abstract_text:      self.abstract_text,
        publication_date:   decode_date(&self.publication_date)?,
        publication_status: self.publication_status,
        authors:            decode_authors(&self.authors)?,
        mesh_terms:         decode_mesh_terms(&self.mesh_terms)?,
        languages:          decode_languages(&self.languages)?,
        raw_document:       serde_json::from_str(&self.raw_document)?,
        content_hash:       self.content_hash,
      },
      provenance: Provenance::new(self.batch_name, self.ingestion_ts),
    })
  }
}
