//! Downstream fan-out views — pure 1:N expansions of record state.
//!
//! These carry no state of their own; consumers call them over whatever
//! [`RecordState`] rows the store returns.

use serde::Serialize;
use uuid::Uuid;

use crate::record::{RecordState, derived_id_from_parts};

// ─── Authors ─────────────────────────────────────────────────────────────────

/// One row of the per-author expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRow {
  pub key:         String,
  pub derived_id:  Uuid,
  /// Deterministic identifier over (last_name, fore_name, initials).
  pub author_id:   Uuid,
  /// 1-based ordinal preserving source order.
  pub rank:        u32,
  pub last_name:   Option<String>,
  pub fore_name:   Option<String>,
  pub initials:    Option<String>,
  pub affiliation: Option<String>,
}

/// Expand a record into one row per author, in source order.
pub fn expand_authors(record: &RecordState) -> Vec<AuthorRow> {
  record
    .fields
    .authors
    .iter()
    .enumerate()
    .map(|(i, a)| AuthorRow {
      key:         record.key.clone(),
      derived_id:  record.derived_id,
      author_id:   derived_id_from_parts(&[
        a.last_name.as_deref(),
        a.fore_name.as_deref(),
        a.initials.as_deref(),
      ]),
      rank:        (i + 1) as u32,
      last_name:   a.last_name.clone(),
      fore_name:   a.fore_name.clone(),
      initials:    a.initials.clone(),
      affiliation: a.affiliation.clone(),
    })
    .collect()
}

// ─── MeSH terms ──────────────────────────────────────────────────────────────

/// One row of the per-MeSH-heading expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshRow {
  pub key:             String,
  pub derived_id:      Uuid,
  /// Deterministic identifier from the stable code when present, else the
  /// display name.
  pub term_id:         Uuid,
  pub descriptor_name: Option<String>,
  pub descriptor_ui:   Option<String>,
}

/// Expand a record into one row per MeSH heading.
pub fn expand_mesh_terms(record: &RecordState) -> Vec<MeshRow> {
  record
    .fields
    .mesh_terms
    .iter()
    .map(|t| {
      let id_source = t
        .descriptor_ui
        .as_deref()
        .or(t.descriptor_name.as_deref());
      MeshRow {
        key:             record.key.clone(),
        derived_id:      record.derived_id,
        term_id:         derived_id_from_parts(&[id_source]),
        descriptor_name: t.descriptor_name.clone(),
        descriptor_ui:   t.descriptor_ui.clone(),
      }
    })
    .collect()
}

// ─── Knowledge view ──────────────────────────────────────────────────────────

/// Filter records down to the "knowledge" view: non-null abstract, and —
/// when `language` is a non-empty allow-list value — a matching language
/// code. An unset or empty `language` skips the language filter entirely.
pub fn knowledge_rows<'a>(
  records: &'a [RecordState],
  language: Option<&str>,
) -> Vec<&'a RecordState> {
  let language = language.filter(|l| !l.is_empty());
  records
    .iter()
    .filter(|r| r.fields.abstract_text.is_some())
    .filter(|r| match language {
      None => true,
      Some(lang) => r.fields.languages.iter().any(|l| l == lang),
    })
    .collect()
}
