//! Record state — the single authoritative row per key, plus the
//! deterministic identifier derivation used by downstream joins.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::event::{CitationFields, Provenance};

// ─── Derived identifiers ─────────────────────────────────────────────────────

/// Deterministic secondary identifier for a key.
///
/// SHA-256 of the key string, truncated to 16 bytes and read as a UUID.
/// Stable across runs and process restarts, so downstream joins never depend
/// on storage-internal identifiers.
pub fn derived_id(key: &str) -> Uuid {
  let digest = Sha256::digest(key.as_bytes());
  let mut bytes = [0u8; 16];
  bytes.copy_from_slice(&digest[..16]);
  Uuid::from_bytes(bytes)
}

/// Deterministic identifier over an ordered set of name parts.
///
/// Parts are hashed with a `\x1f` separator and a `\x00` marker for absent
/// parts, so `("a", None)` and `("", Some(""))` cannot collide.
pub fn derived_id_from_parts(parts: &[Option<&str>]) -> Uuid {
  let mut hasher = Sha256::new();
  for part in parts {
    match part {
      Some(p) => hasher.update(p.as_bytes()),
      None => hasher.update([0u8]),
    }
    hasher.update([0x1fu8]);
  }
  let digest = hasher.finalize();
  let mut bytes = [0u8; 16];
  bytes.copy_from_slice(&digest[..16]);
  Uuid::from_bytes(bytes)
}

// ─── RecordState ─────────────────────────────────────────────────────────────

/// The current authoritative view of one key, as persisted.
///
/// At most one row exists per key at any time; absence means the key was
/// never seen or has been deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordState {
  pub key:        String,
  pub derived_id: Uuid,
  pub fields:     CitationFields,
  /// Provenance of the winning event — the staleness guard compares against
  /// this on subsequent runs.
  pub provenance: Provenance,
}

impl RecordState {
  /// Build state from a winning upsert. `derived_id` is recomputed from the
  /// key, never carried over.
  pub fn from_winner(
    key: impl Into<String>,
    fields: CitationFields,
    provenance: Provenance,
  ) -> Self {
    let key = key.into();
    let derived_id = derived_id(&key);
    Self {
      key,
      derived_id,
      fields,
      provenance,
    }
  }
}
