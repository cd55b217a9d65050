//! Conflict resolution — the algorithmic core.
//!
//! Given one batch of events (possibly several per key) and the provenance of
//! already-persisted state, decide for each key the single action to apply.
//! The source system expressed this as window-function ranking ("rank per
//! key, take rank 1"); here it is a grouping pass followed by an explicit
//! max-by-comparator, which keeps the tie-break determinism visible.

use std::collections::{BTreeMap, HashMap};

use crate::event::{CitationFields, Event, EventKind, Provenance};

// ─── Decisions ───────────────────────────────────────────────────────────────

/// What to do for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
  /// Insert-or-replace the record state with this field set.
  Apply(Box<CitationFields>),
  /// Remove the record state row if present (idempotent).
  Delete,
  /// The batch winner lost the staleness guard; state is untouched.
  Discard,
}

/// The resolver's verdict for one key in one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
  pub key:        String,
  /// Provenance of the group winner (also stored on applied state).
  pub provenance: Provenance,
  pub action:     Action,
}

impl Decision {
  pub fn is_apply(&self) -> bool { matches!(self.action, Action::Apply(_)) }

  pub fn is_delete(&self) -> bool { matches!(self.action, Action::Delete) }
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve one batch into per-key decisions.
///
/// `existing` maps keys already in the state store to their stored
/// provenance; the resolver only needs entries for keys present in `batch`.
///
/// Per key:
/// 1. The group winner is the event with the greatest
///    `(batch_name, ingestion_ts)` provenance. Events identical on both are
///    ordered by input position — the later observation wins. Deterministic
///    by construction, never random.
/// 2. A winning delete shadows every other event for the key, including
///    earlier upserts; an earlier delete shadowed by a later upsert must not
///    delete. Deletes for never-seen keys still resolve to [`Action::Delete`]
///    (a store no-op) so they count as processed for the watermark.
/// 3. A winning upsert is applied only if its provenance is strictly greater
///    than the persisted one (or no state exists); otherwise the whole group
///    is discarded — an older or equal-aged record never overwrites newer
///    persisted state, even across reprocessed batches.
///
/// Output is ordered by key, so identical inputs yield identical output.
pub fn resolve(
  batch: Vec<Event>,
  existing: &HashMap<String, Provenance>,
) -> Vec<Decision> {
  // Group by key, carrying the input index for the final tie-break.
  let mut groups: BTreeMap<String, Vec<(usize, Event)>> = BTreeMap::new();
  for (idx, event) in batch.into_iter().enumerate() {
    groups.entry(event.key.clone()).or_default().push((idx, event));
  }

  let mut decisions = Vec::with_capacity(groups.len());
  for (key, group) in groups {
    let (_, winner) = group
      .into_iter()
      .max_by(|(ia, a), (ib, b)| {
        a.provenance
          .cmp(&b.provenance)
          .then(ia.cmp(ib))
      })
      .expect("group is never empty");

    let action = match winner.kind {
      EventKind::Delete => Action::Delete,
      EventKind::Upsert(fields) => match existing.get(&key) {
        Some(stored) if winner.provenance <= *stored => {
          tracing::debug!(
            key = %key,
            winner = ?winner.provenance,
            stored = ?stored,
            "stale upsert discarded"
          );
          Action::Discard
        }
        _ => Action::Apply(fields),
      },
    };

    decisions.push(Decision {
      key,
      provenance: winner.provenance,
      action,
    });
  }

  decisions
}
