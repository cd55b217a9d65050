//! Batch selection — the watermark filter that makes runs incremental.

use crate::event::Event;

/// Select the unprocessed portion of `events` for one run.
///
/// Retains events whose `ingestion_ts` is strictly greater than `watermark`;
/// a `None` watermark (empty state store, first run) selects everything.
/// This is a pure filter — no deduplication happens here.
pub fn select_batch(events: Vec<Event>, watermark: Option<i64>) -> Vec<Event> {
  match watermark {
    None => events,
    Some(w) => events
      .into_iter()
      .filter(|e| e.provenance.ingestion_ts > w)
      .collect(),
  }
}
