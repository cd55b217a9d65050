//! One end-to-end run: select, resolve, commit.
//!
//! The watermark is an explicit value read from and written through the
//! store — never process-global state — so runs compose in tests with
//! synthetic watermarks.

use crate::{
  batch::select_batch,
  event::Event,
  resolver::{Action, resolve},
  store::{RunSummary, StateStore},
};

/// Process one batch of events against `store`.
///
/// Reads the current watermark, selects unprocessed events, resolves
/// per-key decisions against existing state, and commits the write set plus
/// the new watermark as one atomic unit. The committed watermark is the
/// maximum `ingestion_ts` across the *selected* events — shadowed and
/// discarded events count as processed, so they are never re-selected.
///
/// An empty selection is a no-op: nothing is written and the watermark does
/// not move.
pub async fn run_batch<S: StateStore>(
  store: &S,
  events: Vec<Event>,
) -> Result<RunSummary, S::Error> {
  let watermark = store.watermark().await?;
  let batch = select_batch(events, watermark);

  if batch.is_empty() {
    tracing::info!(?watermark, "no events past watermark; nothing to do");
    return Ok(RunSummary {
      watermark,
      ..RunSummary::default()
    });
  }

  let selected = batch.len();
  let max_ts = batch
    .iter()
    .map(|e| e.provenance.ingestion_ts)
    .max()
    .expect("batch is non-empty");

  let keys: Vec<String> = {
    let mut keys: Vec<String> = batch.iter().map(|e| e.key.clone()).collect();
    keys.sort_unstable();
    keys.dedup();
    keys
  };
  let existing = store.provenance_for(keys).await?;

  let decisions = resolve(batch, &existing);

  let mut applied = 0usize;
  let mut deleted = 0usize;
  let mut discarded = 0usize;
  for d in &decisions {
    match d.action {
      Action::Apply(_) => applied += 1,
      Action::Delete => deleted += 1,
      Action::Discard => discarded += 1,
    }
  }

  store.apply_run(decisions, max_ts).await?;

  let summary = RunSummary {
    selected,
    applied,
    deleted,
    discarded,
    watermark: Some(max_ts.max(watermark.unwrap_or(i64::MIN))),
  };
  tracing::info!(
    selected = summary.selected,
    applied = summary.applied,
    deleted = summary.deleted,
    discarded = summary.discarded,
    watermark = ?summary.watermark,
    "run committed"
  );
  Ok(summary)
}
