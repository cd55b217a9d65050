//! The `StateStore` trait and the run summary type.
//!
//! The trait is implemented by storage backends (e.g. `pubset-store-sqlite`).
//! The run orchestration and the CLI depend on this abstraction, not on any
//! concrete backend.

use std::{collections::HashMap, future::Future};

use crate::{event::Provenance, record::RecordState, resolver::Decision};

// ─── Run summary ─────────────────────────────────────────────────────────────

/// Counts reported after one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
  /// Events selected past the watermark (before conflict resolution).
  pub selected:  usize,
  /// Keys whose record state was inserted or replaced.
  pub applied:   usize,
  /// Keys whose record state was removed (or would have been — deletes of
  /// never-seen keys are counted too).
  pub deleted:   usize,
  /// Keys whose batch winner lost the staleness guard.
  pub discarded: usize,
  /// The watermark after the run committed (unchanged if nothing was
  /// selected).
  pub watermark: Option<i64>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the persistent record-state backend.
///
/// The store holds the only two shared mutable resources of the system: the
/// record-state table and the watermark. One writer at a time is the caller's
/// contract (external run-lock); the trait itself does no locking.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded async runtimes.
pub trait StateStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The highest `ingestion_ts` committed so far; `None` if the store is
  /// empty of run history (full-history mode).
  fn watermark(
    &self,
  ) -> impl Future<Output = Result<Option<i64>, Self::Error>> + Send + '_;

  /// Stored provenance for each of `keys` that currently has record state.
  /// Keys without state are simply absent from the result.
  fn provenance_for(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<HashMap<String, Provenance>, Self::Error>> + Send + '_;

  /// Retrieve one record by key. `None` means never seen or deleted.
  fn get_record<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<RecordState>, Self::Error>> + Send + 'a;

  /// All current record state, ordered by key. Downstream fan-outs and tests
  /// read through this.
  fn list_records(
    &self,
  ) -> impl Future<Output = Result<Vec<RecordState>, Self::Error>> + Send + '_;

  /// Apply one run's decisions and advance the watermark, atomically.
  ///
  /// Inserts-or-replaces every `Apply`, removes every `Delete` (absence is
  /// not an error), ignores `Discard`, then advances the watermark to
  /// `new_watermark` — all in a single unit of work. On any failure nothing
  /// is visible and the watermark is unmoved, so a retried run re-selects
  /// the same batch and re-derives identical decisions.
  ///
  /// The watermark never moves backward: a `new_watermark` at or below the
  /// stored value leaves it unchanged.
  fn apply_run(
    &self,
    decisions: Vec<Decision>,
    new_watermark: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
