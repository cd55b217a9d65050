//! `pubset` — batch runner for the pubset citation state store.
//!
//! # Usage
//!
//! ```
//! pubset --store ./pubset.db pubmed24n1001.ndjson pubmed24n1002.ndjson
//! pubset --config pubset.toml --dry-run pubmed24n1001.ndjson
//! ```
//!
//! Each input file is NDJSON: one ingestion envelope per line, shaped as
//! `{"file_name": …, "ingestion_ts": …, "raw_data": {…}}`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use pubset_core::{
  event::{Event, EventKind},
  run::run_batch,
  store::StateStore as _,
  views::{expand_authors, expand_mesh_terms, knowledge_rows},
};
use pubset_normalize::{Envelope, normalize_envelope};
use pubset_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "pubset",
  about = "Incremental deduplication runner for citation event batches"
)]
struct Args {
  /// Path to the SQLite state store (created on first use).
  #[arg(long, env = "PUBSET_STORE", value_name = "FILE")]
  store: Option<PathBuf>,

  /// Path to a TOML config file (store, language).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Language allow-list for the knowledge view. An empty value disables the
  /// filter.
  #[arg(long, env = "PUBSET_LANGUAGE")]
  language: Option<String>,

  /// Normalize and count only; do not touch the store.
  #[arg(long)]
  dry_run: bool,

  /// NDJSON files of ingestion envelopes.
  #[arg(value_name = "EVENTS", required = true)]
  inputs: Vec<PathBuf>,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  store:    String,
  #[serde(default)]
  language: String,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  // Load config file if provided.
  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let language = args
    .language
    .or_else(|| (!file_cfg.language.is_empty()).then(|| file_cfg.language.clone()))
    .unwrap_or_else(|| "eng".to_string());

  let (events, skipped) = read_events(&args.inputs)?;
  let upserts = events
    .iter()
    .filter(|e| matches!(e.kind, EventKind::Upsert(_)))
    .count();
  let deletes = events.len() - upserts;

  if args.dry_run {
    println!(
      "dry run: {} event(s) ({upserts} upsert, {deletes} delete), {skipped} \
       record(s) skipped",
      events.len()
    );
    return Ok(());
  }

  let store_path = args
    .store
    .or_else(|| (!file_cfg.store.is_empty()).then(|| PathBuf::from(&file_cfg.store)))
    .context("no store path: pass --store or set `store` in the config file")?;

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("opening store {}", store_path.display()))?;

  info!(
    events = events.len(),
    upserts, deletes, skipped, "normalized input"
  );

  let summary = run_batch(&store, events).await.context("running batch")?;

  // Report the downstream view sizes over the post-run state.
  let records = store.list_records().await.context("listing records")?;
  let author_rows: usize = records.iter().map(|r| expand_authors(r).len()).sum();
  let mesh_rows: usize = records.iter().map(|r| expand_mesh_terms(r).len()).sum();
  let knowledge = knowledge_rows(&records, Some(language.as_str())).len();
  info!(
    records = records.len(),
    author_rows, mesh_rows, knowledge, language = %language, "state after run"
  );

  println!(
    "selected {} | applied {} | deleted {} | discarded {} | watermark {}",
    summary.selected,
    summary.applied,
    summary.deleted,
    summary.discarded,
    summary
      .watermark
      .map_or_else(|| "none".to_string(), |w| w.to_string()),
  );
  Ok(())
}

// ─── Input reading ────────────────────────────────────────────────────────────

/// Read and normalize every envelope line across the input files.
///
/// Unparseable lines and records without an extractable key are skipped with
/// a warning; they never fail the batch. Returns the events plus the skip
/// count.
fn read_events(inputs: &[PathBuf]) -> Result<(Vec<Event>, usize)> {
  let mut events = Vec::new();
  let mut skipped = 0usize;

  for path in inputs {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading {}", path.display()))?;

    for (idx, line) in raw.lines().enumerate() {
      let line = line.trim();
      if line.is_empty() {
        continue;
      }

      let envelope: Envelope = match serde_json::from_str(line) {
        Ok(envelope) => envelope,
        Err(error) => {
          warn!(
            file = %path.display(),
            line = idx + 1,
            %error,
            "skipping unparseable envelope"
          );
          skipped += 1;
          continue;
        }
      };

      match normalize_envelope(&envelope) {
        Ok(mut batch) => events.append(&mut batch),
        Err(error) => {
          warn!(
            file = %path.display(),
            line = idx + 1,
            %error,
            "skipping malformed record"
          );
          skipped += 1;
        }
      }
    }
  }

  Ok((events, skipped))
}
