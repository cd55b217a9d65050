//! [`SqliteStore`] — the SQLite implementation of [`StateStore`].

use std::{collections::HashMap, path::Path};

use pubset_core::{
  event::Provenance,
  record::RecordState,
  resolver::{Action, Decision},
  store::StateStore,
};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::RecordRow,
  schema::SCHEMA,
};

const RECORD_COLUMNS: &str = "key, derived_id, title, doi, abstract_text, \
                              publication_date, publication_status, authors, \
                              mesh_terms, languages, raw_document, \
                              content_hash, batch_name, ingestion_ts";

fn row_to_record_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
  Ok(RecordRow {
    key:                row.get(0)?,
    derived_id:         row.get(1)?,
    title:              row.get(2)?,
    doi:                row.get(3)?,
    abstract_text:      row.get(4)?,
    publication_date:   row.get(5)?,
    publication_status: row.get(6)?,
    authors:            row.get(7)?,
    mesh_terms:         row.get(8)?,
    languages:          row.get(9)?,
    raw_document:       row.get(10)?,
    content_hash:       row.get(11)?,
    batch_name:         row.get(12)?,
    ingestion_ts:       row.get(13)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A pubset state store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Exactly one
/// writer process at a time is the caller's contract; the store serializes
/// its own statements on one connection but takes no cross-process lock.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run arbitrary SQL against the underlying connection. Tests use this to
  /// inject failures (e.g. an aborting trigger) mid-run.
  #[cfg(test)]
  pub(crate) async fn execute_raw(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── StateStore impl ─────────────────────────────────────────────────────────

impl StateStore for SqliteStore {
  type Error = Error;

  async fn watermark(&self) -> Result<Option<i64>> {
    let value: Option<i64> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT ingestion_ts FROM watermark WHERE id = 1",
              [],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn provenance_for(
    &self,
    keys: Vec<String>,
  ) -> Result<HashMap<String, Provenance>> {
    let found: Vec<(String, String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key, batch_name, ingestion_ts FROM record_state WHERE key = ?1",
        )?;
        let mut rows = Vec::new();
        for key in &keys {
          let hit: Option<(String, String, i64)> = stmt
            .query_row(rusqlite::params![key], |r| {
              Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .optional()?;
          if let Some(hit) = hit {
            rows.push(hit);
          }
        }
        Ok(rows)
      })
      .await?;

    Ok(
      found
        .into_iter()
        .map(|(key, batch_name, ingestion_ts)| {
          (key, Provenance::new(batch_name, ingestion_ts))
        })
        .collect(),
    )
  }

  async fn get_record(&self, key: &str) -> Result<Option<RecordState>> {
    let key = key.to_owned();
    let raw: Option<RecordRow> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RECORD_COLUMNS} FROM record_state WHERE key = ?1"),
              rusqlite::params![key],
              row_to_record_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RecordRow::into_record).transpose()
  }

  async fn list_records(&self) -> Result<Vec<RecordState>> {
    let raws: Vec<RecordRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RECORD_COLUMNS} FROM record_state ORDER BY key"
        ))?;
        let rows = stmt
          .query_map([], row_to_record_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RecordRow::into_record).collect()
  }

  async fn apply_run(
    &self,
    decisions: Vec<Decision>,
    new_watermark: i64,
  ) -> Result<()> {
    // Encode outside the connection closure; serialization failures abort
    // before anything touches the database.
    let mut upserts: Vec<RecordRow> = Vec::new();
    let mut deletes: Vec<String> = Vec::new();
    for decision in decisions {
      match decision.action {
        Action::Apply(fields) => {
          let record =
            RecordState::from_winner(decision.key, *fields, decision.provenance);
          upserts.push(RecordRow::from_record(&record)?);
        }
        Action::Delete => deletes.push(decision.key),
        Action::Discard => {}
      }
    }

    self
      .conn
      .call(move |conn| {
        // One failure unit: decisions and watermark commit or roll back
        // together, so a retried run re-selects the same batch.
        let tx = conn.transaction()?;

        for row in &upserts {
          tx.execute(
            "INSERT OR REPLACE INTO record_state (
               key, derived_id, title, doi, abstract_text,
               publication_date, publication_status, authors,
               mesh_terms, languages, raw_document,
               content_hash, batch_name, ingestion_ts
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            rusqlite::params![
              row.key,
              row.derived_id,
              row.title,
              row.doi,
              row.abstract_text,
              row.publication_date,
              row.publication_status,
              row.authors,
              row.mesh_terms,
              row.languages,
              row.raw_document,
              row.content_hash,
              row.batch_name,
              row.ingestion_ts,
            ],
          )?;
        }

        // Absence is not an error — a delete of a never-seen key is a no-op.
        for key in &deletes {
          tx.execute(
            "DELETE FROM record_state WHERE key = ?1",
            rusqlite::params![key],
          )?;
        }

        // MAX() keeps the watermark from ever moving backward, even when a
        // caller replays an old batch.
        tx.execute(
          "INSERT INTO watermark (id, ingestion_ts) VALUES (1, ?1)
           ON CONFLICT(id) DO UPDATE
           SET ingestion_ts = MAX(ingestion_ts, excluded.ingestion_ts)",
          rusqlite::params![new_watermark],
        )?;

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
