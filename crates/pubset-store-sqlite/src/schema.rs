//! SQL schema for the pubset SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The single authoritative row per key. Absence of a row means the key was
-- never seen or has been deleted. Writes are insert-or-replace only; partial
-- column updates are never issued.
CREATE TABLE IF NOT EXISTS record_state (
    key                TEXT PRIMARY KEY,
    derived_id         TEXT NOT NULL,    -- UUID derived from key; stable
    title              TEXT,
    doi                TEXT,
    abstract_text      TEXT,
    publication_date   TEXT NOT NULL,    -- ISO 8601 date; never NULL
    publication_status TEXT,
    authors            TEXT NOT NULL DEFAULT '[]',  -- JSON array
    mesh_terms         TEXT NOT NULL DEFAULT '[]',  -- JSON array
    languages          TEXT NOT NULL DEFAULT '[]',  -- JSON array
    raw_document       TEXT NOT NULL,    -- original nested document, JSON
    content_hash       TEXT NOT NULL,    -- SHA-256 hex of raw_document
    batch_name         TEXT NOT NULL,    -- provenance of the winning event
    ingestion_ts       INTEGER NOT NULL
);

-- Process-wide watermark: the highest ingestion_ts committed so far.
-- Single row, written in the same transaction as the run's decisions.
CREATE TABLE IF NOT EXISTS watermark (
    id           INTEGER PRIMARY KEY CHECK (id = 1),
    ingestion_ts INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS record_state_provenance_idx
    ON record_state(batch_name, ingestion_ts);

PRAGMA user_version = 1;
";
