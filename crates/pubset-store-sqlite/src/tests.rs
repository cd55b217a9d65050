//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use pubset_core::{
  event::{CitationFields, Event, EventKind, Provenance},
  record::derived_id,
  resolver::{Action, Decision},
  run::run_batch,
  store::StateStore,
};
use pubset_normalize::normalize;
use serde_json::json;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fields(title: &str) -> Box<CitationFields> {
  Box::new(CitationFields {
    title:              Some(title.to_string()),
    doi:                Some("10.1000/demo".to_string()),
    abstract_text:      Some("An abstract.".to_string()),
    publication_date:   NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
    publication_status: Some("MEDLINE".to_string()),
    authors:            vec![],
    mesh_terms:         vec![],
    languages:          vec!["eng".to_string()],
    raw_document:       json!({"MedlineCitation": {"PMID": "x"}}),
    content_hash:       "deadbeef".to_string(),
  })
}

fn upsert(key: &str, batch: &str, ts: i64, title: &str) -> Event {
  Event {
    key:        key.to_string(),
    provenance: Provenance::new(batch, ts),
    kind:       EventKind::Upsert(fields(title)),
  }
}

fn delete(key: &str, batch: &str, ts: i64) -> Event {
  Event {
    key:        key.to_string(),
    provenance: Provenance::new(batch, ts),
    kind:       EventKind::Delete,
  }
}

fn title_of(record: &pubset_core::record::RecordState) -> &str {
  record.fields.title.as_deref().unwrap_or_default()
}

// ─── Watermark ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_has_no_watermark() {
  let s = store().await;
  assert_eq!(s.watermark().await.unwrap(), None);
}

#[tokio::test]
async fn watermark_advances_with_committed_run() {
  let s = store().await;
  let summary = run_batch(&s, vec![upsert("1", "file0001", 10, "a")])
    .await
    .unwrap();
  assert_eq!(summary.watermark, Some(10));
  assert_eq!(s.watermark().await.unwrap(), Some(10));
}

#[tokio::test]
async fn watermark_never_moves_backward() {
  let s = store().await;
  s.apply_run(vec![], 100).await.unwrap();
  s.apply_run(vec![], 50).await.unwrap();
  assert_eq!(s.watermark().await.unwrap(), Some(100));
}

// ─── Record round-trip ───────────────────────────────────────────────────────

#[tokio::test]
async fn apply_and_get_record() {
  let s = store().await;
  run_batch(&s, vec![upsert("123", "file0001", 10, "Title")])
    .await
    .unwrap();

  let record = s.get_record("123").await.unwrap().expect("record exists");
  assert_eq!(record.key, "123");
  assert_eq!(record.derived_id, derived_id("123"));
  assert_eq!(title_of(&record), "Title");
  assert_eq!(record.fields.languages, vec!["eng"]);
  assert_eq!(
    record.fields.publication_date,
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
  );
  assert_eq!(record.provenance, Provenance::new("file0001", 10));
  assert_eq!(
    record.fields.raw_document,
    json!({"MedlineCitation": {"PMID": "x"}})
  );
}

#[tokio::test]
async fn get_record_missing_returns_none() {
  let s = store().await;
  assert!(s.get_record("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn replace_is_full_not_a_merge() {
  let s = store().await;
  run_batch(&s, vec![upsert("1", "file0001", 10, "old")])
    .await
    .unwrap();

  let mut replacement = fields("new");
  replacement.doi = None;
  replacement.abstract_text = None;
  run_batch(&s, vec![Event {
    key:        "1".to_string(),
    provenance: Provenance::new("file0002", 20),
    kind:       EventKind::Upsert(replacement),
  }])
  .await
  .unwrap();

  let record = s.get_record("1").await.unwrap().unwrap();
  assert_eq!(title_of(&record), "new");
  // Fields absent from the replacement payload are gone, not inherited.
  assert!(record.fields.doi.is_none());
  assert!(record.fields.abstract_text.is_none());
}

// ─── Upsert / delete sequencing ──────────────────────────────────────────────

#[tokio::test]
async fn upsert_then_delete_across_runs() {
  let s = store().await;

  // Batch A: upsert for key "100" at (file0001, t=10).
  run_batch(&s, vec![upsert("100", "file0001", 10, "alive")])
    .await
    .unwrap();
  assert!(s.get_record("100").await.unwrap().is_some());

  // Batch B: delete for key "100" at (file0002, t=20).
  let summary = run_batch(&s, vec![delete("100", "file0002", 20)])
    .await
    .unwrap();
  assert_eq!(summary.deleted, 1);
  assert!(s.get_record("100").await.unwrap().is_none());
  assert_eq!(s.watermark().await.unwrap(), Some(20));
}

#[tokio::test]
async fn delete_of_never_seen_key_is_a_processed_no_op() {
  let s = store().await;
  let summary = run_batch(&s, vec![delete("ghost", "file0001", 10)])
    .await
    .unwrap();
  assert_eq!(summary.deleted, 1);
  assert_eq!(s.watermark().await.unwrap(), Some(10));
  assert!(s.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_upsert_across_runs_is_discarded() {
  let s = store().await;
  run_batch(&s, vec![upsert("1", "file0009", 10, "authoritative")])
    .await
    .unwrap();

  // Newer load time, older batch name: selected but discarded.
  let summary = run_batch(&s, vec![upsert("1", "file0002", 20, "stale")])
    .await
    .unwrap();
  assert_eq!(summary.selected, 1);
  assert_eq!(summary.discarded, 1);
  assert_eq!(summary.applied, 0);

  let record = s.get_record("1").await.unwrap().unwrap();
  assert_eq!(title_of(&record), "authoritative");
  // The discarded event still counts as processed.
  assert_eq!(s.watermark().await.unwrap(), Some(20));
}

// ─── Idempotence & incrementality ────────────────────────────────────────────

#[tokio::test]
async fn rerunning_the_same_events_selects_nothing() {
  let s = store().await;
  let events = || {
    vec![
      upsert("1", "file0001", 10, "a"),
      delete("2", "file0001", 11),
    ]
  };

  let first = run_batch(&s, events()).await.unwrap();
  assert_eq!(first.selected, 2);

  let second = run_batch(&s, events()).await.unwrap();
  assert_eq!(second.selected, 0);
  assert_eq!(second.watermark, Some(11));
  assert_eq!(s.list_records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn replaying_decisions_without_watermark_advance_is_idempotent() {
  let s = store().await;
  let decisions = vec![
    Decision {
      key:        "1".to_string(),
      provenance: Provenance::new("file0001", 10),
      action:     Action::Apply(fields("same")),
    },
    Decision {
      key:        "2".to_string(),
      provenance: Provenance::new("file0001", 10),
      action:     Action::Delete,
    },
  ];

  s.apply_run(decisions.clone(), 10).await.unwrap();
  let once = s.list_records().await.unwrap();

  s.apply_run(decisions, 10).await.unwrap();
  let twice = s.list_records().await.unwrap();

  assert_eq!(once, twice);
  assert_eq!(s.watermark().await.unwrap(), Some(10));
}

#[tokio::test]
async fn failed_run_rolls_back_records_and_watermark() {
  let s = store().await;
  run_batch(&s, vec![upsert("1", "file0001", 10, "kept")])
    .await
    .unwrap();

  // Make every row deletion abort, so a run mixing an upsert and a delete
  // fails partway through its transaction.
  s.execute_raw(
    "CREATE TRIGGER reject_deletes BEFORE DELETE ON record_state
     BEGIN SELECT RAISE(ABORT, 'injected'); END;",
  )
  .await
  .unwrap();

  let decisions = vec![
    Decision {
      key:        "2".to_string(),
      provenance: Provenance::new("file0002", 20),
      action:     Action::Apply(fields("phantom")),
    },
    Decision {
      key:        "1".to_string(),
      provenance: Provenance::new("file0002", 20),
      action:     Action::Delete,
    },
  ];
  assert!(s.apply_run(decisions, 20).await.is_err());

  s.execute_raw("DROP TRIGGER reject_deletes").await.unwrap();

  // Nothing from the failed run is visible: the upsert that succeeded
  // inside the transaction is gone, the delete never happened, and the
  // watermark is unmoved — so a retry re-selects the same batch.
  assert!(s.get_record("2").await.unwrap().is_none());
  let kept = s.get_record("1").await.unwrap().expect("row survives");
  assert_eq!(title_of(&kept), "kept");
  assert_eq!(s.watermark().await.unwrap(), Some(10));
}

#[tokio::test]
async fn provenance_for_reports_only_known_keys() {
  let s = store().await;
  run_batch(&s, vec![upsert("1", "file0001", 10, "a")])
    .await
    .unwrap();

  let existing = s
    .provenance_for(vec!["1".to_string(), "2".to_string()])
    .await
    .unwrap();
  assert_eq!(existing.len(), 1);
  assert_eq!(existing["1"], Provenance::new("file0001", 10));
}

// ─── Within-batch conflict resolution, end to end ────────────────────────────

#[tokio::test]
async fn batch_name_dominates_within_one_run() {
  let s = store().await;
  run_batch(&s, vec![
    upsert("200", "file0005", 5, "winner"),
    upsert("200", "file0003", 50, "loser"),
  ])
  .await
  .unwrap();

  let record = s.get_record("200").await.unwrap().unwrap();
  assert_eq!(title_of(&record), "winner");
  assert_eq!(record.provenance.batch_name, "file0005");
  // Watermark covers every selected event, not just the winner.
  assert_eq!(s.watermark().await.unwrap(), Some(50));
}

#[tokio::test]
async fn latest_delete_wins_within_one_run() {
  let s = store().await;
  run_batch(&s, vec![
    upsert("300", "file0001", 10, "a"),
    delete("300", "file0002", 20),
    upsert("300", "file0001", 15, "b"),
  ])
  .await
  .unwrap();
  assert!(s.get_record("300").await.unwrap().is_none());
}

// ─── From raw documents to state ─────────────────────────────────────────────

#[tokio::test]
async fn normalized_documents_flow_end_to_end() {
  let s = store().await;

  let citation = json!({
    "MedlineCitation": {
      "@Status": "MEDLINE",
      "PMID": [{"@Version": "1", "#text": "555"}],
      "Article": {
        "ArticleTitle": "End to end",
        "Abstract": {"AbstractText": ["Part one.", "Part two."]},
        "Language": "eng",
        "AuthorList": {"Author": {"LastName": "Doe", "ForeName": "Jane"}},
      },
    }
  });
  let mut events =
    normalize(&citation, Provenance::new("pubmed24n0001", 100)).unwrap();

  let removal = json!({
    "DeleteCitation": {"PMID": [{"#text": "555"}, {"#text": "556"}]}
  });
  events
    .extend(normalize(&removal, Provenance::new("pubmed24n0002", 200)).unwrap());

  let summary = run_batch(&s, events).await.unwrap();
  assert_eq!(summary.selected, 3);
  assert_eq!(summary.deleted, 2);

  // The later delete shadows the upsert for 555; 556 was never seen.
  assert!(s.get_record("555").await.unwrap().is_none());
  assert!(s.get_record("556").await.unwrap().is_none());
  assert_eq!(s.watermark().await.unwrap(), Some(200));
}

#[tokio::test]
async fn list_records_is_ordered_by_key() {
  let s = store().await;
  run_batch(&s, vec![
    upsert("b", "file0001", 10, "b"),
    upsert("a", "file0001", 11, "a"),
    upsert("c", "file0001", 12, "c"),
  ])
  .await
  .unwrap();

  let keys: Vec<_> = s
    .list_records()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.key)
    .collect();
  assert_eq!(keys, vec!["a", "b", "c"]);
}
