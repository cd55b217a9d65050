//! Raw-document normalization.
//!
//! Pipeline:
//!   raw nested JSON document + provenance
//!     └─ classify (MedlineCitation / DeleteCitation)
//!          └─ extract_key()            → natural key(s)
//!               └─ extract_fields()   → list-normalized payload
//!                    └─ Vec<Event>

use chrono::NaiveDate;
use pubset_core::event::{
  Author, CitationFields, Event, EventKind, MeshTerm, Provenance,
};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

// ─── Low-level helpers ───────────────────────────────────────────────────────

/// View a possibly-array-forced value as a list of elements.
///
/// Upstream normalization already forces known list-valued fields into
/// arrays, but single objects and plain scalars still occur in the wild:
/// an array yields its elements, null/absent yields nothing, and anything
/// else is a singleton. Consumers therefore never branch on object-vs-array.
fn forced_list(v: Option<&Value>) -> Vec<&Value> {
  match v {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items.iter().collect(),
    Some(other) => vec![other],
  }
}

/// Extract scalar text, preferring the structured `{"#text": …}` form and
/// falling back to a plain string or number.
fn scalar_text(v: &Value) -> Option<String> {
  match v {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Object(map) => match map.get("#text") {
      Some(Value::String(s)) => Some(s.clone()),
      Some(Value::Number(n)) => Some(n.to_string()),
      _ => None,
    },
    _ => None,
  }
}

/// Extract the natural key from a `PMID` node (plain scalar, `#text` object,
/// or a forced list of either — first entry wins).
fn extract_key(pmid: &Value) -> Option<String> {
  forced_list(Some(pmid)).first().and_then(|v| scalar_text(v))
}

/// SHA-256 hex digest of the compact document serialization. `Value` maps
/// are key-ordered, so the digest is stable for equal documents.
fn content_hash(doc: &Value) -> Result<String> {
  let compact = serde_json::to_string(doc)?;
  Ok(hex::encode(Sha256::digest(compact.as_bytes())))
}

// ─── Publication date policy ─────────────────────────────────────────────────

const FALLBACK_YEAR: i32 = 1900;

/// Month as a 1–2 digit numeral or a case-insensitive English name or
/// abbreviation. Anything unrecognized (including out-of-range numerals)
/// resolves to January.
fn month_number(raw: &str) -> u32 {
  let raw = raw.trim();
  if let Ok(n) = raw.parse::<u32>() {
    return if (1..=12).contains(&n) { n } else { 1 };
  }
  let prefix: String = raw.chars().take(3).flat_map(char::to_lowercase).collect();
  match prefix.as_str() {
    "jan" => 1,
    "feb" => 2,
    "mar" => 3,
    "apr" => 4,
    "may" => 5,
    "jun" => 6,
    "jul" => 7,
    "aug" => 8,
    "sep" => 9,
    "oct" => 10,
    "nov" => 11,
    "dec" => 12,
    _ => 1,
  }
}

/// First run of four consecutive ASCII digits in a free-text Medline date
/// (e.g. `"1998 Dec-1999 Jan"` → 1998, `"Spring 2000"` → 2000).
fn four_digit_year(s: &str) -> Option<i32> {
  let bytes = s.as_bytes();
  bytes
    .windows(4)
    .find(|w| w.iter().all(u8::is_ascii_digit))
    .and_then(|w| std::str::from_utf8(w).ok())
    .and_then(|w| w.parse().ok())
}

/// Resolve a publication date from a `PubDate` node. Never fails:
///
/// 1. explicit `Year`/`Month`/`Day` fields (garbage year falls through to
///    the final fallback, matching the source system's safe cast);
/// 2. a 4-digit year pattern-matched out of `MedlineDate`, Jan 1st;
/// 3. 1900-01-01.
fn resolve_publication_date(pub_date: Option<&Value>) -> NaiveDate {
  let fallback = NaiveDate::from_ymd_opt(FALLBACK_YEAR, 1, 1)
    .expect("1900-01-01 is a valid date");

  let Some(pd) = pub_date else { return fallback };

  if let Some(year_raw) = pd.get("Year").and_then(scalar_text) {
    let Ok(year) = year_raw.trim().parse::<i32>() else {
      return fallback;
    };
    let month = pd
      .get("Month")
      .and_then(scalar_text)
      .map(|m| month_number(&m))
      .unwrap_or(1);
    let day = pd
      .get("Day")
      .and_then(scalar_text)
      .and_then(|d| d.trim().parse::<u32>().ok())
      .unwrap_or(1);
    return NaiveDate::from_ymd_opt(year, month, day)
      .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
      .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
      .unwrap_or(fallback);
  }

  if let Some(medline) = pd.get("MedlineDate").and_then(scalar_text)
    && let Some(year) = four_digit_year(&medline)
  {
    return NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(fallback);
  }

  fallback
}

// ─── Field extraction ────────────────────────────────────────────────────────

fn extract_doi(article: &Value) -> Option<String> {
  forced_list(article.get("ELocationID"))
    .into_iter()
    .find(|e| {
      e.get("@EIdType")
        .and_then(Value::as_str)
        .is_some_and(|t| t.eq_ignore_ascii_case("doi"))
    })
    .and_then(scalar_text)
}

/// Concatenate abstract segments with a single space, in source order,
/// preferring inline `#text` content. `AbstractText` usually sits under
/// `Abstract`, but some records carry it directly on `Article`.
fn extract_abstract(article: &Value) -> Option<String> {
  let node = article
    .get("Abstract")
    .and_then(|a| a.get("AbstractText"))
    .or_else(|| article.get("AbstractText"));

  let segments: Vec<String> = forced_list(node)
    .into_iter()
    .filter_map(scalar_text)
    .collect();

  if segments.is_empty() {
    None
  } else {
    Some(segments.join(" "))
  }
}

fn extract_authors(article: &Value) -> Vec<Author> {
  let node = article.get("AuthorList").and_then(|l| l.get("Author"));
  forced_list(node)
    .into_iter()
    .map(|a| {
      // AffiliationInfo arrives as an object or an array; first entry wins.
      let affiliation = forced_list(a.get("AffiliationInfo"))
        .first()
        .and_then(|info| info.get("Affiliation"))
        .and_then(scalar_text);
      Author {
        last_name: a.get("LastName").and_then(scalar_text),
        fore_name: a.get("ForeName").and_then(scalar_text),
        initials: a.get("Initials").and_then(scalar_text),
        affiliation,
      }
    })
    .collect()
}

fn extract_mesh_terms(citation: &Value) -> Vec<MeshTerm> {
  let node = citation
    .get("MeshHeadingList")
    .and_then(|l| l.get("MeshHeading"));
  forced_list(node)
    .into_iter()
    .map(|h| {
      let desc = h.get("DescriptorName");
      MeshTerm {
        descriptor_name: desc.and_then(scalar_text),
        descriptor_ui:   desc
          .and_then(|d| d.get("@UI"))
          .and_then(Value::as_str)
          .map(str::to_string),
      }
    })
    .collect()
}

fn extract_languages(article: &Value) -> Vec<String> {
  forced_list(article.get("Language"))
    .into_iter()
    .filter_map(scalar_text)
    .collect()
}

fn extract_fields(citation: &Value, doc: &Value) -> Result<CitationFields> {
  static EMPTY: Value = Value::Null;
  let article = citation.get("Article").unwrap_or(&EMPTY);

  let pub_date = article
    .get("Journal")
    .and_then(|j| j.get("JournalIssue"))
    .and_then(|i| i.get("PubDate"));

  Ok(CitationFields {
    title:              article.get("ArticleTitle").and_then(scalar_text),
    doi:                extract_doi(article),
    abstract_text:      extract_abstract(article),
    publication_date:   resolve_publication_date(pub_date),
    publication_status: citation
      .get("@Status")
      .and_then(Value::as_str)
      .map(str::to_string),
    authors:            extract_authors(article),
    mesh_terms:         extract_mesh_terms(citation),
    languages:          extract_languages(article),
    raw_document:       doc.clone(),
    content_hash:       content_hash(doc)?,
  })
}

// ─── Classification ──────────────────────────────────────────────────────────

/// Normalize one raw document into events.
///
/// A citation document yields exactly one upsert. A delete document may
/// reference several keys and expands into one delete event per key — it is
/// never collapsed. Any document whose key(s) cannot be extracted is
/// rejected with [`Error::MalformedRecord`].
pub(crate) fn normalize_one(
  doc: &Value,
  provenance: &Provenance,
) -> Result<Vec<Event>> {
  if let Some(citation_node) = doc.get("MedlineCitation") {
    // MedlineCitation is not array-forced upstream, but tolerate it anyway.
    let citation = forced_list(Some(citation_node))
      .into_iter()
      .next()
      .ok_or_else(|| Error::MalformedRecord("empty MedlineCitation".into()))?;

    let key = citation
      .get("PMID")
      .and_then(extract_key)
      .ok_or_else(|| {
        Error::MalformedRecord("citation without extractable PMID".into())
      })?;

    let fields = extract_fields(citation, doc)?;
    return Ok(vec![Event {
      key,
      provenance: provenance.clone(),
      kind: EventKind::Upsert(Box::new(fields)),
    }]);
  }

  if let Some(delete_node) = doc.get("DeleteCitation") {
    let mut events = Vec::new();
    for entry in forced_list(Some(delete_node)) {
      for pmid in forced_list(entry.get("PMID")) {
        let key = extract_key(pmid).ok_or_else(|| {
          Error::MalformedRecord("delete entry without extractable PMID".into())
        })?;
        events.push(Event {
          key,
          provenance: provenance.clone(),
          kind: EventKind::Delete,
        });
      }
    }
    if events.is_empty() {
      return Err(Error::MalformedRecord(
        "delete document references no PMIDs".into(),
      ));
    }
    return Ok(events);
  }

  Err(Error::UnrecognizedDocument)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
