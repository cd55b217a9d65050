//! Core types and algorithms for the pubset deduplication engine.
//!
//! This crate is deliberately free of I/O and database dependencies: the
//! batch selector, conflict resolver and view expansions are pure functions,
//! and persistence hides behind the [`store::StateStore`] trait.

pub mod batch;
pub mod event;
pub mod record;
pub mod resolver;
pub mod run;
pub mod store;
pub mod views;

pub use batch::select_batch;
pub use event::{Author, CitationFields, Event, EventKind, MeshTerm, Provenance};
pub use record::{RecordState, derived_id};
pub use resolver::{Action, Decision, resolve};
pub use run::run_batch;
pub use store::{RunSummary, StateStore};
