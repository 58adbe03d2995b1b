//! # SOP Knowledge Core
//!
//! Runtime-agnostic logic for the SOP knowledge service: data models, the
//! error taxonomy, the table-of-contents index and its lexical matcher,
//! the document store trait, and text renderings.
//!
//! This crate contains no tokio, network, or filesystem dependencies.
//! Backends and the async resolver live in the `sop-knowledge` crate.

pub mod error;
pub mod models;
pub mod render;
pub mod store;
pub mod toc;

pub use error::{DataQualityWarning, KnowledgeError, NotFoundKind, StoreError};
pub use models::{Sop, StoredSop, TocEntry};
pub use store::DocumentStore;
pub use toc::{Catalog, CatalogError, ScoredEntry, TocIndex};
