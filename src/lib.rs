//! # SOP Knowledge
//!
//! Retrieval service for Standard Operating Procedures consumed by a
//! seller-support assistant. Given an SOP id or a free-text question it
//! returns structured SOPs whose image locators have been turned into
//! fetchable URLs, or a typed error.
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────┐
//!  id / query ──▶│  Knowledge   │──▶ Sop | KnowledgeError
//!                │   Service    │
//!                └──────┬───────┘
//!                       ▼
//!                ┌──────────────┐    ┌────────────┐
//!                │   Resolver   │◀──▶│ SOP cache  │
//!                └──┬────────┬──┘    └────────────┘
//!                   ▼        ▼
//!            ┌──────────┐ ┌────────────────┐
//!            │ TOC index│ │ Document store │
//!            │ (memory) │ │ S3 / local     │
//!            └──────────┘ └────────────────┘
//! ```
//!
//! Runtime-agnostic pieces (models, errors, the TOC index, the store trait)
//! live in the `sop-knowledge-core` crate.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration, environment overrides, validation |
//! | [`catalog`] | Catalog loading and `sopkb toc` |
//! | [`store_fs`] | Local filesystem store |
//! | [`store_s3`] | Amazon S3 store with SigV4 signing and pre-signed URLs |
//! | [`cache`] | Single-flight TTL cache of resolved SOPs |
//! | [`resolver`] | Id and query resolution |
//! | [`service`] | Facade used by the CLI and HTTP server |
//! | [`get`] / [`search`] / [`check`] | CLI commands |
//! | [`server`] | HTTP API |

pub mod cache;
pub mod catalog;
pub mod check;
pub mod config;
pub mod get;
pub mod resolver;
pub mod search;
pub mod server;
pub mod service;
pub mod store_fs;
pub mod store_s3;
