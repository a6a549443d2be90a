//! Generic repository layer over MongoDB document storage.
//!
//! This crate lets arbitrary record types be created, updated,
//! soft/hard-deleted, queried, aggregated and grouped without each caller
//! re-implementing query construction, timeout handling, or error
//! classification.
//!
//! # Architecture
//!
//! - [`config`] / [`connection`]: connection setup, URI building, bounded
//!   liveness check, optional command mirroring, shared process-wide handle
//! - [`nullable`]: decode override substituting a type's zero value for
//!   explicit nulls
//! - [`model`]: the record contract, id plus creation/update/deletion
//!   timestamps, with all stamping policy provided by the trait
//! - [`repository`]: the generic CRUD/query/aggregation engine, with
//!   per-operation deadlines and serialized writes
//! - [`ids`]: id extraction, deduplication, grouping and indexing helpers
//!   over record sequences
//! - [`query`]: pure builders for composable filter and pipeline fragments
//!
//! # Quick start
//!
//! ```no_run
//! use docrepo::{Meta, Model, MongoConfig, Repository};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Article {
//!     #[serde(flatten)]
//!     meta: Meta,
//!     title: String,
//!     views: i64,
//! }
//!
//! impl Model for Article {
//!     fn meta(&self) -> &Meta {
//!         &self.meta
//!     }
//!     fn meta_mut(&mut self) -> &mut Meta {
//!         &mut self.meta
//!     }
//! }
//!
//! # async fn example() -> docrepo::Result<()> {
//! let database = docrepo::connection::init(&MongoConfig::from_env()).await?;
//! let articles: Repository<Article> = Repository::new(database, "articles");
//!
//! let mut article = Article {
//!     title: "hello".to_string(),
//!     ..Default::default()
//! };
//! articles.create(&mut article).await?;
//!
//! // Soft delete keeps the document around, flagged by `deleted_at`.
//! articles.delete(&mut article).await?;
//! let still_there = articles
//!     .find_one_by_id(&article.id().unwrap().to_hex())
//!     .await?;
//! assert!(still_there.meta().is_deleted());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod ids;
pub mod model;
pub mod nullable;
pub mod query;
pub mod repository;

pub use config::MongoConfig;
pub use error::{Error, Result};
pub use model::{Meta, Model};
pub use repository::Repository;

// Re-export the driver's BSON surface used at every call site.
pub use mongodb::bson::{doc, oid::ObjectId, Bson, DateTime, Document};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
