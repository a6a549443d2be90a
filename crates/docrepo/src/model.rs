//! The record contract every persisted type satisfies.
//!
//! A record embeds [`Meta`] (flattened into its BSON document) and implements
//! [`Model`] by exposing that metadata. All timestamp and id policy lives in
//! the trait's provided methods; record types never duplicate it.
//!
//! ```
//! use docrepo::{Meta, Model};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct User {
//!     #[serde(flatten)]
//!     meta: Meta,
//!     email: String,
//! }
//!
//! impl Model for User {
//!     fn meta(&self) -> &Meta {
//!         &self.meta
//!     }
//!     fn meta_mut(&mut self) -> &mut Meta {
//!         &mut self.meta
//!     }
//! }
//! ```

use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Persistence metadata embedded in every record.
///
/// Serialized field names match the stored document layout: `_id`,
/// `created_at`, `updated_at`, `deleted_at`. Unassigned fields are omitted
/// from the serialized document entirely, so an insert never writes a null
/// id or placeholder timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// Document identifier; `None` means "unassigned".
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Set exactly once, at first insertion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,

    /// Set on every mutating write.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    /// Presence marks the record as soft-deleted. Advisory only: queries do
    /// not auto-filter deleted records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,
}

impl Meta {
    /// Creation time as a chrono UTC timestamp.
    pub fn created_at_utc(&self) -> Option<chrono::DateTime<Utc>> {
        self.created_at.map(|at| at.to_chrono())
    }

    /// Last-update time as a chrono UTC timestamp.
    pub fn updated_at_utc(&self) -> Option<chrono::DateTime<Utc>> {
        self.updated_at.map(|at| at.to_chrono())
    }

    /// Soft-deletion time as a chrono UTC timestamp.
    pub fn deleted_at_utc(&self) -> Option<chrono::DateTime<Utc>> {
        self.deleted_at.map(|at| at.to_chrono())
    }

    /// True once `deleted_at` has been stamped.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Capability set required of every persisted record type.
///
/// Only the two metadata accessors are required; id and timestamp policy is
/// provided. `bson::DateTime` carries millisecond precision, matching the
/// server-side representation, so a stamped value round-trips unchanged.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + Unpin {
    /// Borrows the embedded persistence metadata.
    fn meta(&self) -> &Meta;

    /// Mutably borrows the embedded persistence metadata.
    fn meta_mut(&mut self) -> &mut Meta;

    /// The assigned document id, treating the all-zero id as unassigned.
    fn id(&self) -> Option<ObjectId> {
        self.meta().id.filter(|id| id.bytes() != [0u8; 12])
    }

    /// Assigns the document id.
    fn set_id(&mut self, id: ObjectId) {
        self.meta_mut().id = Some(id);
    }

    /// The first-insertion timestamp, if assigned.
    fn created_at(&self) -> Option<DateTime> {
        self.meta().created_at
    }

    /// Stamps both `created_at` and `updated_at` to now. Called once, at
    /// first insertion.
    fn stamp(&mut self) {
        let now = DateTime::now();
        let meta = self.meta_mut();
        meta.created_at = Some(now);
        meta.updated_at = Some(now);
    }

    /// Advances `updated_at` to now, leaving `created_at` untouched.
    fn update_stamp(&mut self) {
        self.meta_mut().updated_at = Some(DateTime::now());
    }

    /// Stamps `deleted_at` to now, marking the record soft-deleted.
    fn delete_stamp(&mut self) {
        self.meta_mut().deleted_at = Some(DateTime::now());
    }
}
