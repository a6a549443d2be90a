//! The generic CRUD/query/aggregation engine.

use std::future::Future;
use std::time::Duration;

use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, to_document, Bson, Document};
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::error::{classify_write, Error, Result};
use crate::ids;
use crate::model::Model;
use crate::query;

/// Default deadline for point operations.
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default deadline for read-heavy aggregations.
const DEFAULT_AGGREGATE_TIMEOUT: Duration = Duration::from_secs(300);

/// A generic repository over one collection of records of type `T`.
///
/// Every operation is individually deadline-bound: point operations default
/// to 2 seconds, aggregations to 5 minutes (override per instance with
/// [`with_op_timeout`](Self::with_op_timeout) /
/// [`with_aggregate_timeout`](Self::with_aggregate_timeout), or per call with
/// the `*_within` variants). A missed deadline cancels the in-flight call and
/// surfaces [`Error::Timeout`]; nothing is retried.
///
/// Mutating operations are serialized behind a per-instance lock so two
/// logically concurrent mutations cannot interleave stamp assignment with
/// the actual write. Reads and aggregations are lock-free; the underlying
/// client may be shared across any number of repositories.
///
/// # Example
///
/// ```no_run
/// use docrepo::{Meta, Model, MongoConfig, Repository};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct User {
///     #[serde(flatten)]
///     meta: Meta,
///     email: String,
/// }
///
/// impl Model for User {
///     fn meta(&self) -> &Meta {
///         &self.meta
///     }
///     fn meta_mut(&mut self) -> &mut Meta {
///         &mut self.meta
///     }
/// }
///
/// # async fn example() -> docrepo::Result<()> {
/// let database = docrepo::connection::connect(&MongoConfig::default()).await?;
/// let users: Repository<User> = Repository::new(&database, "users");
///
/// let mut user = User {
///     email: "alice@example.com".to_string(),
///     ..Default::default()
/// };
/// users.create(&mut user).await?;
/// assert!(user.id().is_some());
/// # Ok(())
/// # }
/// ```
pub struct Repository<T: Model> {
    collection: Collection<T>,
    write_lock: Mutex<()>,
    op_timeout: Duration,
    aggregate_timeout: Duration,
}

impl<T: Model> Repository<T> {
    /// Creates a repository over the named collection.
    ///
    /// The database handle is passed explicitly; repositories never reach
    /// for hidden global state, which keeps them testable against any
    /// injected handle.
    pub fn new(database: &Database, collection: &str) -> Self {
        Self {
            collection: database.collection(collection),
            write_lock: Mutex::new(()),
            op_timeout: DEFAULT_OP_TIMEOUT,
            aggregate_timeout: DEFAULT_AGGREGATE_TIMEOUT,
        }
    }

    /// Overrides the point-operation deadline.
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Overrides the aggregation deadline.
    pub fn with_aggregate_timeout(mut self, timeout: Duration) -> Self {
        self.aggregate_timeout = timeout;
        self
    }

    /// The underlying typed collection, for operations outside this surface.
    pub fn collection(&self) -> &Collection<T> {
        &self.collection
    }

    /// Runs `op` under `limit`, cancelling the in-flight call on a miss.
    async fn bounded<F, O>(&self, limit: Duration, op: F) -> Result<O>
    where
        F: Future<Output = Result<O>>,
    {
        match tokio::time::timeout(limit, op).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(limit)),
        }
    }

    fn required_id(record: &T) -> Result<ObjectId> {
        record.id().ok_or(Error::InvalidId)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Inserts a record.
    ///
    /// Stamps `created_at`/`updated_at` when `created_at` is unassigned and
    /// assigns a fresh id when `id` is unassigned; a caller-supplied id is
    /// preserved.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateDocument`] on a uniqueness violation;
    /// [`Error::Write`] for any other native write error.
    pub async fn create(&self, record: &mut T) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if record.created_at().is_none() {
            record.stamp();
        }
        if record.id().is_none() {
            record.set_id(ObjectId::new());
        }
        self.bounded(self.op_timeout, async {
            self.collection
                .insert_one(&*record)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Inserts a batch in one store call, applying the [`create`](Self::create)
    /// stamping policy independently to each element first.
    ///
    /// Partial-failure behavior is the store's native batch semantics; no
    /// compensating rollback is performed.
    ///
    /// # Errors
    ///
    /// [`Error::EmptySlice`] when `records` is empty, before any store call.
    pub async fn create_many(&self, records: &mut [T]) -> Result<()> {
        if records.is_empty() {
            return Err(Error::EmptySlice);
        }
        let _guard = self.write_lock.lock().await;
        for record in records.iter_mut() {
            if record.created_at().is_none() {
                record.stamp();
            }
            if record.id().is_none() {
                record.set_id(ObjectId::new());
            }
        }
        self.bounded(self.op_timeout, async {
            self.collection
                .insert_many(records.iter())
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Re-stamps `updated_at` and writes the full serialized document as a
    /// `$set` keyed by id.
    ///
    /// This is a strict replace-by-id of every serialized field, not a
    /// merge: callers supply the complete desired state.
    pub async fn update(&self, record: &mut T) -> Result<()> {
        let id = Self::required_id(record)?;
        let _guard = self.write_lock.lock().await;
        record.update_stamp();
        let set = to_document(&*record)?;
        self.update_by_id(id, doc! { "$set": set }).await
    }

    /// Like [`update`](Self::update) but leaves `updated_at` untouched, for
    /// system-driven corrections that must not appear as user-visible edits.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidId`] when the record's id is unassigned.
    pub async fn update_without_timestamp(&self, record: &T) -> Result<()> {
        let id = Self::required_id(record)?;
        let _guard = self.write_lock.lock().await;
        let set = to_document(record)?;
        self.update_by_id(id, doc! { "$set": set }).await
    }

    /// Stamps `updated_at` and replaces the whole stored document keyed by
    /// id. Unlike [`update`](Self::update), fields absent from the record
    /// are removed, not merged.
    pub async fn replace(&self, record: &mut T) -> Result<()> {
        let id = Self::required_id(record)?;
        let _guard = self.write_lock.lock().await;
        record.update_stamp();
        self.bounded(self.op_timeout, async {
            self.collection
                .replace_one(doc! { "_id": id }, &*record)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Soft delete: stamps `deleted_at` and performs a regular
    /// [`update`](Self::update). The document stays in storage.
    pub async fn delete(&self, record: &mut T) -> Result<()> {
        Self::required_id(record)?;
        record.delete_stamp();
        self.update(record).await
    }

    /// Physically removes the document keyed by id. Irreversible.
    pub async fn hard_delete(&self, record: &T) -> Result<()> {
        let id = Self::required_id(record)?;
        let _guard = self.write_lock.lock().await;
        self.bounded(self.op_timeout, async {
            self.collection
                .delete_one(doc! { "_id": id })
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Bulk physical removal of every document matching the selector.
    /// Returns the number of documents removed.
    pub async fn hard_delete_all_by_selector(&self, selector: Document) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        self.bounded(self.op_timeout, async {
            let result = self
                .collection
                .delete_many(selector)
                .await
                .map_err(classify_write)?;
            tracing::debug!(deleted = result.deleted_count, "hard delete by selector");
            Ok(result.deleted_count)
        })
        .await
    }

    /// Update-or-insert in one store operation.
    ///
    /// With an assigned id, the id is merged into an internal copy of the
    /// selector and `updated_at` is re-stamped; otherwise the record is
    /// stamped as a fresh insert. The caller's selector is never mutated:
    /// the method takes it by value and augments its own copy.
    pub async fn upsert(&self, record: &mut T, selector: Document) -> Result<()> {
        let mut selector = selector;
        let _guard = self.write_lock.lock().await;
        if let Some(id) = record.id() {
            selector.insert("_id", id);
            record.update_stamp();
        } else {
            record.stamp();
        }
        let set = to_document(&*record)?;
        self.bounded(self.op_timeout, async {
            self.collection
                .update_one(selector, doc! { "$set": set })
                .upsert(true)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Raw upsert escape hatch: no record, no stamping. For callers that
    /// build their own update documents.
    pub async fn upsert_by_selector_and_update(
        &self,
        selector: Document,
        update: Document,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.bounded(self.op_timeout, async {
            self.collection
                .update_one(selector, update)
                .upsert(true)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Removes the named fields from the stored document keyed by id,
    /// re-stamping `updated_at` via the shared update path.
    pub async fn unset_fields(&self, record: &mut T, fields: &[&str]) -> Result<()> {
        let mut unset = Document::new();
        for field in fields {
            unset.insert(*field, 1);
        }
        self.apply_to_record(record, doc! { "$unset": unset }).await
    }

    /// Atomically adds `value` to the array-valued `field`, keyed by the
    /// record's id.
    pub async fn add_to_set(
        &self,
        field: &str,
        value: impl Into<Bson>,
        record: &mut T,
    ) -> Result<()> {
        self.toggle_in_set("$addToSet", field, value.into(), record)
            .await
    }

    /// Atomically removes `value` from the array-valued `field`, keyed by
    /// the record's id.
    pub async fn remove_from_set(
        &self,
        field: &str,
        value: impl Into<Bson>,
        record: &mut T,
    ) -> Result<()> {
        self.toggle_in_set("$pull", field, value.into(), record).await
    }

    async fn toggle_in_set(
        &self,
        action: &str,
        field: &str,
        value: Bson,
        record: &mut T,
    ) -> Result<()> {
        self.apply_to_record(record, doc! { action: { field: value } })
            .await
    }

    /// Atomic numeric increment at a dotted field path.
    pub async fn inc(&self, id: ObjectId, path: &str, amount: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.update_by_id(id, doc! { "$inc": { path: amount } }).await
    }

    /// Applies an arbitrary update document to every document matching the
    /// selector. Returns the number of documents modified.
    pub async fn update_many_by_selector(
        &self,
        selector: Document,
        update: Document,
    ) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        self.bounded(self.op_timeout, async {
            let result = self
                .collection
                .update_many(selector, update)
                .await
                .map_err(classify_write)?;
            Ok(result.modified_count)
        })
        .await
    }

    /// Applies an arbitrary update document to the first document matching
    /// the selector.
    pub async fn update_one_by_selector(
        &self,
        selector: Document,
        update: Document,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.bounded(self.op_timeout, async {
            self.collection
                .update_one(selector, update)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    /// Shared update path for id-keyed modifications: re-stamps the record's
    /// in-memory `updated_at` and applies the update document keyed by id.
    async fn apply_to_record(&self, record: &mut T, update: Document) -> Result<()> {
        let id = Self::required_id(record)?;
        let _guard = self.write_lock.lock().await;
        record.update_stamp();
        self.update_by_id(id, update).await
    }

    async fn update_by_id(&self, id: ObjectId, update: Document) -> Result<()> {
        self.bounded(self.op_timeout, async {
            self.collection
                .update_one(doc! { "_id": id }, update)
                .await
                .map_err(classify_write)?;
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the first record matching the selector.
    ///
    /// Soft-deleted records are not filtered out; callers that want live
    /// records only add a `deleted_at` condition to the selector.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when nothing matches.
    pub async fn find_one_by_selector(&self, selector: Document) -> Result<T> {
        self.bounded(self.op_timeout, async {
            self.collection
                .find_one(selector)
                .await?
                .ok_or(Error::NotFound)
        })
        .await
    }

    /// Returns the record with the given hex id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidId`] when the hex string cannot be parsed, raised
    /// before any store access. [`Error::NotFound`] when no document has
    /// that id.
    pub async fn find_one_by_id(&self, id: &str) -> Result<T> {
        let id = ObjectId::parse_str(id).map_err(|_| Error::InvalidId)?;
        self.find_one_by_selector(doc! { "_id": id }).await
    }

    /// Drains every record matching the selector, preserving store order.
    ///
    /// The cursor is released on every exit path; the first decode or cursor
    /// error encountered is surfaced.
    pub async fn find_all(
        &self,
        selector: Document,
        options: impl Into<Option<FindOptions>>,
    ) -> Result<Vec<T>> {
        let options = options.into();
        self.bounded(self.op_timeout, async {
            let mut cursor = self.collection.find(selector).with_options(options).await?;
            let mut records = Vec::new();
            while let Some(record) = cursor.try_next().await? {
                records.push(record);
            }
            Ok(records)
        })
        .await
    }

    /// Finds every record whose id appears in `ids`; unparsable hex strings
    /// are silently dropped.
    pub async fn find_all_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<T>> {
        let object_ids = ids::parse_object_ids(ids);
        self.find_all(query::in_ids(&object_ids), None).await
    }

    /// Executes an aggregation pipeline, draining every result document into
    /// `R`, under the instance aggregation deadline.
    ///
    /// Stages execute strictly in the order given; see [`crate::query`] for
    /// fragment builders.
    pub async fn aggregate_all<R>(&self, pipeline: Vec<Document>) -> Result<Vec<R>>
    where
        R: DeserializeOwned + Send + Sync + Unpin,
    {
        self.aggregate_all_within(pipeline, self.aggregate_timeout)
            .await
    }

    /// [`aggregate_all`](Self::aggregate_all) with a caller-supplied
    /// deadline.
    pub async fn aggregate_all_within<R>(
        &self,
        pipeline: Vec<Document>,
        limit: Duration,
    ) -> Result<Vec<R>>
    where
        R: DeserializeOwned + Send + Sync + Unpin,
    {
        self.bounded(limit, async {
            let mut cursor = self
                .collection
                .aggregate(pipeline)
                .with_type::<R>()
                .await?;
            let mut results = Vec::new();
            while let Some(result) = cursor.try_next().await? {
                results.push(result);
            }
            Ok(results)
        })
        .await
    }

    /// Executes an aggregation pipeline and returns the first result,
    /// ignoring the rest.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the pipeline yields no documents.
    pub async fn aggregate_one<R>(&self, pipeline: Vec<Document>) -> Result<R>
    where
        R: DeserializeOwned + Send + Sync + Unpin,
    {
        self.aggregate_one_within(pipeline, self.op_timeout).await
    }

    /// [`aggregate_one`](Self::aggregate_one) with a caller-supplied
    /// deadline.
    pub async fn aggregate_one_within<R>(&self, pipeline: Vec<Document>, limit: Duration) -> Result<R>
    where
        R: DeserializeOwned + Send + Sync + Unpin,
    {
        self.bounded(limit, async {
            let mut cursor = self
                .collection
                .aggregate(pipeline)
                .with_type::<R>()
                .await?;
            cursor.try_next().await?.ok_or(Error::NotFound)
        })
        .await
    }

    /// Counts documents matching the selector.
    pub async fn count_by_selector(&self, selector: Document) -> Result<u64> {
        self.bounded(self.op_timeout, async {
            Ok(self.collection.count_documents(selector).await?)
        })
        .await
    }
}

impl<T: Model> std::fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("collection", &self.collection.name())
            .field("op_timeout", &self.op_timeout)
            .field("aggregate_timeout", &self.aggregate_timeout)
            .finish_non_exhaustive()
    }
}
