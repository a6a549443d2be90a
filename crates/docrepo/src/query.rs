//! Composable query and aggregation fragment builders.
//!
//! Pure constructors returning store-native [`Document`] fragments. None of
//! them executes anything; callers assemble the fragments into pipelines for
//! [`Repository::aggregate_all`](crate::Repository::aggregate_all) and
//! [`Repository::aggregate_one`](crate::Repository::aggregate_one), or use
//! the filter fragments as selectors. Stage order is caller-defined and
//! never reordered here.

use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};

/// Regex match on a field, with driver-native options (e.g. `"i"`).
pub fn regex(field: &str, pattern: &str, options: &str) -> Document {
    doc! { field: { "$regex": pattern, "$options": options } }
}

/// Inclusive range match (`$gte`/`$lte`) on a field.
pub fn range(field: &str, from: impl Into<Bson>, to: impl Into<Bson>) -> Document {
    doc! { field: { "$gte": from.into(), "$lte": to.into() } }
}

/// `$sort` stage; `direction` is 1 (ascending) or -1 (descending).
pub fn sort(field: &str, direction: i32) -> Document {
    doc! { "$sort": { field: direction } }
}

/// `$match` stage wrapping an arbitrary filter.
pub fn match_stage(filter: Document) -> Document {
    doc! { "$match": filter }
}

/// `$lookup` (join) stage against a foreign collection.
pub fn lookup(from: &str, local_field: &str, foreign_field: &str, output: &str) -> Document {
    doc! {
        "$lookup": {
            "from": from,
            "localField": local_field,
            "foreignField": foreign_field,
            "as": output,
        }
    }
}

/// `$unwind` stage with the preserve-empty-arrays toggle.
pub fn unwind(path: &str, preserve_null_and_empty: bool) -> Document {
    doc! {
        "$unwind": {
            "path": path,
            "preserveNullAndEmptyArrays": preserve_null_and_empty,
        }
    }
}

/// `$group` stage from a group key and named accumulator fragments.
pub fn group(key: impl Into<Bson>, accumulators: Document) -> Document {
    let mut spec = doc! { "_id": key.into() };
    for (name, accumulator) in accumulators {
        spec.insert(name, accumulator);
    }
    doc! { "$group": spec }
}

/// `$project` stage with named output fields.
pub fn project(fields: Document) -> Document {
    doc! { "$project": fields }
}

/// `$replaceRoot` stage merging a computed field into the document root.
pub fn replace_root_merging(field: impl Into<Bson>) -> Document {
    doc! {
        "$replaceRoot": {
            "newRoot": {
                "$mergeObjects": [field.into(), "$$ROOT"],
            }
        }
    }
}

/// Inclusion filter matching documents whose `_id` is in `ids`.
pub fn in_ids(ids: &[ObjectId]) -> Document {
    doc! { "_id": { "$in": ids.to_vec() } }
}
