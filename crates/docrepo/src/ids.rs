//! Id-centric helpers over sequences of records.
//!
//! Field addressing is by accessor closure rather than field name: the
//! closure returns `Option<ObjectId>`, which covers both direct and nullable
//! id fields on the record type. `None` and the all-zero id both count as
//! "absent".

use std::collections::{HashMap, HashSet};

use mongodb::bson::oid::ObjectId;

fn assigned(id: Option<ObjectId>) -> Option<ObjectId> {
    id.filter(|id| id.bytes() != [0u8; 12])
}

/// Collects the distinct non-zero ids found across `records`, in first-seen
/// order.
pub fn extract_ids<T, F>(records: &[T], id_of: F) -> Vec<ObjectId>
where
    F: Fn(&T) -> Option<ObjectId>,
{
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for record in records {
        if let Some(id) = assigned(id_of(record)) {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// All ids in `a` not present in `b`, preserving the order of `a`.
pub fn set_difference(a: &[ObjectId], b: &[ObjectId]) -> Vec<ObjectId> {
    let exclude: HashSet<&ObjectId> = b.iter().collect();
    a.iter().filter(|id| !exclude.contains(id)).copied().collect()
}

/// Groups records by id, preserving input order within each group and
/// capping every group at `per_group_limit` entries.
///
/// A limit of 0 yields an empty mapping. Records with an absent id are
/// excluded.
pub fn group_by_id<T, F>(
    records: &[T],
    id_of: F,
    per_group_limit: usize,
) -> HashMap<ObjectId, Vec<T>>
where
    T: Clone,
    F: Fn(&T) -> Option<ObjectId>,
{
    let mut groups: HashMap<ObjectId, Vec<T>> = HashMap::new();
    if per_group_limit == 0 {
        return groups;
    }
    for record in records {
        if let Some(id) = assigned(id_of(record)) {
            let group = groups.entry(id).or_default();
            if group.len() < per_group_limit {
                group.push(record.clone());
            }
        }
    }
    groups
}

/// Builds a one-to-one index from id to record, last-write-wins on duplicate
/// ids. Records with an absent id are excluded.
pub fn index_by_id<T, F>(records: &[T], id_of: F) -> HashMap<ObjectId, T>
where
    T: Clone,
    F: Fn(&T) -> Option<ObjectId>,
{
    let mut index = HashMap::new();
    for record in records {
        if let Some(id) = assigned(id_of(record)) {
            index.insert(id, record.clone());
        }
    }
    index
}

/// Parses hex id strings into [`ObjectId`]s, silently dropping unparsable
/// entries.
pub fn parse_object_ids<S: AsRef<str>>(ids: &[S]) -> Vec<ObjectId> {
    ids.iter()
        .filter_map(|id| ObjectId::parse_str(id.as_ref()).ok())
        .collect()
}
