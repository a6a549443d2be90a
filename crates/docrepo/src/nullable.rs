//! Decode overrides for explicit null field values.
//!
//! The driver's default deserialization either errors with a type mismatch or
//! leaves the destination in an inconsistent state when a stored field is
//! present but explicitly `null`. The [`zero_on_null`] override substitutes
//! the zero value of the field's type instead, and delegates to the type's
//! normal deserialization for every non-null wire value.
//!
//! Coverage is per-type: any field whose declared type implements `Default`
//! can opt in at the declaration site. The zero values for the common cases
//! (empty string, zero integer) are the standard `Default` impls.
//!
//! ```
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Profile {
//!     #[serde(default, deserialize_with = "docrepo::nullable::zero_on_null")]
//!     nickname: String,
//!     #[serde(default, deserialize_with = "docrepo::nullable::zero_on_null")]
//!     login_count: i64,
//! }
//! ```

use serde::{Deserialize, Deserializer};

/// Decodes an explicit `null` as the zero value of `T`.
///
/// Pair with `#[serde(default)]` so an absent field also falls back to the
/// zero value rather than failing the whole document decode.
pub fn zero_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document, Bson};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Subject {
        #[serde(default, deserialize_with = "super::zero_on_null")]
        name: String,
        #[serde(default, deserialize_with = "super::zero_on_null")]
        count: i64,
    }

    #[test]
    fn test_explicit_null_decodes_to_zero_values() {
        let decoded: Subject =
            from_document(doc! { "name": Bson::Null, "count": Bson::Null }).unwrap();
        assert_eq!(decoded.name, "");
        assert_eq!(decoded.count, 0);
    }

    #[test]
    fn test_non_null_values_delegate_to_default_decoding() {
        let decoded: Subject = from_document(doc! { "name": "alice", "count": 7_i64 }).unwrap();
        assert_eq!(decoded.name, "alice");
        assert_eq!(decoded.count, 7);
    }

    #[test]
    fn test_absent_fields_fall_back_to_zero_values() {
        let decoded: Subject = from_document(doc! {}).unwrap();
        assert_eq!(decoded.name, "");
        assert_eq!(decoded.count, 0);
    }

    #[test]
    fn test_type_mismatch_still_errors() {
        let result = from_document::<Subject>(doc! { "count": "seven" });
        assert!(result.is_err());
    }
}
