//! Shard-key comparison: turns a shard's raw `lower_bound` string and an
//! incoming key into an ordering, dispatched on [`ShardType`].
//!
//! A malformed `lower_bound` or key is rejected with
//! [`FabricCacheError::MalformedKey`] rather than treated as an
//! always-matching lower bound — a boundary that silently matches
//! everything would route every key to the shard that happens to hold it.

use core::cmp::Ordering;

use md5::{Digest, Md5};

use crate::error::FabricCacheError;
use crate::model::{ManagedShard, ShardType};

fn integer_bound(value: &str) -> Result<i64, FabricCacheError> {
    value.trim().parse().map_err(|_| FabricCacheError::MalformedKey {
        value: value.to_owned(),
        shard_type: "integer",
    })
}

fn datetime_bound(value: &str) -> Result<chrono::NaiveDateTime, FabricCacheError> {
    chrono::NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S").map_err(|_| {
        FabricCacheError::MalformedKey {
            value: value.to_owned(),
            shard_type: "datetime",
        }
    })
}

fn md5_hex(value: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(value.as_bytes());
    hex_lower(&hasher.finalize())
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Compares `shard`'s lower bound against `key`, in the representation
/// `shard.shard_type` dictates. Returns `bound.cmp(key)`: `Less` means the
/// bound is below the key (the shard is a candidate), `Greater` or `Equal`
/// also participate per the range rule below.
pub fn compare_bound(shard: &ManagedShard, key: &str) -> Result<Ordering, FabricCacheError> {
    match shard.shard_type {
        ShardType::Integer => {
            let bound = integer_bound(&shard.lower_bound)?;
            let key = integer_bound(key)?;
            Ok(bound.cmp(&key))
        }
        ShardType::DateTime => {
            let bound = datetime_bound(&shard.lower_bound)?;
            let key = datetime_bound(key)?;
            Ok(bound.cmp(&key))
        }
        ShardType::String => Ok(shard.lower_bound.as_str().cmp(key)),
        ShardType::Hash => Ok(shard.lower_bound.as_str().cmp(key)),
    }
}

/// Selects the shard whose lower bound is the greatest one `<= key`
/// among `shards` — the "maximum lower_bound ≤ key" rule Fabric's
/// range sharding uses to pick the shard a row belongs to. Returns `None`
/// when no shard's bound is `<= key`, distinct from a malformed bound or
/// key, which is still a hard error.
///
/// `shards` must all share the same [`ShardType`]; this is Fabric's own
/// invariant for a sharding table and is not re-validated here.
pub fn select_shard<'a>(
    shards: &'a [ManagedShard],
    key: &str,
) -> Result<Option<&'a ManagedShard>, FabricCacheError> {
    let mut best: Option<&ManagedShard> = None;

    for shard in shards {
        let ordering = compare_bound(shard, key)?;
        if ordering == Ordering::Greater {
            continue;
        }
        best = match best {
            None => Some(shard),
            Some(current) => {
                if compare_bound(shard, &current.lower_bound)? == Ordering::Greater {
                    Some(shard)
                } else {
                    Some(current)
                }
            }
        };
    }

    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(lower_bound: &str, shard_type: ShardType) -> ManagedShard {
        ManagedShard {
            schema_name: "db".to_owned(),
            table_name: "t".to_owned(),
            column_name: "id".to_owned(),
            lower_bound: lower_bound.to_owned(),
            shard_id: 1,
            shard_type,
            group_id: "group-1".to_owned(),
            global_group: "global".to_owned(),
        }
    }

    #[test]
    fn picks_the_greatest_bound_not_exceeding_the_key() {
        let shards = vec![
            shard("0", ShardType::Integer),
            shard("100", ShardType::Integer),
            shard("200", ShardType::Integer),
        ];
        let picked = select_shard(&shards, "150").unwrap().unwrap();
        assert_eq!(picked.lower_bound, "100");
    }

    #[test]
    fn key_below_every_bound_is_not_found() {
        let shards = vec![shard("100", ShardType::Integer)];
        assert!(select_shard(&shards, "50").unwrap().is_none());
    }

    #[test]
    fn malformed_datetime_bound_is_rejected() {
        let shards = vec![shard("not-a-date", ShardType::DateTime)];
        let err = select_shard(&shards, "2024-01-01 00:00:00").unwrap_err();
        assert!(matches!(err, FabricCacheError::MalformedKey { .. }));
    }

    #[test]
    fn datetime_bounds_order_chronologically() {
        let shards = vec![
            shard("2020-01-01 00:00:00", ShardType::DateTime),
            shard("2023-06-01 00:00:00", ShardType::DateTime),
        ];
        let picked = select_shard(&shards, "2024-01-01 00:00:00").unwrap().unwrap();
        assert_eq!(picked.lower_bound, "2023-06-01 00:00:00");
    }

    #[test]
    fn string_bounds_compare_lexicographically() {
        let shards = vec![shard("a", ShardType::String), shard("m", ShardType::String)];
        let picked = select_shard(&shards, "z").unwrap().unwrap();
        assert_eq!(picked.lower_bound, "m");
    }

    #[test]
    fn hash_bound_compares_against_an_already_hashed_key() {
        // The Hash comparator never hashes its input itself — callers
        // resolving a HASH-sharded key must MD5 it first, same as the
        // original implementation's `MD5HashValueComparator::compare`.
        let key_digest = md5_hex("user-42");
        let mid = &key_digest[..key_digest.len() - 1];
        let shards = vec![
            shard("00000000000000000000000000000000", ShardType::Hash),
            shard(mid, ShardType::Hash),
            shard("ffffffffffffffffffffffffffffffff", ShardType::Hash),
        ];
        let picked = select_shard(&shards, &key_digest).unwrap().unwrap();
        assert_eq!(picked.lower_bound, mid);
    }
}
