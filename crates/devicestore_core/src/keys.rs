//! Row-key construction and parsing.
//!
//! Every row key has the shape `[parent scope][record type][local id?]`.
//! Scopes and local ids are fixed-width truncations of 64-bit values.
//! The functions here are pure: no I/O, no allocation beyond the key.

use crate::schema::RecordType;
use devicestore_storage::{RowFilter, Scan};

/// Width in bytes of a parent scope.
///
/// Four bytes bound each family to 2^32 distinct parents before two
/// identifiers share a scope.
pub const SCOPE_WIDTH: usize = 4;

/// Width in bytes of a child's local id.
///
/// Four bytes bound each parent to 2^32 children of one record type.
pub const LOCAL_ID_WIDTH: usize = 4;

/// Byte offset of the record-type discriminator in every key.
pub const DISCRIMINATOR_OFFSET: usize = SCOPE_WIDTH;

/// Length of a primary key (`scope + discriminator`).
pub const PRIMARY_KEY_LEN: usize = SCOPE_WIDTH + 1;

/// Length of a child key (`scope + discriminator + local id`).
pub const CHILD_KEY_LEN: usize = PRIMARY_KEY_LEN + LOCAL_ID_WIDTH;

/// Keeps the low-order `width` bytes of `id`, big-endian.
///
/// # Panics
///
/// Panics if `width` is not in `1..=8`.
#[must_use]
pub fn truncate(id: i64, width: usize) -> Vec<u8> {
    assert!((1..=8).contains(&width), "invalid truncation width {width}");
    id.to_be_bytes()[8 - width..].to_vec()
}

/// Scope bytes for a parent's internal id.
#[must_use]
pub fn scope(id: i64) -> Vec<u8> {
    truncate(id, SCOPE_WIDTH)
}

/// Local id bytes for a child's allocated counter value.
#[must_use]
pub fn local_id(value: i64) -> Vec<u8> {
    truncate(value, LOCAL_ID_WIDTH)
}

/// `scope + discriminator`, the key of a parent's primary record.
#[must_use]
pub fn primary_key<R: RecordType>(scope: &[u8], record: R) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1);
    key.extend_from_slice(scope);
    key.push(record.discriminator());
    key
}

/// `scope + discriminator`, the common prefix of one record type's children.
#[must_use]
pub fn child_prefix<R: RecordType>(scope: &[u8], record: R) -> Vec<u8> {
    primary_key(scope, record)
}

/// `scope + discriminator + local`, the key of one child record.
#[must_use]
pub fn child_key<R: RecordType>(scope: &[u8], record: R, local: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1 + local.len());
    key.extend_from_slice(scope);
    key.push(record.discriminator());
    key.extend_from_slice(local);
    key
}

/// `scope + END`, sorting after every record of the parent.
#[must_use]
pub fn end_key<R: RecordType>(scope: &[u8]) -> Vec<u8> {
    primary_key(scope, R::END)
}

/// Exclusive stop key for one record type's children: the next
/// discriminator under the same scope (the `END` value for the last type).
#[must_use]
pub fn after_key<R: RecordType>(scope: &[u8], record: R) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1);
    key.extend_from_slice(scope);
    key.push(record.discriminator() + 1);
    key
}

/// Scan covering exactly the children of `record` under `scope`.
#[must_use]
pub fn child_range<R: RecordType>(scope: &[u8], record: R) -> Scan {
    Scan::range(child_prefix(scope, record), after_key(scope, record))
}

/// Scan covering every child record of a parent (primary record excluded).
#[must_use]
pub fn children_range<R: RecordType>(scope: &[u8], first_child: R) -> Scan {
    Scan::range(child_prefix(scope, first_child), end_key::<R>(scope))
}

/// Filter selecting only primary records of type `record` in a table that
/// mixes primary and child rows.
#[must_use]
pub fn primary_filter<R: RecordType>(record: R) -> RowFilter {
    RowFilter::All(vec![
        RowFilter::DiscriminatorAt {
            offset: DISCRIMINATOR_OFFSET,
            value: record.discriminator(),
        },
        RowFilter::KeyLength(PRIMARY_KEY_LEN),
    ])
}

/// Reads the discriminator byte at `offset`.
#[must_use]
pub fn discriminator_at(key: &[u8], offset: usize) -> Option<u8> {
    key.get(offset).copied()
}

/// Reads the discriminator of a key that starts with a parent scope.
#[must_use]
pub fn record_discriminator(key: &[u8]) -> Option<u8> {
    discriminator_at(key, DISCRIMINATOR_OFFSET)
}

/// Returns the scope bytes of a key.
#[must_use]
pub fn scope_of(key: &[u8]) -> Option<&[u8]> {
    key.get(..SCOPE_WIDTH)
}

/// Returns the local id bytes of a child key.
#[must_use]
pub fn local_id_of(key: &[u8]) -> Option<&[u8]> {
    key.get(PRIMARY_KEY_LEN..CHILD_KEY_LEN)
}

/// Parses a child key's local id as an unsigned 32-bit value.
#[must_use]
pub fn parse_local_id(key: &[u8]) -> Option<u32> {
    let bytes: [u8; LOCAL_ID_WIDTH] = local_id_of(key)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AreaRecord, DeviceTypeRecord, GroupRecord};
    use proptest::prelude::*;

    #[test]
    fn truncate_keeps_low_order_bytes() {
        assert_eq!(truncate(0x0102_0304_0506_0708, 2), vec![0x07, 0x08]);
        assert_eq!(truncate(0x0102_0304_0506_0708, 4), vec![0x05, 0x06, 0x07, 0x08]);
        assert_eq!(truncate(1, 8), vec![0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(truncate(i64::MAX - 1, 4), vec![0xff, 0xff, 0xff, 0xfe]);
    }

    #[test]
    #[should_panic(expected = "invalid truncation width")]
    fn truncate_rejects_zero_width() {
        let _ = truncate(1, 0);
    }

    #[test]
    fn key_shapes() {
        let s = scope(7);
        assert_eq!(primary_key(&s, AreaRecord::Area), vec![0, 0, 0, 7, 0x00]);
        assert_eq!(
            child_key(&s, AreaRecord::Zone, &local_id(9)),
            vec![0, 0, 0, 7, 0x01, 0, 0, 0, 9]
        );
        assert_eq!(end_key::<AreaRecord>(&s), vec![0, 0, 0, 7, 0x03]);
        assert_eq!(after_key(&s, AreaRecord::Zone), vec![0, 0, 0, 7, 0x02]);
        assert_eq!(after_key(&s, AreaRecord::Assignment), end_key::<AreaRecord>(&s));
    }

    #[test]
    fn child_range_excludes_siblings() {
        let s = scope(3);
        let zones = child_range(&s, AreaRecord::Zone);
        let zone = child_key(&s, AreaRecord::Zone, &local_id(i64::MAX - 1));
        let assignment = child_key(&s, AreaRecord::Assignment, &local_id(i64::MAX - 1));
        assert!(zones.in_range(&zone));
        assert!(!zones.in_range(&assignment));
        assert!(!zones.in_range(&primary_key(&s, AreaRecord::Area)));
    }

    #[test]
    fn children_range_covers_all_child_types() {
        let s = scope(3);
        let all = children_range(&s, DeviceTypeRecord::Command);
        assert!(all.in_range(&child_key(&s, DeviceTypeRecord::Command, &local_id(1))));
        assert!(all.in_range(&child_key(&s, DeviceTypeRecord::Status, &local_id(1))));
        assert!(!all.in_range(&primary_key(&s, DeviceTypeRecord::DeviceType)));
        assert!(!all.in_range(&primary_key(&scope(4), DeviceTypeRecord::DeviceType)));
    }

    #[test]
    fn primary_filter_matches_only_primary_rows() {
        let filter = primary_filter(GroupRecord::Group);
        let s = scope(11);
        assert!(filter.matches(&primary_key(&s, GroupRecord::Group)));
        assert!(!filter.matches(&child_key(&s, GroupRecord::Element, &local_id(1))));
    }

    #[test]
    fn parse_helpers() {
        let key = child_key(&scope(5), AreaRecord::Assignment, &local_id(42));
        assert_eq!(scope_of(&key), Some(&[0, 0, 0, 5][..]));
        assert_eq!(record_discriminator(&key), Some(0x02));
        assert_eq!(parse_local_id(&key), Some(42));
        assert_eq!(parse_local_id(&key[..6]), None);
        assert_eq!(discriminator_at(&key, 100), None);
    }

    proptest! {
        #[test]
        fn descending_values_sort_newest_first(a in 1i64..1_000_000, b in 1i64..1_000_000) {
            prop_assume!(a != b);
            let s = scope(1);
            let ka = child_key(&s, AreaRecord::Zone, &local_id(i64::MAX - a));
            let kb = child_key(&s, AreaRecord::Zone, &local_id(i64::MAX - b));
            // later allocation (larger offset from MAX) sorts first
            prop_assert_eq!(a < b, kb < ka);
        }

        #[test]
        fn child_range_partitions_by_record(scope_id in any::<i64>(), local in any::<i64>()) {
            let s = scope(scope_id);
            let zone = child_key(&s, AreaRecord::Zone, &local_id(local));
            let assignment = child_key(&s, AreaRecord::Assignment, &local_id(local));
            prop_assert!(child_range(&s, AreaRecord::Zone).in_range(&zone));
            prop_assert!(!child_range(&s, AreaRecord::Zone).in_range(&assignment));
            prop_assert!(child_range(&s, AreaRecord::Assignment).in_range(&assignment));
            prop_assert!(!child_range(&s, AreaRecord::Assignment).in_range(&zone));
        }
    }
}
