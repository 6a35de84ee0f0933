//! redb table definitions for the KKN store.
//!
//! Record tables are keyed by a `u64` id and hold JSON values. Member rows
//! use `{grouping:010}:{group:05}:{seq:05}` string keys, zero padded so the
//! lexical order is grouping, then group number, then insertion order.

use redb::TableDefinition;

/// Placement locations keyed by `id_lokasi`.
pub const LOCATIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("locations");

/// Filter criteria keyed by `id_criteria`.
pub const CRITERIA: TableDefinition<u64, &[u8]> = TableDefinition::new("criteria");

/// Grouping history headers keyed by `id_grouping`.
pub const GROUPINGS: TableDefinition<u64, &[u8]> = TableDefinition::new("groupings");

/// One row per placed student, keyed by `{grouping}:{group}:{seq}`.
pub const GROUPING_MEMBERS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("grouping_members");

/// Last id handed out, per record table name.
pub const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence names.
pub const SEQ_LOCATIONS: &str = "locations";
pub const SEQ_CRITERIA: &str = "criteria";
pub const SEQ_GROUPINGS: &str = "groupings";

/// Key for a member row.
pub fn member_key(grouping_id: u64, group_number: u32, seq: usize) -> String {
    format!("{grouping_id:010}:{group_number:05}:{seq:05}")
}

/// Prefix shared by every member row of a grouping.
pub fn member_prefix(grouping_id: u64) -> String {
    format!("{grouping_id:010}:")
}
