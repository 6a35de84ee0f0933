//! StateStore: redb-backed persistence for the KKN autogroup service.
//!
//! Typed CRUD over locations, filter criteria, and grouping history. All
//! values are JSON-serialized into redb's `&[u8]` value columns. The store
//! supports both on-disk and in-memory backends (the latter for testing).

use std::cmp::Reverse;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use kkn_core::{FilterCriteria, Location, LocationId};
use redb::{Database, ReadableDatabase, ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
        txn.open_table(CRITERIA).map_err(map_err!(Table))?;
        txn.open_table(GROUPINGS).map_err(map_err!(Table))?;
        txn.open_table(GROUPING_MEMBERS).map_err(map_err!(Table))?;
        txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Locations ──────────────────────────────────────────────────

    /// Insert a new location and return it with its assigned id.
    pub fn insert_location(&self, location: &Location) -> StateResult<Location> {
        check_location(location)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut stored = location.clone();
        stored.id = next_id(&txn, SEQ_LOCATIONS)?;
        {
            let mut table = txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
            let value = encode(&stored)?;
            table
                .insert(stored.id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = stored.id, name = %stored.name, "location stored");
        Ok(stored)
    }

    /// Replace an existing location. Fails with `NotFound` if the id is unknown.
    pub fn put_location(&self, location: &Location) -> StateResult<()> {
        check_location(location)?;
        let value = encode(location)?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
            if table.get(location.id).map_err(map_err!(Read))?.is_none() {
                return Err(StateError::NotFound(format!("location {}", location.id)));
            }
            table
                .insert(location.id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = location.id, "location updated");
        Ok(())
    }

    /// Get a location by id.
    pub fn get_location(&self, id: LocationId) -> StateResult<Option<Location>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// List all locations, newest first.
    pub fn list_locations(&self) -> StateResult<Vec<Location>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
        let mut locations = load_all::<Location>(&table)?;
        locations.reverse();
        Ok(locations)
    }

    /// Delete a location by id. Returns true if it existed.
    pub fn delete_location(&self, id: LocationId) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(LOCATIONS).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, existed, "location deleted");
        Ok(existed)
    }

    // ── Criteria ───────────────────────────────────────────────────

    /// Insert a criteria record. The name must be unique (case-insensitive).
    /// An active record deactivates every other record in the same transaction.
    pub fn insert_criteria(&self, draft: &CriteriaRecord) -> StateResult<CriteriaRecord> {
        check_criteria(&draft.criteria)?;
        let now = epoch_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut record = draft.clone();
        record.criteria.name = record.criteria.name.trim().to_string();
        record.created_at = now;
        record.updated_at = now;
        record.id = next_id(&txn, SEQ_CRITERIA)?;
        {
            let mut table = txn.open_table(CRITERIA).map_err(map_err!(Table))?;
            let existing = load_all::<CriteriaRecord>(&table)?;
            ensure_unique_name(&existing, &record.criteria.name, None)?;
            if record.is_active {
                deactivate_others(&mut table, &existing, record.id, now)?;
            }
            let value = encode(&record)?;
            table
                .insert(record.id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            id = record.id,
            name = %record.criteria.name,
            active = record.is_active,
            "criteria stored"
        );
        Ok(record)
    }

    /// Replace an existing criteria record, keeping its creation time.
    pub fn put_criteria(&self, record: &CriteriaRecord) -> StateResult<CriteriaRecord> {
        check_criteria(&record.criteria)?;
        let now = epoch_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut updated = record.clone();
        updated.criteria.name = updated.criteria.name.trim().to_string();
        {
            let mut table = txn.open_table(CRITERIA).map_err(map_err!(Table))?;
            let existing = load_all::<CriteriaRecord>(&table)?;
            let Some(current) = existing.iter().find(|r| r.id == record.id) else {
                return Err(StateError::NotFound(format!("criteria {}", record.id)));
            };
            ensure_unique_name(&existing, &updated.criteria.name, Some(record.id))?;

            updated.created_at = current.created_at;
            updated.updated_at = now;
            if updated.is_active {
                deactivate_others(&mut table, &existing, updated.id, now)?;
            }
            let value = encode(&updated)?;
            table
                .insert(updated.id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = updated.id, active = updated.is_active, "criteria updated");
        Ok(updated)
    }

    /// Get a criteria record by id.
    pub fn get_criteria(&self, id: CriteriaId) -> StateResult<Option<CriteriaRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CRITERIA).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// List criteria records: the active one first, then newest first.
    pub fn list_criteria(&self) -> StateResult<Vec<CriteriaRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CRITERIA).map_err(map_err!(Table))?;
        let mut records = load_all::<CriteriaRecord>(&table)?;
        records.sort_by_key(|r| (!r.is_active, Reverse(r.id)));
        Ok(records)
    }

    /// The currently active criteria record, if any.
    pub fn active_criteria(&self) -> StateResult<Option<CriteriaRecord>> {
        Ok(self.list_criteria()?.into_iter().find(|r| r.is_active))
    }

    /// Delete a criteria record by id. Returns true if it existed.
    pub fn delete_criteria(&self, id: CriteriaId) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(CRITERIA).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, existed, "criteria deleted");
        Ok(existed)
    }

    /// Insert `defaults` as the active record when no criteria exist yet.
    /// Returns the inserted record, or `None` if the table was not empty.
    pub fn seed_default_criteria(
        &self,
        defaults: &FilterCriteria,
    ) -> StateResult<Option<CriteriaRecord>> {
        if !self.list_criteria()?.is_empty() {
            return Ok(None);
        }
        let mut draft = CriteriaRecord::draft(defaults.clone());
        draft.description = Some("Kriteria default untuk pengelompokan".to_string());
        let record = self.insert_criteria(&draft)?;
        debug!(id = record.id, "default criteria seeded");
        Ok(Some(record))
    }

    // ── Grouping history ───────────────────────────────────────────

    /// Store a grouping header and all of its member rows atomically.
    /// Returns the assigned grouping id.
    pub fn save_grouping(
        &self,
        header: &GroupingHistory,
        members: &[GroupingMember],
    ) -> StateResult<GroupingId> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let id = next_id(&txn, SEQ_GROUPINGS)?;
        let mut stored = header.clone();
        stored.id = id;
        if stored.created_at == 0 {
            stored.created_at = epoch_secs();
        }
        {
            let mut table = txn.open_table(GROUPINGS).map_err(map_err!(Table))?;
            let value = encode(&stored)?;
            table.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        {
            let mut table = txn.open_table(GROUPING_MEMBERS).map_err(map_err!(Table))?;
            for (seq, member) in members.iter().enumerate() {
                let mut row = member.clone();
                row.grouping_id = id;
                let key = member_key(id, row.group_number, seq);
                let value = encode(&row)?;
                table
                    .insert(key.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, members = members.len(), "grouping stored");
        Ok(id)
    }

    /// Get a full grouping record by id.
    pub fn get_grouping(&self, id: GroupingId) -> StateResult<Option<GroupingHistory>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPINGS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// List grouping summaries, newest first.
    pub fn list_groupings(&self) -> StateResult<Vec<GroupingSummary>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPINGS).map_err(map_err!(Table))?;
        let records = load_all::<GroupingHistory>(&table)?;
        Ok(records.iter().rev().map(GroupingSummary::from).collect())
    }

    /// Member rows of a grouping ordered by group number, then name.
    pub fn list_grouping_members(&self, id: GroupingId) -> StateResult<Vec<GroupingMember>> {
        let prefix = member_prefix(id);
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(GROUPING_MEMBERS).map_err(map_err!(Table))?;
        let mut rows = Vec::new();
        for entry in table.range(prefix.as_str()..).map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            rows.push(decode::<GroupingMember>(value.value())?);
        }
        rows.sort_by(|a, b| {
            a.group_number
                .cmp(&b.group_number)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    /// Delete a grouping and its member rows. Returns true if it existed.
    pub fn delete_grouping(&self, id: GroupingId) -> StateResult<bool> {
        let prefix = member_prefix(id);
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        let mut removed = 0usize;
        {
            let mut table = txn.open_table(GROUPINGS).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        {
            let mut table = txn.open_table(GROUPING_MEMBERS).map_err(map_err!(Table))?;
            let mut keys = Vec::new();
            for entry in table.range(prefix.as_str()..).map_err(map_err!(Read))? {
                let (key, _) = entry.map_err(map_err!(Read))?;
                let k = key.value();
                if !k.starts_with(&prefix) {
                    break;
                }
                keys.push(k.to_string());
            }
            for key in &keys {
                table.remove(key.as_str()).map_err(map_err!(Write))?;
                removed += 1;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, existed, members = removed, "grouping deleted");
        Ok(existed)
    }
}

// ── Helpers ────────────────────────────────────────────────────────

fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(map_err!(Serialize))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StateResult<T> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

/// Every record of a `u64`-keyed table in ascending id order.
fn load_all<T: DeserializeOwned>(
    table: &impl ReadableTable<u64, &'static [u8]>,
) -> StateResult<Vec<T>> {
    let mut records = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, value) = entry.map_err(map_err!(Read))?;
        records.push(decode(value.value())?);
    }
    Ok(records)
}

/// Bump and return the named sequence inside an open write transaction.
fn next_id(txn: &WriteTransaction, sequence: &str) -> StateResult<u64> {
    let mut table = txn.open_table(SEQUENCES).map_err(map_err!(Table))?;
    let current = table
        .get(sequence)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next).map_err(map_err!(Write))?;
    Ok(next)
}

fn check_location(location: &Location) -> StateResult<()> {
    if location.name.trim().is_empty() {
        return Err(StateError::Invalid("lokasi is required".to_string()));
    }
    if location.quota_used > location.quota_total {
        return Err(StateError::Invalid(format!(
            "kuota_terpakai ({}) exceeds kuota_total ({})",
            location.quota_used, location.quota_total
        )));
    }
    Ok(())
}

fn check_criteria(criteria: &FilterCriteria) -> StateResult<()> {
    if criteria.name.trim().is_empty() {
        return Err(StateError::Invalid("nama_kriteria is required".to_string()));
    }
    criteria
        .validate()
        .map_err(|e| StateError::Invalid(e.to_string()))
}

fn ensure_unique_name(
    existing: &[CriteriaRecord],
    name: &str,
    except: Option<CriteriaId>,
) -> StateResult<()> {
    let taken = existing
        .iter()
        .filter(|r| Some(r.id) != except)
        .any(|r| r.criteria.name.trim().eq_ignore_ascii_case(name));
    if taken {
        return Err(StateError::Conflict(format!(
            "criteria name `{name}` is already used"
        )));
    }
    Ok(())
}

fn deactivate_others(
    table: &mut redb::Table<'_, u64, &'static [u8]>,
    existing: &[CriteriaRecord],
    keep: CriteriaId,
    now: u64,
) -> StateResult<()> {
    for other in existing.iter().filter(|r| r.is_active && r.id != keep) {
        let mut off = other.clone();
        off.is_active = false;
        off.updated_at = now;
        let value = encode(&off)?;
        table.insert(off.id, value.as_slice()).map_err(map_err!(Write))?;
        debug!(id = off.id, "criteria deactivated");
    }
    Ok(())
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
