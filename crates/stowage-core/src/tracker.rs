//! The change tracker: staged mutations awaiting commit.
//!
//! Repositories stage entities here; the session's commit walks the
//! entries, stamps audit fields and flushes them to storage. Entries are
//! type-erased through [`Staged`] so one tracker spans every entity type
//! of the session.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;

use crate::entity::{ActorKey, Capabilities, Entity};

/// Lifecycle state of a staged entry.
///
/// Soft deletes stage as [`Modified`](EntryState::Modified) rows carrying
/// a deletion timestamp; only hard deletes stage as
/// [`Deleted`](EntryState::Deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
}

/// Object-safe view of a staged entity, exposing exactly what the audit
/// pipeline and the flush need: the row mapping, the capability tags and
/// the stamping hooks.
pub(crate) trait Staged<K>: Send {
    fn table(&self) -> &'static str;
    fn id_column(&self) -> &'static str;
    fn id_value(&self) -> Option<Value>;
    fn row(&self) -> Vec<(&'static str, Value)>;
    fn caps(&self) -> Capabilities;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn set_created(&mut self, at: DateTime<Utc>);
    fn set_modified(&mut self, at: DateTime<Utc>);
    fn set_created_by(&mut self, by: K);
    fn set_modified_by(&mut self, by: K);
    fn set_deleted(&mut self, at: DateTime<Utc>);
    fn set_deleted_by(&mut self, by: K);
}

impl<K: ActorKey, E: Entity<Actor = K>> Staged<K> for E {
    fn table(&self) -> &'static str {
        E::TABLE
    }

    fn id_column(&self) -> &'static str {
        E::ID_COLUMN
    }

    fn id_value(&self) -> Option<Value> {
        self.id().map(Into::into)
    }

    fn row(&self) -> Vec<(&'static str, Value)> {
        Entity::row(self)
    }

    fn caps(&self) -> Capabilities {
        E::CAPS
    }

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        Entity::deleted_at(self)
    }

    fn set_created(&mut self, at: DateTime<Utc>) {
        Entity::set_created(self, at);
    }

    fn set_modified(&mut self, at: DateTime<Utc>) {
        Entity::set_modified(self, at);
    }

    fn set_created_by(&mut self, by: K) {
        Entity::set_created_by(self, by);
    }

    fn set_modified_by(&mut self, by: K) {
        Entity::set_modified_by(self, by);
    }

    fn set_deleted(&mut self, at: DateTime<Utc>) {
        Entity::set_deleted(self, Some(at));
    }

    fn set_deleted_by(&mut self, by: K) {
        Entity::set_deleted_by(self, by);
    }
}

/// One staged mutation.
pub(crate) struct Entry<K> {
    pub state: EntryState,
    pub record: Box<dyn Staged<K>>,
}

/// Pending entries plus the identity registry of attached rows.
pub(crate) struct ChangeTracker<K> {
    pub entries: Vec<Entry<K>>,
    attached: Vec<(&'static str, Value)>,
}

impl<K> ChangeTracker<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            attached: Vec::new(),
        }
    }

    pub fn stage(&mut self, state: EntryState, record: Box<dyn Staged<K>>) {
        self.entries.push(Entry { state, record });
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Registers a materialized row as attached to this unit of work.
    pub fn attach(&mut self, table: &'static str, id: Value) {
        if !self.is_attached(table, &id) {
            self.attached.push((table, id));
        }
    }

    pub fn is_attached(&self, table: &'static str, id: &Value) -> bool {
        self.attached
            .iter()
            .any(|(t, v)| *t == table && v == id)
    }
}

pub(crate) type TrackerHandle<K> = Arc<Mutex<ChangeTracker<K>>>;

pub(crate) fn new_tracker<K>() -> TrackerHandle<K> {
    Arc::new(Mutex::new(ChangeTracker::new()))
}
