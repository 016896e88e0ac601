//! The unit of work.
//!
//! A [`Session`] owns one database handle, one change tracker and a
//! default actor. Repositories created from it stage mutations;
//! [`Session::commit`] runs the audit pass over the staged entries and
//! flushes them inside a single store transaction.

use chrono::{DateTime, Utc};
use stowage_db::{Database, DeleteQuery, Filter, InsertQuery, UpdateQuery};
use tokio::task;
use tracing::{debug, trace};

use crate::{
    entity::{ActorKey, AuditCapability, DeleteCapability, Entity},
    error::{Error, Result},
    repository::{ReadOnlyRepository, Repository},
    tracker::{new_tracker, Entry, EntryState, TrackerHandle},
};

/// A unit of work over one logical transaction.
///
/// `K` is the actor key type stamped into created-by/modified-by/
/// deleted-by fields; entities served by this session must agree on it.
/// One session per logical request, used from a single logical thread of
/// control at a time.
pub struct Session<K: ActorKey> {
    db: Database,
    tracker: TrackerHandle<K>,
    default_actor: K,
}

impl<K: ActorKey> Clone for Session<K> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            tracker: self.tracker.clone(),
            default_actor: self.default_actor.clone(),
        }
    }
}

impl<K: ActorKey> Session<K> {
    /// Creates a session. `default_actor` is stamped whenever a commit
    /// is given no explicit actor.
    pub fn new(db: Database, default_actor: K) -> Self {
        Self {
            db,
            tracker: new_tracker(),
            default_actor,
        }
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// A read-write repository sharing this session's change tracker.
    pub fn repository<E: Entity<Actor = K>>(&self) -> Repository<E> {
        Repository::new(self.db.clone(), self.tracker.clone())
    }

    /// A read-only repository whose tracked reads register with this
    /// session.
    pub fn read_only<E: Entity<Actor = K>>(&self) -> ReadOnlyRepository<E> {
        ReadOnlyRepository::with_tracker(self.db.clone(), self.tracker.clone())
    }

    /// Number of staged mutations awaiting commit.
    pub fn pending(&self) -> usize {
        self.tracker.lock().unwrap().pending()
    }

    /// Runs the audit pass over every staged entry, then persists all of
    /// them inside one store transaction. Returns the number of affected
    /// rows.
    ///
    /// On persistence failure the store error propagates unmodified and
    /// the entries stay staged for a later attempt; audit stamps applied
    /// by the failed pass are not rolled back.
    pub fn commit(&self, actor: Option<K>) -> Result<usize> {
        let mut tracker = self.tracker.lock().unwrap();
        if tracker.entries.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let by = actor.unwrap_or_else(|| self.default_actor.clone());
        debug!(pending = tracker.entries.len(), "committing unit of work");

        stamp_entries(&mut tracker.entries, &by, now);
        flush(&self.db, &mut tracker.entries)
    }

    /// Async dual of [`Self::commit`], run on the blocking thread pool.
    /// Dropping the future before it is polled to completion abandons
    /// the commit; staged entries remain for the next attempt.
    pub async fn commit_async(&self, actor: Option<K>) -> Result<usize> {
        let session = self.clone();
        task::spawn_blocking(move || session.commit(actor)).await?
    }
}

/// The audit pass. Only `Added` and `Modified` entries are stamped;
/// actor-aware capabilities take precedence over plain timestamps, and
/// the deletion stamp runs independently of both whenever the staged
/// record already carries a deletion timestamp.
fn stamp_entries<K: ActorKey>(entries: &mut [Entry<K>], by: &K, now: DateTime<Utc>) {
    for entry in entries.iter_mut() {
        if !matches!(entry.state, EntryState::Added | EntryState::Modified) {
            continue;
        }

        let caps = entry.record.caps();
        match (caps.audit, entry.state) {
            (AuditCapability::WithActor, EntryState::Added) => {
                entry.record.set_created(now);
                entry.record.set_created_by(by.clone());
            }
            (AuditCapability::WithActor, EntryState::Modified) => {
                entry.record.set_modified(now);
                entry.record.set_modified_by(by.clone());
            }
            (AuditCapability::Timestamps, EntryState::Added) => {
                entry.record.set_created(now);
            }
            (AuditCapability::Timestamps, EntryState::Modified) => {
                entry.record.set_modified(now);
            }
            _ => {}
        }

        if entry.record.deleted_at().is_some() {
            match caps.delete {
                DeleteCapability::SoftWithActor => {
                    entry.record.set_deleted(now);
                    entry.record.set_deleted_by(by.clone());
                }
                DeleteCapability::Soft => {
                    entry.record.set_deleted(now);
                }
                DeleteCapability::Hard => {}
            }
        }

        trace!(
            table = entry.record.table(),
            state = ?entry.state,
            "stamped entry"
        );
    }
}

/// Flushes every staged entry through the query builders inside one
/// store transaction. Drains the entries on success; leaves them staged
/// on failure.
fn flush<K>(db: &Database, entries: &mut Vec<Entry<K>>) -> Result<usize> {
    db.execute_batch("BEGIN IMMEDIATE").map_err(Error::from)?;

    match flush_all(db, entries) {
        Ok(affected) => {
            db.execute_batch("COMMIT").map_err(Error::from)?;
            entries.clear();
            debug!(affected, "unit of work committed");
            Ok(affected)
        }
        Err(err) => {
            let _ = db.execute_batch("ROLLBACK");
            Err(err)
        }
    }
}

fn flush_all<K>(db: &Database, entries: &[Entry<K>]) -> Result<usize> {
    let mut affected = 0;

    for entry in entries {
        let record = &entry.record;
        match entry.state {
            EntryState::Added => {
                let mut query = InsertQuery::into(db.clone(), record.table()).set_row(record.row());
                if let Some(id) = record.id_value() {
                    query = query.value(record.id_column(), id);
                }
                query.execute()?;
                affected += 1;
            }
            EntryState::Modified => {
                let id = record.id_value().ok_or(Error::MissingId {
                    table: record.table(),
                })?;
                affected += UpdateQuery::table(db.clone(), record.table())
                    .set_row(record.row())
                    .with_filter(Filter::column_eq(record.id_column(), id))
                    .execute()?;
            }
            EntryState::Deleted => match record.id_value() {
                Some(id) => {
                    affected += DeleteQuery::from(db.clone(), record.table())
                        .with_filter(Filter::column_eq(record.id_column(), id))
                        .execute()?;
                }
                None => {
                    trace!(table = record.table(), "skipping delete of transient row");
                }
            },
        }
    }

    Ok(affected)
}
