//! Read-only and read-write repositories.
//!
//! Every read routes through [`crate::filter::compose`]; every write
//! stages an entry in the owning session's change tracker and touches
//! storage only at commit. Async variants run the same logic on the
//! blocking thread pool so callers never block an async executor thread;
//! dropping the returned future between I/O steps abandons the call
//! without touching staged state.

use rusqlite::types::Value;
use stowage_db::{
    query::SelectQuery, Database, Filter, FromRow, Predicate, Projection,
};
use tokio::task;
use tracing::{debug, trace};

use crate::{
    entity::{DeleteCapability, Entity},
    error::{Error, Result},
    filter::{compose, QueryOptions},
    paged::Paged,
    tracker::{EntryState, TrackerHandle},
};

/// Query surface over one entity type.
///
/// Standalone instances (via [`ReadOnlyRepository::new`]) always return
/// detached rows; instances handed out by a session additionally register
/// tracked reads with the session's change tracker.
pub struct ReadOnlyRepository<E: Entity> {
    db: Database,
    tracker: Option<TrackerHandle<E::Actor>>,
}

impl<E: Entity> Clone for ReadOnlyRepository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<E: Entity> ReadOnlyRepository<E> {
    /// A repository without a change tracker, for pure query work.
    pub fn new(db: Database) -> Self {
        Self { db, tracker: None }
    }

    pub(crate) fn with_tracker(db: Database, tracker: TrackerHandle<E::Actor>) -> Self {
        Self {
            db,
            tracker: Some(tracker),
        }
    }

    fn base(&self) -> SelectQuery<E> {
        SelectQuery::from(self.db.clone(), E::TABLE)
    }

    fn register(&self, rows: &[E], options: &QueryOptions) {
        let Some(tracker) = &self.tracker else {
            return;
        };
        if !options.is_tracked() {
            return;
        }
        let mut tracker = tracker.lock().unwrap();
        for row in rows {
            if let Some(id) = row.id() {
                tracker.attach(E::TABLE, id.into());
            }
        }
    }

    /// Whether at least one row matches the condition. The global
    /// soft-delete filter applies.
    pub fn any(&self, condition: impl Predicate) -> Result<bool> {
        let query = compose(self.base(), &QueryOptions::new().filter(condition));
        Ok(query.exists()?)
    }

    /// Counts matching rows.
    pub fn count(&self, options: QueryOptions) -> Result<i64> {
        Ok(compose(self.base(), &options).count()?)
    }

    /// Looks up one row by identifier equality.
    pub fn get_by_id(&self, id: E::Id, options: QueryOptions) -> Result<Option<E>> {
        let query = compose(self.base(), &options)
            .with_filter(Filter::column_eq(E::ID_COLUMN, id.into()));
        let found = query.fetch_one()?;
        if let Some(row) = &found {
            self.register(std::slice::from_ref(row), &options);
        }
        Ok(found)
    }

    /// First matching row; fails with [`Error::NoRows`] when none match.
    pub fn get_first(&self, options: QueryOptions) -> Result<E> {
        self.get_first_opt(options)?.ok_or(Error::NoRows)
    }

    /// First matching row, or `None`.
    pub fn get_first_opt(&self, options: QueryOptions) -> Result<Option<E>> {
        let found = compose(self.base(), &options).fetch_one()?;
        if let Some(row) = &found {
            self.register(std::slice::from_ref(row), &options);
        }
        Ok(found)
    }

    /// The unique matching row; fails with [`Error::NoRows`] when none
    /// match and [`Error::MultipleRows`] when several do.
    pub fn get_single(&self, options: QueryOptions) -> Result<E> {
        self.get_single_opt(options)?.ok_or(Error::NoRows)
    }

    /// The unique matching row, or `None`; fails with
    /// [`Error::MultipleRows`] when several match.
    pub fn get_single_opt(&self, options: QueryOptions) -> Result<Option<E>> {
        let mut rows = compose(self.base(), &options).limit(2).fetch()?;
        match rows.len() {
            0 => Ok(None),
            1 => {
                self.register(&rows, &options);
                Ok(rows.pop())
            }
            _ => Err(Error::MultipleRows),
        }
    }

    /// Materializes every matching row.
    pub fn get_all(&self, options: QueryOptions) -> Result<Vec<E>> {
        let rows = compose(self.base(), &options).fetch()?;
        self.register(&rows, &options);
        Ok(rows)
    }

    /// One page of matching rows plus the total count across all pages.
    /// The count is taken from the full filtered set before skip/take.
    pub fn get_paged(&self, page: u32, page_size: u32, options: QueryOptions) -> Result<Paged<E>> {
        let query = compose(self.base(), &options);
        let total_count = query.clone().count()?;
        let results = query.page(page, page_size).fetch()?;
        self.register(&results, &options);

        Ok(Paged {
            results,
            total_count,
            page,
            page_size,
        })
    }

    /// Looks up one row by id and materializes a projected shape.
    /// Projections are always detached.
    pub fn get_by_id_as<P: FromRow>(
        &self,
        id: E::Id,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let query = compose::<E>(self.base(), &options.untracked())
            .with_filter(Filter::column_eq(E::ID_COLUMN, id.into()));
        Ok(query.retype::<P>().project(projection).fetch_one()?)
    }

    /// First matching row as a projected shape; fails when none match.
    pub fn get_first_as<P: FromRow>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<P> {
        self.get_first_opt_as(projection, options)?
            .ok_or(Error::NoRows)
    }

    /// First matching row as a projected shape, or `None`.
    pub fn get_first_opt_as<P: FromRow>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let query = compose::<E>(self.base(), &options.untracked());
        Ok(query.retype::<P>().project(projection).fetch_one()?)
    }

    /// The unique matching row as a projected shape; fails when none or
    /// several match.
    pub fn get_single_as<P: FromRow>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<P> {
        self.get_single_opt_as(projection, options)?
            .ok_or(Error::NoRows)
    }

    /// The unique matching row as a projected shape, or `None`; fails
    /// when several match.
    pub fn get_single_opt_as<P: FromRow>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let query = compose::<E>(self.base(), &options.untracked());
        let mut rows = query.retype::<P>().project(projection).limit(2).fetch()?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            _ => Err(Error::MultipleRows),
        }
    }

    /// Every matching row as a projected shape.
    pub fn get_all_as<P: FromRow>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Vec<P>> {
        let query = compose::<E>(self.base(), &options.untracked());
        Ok(query.retype::<P>().project(projection).fetch()?)
    }

    /// Async dual of [`Self::any`].
    pub async fn any_async(&self, condition: impl Predicate + 'static) -> Result<bool> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.any(condition)).await?
    }

    /// Async dual of [`Self::count`].
    pub async fn count_async(&self, options: QueryOptions) -> Result<i64> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.count(options)).await?
    }

    /// Async dual of [`Self::get_by_id`].
    pub async fn get_by_id_async(&self, id: E::Id, options: QueryOptions) -> Result<Option<E>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_by_id(id, options)).await?
    }

    /// Async dual of [`Self::get_first`].
    pub async fn get_first_async(&self, options: QueryOptions) -> Result<E> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_first(options)).await?
    }

    /// Async dual of [`Self::get_first_opt`].
    pub async fn get_first_opt_async(&self, options: QueryOptions) -> Result<Option<E>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_first_opt(options)).await?
    }

    /// Async dual of [`Self::get_single`].
    pub async fn get_single_async(&self, options: QueryOptions) -> Result<E> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_single(options)).await?
    }

    /// Async dual of [`Self::get_single_opt`].
    pub async fn get_single_opt_async(&self, options: QueryOptions) -> Result<Option<E>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_single_opt(options)).await?
    }

    /// Async dual of [`Self::get_all`].
    pub async fn get_all_async(&self, options: QueryOptions) -> Result<Vec<E>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_all(options)).await?
    }

    /// Async dual of [`Self::get_paged`].
    pub async fn get_paged_async(
        &self,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> Result<Paged<E>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_paged(page, page_size, options)).await?
    }

    /// Async dual of [`Self::get_all_as`].
    pub async fn get_all_as_async<P: FromRow + Send + 'static>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Vec<P>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_all_as(projection, options)).await?
    }

    /// Async dual of [`Self::get_first_opt_as`].
    pub async fn get_first_opt_as_async<P: FromRow + Send + 'static>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_first_opt_as(projection, options)).await?
    }

    /// Async dual of [`Self::get_single_opt_as`].
    pub async fn get_single_opt_as_async<P: FromRow + Send + 'static>(
        &self,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_single_opt_as(projection, options)).await?
    }

    /// Async dual of [`Self::get_by_id_as`].
    pub async fn get_by_id_as_async<P: FromRow + Send + 'static>(
        &self,
        id: E::Id,
        projection: Projection,
        options: QueryOptions,
    ) -> Result<Option<P>> {
        let repo = self.clone();
        task::spawn_blocking(move || repo.get_by_id_as(id, projection, options)).await?
    }
}

/// Read-write surface over one entity type, bound to a session.
///
/// Writes stage mutations in the session's change tracker; nothing is
/// persisted until [`crate::session::Session::commit`]. Deletes use the
/// entity type's delete capability: soft-deletable types get their
/// deletion timestamp set and stage as updates, everything else stages
/// for removal.
pub struct Repository<E: Entity> {
    reads: ReadOnlyRepository<E>,
    tracker: TrackerHandle<E::Actor>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            reads: self.reads.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<E: Entity> Repository<E> {
    pub(crate) fn new(db: Database, tracker: TrackerHandle<E::Actor>) -> Self {
        Self {
            reads: ReadOnlyRepository::with_tracker(db, tracker.clone()),
            tracker,
        }
    }

    /// The read surface, including the projection variants.
    pub fn reader(&self) -> &ReadOnlyRepository<E> {
        &self.reads
    }

    /// Stages an entity for insertion.
    pub fn add(&self, entity: E) {
        debug!(table = E::TABLE, "staging insert");
        self.tracker
            .lock()
            .unwrap()
            .stage(EntryState::Added, Box::new(entity));
    }

    /// Stages several entities for insertion.
    pub fn add_many(&self, entities: impl IntoIterator<Item = E>) {
        let mut tracker = self.tracker.lock().unwrap();
        for entity in entities {
            tracker.stage(EntryState::Added, Box::new(entity));
        }
    }

    /// Async dual of [`Self::add`]. Staging itself performs no I/O; the
    /// dual exists for signature parity with the rest of the surface.
    pub async fn add_async(&self, entity: E) {
        self.add(entity);
    }

    /// Async dual of [`Self::add_many`].
    pub async fn add_many_async(&self, entities: impl IntoIterator<Item = E>) {
        self.add_many(entities);
    }

    /// Stages a whole-row update.
    pub fn update(&self, entity: E) {
        debug!(table = E::TABLE, "staging update");
        self.tracker
            .lock()
            .unwrap()
            .stage(EntryState::Modified, Box::new(entity));
    }

    /// Stages whole-row updates for several entities.
    pub fn update_many(&self, entities: impl IntoIterator<Item = E>) {
        let mut tracker = self.tracker.lock().unwrap();
        for entity in entities {
            tracker.stage(EntryState::Modified, Box::new(entity));
        }
    }

    /// Stages a delete. Soft-deletable types get their deletion
    /// timestamp set here (the deleting actor is stamped at commit) and
    /// stage as updates; other types stage for removal.
    pub fn delete(&self, entity: E) {
        match E::CAPS.delete {
            DeleteCapability::Hard => {
                debug!(table = E::TABLE, "staging hard delete");
                self.tracker
                    .lock()
                    .unwrap()
                    .stage(EntryState::Deleted, Box::new(entity));
            }
            DeleteCapability::Soft | DeleteCapability::SoftWithActor => {
                self.soft_delete(entity, &mut self.tracker.lock().unwrap());
            }
        }
    }

    /// Stages deletes for several entities, each by the same capability
    /// decision as [`Self::delete`].
    pub fn delete_many(&self, entities: impl IntoIterator<Item = E>) {
        let mut tracker = self.tracker.lock().unwrap();
        for entity in entities {
            match E::CAPS.delete {
                DeleteCapability::Hard => {
                    tracker.stage(EntryState::Deleted, Box::new(entity));
                }
                DeleteCapability::Soft | DeleteCapability::SoftWithActor => {
                    self.soft_delete(entity, &mut tracker);
                }
            }
        }
    }

    /// Looks up by id and stages a delete when found. A missing id is
    /// not an error.
    pub fn delete_by_id(&self, id: E::Id) -> Result<()> {
        match self.reads.get_by_id(id, QueryOptions::new())? {
            Some(entity) => {
                self.delete(entity);
                Ok(())
            }
            None => {
                trace!(table = E::TABLE, "delete_by_id found no row");
                Ok(())
            }
        }
    }

    fn soft_delete(&self, mut entity: E, tracker: &mut crate::tracker::ChangeTracker<E::Actor>) {
        if let Some(id) = entity.id() {
            let id: Value = id.into();
            if !tracker.is_attached(E::TABLE, &id) {
                trace!(table = E::TABLE, "attaching detached entity");
                tracker.attach(E::TABLE, id);
            }
        }
        entity.set_deleted(Some(chrono::Utc::now()));
        debug!(table = E::TABLE, "staging soft delete");
        tracker.stage(EntryState::Modified, Box::new(entity));
    }

    // Delegated read surface.

    pub fn any(&self, condition: impl Predicate) -> Result<bool> {
        self.reads.any(condition)
    }

    pub fn count(&self, options: QueryOptions) -> Result<i64> {
        self.reads.count(options)
    }

    pub fn get_by_id(&self, id: E::Id, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_by_id(id, options)
    }

    pub fn get_first(&self, options: QueryOptions) -> Result<E> {
        self.reads.get_first(options)
    }

    pub fn get_first_opt(&self, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_first_opt(options)
    }

    pub fn get_single(&self, options: QueryOptions) -> Result<E> {
        self.reads.get_single(options)
    }

    pub fn get_single_opt(&self, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_single_opt(options)
    }

    pub fn get_all(&self, options: QueryOptions) -> Result<Vec<E>> {
        self.reads.get_all(options)
    }

    pub fn get_paged(&self, page: u32, page_size: u32, options: QueryOptions) -> Result<Paged<E>> {
        self.reads.get_paged(page, page_size, options)
    }

    pub async fn any_async(&self, condition: impl Predicate + 'static) -> Result<bool> {
        self.reads.any_async(condition).await
    }

    pub async fn count_async(&self, options: QueryOptions) -> Result<i64> {
        self.reads.count_async(options).await
    }

    pub async fn get_by_id_async(&self, id: E::Id, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_by_id_async(id, options).await
    }

    pub async fn get_first_async(&self, options: QueryOptions) -> Result<E> {
        self.reads.get_first_async(options).await
    }

    pub async fn get_first_opt_async(&self, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_first_opt_async(options).await
    }

    pub async fn get_single_async(&self, options: QueryOptions) -> Result<E> {
        self.reads.get_single_async(options).await
    }

    pub async fn get_single_opt_async(&self, options: QueryOptions) -> Result<Option<E>> {
        self.reads.get_single_opt_async(options).await
    }

    pub async fn get_all_async(&self, options: QueryOptions) -> Result<Vec<E>> {
        self.reads.get_all_async(options).await
    }

    pub async fn get_paged_async(
        &self,
        page: u32,
        page_size: u32,
        options: QueryOptions,
    ) -> Result<Paged<E>> {
        self.reads.get_paged_async(page, page_size, options).await
    }
}
