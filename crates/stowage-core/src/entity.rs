//! The entity contract and its capability metadata.
//!
//! An [`Entity`] maps a Rust type onto one table: a typed identifier, a
//! row mapping in both directions, and a pair of compile-time capability
//! tags that drive the delete decision and the audit pipeline. There is
//! no runtime probing — a type either declares a capability in its
//! `CAPS` constant and overrides the matching stamping hooks, or it gets
//! the plain behavior.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use stowage_db::FromRow;

/// Identifier key types: cheap to clone, comparable, storable.
pub trait IdKey: Clone + PartialEq + Into<Value> + Send + 'static {}

impl<T: Clone + PartialEq + Into<Value> + Send + 'static> IdKey for T {}

/// Actor key types used for created-by/modified-by/deleted-by stamps.
pub trait ActorKey: Clone + Into<Value> + Send + 'static {}

impl<T: Clone + Into<Value> + Send + 'static> ActorKey for T {}

/// Whether and how an entity type records audit metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditCapability {
    /// No audit fields.
    None,
    /// Creation/modification timestamps only.
    Timestamps,
    /// Timestamps plus creator/modifier actor identifiers.
    WithActor,
}

/// Whether deleting an entity removes the row or marks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCapability {
    /// Deletes remove the row.
    Hard,
    /// Deletes set the deletion timestamp; reads exclude marked rows
    /// unless the global filter is bypassed.
    Soft,
    /// Soft deletion plus a deleter actor identifier.
    SoftWithActor,
}

impl DeleteCapability {
    /// Whether this capability keeps deleted rows in storage.
    pub const fn is_soft(self) -> bool {
        matches!(self, DeleteCapability::Soft | DeleteCapability::SoftWithActor)
    }
}

/// Capability tags fixed per entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub audit: AuditCapability,
    pub delete: DeleteCapability,
}

impl Capabilities {
    /// No audit fields, hard deletes.
    pub const fn plain() -> Self {
        Self {
            audit: AuditCapability::None,
            delete: DeleteCapability::Hard,
        }
    }

    pub const fn new(audit: AuditCapability, delete: DeleteCapability) -> Self {
        Self { audit, delete }
    }
}

/// A persisted record type.
///
/// The stamping hooks default to no-ops. A type declaring
/// `AuditCapability::Timestamps` must override `set_created` and
/// `set_modified`; `WithActor` additionally `set_created_by` and
/// `set_modified_by`. A soft-deletable type must override `deleted_at`
/// and `set_deleted` (plus `set_deleted_by` for `SoftWithActor`) and
/// name its deletion column in `DELETED_COLUMN` so reads can exclude
/// marked rows by default.
pub trait Entity: FromRow + Send + 'static {
    /// Identifier type.
    type Id: IdKey;

    /// Actor key type shared with the owning session.
    type Actor: ActorKey;

    /// Table this entity maps onto.
    const TABLE: &'static str;

    /// Name of the identifier column.
    const ID_COLUMN: &'static str;

    /// Deletion-timestamp column for soft-deletable types.
    const DELETED_COLUMN: Option<&'static str> = None;

    /// Capability tags for this type.
    const CAPS: Capabilities = Capabilities::plain();

    /// The identifier, absent until the row has been persisted (or the
    /// caller assigned one).
    fn id(&self) -> Option<Self::Id>;

    /// Maps every non-identifier column to its stored value.
    fn row(&self) -> Vec<(&'static str, Value)>;

    fn set_created(&mut self, _at: DateTime<Utc>) {}

    fn set_modified(&mut self, _at: DateTime<Utc>) {}

    fn set_created_by(&mut self, _by: Self::Actor) {}

    fn set_modified_by(&mut self, _by: Self::Actor) {}

    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn set_deleted(&mut self, _at: Option<DateTime<Utc>>) {}

    fn set_deleted_by(&mut self, _by: Self::Actor) {}
}
