//! Content Store
//!
//! Durable storage for content units and their generated variants. The
//! pipeline depends on the traits; the shipped implementation is sled-backed
//! (see `persistence`).

pub mod persistence;

pub use persistence::SledContentStore;

use crate::error::StoreError;
use crate::types::{ContentUnit, ContentVariant, Tier};

/// Read/write access to the source content units
///
/// Units are produced upstream (ingest) and are read-only to the pipeline.
pub trait UnitStore: Send + Sync {
    fn put_unit(&self, unit: &ContentUnit) -> Result<(), StoreError>;

    /// Bulk insert; more efficient than repeated `put_unit`
    fn put_units(&self, units: &[ContentUnit]) -> Result<(), StoreError>;

    /// All units, ordered by `unit_id`
    fn list_units(&self) -> Result<Vec<ContentUnit>, StoreError>;

    fn unit_count(&self) -> Result<usize, StoreError>;

    /// Remove every unit; returns the number removed
    fn clear_units(&self) -> Result<usize, StoreError>;
}

/// Read/write access to generated variants
///
/// The `(unit_id, tier)` pair is the key; `upsert` is insert-or-replace,
/// never insert-then-catch, and commits durably before returning.
pub trait VariantStore: Send + Sync {
    /// Number of tiers already persisted for a unit. Side-effect-free.
    fn count_existing(&self, unit_id: &str) -> Result<usize, StoreError>;

    /// Insert or replace the variant for its `(unit_id, tier)` pair
    fn upsert(&self, variant: &ContentVariant) -> Result<(), StoreError>;

    fn get(&self, unit_id: &str, tier: Tier) -> Result<Option<ContentVariant>, StoreError>;

    /// Remove every variant; returns the number removed
    fn clear_all(&self) -> Result<usize, StoreError>;

    fn variant_count(&self) -> Result<usize, StoreError>;
}
