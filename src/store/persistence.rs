//! Sled-backed persistence for the content store

use crate::error::StoreError;
use crate::store::{UnitStore, VariantStore};
use crate::types::{ContentUnit, ContentVariant, Tier};
use sled;
use std::path::Path;

const UNIT_PREFIX: &str = "unit:";
const VARIANT_PREFIX: &str = "variant:";

/// Sled-based implementation of both store traits
///
/// Keys are namespaced by prefix in one tree: `unit:{unit_id}` and
/// `variant:{unit_id}:{tier}`. Key order gives `list_units` its deterministic
/// unit-id ordering, and the keyed insert gives `upsert` its atomic
/// insert-or-replace semantics.
pub struct SledContentStore {
    db: sled::Db,
}

impl SledContentStore {
    /// Open (or create) a store at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn unit_key(unit_id: &str) -> String {
        format!("{}{}", UNIT_PREFIX, unit_id)
    }

    fn variant_key(unit_id: &str, tier: Tier) -> String {
        format!("{}{}:{}", VARIANT_PREFIX, unit_id, tier.as_str())
    }

    fn variant_unit_prefix(unit_id: &str) -> String {
        format!("{}{}:", VARIANT_PREFIX, unit_id)
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn clear_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut batch = sled::Batch::default();
        let mut removed = 0;
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item?;
            batch.remove(key);
            removed += 1;
        }
        self.db.apply_batch(batch)?;
        self.flush()?;
        Ok(removed)
    }
}

impl UnitStore for SledContentStore {
    fn put_unit(&self, unit: &ContentUnit) -> Result<(), StoreError> {
        let value = bincode::serialize(unit)
            .map_err(|e| StoreError::Serialization(format!("Failed to serialize unit: {}", e)))?;
        self.db.insert(Self::unit_key(&unit.unit_id).as_bytes(), value)?;
        self.flush()?;
        Ok(())
    }

    fn put_units(&self, units: &[ContentUnit]) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for unit in units {
            let value = bincode::serialize(unit).map_err(|e| {
                StoreError::Serialization(format!("Failed to serialize unit: {}", e))
            })?;
            batch.insert(Self::unit_key(&unit.unit_id).as_bytes(), value);
        }
        self.db.apply_batch(batch)?;
        self.flush()?;
        Ok(())
    }

    fn list_units(&self) -> Result<Vec<ContentUnit>, StoreError> {
        let mut units = Vec::new();
        for item in self.db.scan_prefix(UNIT_PREFIX.as_bytes()) {
            let (_, value) = item?;
            let unit: ContentUnit = bincode::deserialize(&value).map_err(|e| {
                StoreError::Serialization(format!("Failed to deserialize unit: {}", e))
            })?;
            units.push(unit);
        }
        Ok(units)
    }

    fn unit_count(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for item in self.db.scan_prefix(UNIT_PREFIX.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn clear_units(&self) -> Result<usize, StoreError> {
        self.clear_prefix(UNIT_PREFIX)
    }
}

impl VariantStore for SledContentStore {
    fn count_existing(&self, unit_id: &str) -> Result<usize, StoreError> {
        let prefix = Self::variant_unit_prefix(unit_id);
        let mut count = 0;
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn upsert(&self, variant: &ContentVariant) -> Result<(), StoreError> {
        let key = Self::variant_key(&variant.unit_id, variant.tier);
        let value = bincode::serialize(variant).map_err(|e| {
            StoreError::Serialization(format!("Failed to serialize variant: {}", e))
        })?;
        self.db.insert(key.as_bytes(), value)?;
        self.flush()?;
        Ok(())
    }

    fn get(&self, unit_id: &str, tier: Tier) -> Result<Option<ContentVariant>, StoreError> {
        let key = Self::variant_key(unit_id, tier);
        match self.db.get(key.as_bytes())? {
            Some(value) => {
                let variant: ContentVariant = bincode::deserialize(&value).map_err(|e| {
                    StoreError::Serialization(format!("Failed to deserialize variant: {}", e))
                })?;
                Ok(Some(variant))
            }
            None => Ok(None),
        }
    }

    fn clear_all(&self) -> Result<usize, StoreError> {
        self.clear_prefix(VARIANT_PREFIX)
    }

    fn variant_count(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for item in self.db.scan_prefix(VARIANT_PREFIX.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }
}
