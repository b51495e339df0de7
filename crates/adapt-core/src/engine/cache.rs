use super::error::EngineError;
use crate::core::models::grid::{GridPoint, ParameterGrid};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub point: GridPoint,
    pub value: f64,
}

/// Memo of completed grid evaluations for one campaign.
///
/// Entries are only ever inserted, never evicted or overwritten: a key that is
/// present always corresponds to completed, successful work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<CacheEntry>", try_from = "Vec<CacheEntry>")]
pub struct EvaluationCache {
    data: HashMap<GridPoint, f64>,
}

impl EvaluationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `point`.
    ///
    /// Re-inserting the identical value is a no-op; a different value for a
    /// stored point is [`EngineError::CacheCorruption`].
    pub fn insert(&mut self, point: GridPoint, value: f64) -> Result<(), EngineError> {
        match self.data.get(&point) {
            Some(stored) if stored.to_bits() == value.to_bits() => Ok(()),
            Some(stored) => Err(EngineError::CacheCorruption {
                point,
                stored: *stored,
                offered: value,
            }),
            None => {
                self.data.insert(point, value);
                Ok(())
            }
        }
    }

    pub fn get(&self, point: &GridPoint) -> Option<f64> {
        self.data.get(point).copied()
    }

    pub fn contains(&self, point: &GridPoint) -> bool {
        self.data.contains_key(point)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn covers(&self, grid: &ParameterGrid) -> bool {
        self.len() >= grid.point_count()
    }

    /// All entries, ordered by grid point.
    pub fn entries(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = self
            .data
            .iter()
            .map(|(point, value)| CacheEntry {
                point: point.clone(),
                value: *value,
            })
            .collect();
        entries.sort_by(|a, b| a.point.cmp(&b.point));
        entries
    }

    /// Lowest cached value; ties resolve to the smallest grid point.
    pub fn best(&self) -> Option<CacheEntry> {
        self.entries()
            .into_iter()
            .min_by(|a, b| a.value.total_cmp(&b.value).then(a.point.cmp(&b.point)))
    }
}

impl From<EvaluationCache> for Vec<CacheEntry> {
    fn from(cache: EvaluationCache) -> Self {
        cache.entries()
    }
}

impl TryFrom<Vec<CacheEntry>> for EvaluationCache {
    type Error = EngineError;

    fn try_from(entries: Vec<CacheEntry>) -> Result<Self, Self::Error> {
        let mut cache = Self::new();
        for entry in entries {
            cache.insert(entry.point, entry.value)?;
        }
        Ok(cache)
    }
}
