use super::ElevationResolver;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use geo::geometry::Coord;
use serde::Serialize;

/// Cache keys are coordinates rounded to this many degrees.
const KEY_RESOLUTION: f64 = 1e-7;

/// A memoized elevation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheEntry {
    pub elevation_m: f64,
    pub updated_at: DateTime<Utc>,
}

/// Memoizes another resolver's answers per rounded coordinate.
///
/// Entries are never invalidated; the isoline set behind the wrapped
/// resolver is immutable.
#[derive(Debug)]
pub struct CachedResolver<R> {
    inner: R,
    entries: DashMap<(i64, i64), CacheEntry>,
}

impl<R: ElevationResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached entry for `coord`, if any.
    pub fn get(&self, coord: Coord<f64>) -> Option<CacheEntry> {
        self.entries.get(&key(coord)).map(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: ElevationResolver> ElevationResolver for CachedResolver<R> {
    fn resolve(&self, coord: Coord<f64>) -> f64 {
        let key = key(coord);
        if let Some(entry) = self.entries.get(&key) {
            return entry.elevation_m;
        }
        // Resolve outside the shard lock; a racing insert for the same
        // key stores the same value.
        let elevation_m = self.inner.resolve(coord);
        self.entries
            .entry(key)
            .or_insert_with(|| CacheEntry {
                elevation_m,
                updated_at: Utc::now(),
            })
            .elevation_m
    }
}

#[allow(clippy::cast_possible_truncation)]
fn key(coord: Coord<f64>) -> (i64, i64) {
    (
        (coord.x / KEY_RESOLUTION).round() as i64,
        (coord.y / KEY_RESOLUTION).round() as i64,
    )
}
