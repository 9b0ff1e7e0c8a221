//! Envelope index over an isoline dataset.

use crate::{Isoline, C};
use geo::geometry::{Coord, Rect};
use log::debug;
use rstar::{
    primitives::{GeomWithData, Rectangle},
    RTree, AABB,
};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

type Entry = GeomWithData<Rectangle<[C; 2]>, usize>;

/// Read-only R-tree of isoline envelopes.
///
/// Built once (STR bulk load) from a complete dataset snapshot and
/// never mutated afterwards, so it can be shared freely behind an
/// [Arc].
pub struct SpatialIndex {
    /// Indexed isolines; tree entries point into this vec.
    isolines: Vec<Isoline>,

    tree: RTree<Entry>,

    /// Union of every isoline envelope.
    envelope: Option<Rect<C>>,
}

impl SpatialIndex {
    pub fn new(isolines: Vec<Isoline>) -> Self {
        let now = std::time::Instant::now();
        let mut envelope: Option<Rect<C>> = None;
        let entries: Vec<Entry> = isolines
            .iter()
            .enumerate()
            .filter_map(|(idx, isoline)| {
                let env = isoline.envelope()?;
                envelope = Some(envelope.map_or(env, |acc| merge(acc, env)));
                Some(GeomWithData::new(
                    Rectangle::from_corners(corner(env.min()), corner(env.max())),
                    idx,
                ))
            })
            .collect();
        let tree = RTree::bulk_load(entries);
        debug!(
            "spatial index; isolines: {}, build_exec: {:?}",
            isolines.len(),
            now.elapsed()
        );
        Self {
            isolines,
            tree,
            envelope,
        }
    }

    /// Returns every isoline whose envelope intersects `rect`.
    ///
    /// Results are in dataset order, which keeps downstream
    /// tie-breaking deterministic.
    pub fn query(&self, rect: &Rect<C>) -> Vec<&Isoline> {
        let aabb = AABB::from_corners(corner(rect.min()), corner(rect.max()));
        let mut hits: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&aabb)
            .map(|entry| entry.data)
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|idx| &self.isolines[idx]).collect()
    }

    /// Returns every isoline whose envelope comes within `radius`
    /// (degrees, box metric) of `coord`.
    pub fn query_around(&self, coord: Coord<C>, radius: C) -> Vec<&Isoline> {
        self.query(&Rect::new(
            Coord {
                x: coord.x - radius,
                y: coord.y - radius,
            },
            Coord {
                x: coord.x + radius,
                y: coord.y + radius,
            },
        ))
    }

    /// Cheap check against the dataset's overall envelope grown by
    /// `pad` degrees.
    ///
    /// A `false` answer means no isoline can influence `coord`.
    pub fn probably_inside_coverage(&self, coord: Coord<C>, pad: C) -> bool {
        self.envelope.map_or(false, |env| {
            env.min().x - pad <= coord.x
                && coord.x <= env.max().x + pad
                && env.min().y - pad <= coord.y
                && coord.y <= env.max().y + pad
        })
    }

    /// Union of all isoline envelopes, `None` for an empty dataset.
    pub fn envelope(&self) -> Option<Rect<C>> {
        self.envelope
    }

    pub fn isolines(&self) -> &[Isoline] {
        &self.isolines
    }

    pub fn len(&self) -> usize {
        self.isolines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isolines.is_empty()
    }
}

impl fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("isolines", &self.isolines.len())
            .field("envelope", &self.envelope)
            .finish()
    }
}

/// A [SpatialIndex] built on first use.
///
/// Concurrent first callers block on the same initialisation, so
/// the loader runs exactly once and every caller receives the same
/// index.
pub struct LazyIndex {
    cell: OnceLock<Arc<SpatialIndex>>,
    loader: Box<dyn Fn() -> Vec<Isoline> + Send + Sync>,
}

impl LazyIndex {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Vec<Isoline> + Send + Sync + 'static,
    {
        Self {
            cell: OnceLock::new(),
            loader: Box::new(loader),
        }
    }

    /// Returns the index, building it if this is the first call.
    pub fn get(&self) -> Arc<SpatialIndex> {
        Arc::clone(
            self.cell
                .get_or_init(|| Arc::new(SpatialIndex::new((self.loader)()))),
        )
    }

    pub fn is_built(&self) -> bool {
        self.cell.get().is_some()
    }
}

fn corner(Coord { x, y }: Coord<C>) -> [C; 2] {
    [x, y]
}

fn merge(a: Rect<C>, b: Rect<C>) -> Rect<C> {
    Rect::new(
        Coord {
            x: a.min().x.min(b.min().x),
            y: a.min().y.min(b.min().y),
        },
        Coord {
            x: a.max().x.max(b.max().x),
            y: a.max().y.max(b.max().y),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{Coord, LazyIndex, Rect, SpatialIndex};
    use crate::Isoline;
    use geo::{geometry::LineString, polygon};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn square(level: f64, min: f64, max: f64) -> Isoline {
        Isoline::polygon(
            level,
            polygon![
                (x: min, y: min),
                (x: max, y: min),
                (x: max, y: max),
                (x: min, y: max),
            ],
        )
    }

    fn dataset() -> Vec<Isoline> {
        vec![
            square(1.0, 0.0, 10.0),
            square(2.0, 2.0, 8.0),
            square(3.0, 4.0, 6.0),
            Isoline::line(1.0, LineString::from(vec![(20.0, 20.0), (21.0, 21.0)])),
        ]
    }

    #[test]
    fn test_query() {
        let index = SpatialIndex::new(dataset());
        assert_eq!(index.len(), 4);

        let hits = index.query_around(Coord { x: 5.0, y: 5.0 }, 0.1);
        let levels: Vec<f64> = hits.iter().map(|iso| iso.level).collect();
        assert_eq!(levels, vec![1.0, 2.0, 3.0]);

        let hits = index.query_around(Coord { x: 1.0, y: 1.0 }, 0.1);
        assert_eq!(hits.len(), 1);

        let hits = index.query(&Rect::new(
            Coord { x: 19.0, y: 19.0 },
            Coord { x: 20.5, y: 20.5 },
        ));
        assert_eq!(hits.len(), 1);
        assert!(hits[0].as_polygon().is_none());

        assert!(index
            .query_around(Coord { x: 15.0, y: 15.0 }, 1.0)
            .is_empty());
    }

    #[test]
    fn test_coverage() {
        let index = SpatialIndex::new(dataset());
        let env = index.envelope().unwrap();
        assert_eq!(env.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(env.max(), Coord { x: 21.0, y: 21.0 });

        assert!(index.probably_inside_coverage(Coord { x: 15.0, y: 15.0 }, 0.0));
        assert!(index.probably_inside_coverage(Coord { x: -0.5, y: 3.0 }, 1.0));
        assert!(!index.probably_inside_coverage(Coord { x: -0.5, y: 3.0 }, 0.1));

        let empty = SpatialIndex::new(Vec::new());
        assert!(empty.is_empty());
        assert!(!empty.probably_inside_coverage(Coord { x: 0.0, y: 0.0 }, 1.0));
    }

    #[test]
    fn test_lazy_index_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let lazy = {
            let builds = Arc::clone(&builds);
            LazyIndex::new(move || {
                builds.fetch_add(1, Ordering::SeqCst);
                dataset()
            })
        };
        assert!(!lazy.is_built());

        let indices: Vec<Arc<SpatialIndex>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| lazy.get())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(lazy.is_built());
        for index in &indices[1..] {
            assert!(Arc::ptr_eq(&indices[0], index));
        }
    }
}
