use super::{ElevationResolver, NO_COVERAGE};
use crate::config::ResolverConfig;
use contour::SpatialIndex;
use geo::geometry::Coord;
use std::sync::Arc;

/// Distances are floored to this before weighting.
const MIN_WEIGHT_DISTANCE: f64 = 1e-10;

/// Inverse distance weighting over the nearest isolines.
#[derive(Debug, Clone)]
pub struct IdwResolver {
    index: Arc<SpatialIndex>,
    config: ResolverConfig,
}

impl IdwResolver {
    pub fn new(index: Arc<SpatialIndex>, config: ResolverConfig) -> Self {
        Self { index, config }
    }
}

impl ElevationResolver for IdwResolver {
    fn resolve(&self, coord: Coord<f64>) -> f64 {
        let ResolverConfig {
            step_height_m,
            on_line_tolerance_deg,
            search_radius_deg,
            neighbors,
            coverage_pad_deg,
            ..
        } = self.config;

        if !self.index.probably_inside_coverage(coord, coverage_pad_deg) {
            return NO_COVERAGE;
        }

        // (distance, elevation), nearest first. The sort is stable so
        // equidistant isolines keep dataset order.
        let mut candidates: Vec<(f64, f64)> = self
            .index
            .query_around(coord, search_radius_deg)
            .into_iter()
            .map(|isoline| (isoline.distance(coord), isoline.level * step_height_m))
            .filter(|(distance, _)| *distance <= search_radius_deg)
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        match candidates.as_slice() {
            [] => NO_COVERAGE,
            [(distance, elevation), ..] if *distance <= on_line_tolerance_deg => *elevation,
            [(_, elevation)] => *elevation,
            nearest => {
                let (weighted, total) = nearest
                    .iter()
                    .take(neighbors.max(1))
                    .map(|(distance, elevation)| {
                        let weight = 1.0 / distance.max(MIN_WEIGHT_DISTANCE);
                        (weight * elevation, weight)
                    })
                    .fold((0.0, 0.0), |(ws, ts), (w, t)| (ws + w, ts + t));
                weighted / total
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IdwResolver;
    use crate::{config::ResolverConfig, elevation::ElevationResolver};
    use approx::assert_relative_eq;
    use contour::{Isoline, SpatialIndex};
    use geo::geometry::{Coord, LineString};
    use std::sync::Arc;

    fn vertical(level: f64, x: f64) -> Isoline {
        Isoline::line(level, LineString::from(vec![(x, -0.01), (x, 0.01)]))
    }

    fn resolver(isolines: Vec<Isoline>) -> IdwResolver {
        IdwResolver::new(
            Arc::new(SpatialIndex::new(isolines)),
            ResolverConfig::default(),
        )
    }

    #[test]
    fn test_on_line() {
        let idw = resolver(vec![vertical(1.0, 0.0), vertical(2.0, 0.0002)]);
        assert_relative_eq!(idw.resolve(Coord { x: 0.000_005, y: 0.0 }), 50.0);
    }

    #[test]
    fn test_weighted_average() {
        let idw = resolver(vec![vertical(1.0, 0.0), vertical(3.0, 0.0004)]);
        // 1e-4 from the first, 3e-4 from the second: weights 3:1.
        let elevation = idw.resolve(Coord { x: 0.0001, y: 0.0 });
        assert_relative_eq!(elevation, (3.0 * 50.0 + 150.0) / 4.0, epsilon = 1e-9);

        // Midway is the plain mean.
        let elevation = idw.resolve(Coord { x: 0.0002, y: 0.0 });
        assert_relative_eq!(elevation, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_only_nearest_k() {
        let idw = resolver(vec![
            vertical(1.0, 0.0),
            vertical(1.0, 0.0001),
            vertical(1.0, 0.0002),
            vertical(9.0, 0.0009),
        ]);
        // The fourth, furthest line is beyond K = 3.
        assert_relative_eq!(idw.resolve(Coord { x: 0.00005, y: 0.0 }), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_candidates() {
        let idw = resolver(vec![vertical(1.0, 0.0), vertical(2.0, 0.005)]);
        // Inside coverage, but nothing within the search radius.
        assert_relative_eq!(idw.resolve(Coord { x: 0.0025, y: 0.0 }), 0.0);
        // Single candidate.
        assert_relative_eq!(idw.resolve(Coord { x: 0.0045, y: 0.0 }), 100.0);
    }
}
