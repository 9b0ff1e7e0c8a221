use super::{ElevationResolver, NO_COVERAGE};
use crate::config::ResolverConfig;
use contour::{Isoline, SpatialIndex};
use geo::geometry::{Coord, Rect};
use std::sync::Arc;

/// Containment banding between nested band polygons.
///
/// Inside the innermost band polygon enclosing a point, elevation
/// rises from the enclosing level (on its boundary) to the next
/// nested level (on that polygon's boundary) with a quadratic
/// falloff. Summits without a nested polygon are flat. Outside every
/// polygon, the nearest one within the search radius decays to zero
/// at the radius.
#[derive(Debug, Clone)]
pub struct BandingResolver {
    index: Arc<SpatialIndex>,
    config: ResolverConfig,
}

impl BandingResolver {
    pub fn new(index: Arc<SpatialIndex>, config: ResolverConfig) -> Self {
        Self { index, config }
    }

    fn elevation(&self, isoline: &Isoline) -> f64 {
        isoline.level * self.config.step_height_m
    }

    /// Highest level polygon containing `coord`.
    fn enclosing(&self, coord: Coord<f64>) -> Option<&Isoline> {
        self.index
            .query(&Rect::new(coord, coord))
            .into_iter()
            .filter(|isoline| isoline.contains(coord))
            .fold(None, |best: Option<&Isoline>, isoline| match best {
                Some(best) if best.level >= isoline.level => Some(best),
                _ => Some(isoline),
            })
    }

    /// Nearest polygon of the next level nested inside `enclosing`,
    /// with its distance from `coord`.
    fn next_inner(&self, enclosing: &Isoline, coord: Coord<f64>) -> Option<(&Isoline, f64)> {
        let envelope = enclosing.envelope()?;
        let nested: Vec<&Isoline> = self
            .index
            .query(&envelope)
            .into_iter()
            .filter(|isoline| isoline.level > enclosing.level)
            .filter(|isoline| {
                isoline
                    .as_polygon()
                    .and_then(|polygon| polygon.exterior().0.first())
                    .map_or(false, |vertex| enclosing.contains(*vertex))
            })
            .collect();
        let next_level = nested
            .iter()
            .map(|isoline| isoline.level)
            .min_by(f64::total_cmp)?;
        nested
            .into_iter()
            .filter(|isoline| isoline.level == next_level)
            .map(|isoline| (isoline, isoline.distance(coord)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Quadratic decay from the nearest polygon outside all bands.
    fn fringe(&self, coord: Coord<f64>) -> f64 {
        let radius = self.config.search_radius_deg;
        self.index
            .query_around(coord, radius)
            .into_iter()
            .filter(|isoline| isoline.as_polygon().is_some())
            .map(|isoline| (isoline, isoline.distance(coord)))
            .filter(|(_, distance)| *distance <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or(NO_COVERAGE, |(isoline, distance)| {
                self.elevation(isoline) * (1.0 - distance / radius).powi(2)
            })
    }
}

impl ElevationResolver for BandingResolver {
    fn resolve(&self, coord: Coord<f64>) -> f64 {
        if !self
            .index
            .probably_inside_coverage(coord, self.config.coverage_pad_deg)
        {
            return NO_COVERAGE;
        }

        let Some(enclosing) = self.enclosing(coord) else {
            return self.fringe(coord);
        };
        let outer = self.elevation(enclosing);
        let Some((inner, d_inner)) = self.next_inner(enclosing, coord) else {
            return outer;
        };
        let inner_elevation = self.elevation(inner);
        let d_outer = enclosing.distance(coord);
        let span = d_inner + d_outer;
        if span <= 0.0 {
            return outer;
        }
        let t = d_inner / span;
        inner_elevation + (outer - inner_elevation) * t * t
    }
}
