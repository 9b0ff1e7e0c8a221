//! Elevation lookup from isoline data.
//!
//! All resolvers share one capability, [ElevationResolver], and are
//! picked once from configuration by [resolver_from_config]. Points
//! without usable isoline coverage resolve to `0.0`.

mod banding;
mod cache;
mod idw;

pub use self::{
    banding::BandingResolver,
    cache::{CacheEntry, CachedResolver},
    idw::IdwResolver,
};
use crate::config::{ResolverConfig, ResolverKind};
use contour::SpatialIndex;
use geo::geometry::Coord;
use std::sync::Arc;

/// Elevation returned where no isoline has any influence.
pub const NO_COVERAGE: f64 = 0.0;

pub trait ElevationResolver: Send + Sync {
    /// Returns the elevation (meters) at geographic `coord`.
    fn resolve(&self, coord: Coord<f64>) -> f64;
}

/// Builds the resolver described by `config` over `index`.
pub fn resolver_from_config(
    config: &ResolverConfig,
    index: Arc<SpatialIndex>,
) -> Arc<dyn ElevationResolver> {
    match (config.kind, config.cache) {
        (ResolverKind::Banding, false) => Arc::new(BandingResolver::new(index, *config)),
        (ResolverKind::Banding, true) => {
            Arc::new(CachedResolver::new(BandingResolver::new(index, *config)))
        }
        (ResolverKind::Idw, false) => Arc::new(IdwResolver::new(index, *config)),
        (ResolverKind::Idw, true) => Arc::new(CachedResolver::new(IdwResolver::new(index, *config))),
    }
}

#[cfg(test)]
mod tests {
    use super::resolver_from_config;
    use crate::config::{ResolverConfig, ResolverKind};
    use approx::assert_relative_eq;
    use contour::{Isoline, SpatialIndex};
    use geo::{geometry::Coord, polygon};
    use std::sync::Arc;

    #[test]
    fn test_every_kind_agrees_inside_single_ring() {
        let ring = Isoline::polygon(
            4.0,
            polygon![
                (x: -0.01, y: -0.01),
                (x: 0.01, y: -0.01),
                (x: 0.01, y: 0.01),
                (x: -0.01, y: 0.01),
            ],
        );
        let index = Arc::new(SpatialIndex::new(vec![ring]));
        for kind in [ResolverKind::Banding, ResolverKind::Idw] {
            for cache in [false, true] {
                let config = ResolverConfig {
                    kind,
                    cache,
                    ..ResolverConfig::default()
                };
                let resolver = resolver_from_config(&config, Arc::clone(&index));
                // Within the search radius of the boundary.
                let elevation = resolver.resolve(Coord { x: 0.0095, y: 0.0 });
                assert_relative_eq!(elevation, 200.0);
                // Far outside coverage.
                assert_relative_eq!(resolver.resolve(Coord { x: 1.0, y: 1.0 }), 0.0);
            }
        }
    }
}
