//! Synthetic isoline generation.
//!
//! Projects without real elevation data get a plausible band
//! dataset: a noisy silhouette (one dominant mountain, secondary
//! peaks, scattered hills and a carved depression) is shrunk in
//! fixed steps, and every step becomes one band level.

use crate::{ContourError, Isoline, C};
use geo::{
    algorithm::line_intersection::line_intersection,
    geometry::{Coord, Line, LineString, MultiPolygon, Point, Polygon, Rect},
    Area, BooleanOps, BoundingRect, Buffer, Centroid, Contains,
};
use log::{debug, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::TAU;

/// Corner cutting blend ratios; each edge is split in three.
const CUTS: [C; 3] = [0.85, 0.50, 0.15];

/// Synthetic isoline generator.
#[derive(Debug, Clone)]
pub struct Generator {
    /// Number of band levels to derive (at least 2).
    levels: usize,

    /// RNG seed; a random seed is drawn when `None`.
    seed: Option<u64>,

    /// Secondary peak placement attempts inside the mountain.
    peaks: usize,

    /// Independent hills scattered around the center.
    hills: usize,

    /// Corner cutting passes applied to every band boundary.
    smoothing_passes: usize,

    /// Amplitude of the angular radius noise.
    noise: C,

    /// Total inward buffer, as a fraction of the smaller bbox side.
    relief: C,

    /// Clip inset, as a fraction of the smaller bbox side.
    margin: C,

    /// Minimum kept fragment area, as a fraction of the smaller bbox
    /// side squared.
    min_area: C,
}

impl Generator {
    pub fn new(levels: usize) -> Self {
        Self {
            levels,
            seed: None,
            peaks: 7,
            hills: 5,
            smoothing_passes: 3,
            noise: 0.18,
            relief: 0.25,
            margin: 0.05,
            min_area: 0.001,
        }
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn peaks(mut self, count: usize) -> Self {
        self.peaks = count;
        self
    }

    #[must_use]
    pub fn hills(mut self, count: usize) -> Self {
        self.hills = count;
        self
    }

    #[must_use]
    pub fn smoothing_passes(mut self, passes: usize) -> Self {
        self.smoothing_passes = passes;
        self
    }

    #[must_use]
    pub fn noise(mut self, amplitude: C) -> Self {
        self.noise = amplitude;
        self
    }

    /// Total inward buffer across all bands, as a fraction of the
    /// smaller bbox side.
    #[must_use]
    pub fn relief(mut self, fraction: C) -> Self {
        self.relief = fraction;
        self
    }

    /// Inset of the band clip region, as a fraction of the smaller
    /// bbox side.
    #[must_use]
    pub fn margin(mut self, fraction: C) -> Self {
        self.margin = fraction;
        self
    }

    #[must_use]
    pub fn min_area(mut self, fraction: C) -> Self {
        self.min_area = fraction;
        self
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Generates isolines covering `bbox`.
    ///
    /// Output is ordered by level, lowest (outermost) band first.
    /// Band `i` carries level `i + 1`.
    pub fn generate(&self, bbox: Rect<C>) -> Result<Vec<Isoline>, ContourError> {
        if self.levels < 2 {
            return Err(ContourError::Levels(self.levels));
        }
        if bbox.width().min(bbox.height()) <= 0.0 {
            return Err(ContourError::EmptyBounds);
        }

        let now = std::time::Instant::now();
        let mut rng = StdRng::seed_from_u64(self.seed.unwrap_or_else(rand::random));
        let silhouette = self.silhouette(bbox, &mut rng);
        let isolines = self.bands(&silhouette, bbox)?;
        if isolines.is_empty() {
            return Err(ContourError::NoCoverage);
        }

        debug!(
            "synth; levels: {}, isolines: {}, exec: {:?}",
            self.levels,
            isolines.len(),
            now.elapsed()
        );
        Ok(isolines)
    }

    /// Builds the base terrain outline.
    pub fn silhouette(&self, bbox: Rect<C>, rng: &mut StdRng) -> MultiPolygon<C> {
        let min_dim = bbox.width().min(bbox.height());
        let center = bbox.center();

        let mountain = ellipse(center, min_dim * 0.35, min_dim * 0.25, 64, self.noise, rng);
        let depression = self.depression(&mountain, rng);

        let mut features = self.peaks_inside(&mountain, min_dim, rng);
        features.extend(self.scattered_hills(center, min_dim, rng));

        let land = features
            .into_iter()
            .fold(MultiPolygon::new(vec![mountain]), |acc, feature| {
                acc.union(&MultiPolygon::new(vec![feature]))
            });
        land.difference(&depression)
    }

    /// Derives nested bands from `silhouette`.
    ///
    /// Fails with [ContourError::NoCoverage] when there is nothing
    /// to derive bands from.
    pub fn bands(
        &self,
        silhouette: &MultiPolygon<C>,
        bbox: Rect<C>,
    ) -> Result<Vec<Isoline>, ContourError> {
        if silhouette.0.is_empty() {
            return Err(ContourError::NoCoverage);
        }
        let min_dim = bbox.width().min(bbox.height());
        if min_dim <= 0.0 {
            return Err(ContourError::EmptyBounds);
        }

        #[allow(clippy::cast_precision_loss)]
        let step = min_dim * self.relief / self.levels as C;
        let inset = min_dim * self.margin;
        let clip = MultiPolygon::new(vec![Rect::new(
            Coord {
                x: bbox.min().x + inset,
                y: bbox.min().y + inset,
            },
            Coord {
                x: bbox.max().x - inset,
                y: bbox.max().y - inset,
            },
        )
        .to_polygon()]);
        let min_area = min_dim * min_dim * self.min_area;

        let mut isolines = Vec::new();
        for band in 0..self.levels {
            #[allow(clippy::cast_precision_loss)]
            let level = (band + 1) as C;
            let shrunk = silhouette.buffer(-step * level);
            if shrunk.0.is_empty() {
                debug!("band {band} vanished after inward buffer");
                continue;
            }
            for fragment in shrunk.intersection(&clip) {
                match smooth_polygon(&fragment, self.smoothing_passes) {
                    Some(polygon) if polygon.unsigned_area() > min_area => {
                        isolines.push(Isoline::polygon(level, polygon));
                    }
                    _ => debug!("band {band}: dropped degenerate fragment"),
                }
            }
        }
        Ok(isolines)
    }
}

/// Private API.
impl Generator {
    fn depression(&self, mountain: &Polygon<C>, rng: &mut StdRng) -> MultiPolygon<C> {
        let Some(env) = mountain.bounding_rect() else {
            return MultiPolygon::new(vec![]);
        };
        let min_dim = env.width().min(env.height());
        let centroid = mountain.centroid().map_or(env.center(), |c| c.0);
        let center = Coord {
            x: centroid.x + (rng.gen::<C>() - 0.5) * min_dim * 0.1,
            y: centroid.y + (rng.gen::<C>() - 0.5) * min_dim * 0.1,
        };
        ellipse(center, min_dim * 0.12, min_dim * 0.08, 48, self.noise, rng)
            .buffer(-min_dim * 0.05)
    }

    fn peaks_inside(&self, mountain: &Polygon<C>, min_dim: C, rng: &mut StdRng) -> Vec<Polygon<C>> {
        let Some(centroid) = mountain.centroid() else {
            return Vec::new();
        };
        let mut peaks = Vec::new();
        for _ in 0..self.peaks {
            let angle = rng.gen::<C>() * TAU;
            let distance = rng.gen::<C>() * min_dim * 0.2;
            let at = Coord {
                x: centroid.x() + angle.cos() * distance,
                y: centroid.y() + angle.sin() * distance,
            };
            if mountain.contains(&Point::from(at)) {
                let size = min_dim * (0.06 + rng.gen::<C>() * 0.10);
                peaks.push(ellipse(at, size, size * 0.7, 36, self.noise, rng));
            }
        }
        peaks
    }

    fn scattered_hills(&self, center: Coord<C>, min_dim: C, rng: &mut StdRng) -> Vec<Polygon<C>> {
        (0..self.hills)
            .map(|_| {
                let angle = rng.gen::<C>() * TAU;
                let distance = min_dim * (0.3 + rng.gen::<C>() * 0.25);
                let at = Coord {
                    x: center.x + angle.cos() * distance,
                    y: center.y + angle.sin() * distance,
                };
                let size = min_dim * (0.12 + rng.gen::<C>() * 0.18);
                let ratio = 0.6 + rng.gen::<C>() * 0.3;
                ellipse(at, size, size * ratio, 48, self.noise, rng)
            })
            .collect()
    }
}

/// Returns a noisy ellipse with semi-axes `a` and `b`.
///
/// The radius is scaled by two cosine harmonics with random phase
/// and integer frequency (so the ring closes smoothly), and every
/// vertex is jittered. A self-intersecting result is replaced by a
/// plain disc of radius `a`.
fn ellipse(center: Coord<C>, a: C, b: C, vertices: usize, noise: C, rng: &mut StdRng) -> Polygon<C> {
    let vertices = vertices.max(36);
    let (phase_lo, phase_hi) = (rng.gen::<C>() * 100.0, rng.gen::<C>() * 100.0);
    let freq_lo = C::from(rng.gen_range(2_u8..=4));
    let freq_hi = C::from(rng.gen_range(7_u8..=9));

    #[allow(clippy::cast_precision_loss)]
    let coords: Vec<Coord<C>> = (0..vertices)
        .map(|i| {
            let theta = i as C * TAU / vertices as C;
            let factor = 1.0
                + (phase_lo + theta * freq_lo).cos() * noise
                + (phase_hi + theta * freq_hi).cos() * noise * 0.5;
            let ea = a * factor * (0.92 + rng.gen::<C>() * 0.16);
            let eb = b * factor * (0.88 + rng.gen::<C>() * 0.20);
            let dx = (rng.gen::<C>() - 0.5) * a * 0.06;
            let dy = (rng.gen::<C>() - 0.5) * b * 0.06;
            Coord {
                x: center.x + dx + ea * theta.cos(),
                y: center.y + dy + eb * theta.sin(),
            }
        })
        .collect();

    let mut ring = LineString::from(coords);
    ring.close();
    if is_simple(&ring) {
        Polygon::new(ring, vec![])
    } else {
        warn!("self-intersecting ellipse at {center:?}, using disc");
        disc(center, a, vertices)
    }
}

/// Regular polygon approximating a circle.
fn disc(center: Coord<C>, radius: C, vertices: usize) -> Polygon<C> {
    #[allow(clippy::cast_precision_loss)]
    let coords: Vec<Coord<C>> = (0..vertices)
        .map(|i| {
            let theta = i as C * TAU / vertices as C;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(coords), vec![])
}

/// Returns true if no two non-adjacent edges of closed `ring` touch.
fn is_simple(ring: &LineString<C>) -> bool {
    let edges: Vec<Line<C>> = ring.lines().collect();
    let n = edges.len();
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            if line_intersection(edges[i], edges[j]).is_some() {
                return false;
            }
        }
    }
    true
}

fn smooth_polygon(polygon: &Polygon<C>, passes: usize) -> Option<Polygon<C>> {
    let exterior = smooth_ring(polygon.exterior(), passes)?;
    let holes = polygon
        .interiors()
        .iter()
        .filter_map(|hole| smooth_ring(hole, passes))
        .collect();
    Some(Polygon::new(exterior, holes))
}

/// Corner cutting subdivision of a closed ring.
///
/// Returns `None` for rings too short to enclose any area.
fn smooth_ring(ring: &LineString<C>, passes: usize) -> Option<LineString<C>> {
    if ring.0.len() < 4 {
        return None;
    }
    let mut coords = ring.0.clone();
    for _ in 0..passes {
        let mut cut = Vec::with_capacity(coords.len() * CUTS.len() + 1);
        for edge in coords.windows(2) {
            let (p0, p1) = (edge[0], edge[1]);
            cut.extend(CUTS.iter().map(|&w| Coord {
                x: w * p0.x + (1.0 - w) * p1.x,
                y: w * p0.y + (1.0 - w) * p1.y,
            }));
        }
        cut.push(cut[0]);
        coords = cut;
    }
    Some(LineString::from(coords))
}

#[cfg(test)]
mod tests {
    use super::{disc, is_simple, smooth_ring, Coord, Generator, LineString, MultiPolygon, Rect};
    use crate::ContourError;
    use approx::assert_relative_eq;
    use geo::{polygon, Area, BoundingRect};

    fn demo_bbox() -> Rect<f64> {
        Rect::new(Coord { x: -0.1, y: -0.1 }, Coord { x: 0.1, y: 0.1 })
    }

    fn unit_bbox() -> Rect<f64> {
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 })
    }

    #[test]
    fn test_generate_is_deterministic() {
        let generator = Generator::new(4).seed(7);
        let a = generator.generate(demo_bbox()).unwrap();
        let b = generator.generate(demo_bbox()).unwrap();
        assert!(!a.is_empty());
        assert_eq!(a, b);
        for isoline in &a {
            assert!((1.0..=4.0).contains(&isoline.level));
        }
        // Output is ordered by level.
        assert!(a.windows(2).all(|w| w[0].level <= w[1].level));
    }

    #[test]
    fn test_generated_bands_stay_inside_clip() {
        let isolines = Generator::new(4).seed(11).generate(demo_bbox()).unwrap();
        for isoline in isolines {
            let env = isoline.envelope().unwrap();
            // 5% inset of a 0.2 degree box.
            assert!(env.min().x >= -0.09 - 1e-9);
            assert!(env.min().y >= -0.09 - 1e-9);
            assert!(env.max().x <= 0.09 + 1e-9);
            assert!(env.max().y <= 0.09 + 1e-9);
        }
    }

    #[test]
    fn test_bands_of_square() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]);
        let bands = Generator::new(4).bands(&square, unit_bbox()).unwrap();
        assert_eq!(bands.len(), 4);

        let areas: Vec<f64> = bands
            .iter()
            .map(|iso| iso.as_polygon().unwrap().unsigned_area())
            .collect();
        assert!(areas.windows(2).all(|w| w[0] > w[1]));

        let levels: Vec<f64> = bands.iter().map(|iso| iso.level).collect();
        assert_eq!(levels, vec![1.0, 2.0, 3.0, 4.0]);

        // Innermost band is the square shrunk by 0.25.
        let inner = bands[3].as_polygon().unwrap().bounding_rect().unwrap();
        assert!((inner.min().x - 0.25).abs() < 0.01);
        assert!((inner.max().x - 0.75).abs() < 0.01);
    }

    #[test]
    fn test_band_tunables() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ]]);
        let generator = Generator::new(2)
            .relief(0.2)
            .margin(0.0)
            .smoothing_passes(0);
        let bands = generator.bands(&square, unit_bbox()).unwrap();
        assert_eq!(bands.len(), 2);
        // Two steps of 0.1 each.
        let outer = bands[0].as_polygon().unwrap().bounding_rect().unwrap();
        assert!((outer.min().x - 0.1).abs() < 0.01);
        let inner = bands[1].as_polygon().unwrap().bounding_rect().unwrap();
        assert!((inner.max().x - 0.8).abs() < 0.01);

        // The inner square (0.36) falls below a 0.4 area floor.
        let bands = generator.min_area(0.4).bands(&square, unit_bbox()).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].level, 1.0);
    }

    #[test]
    fn test_empty_silhouette_is_fatal() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(matches!(
            Generator::new(4).bands(&empty, unit_bbox()),
            Err(ContourError::NoCoverage)
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            Generator::new(1).generate(demo_bbox()),
            Err(ContourError::Levels(1))
        ));
        let flat = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 0.0 });
        assert!(matches!(
            Generator::new(3).generate(flat),
            Err(ContourError::EmptyBounds)
        ));
    }

    #[test]
    fn test_smooth_ring() {
        let square = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)]);
        let once = smooth_ring(&square, 1).unwrap();
        assert_eq!(once.0.len(), 4 * 3 + 1);
        assert!(once.is_closed());
        assert_relative_eq!(once.0[0].x, 0.15, epsilon = 1e-12);
        assert_relative_eq!(once.0[0].y, 0.0);

        let twice = smooth_ring(&square, 2).unwrap();
        assert_eq!(twice.0.len(), 12 * 3 + 1);

        let degenerate = LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(smooth_ring(&degenerate, 1).is_none());
    }

    #[test]
    fn test_is_simple() {
        let bow_tie = LineString::from(vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        assert!(!is_simple(&bow_tie));

        let circle = disc(Coord { x: 0.0, y: 0.0 }, 1.0, 64);
        assert!(is_simple(circle.exterior()));
    }
}
