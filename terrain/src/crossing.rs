//! Isoline crossings along a profile path.

use crate::math::{to_planar, Chord};
use contour::SpatialIndex;
use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    geometry::{Coord, Line, Rect},
};

/// Returns the sorted distances (meters along `chord`) at which the
/// geographic segment `start`-`end` crosses any isoline.
///
/// Collinear overlaps contribute both overlap endpoints.
pub fn crossing_distances(
    index: &SpatialIndex,
    start: Coord<f64>,
    end: Coord<f64>,
    chord: &Chord,
    pad_deg: f64,
) -> Vec<f64> {
    let path = Line::new(start, end);
    let envelope = {
        let rect = Rect::new(start, end);
        let pad = Coord { x: pad_deg, y: pad_deg };
        Rect::new(rect.min() - pad, rect.max() + pad)
    };

    let mut hits = Vec::new();
    for isoline in index.query(&envelope) {
        for segment in isoline.boundaries().flat_map(|line| line.lines()) {
            match line_intersection(path, segment) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => hits.push(intersection),
                Some(LineIntersection::Collinear { intersection }) => {
                    hits.push(intersection.start);
                    hits.push(intersection.end);
                }
                None => (),
            }
        }
    }

    let mut distances: Vec<f64> = hits
        .into_iter()
        .map(|hit| chord.locate(to_planar(hit)))
        .collect();
    distances.sort_by(f64::total_cmp);
    distances
}

/// Greedy earliest-first clustering of sorted crossing distances.
///
/// A crossing is kept only if it lies at least `radius` meters past
/// the previously kept one.
pub fn decluster(sorted: &[f64], radius: f64) -> Vec<f64> {
    let mut accepted: Vec<f64> = Vec::with_capacity(sorted.len());
    for &distance in sorted {
        match accepted.last() {
            Some(last) if distance - last < radius => (),
            _ => accepted.push(distance),
        }
    }
    accepted
}

/// Maps crossing distances onto `n` evenly spaced output samples
/// spanning `[0, length]`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn flag_samples(accepted: &[f64], length: f64, n: usize) -> Vec<bool> {
    let mut flags = vec![false; n];
    if n == 0 || length <= 0.0 {
        return flags;
    }
    let last = n - 1;
    for distance in accepted {
        let idx = (distance / length * last as f64).round().clamp(0.0, last as f64) as usize;
        flags[idx] = true;
    }
    flags
}

/// Clears flags closer than `gap` meters to the previous kept flag.
///
/// Applying this to its own output changes nothing.
pub fn enforce_min_gap(distances: &[f64], flags: &[bool], gap: f64) -> Vec<bool> {
    let mut last_kept: Option<f64> = None;
    distances
        .iter()
        .zip(flags)
        .map(|(&distance, &flag)| match (flag, last_kept) {
            (false, _) => false,
            (true, Some(last)) if distance - last < gap => false,
            (true, _) => {
                last_kept = Some(distance);
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{crossing_distances, decluster, enforce_min_gap, flag_samples};
    use crate::math::{linspace, to_planar, Chord};
    use approx::assert_relative_eq;
    use contour::{Isoline, SpatialIndex};
    use geo::{
        geometry::{Coord, LineString},
        polygon,
    };

    #[test]
    fn test_crossing_distances() {
        let index = SpatialIndex::new(vec![
            Isoline::polygon(
                1.0,
                polygon![
                    (x: -0.001, y: -0.001),
                    (x: 0.001, y: -0.001),
                    (x: 0.001, y: 0.001),
                    (x: -0.001, y: 0.001),
                ],
            ),
            // Far away, filtered by the envelope query.
            Isoline::line(2.0, LineString::from(vec![(1.0, -1.0), (1.0, 1.0)])),
        ]);
        let start = Coord { x: -0.002, y: 0.0 };
        let end = Coord { x: 0.002, y: 0.0 };
        let chord = Chord::new(to_planar(start), to_planar(end));

        let distances = crossing_distances(&index, start, end, &chord, 1e-5);
        assert_eq!(distances.len(), 2);
        assert_relative_eq!(distances[0], chord.length() * 0.25, epsilon = 1e-6);
        assert_relative_eq!(distances[1], chord.length() * 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_collinear_overlap() {
        let index = SpatialIndex::new(vec![Isoline::line(
            1.0,
            LineString::from(vec![(0.001, 0.0), (0.003, 0.0)]),
        )]);
        let start = Coord { x: 0.0, y: 0.0 };
        let end = Coord { x: 0.004, y: 0.0 };
        let chord = Chord::new(to_planar(start), to_planar(end));
        let distances = crossing_distances(&index, start, end, &chord, 1e-5);
        assert_eq!(distances.len(), 2);
        assert_relative_eq!(distances[0], chord.length() * 0.25, epsilon = 1e-6);
        assert_relative_eq!(distances[1], chord.length() * 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_decluster() {
        let accepted = decluster(&[0.0, 5.0, 19.9, 20.0, 30.0, 45.0, 100.0], 20.0);
        assert_eq!(accepted, vec![0.0, 20.0, 45.0, 100.0]);
        assert_eq!(decluster(&accepted, 20.0), accepted);
        assert!(decluster(&[], 20.0).is_empty());
    }

    #[test]
    fn test_flag_samples() {
        let flags = flag_samples(&[0.0, 49.0, 100.0, 250.0], 100.0, 5);
        assert_eq!(flags, vec![true, false, true, false, true]);
        assert_eq!(flag_samples(&[10.0], 0.0, 3), vec![false; 3]);
    }

    #[test]
    fn test_enforce_min_gap_is_idempotent() {
        let distances: Vec<f64> = linspace(0.0, 100.0, 11).collect();
        let flags = vec![
            true, true, false, false, false, true, true, false, true, false, true,
        ];
        let once = enforce_min_gap(&distances, &flags, 25.0);
        assert_eq!(
            once,
            vec![true, false, false, false, false, true, false, false, true, false, false]
        );
        assert_eq!(enforce_min_gap(&distances, &once, 25.0), once);
    }
}
