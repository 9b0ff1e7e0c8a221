use crate::C;
use geo::{
    geometry::{Coord, LineString, Point, Polygon, Rect},
    BoundingRect, Closest, ClosestPoint, Contains,
};
use serde::{Deserialize, Serialize};

/// Geometry of a single isoline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IsolineGeometry {
    /// A closed band; everything inside is at or above the band's
    /// level.
    Polygon(Polygon<C>),

    /// An open contour line.
    Line(LineString<C>),
}

/// A contour of constant elevation level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Isoline {
    /// Band index. Elevation is `level * step height`.
    pub level: C,

    pub geometry: IsolineGeometry,
}

impl Isoline {
    pub fn polygon(level: C, polygon: Polygon<C>) -> Self {
        Self {
            level,
            geometry: IsolineGeometry::Polygon(polygon),
        }
    }

    pub fn line(level: C, line: LineString<C>) -> Self {
        Self {
            level,
            geometry: IsolineGeometry::Line(line),
        }
    }

    /// Returns the band polygon, if this isoline is closed.
    pub fn as_polygon(&self) -> Option<&Polygon<C>> {
        match &self.geometry {
            IsolineGeometry::Polygon(polygon) => Some(polygon),
            IsolineGeometry::Line(_) => None,
        }
    }

    /// Axis aligned envelope, `None` for empty geometry.
    pub fn envelope(&self) -> Option<Rect<C>> {
        match &self.geometry {
            IsolineGeometry::Polygon(polygon) => polygon.bounding_rect(),
            IsolineGeometry::Line(line) => line.bounding_rect(),
        }
    }

    /// Every line making up this isoline's boundary.
    ///
    /// For polygons that is the exterior ring followed by any holes.
    pub fn boundaries(&self) -> Box<dyn Iterator<Item = &LineString<C>> + '_> {
        match &self.geometry {
            IsolineGeometry::Polygon(polygon) => {
                Box::new(std::iter::once(polygon.exterior()).chain(polygon.interiors()))
            }
            IsolineGeometry::Line(line) => Box::new(std::iter::once(line)),
        }
    }

    /// Euclidean distance (degrees) from `coord` to the nearest
    /// boundary line.
    pub fn distance(&self, coord: Coord<C>) -> C {
        let point = Point::from(coord);
        self.boundaries()
            .map(|line| line_distance(line, point))
            .fold(C::INFINITY, C::min)
    }

    /// Returns true if `coord` lies strictly inside a closed band.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        self.as_polygon()
            .map_or(false, |polygon| polygon.contains(&Point::from(coord)))
    }
}

fn line_distance(line: &LineString<C>, point: Point<C>) -> C {
    match line.closest_point(&point) {
        Closest::Intersection(closest) | Closest::SinglePoint(closest) => {
            (closest.x() - point.x()).hypot(closest.y() - point.y())
        }
        Closest::Indeterminate => C::INFINITY,
    }
}
