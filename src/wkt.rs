//! Well-known-text rendering of geo-types geometries
//!
//! Output follows the spaced OGC style (`POINT (1 2)`, `MULTIPOINT ((0 0), (1 1))`).
//! Coordinates use the shortest decimal form that parses back to the same `f64`.

use geo_types::{Coord, Geometry, LineString, Polygon};
use std::fmt::{self, Write};

/// Display adapter writing a geometry as WKT
pub struct Wkt<'a>(pub &'a Geometry<f64>);

impl fmt::Display for Wkt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_geometry(f, self.0)
    }
}

/// Render a geometry as WKT
pub fn to_wkt(geometry: &Geometry<f64>) -> String {
    Wkt(geometry).to_string()
}

/// Whether every coordinate is finite, so the WKT text is valid
pub fn is_representable(geometry: &Geometry<f64>) -> bool {
    let finite = |c: &Coord<f64>| c.x.is_finite() && c.y.is_finite();
    let ring = |ls: &LineString<f64>| ls.0.iter().all(finite);
    let polygon = |p: &Polygon<f64>| ring(p.exterior()) && p.interiors().iter().all(ring);

    match geometry {
        Geometry::Point(p) => finite(&p.0),
        Geometry::Line(line) => finite(&line.start) && finite(&line.end),
        Geometry::LineString(ls) => ring(ls),
        Geometry::Polygon(p) => polygon(p),
        Geometry::MultiPoint(mp) => mp.0.iter().all(|p| finite(&p.0)),
        Geometry::MultiLineString(mls) => mls.0.iter().all(ring),
        Geometry::MultiPolygon(mp) => mp.0.iter().all(polygon),
        Geometry::GeometryCollection(gc) => gc.0.iter().all(is_representable),
        Geometry::Rect(rect) => finite(&rect.min()) && finite(&rect.max()),
        Geometry::Triangle(t) => finite(&t.0) && finite(&t.1) && finite(&t.2),
    }
}

fn write_geometry<W: Write>(out: &mut W, geometry: &Geometry<f64>) -> fmt::Result {
    match geometry {
        Geometry::Point(p) => {
            out.write_str("POINT (")?;
            write_coord(out, &p.0)?;
            out.write_char(')')
        }
        Geometry::Line(line) => {
            out.write_str("LINESTRING (")?;
            write_coord(out, &line.start)?;
            out.write_str(", ")?;
            write_coord(out, &line.end)?;
            out.write_char(')')
        }
        Geometry::LineString(ls) => {
            out.write_str("LINESTRING ")?;
            write_line_string(out, ls)
        }
        Geometry::Polygon(polygon) => {
            out.write_str("POLYGON ")?;
            write_polygon(out, polygon)
        }
        Geometry::MultiPoint(mp) => {
            out.write_str("MULTIPOINT ")?;
            write_members(out, &mp.0, |out, p| {
                out.write_char('(')?;
                write_coord(out, &p.0)?;
                out.write_char(')')
            })
        }
        Geometry::MultiLineString(mls) => {
            out.write_str("MULTILINESTRING ")?;
            write_members(out, &mls.0, write_line_string)
        }
        Geometry::MultiPolygon(mp) => {
            out.write_str("MULTIPOLYGON ")?;
            write_members(out, &mp.0, write_polygon)
        }
        Geometry::GeometryCollection(gc) => {
            out.write_str("GEOMETRYCOLLECTION ")?;
            write_members(out, &gc.0, write_geometry)
        }
        Geometry::Rect(rect) => {
            out.write_str("POLYGON ")?;
            write_polygon(out, &rect.to_polygon())
        }
        Geometry::Triangle(triangle) => {
            out.write_str("POLYGON ")?;
            write_polygon(out, &triangle.to_polygon())
        }
    }
}

/// `(a, b, ...)` or `EMPTY`
fn write_members<W, T, F>(out: &mut W, members: &[T], mut write_one: F) -> fmt::Result
where
    W: Write,
    F: FnMut(&mut W, &T) -> fmt::Result,
{
    if members.is_empty() {
        return out.write_str("EMPTY");
    }
    out.write_char('(')?;
    for (i, member) in members.iter().enumerate() {
        if i > 0 {
            out.write_str(", ")?;
        }
        write_one(out, member)?;
    }
    out.write_char(')')
}

fn write_line_string<W: Write>(out: &mut W, ls: &LineString<f64>) -> fmt::Result {
    write_members(out, &ls.0, write_coord)
}

fn write_polygon<W: Write>(out: &mut W, polygon: &Polygon<f64>) -> fmt::Result {
    if polygon.exterior().0.is_empty() {
        return out.write_str("EMPTY");
    }
    out.write_char('(')?;
    write_members(out, &polygon.exterior().0, write_coord)?;
    for ring in polygon.interiors() {
        out.write_str(", ")?;
        write_members(out, &ring.0, write_coord)?;
    }
    out.write_char(')')
}

#[inline]
fn write_coord<W: Write>(out: &mut W, c: &Coord<f64>) -> fmt::Result {
    write!(out, "{} {}", c.x, c.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{
        line_string, point, polygon, GeometryCollection, MultiPoint, MultiPolygon, Rect,
    };
    use wkt::TryFromWkt;

    #[test]
    fn test_point() {
        let g: Geometry<f64> = point!(x: 0.0, y: 0.0).into();
        assert_eq!(to_wkt(&g), "POINT (0 0)");

        let g: Geometry<f64> = point!(x: -99.1332, y: 19.4326).into();
        assert_eq!(to_wkt(&g), "POINT (-99.1332 19.4326)");
    }

    #[test]
    fn test_line_string_and_polygon() {
        let ls: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.5, y: 2.0)].into();
        assert_eq!(to_wkt(&ls), "LINESTRING (0 0, 1.5 2)");

        let poly: Geometry<f64> = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0)
        ]
        .into();
        assert_eq!(to_wkt(&poly), "POLYGON ((0 0, 1 0, 1 1, 0 0))");
    }

    #[test]
    fn test_multi_and_collections() {
        let mp: Geometry<f64> = MultiPoint::from(vec![(0.0, 0.0), (1.0, 1.0)]).into();
        assert_eq!(to_wkt(&mp), "MULTIPOINT ((0 0), (1 1))");

        let gc = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Point(point!(x: 1.0, y: 2.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)]),
        ]));
        assert_eq!(
            to_wkt(&gc),
            "GEOMETRYCOLLECTION (POINT (1 2), LINESTRING (0 0, 1 1))"
        );

        let empty = Geometry::GeometryCollection(GeometryCollection::<f64>(vec![]));
        assert_eq!(to_wkt(&empty), "GEOMETRYCOLLECTION EMPTY");
        let empty = Geometry::MultiPolygon(MultiPolygon::<f64>(vec![]));
        assert_eq!(to_wkt(&empty), "MULTIPOLYGON EMPTY");
    }

    #[test]
    fn test_rect_renders_as_polygon() {
        let rect: Geometry<f64> = Rect::new((0.0, 0.0), (2.0, 1.0)).into();
        assert!(to_wkt(&rect).starts_with("POLYGON (("));
    }

    #[test]
    fn test_output_parses_back() {
        let geometries = vec![
            Geometry::Point(point!(x: 0.1, y: -1e-7)),
            Geometry::LineString(line_string![(x: 1e15, y: 2.0), (x: -3.25, y: 4.5)]),
            Geometry::Polygon(polygon!(
                exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0)],
                interiors: [[(x: 1.0, y: 1.0), (x: 2.0, y: 1.0), (x: 2.0, y: 2.0)]],
            )),
            MultiPoint::from(vec![(1.0 / 3.0, 2.0 / 3.0)]).into(),
            Geometry::GeometryCollection(GeometryCollection(vec![Geometry::Point(
                point!(x: 5.0, y: 6.0),
            )])),
        ];
        for g in &geometries {
            let parsed = Geometry::<f64>::try_from_wkt_str(&to_wkt(g)).unwrap();
            assert_eq!(&parsed, g);
        }
    }

    #[test]
    fn test_non_finite_not_representable() {
        let g: Geometry<f64> = point!(x: 1.0, y: 2.0).into();
        assert!(is_representable(&g));

        let g: Geometry<f64> = point!(x: f64::NAN, y: 2.0).into();
        assert!(!is_representable(&g));

        let g: Geometry<f64> =
            line_string![(x: 0.0, y: 0.0), (x: f64::INFINITY, y: 1.0)].into();
        assert!(!is_representable(&g));

        let g = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Point(point!(x: 0.0, y: 0.0)),
            Geometry::Point(point!(x: 0.0, y: f64::NEG_INFINITY)),
        ]));
        assert!(!is_representable(&g));
    }
}
