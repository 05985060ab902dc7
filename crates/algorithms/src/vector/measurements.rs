//! Planar measurements and geometry validity

use geo::{Area as GeoArea, Coord, Geometry, Intersects, Line, LineString, Polygon, RemoveRepeatedPoints};
use geofuse_core::{Error, Result};

/// Planar area of a geometry in squared CRS units.
///
/// Non-areal geometries have zero area. Only meaningful in a projected CRS;
/// callers check [`CRS::is_geographic`](geofuse_core::CRS::is_geographic) first.
pub fn area(geom: &Geometry<f64>) -> f64 {
    match geom {
        Geometry::Polygon(p) => p.unsigned_area(),
        Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        Geometry::Rect(r) => r.unsigned_area(),
        Geometry::Triangle(t) => t.unsigned_area(),
        Geometry::GeometryCollection(gc) => gc.iter().map(area).sum(),
        _ => 0.0,
    }
}

/// Check that a geometry can take part in area and distance computations:
/// finite coordinates, non-degenerate rings and no self-intersecting ring.
///
/// `id` names the owning feature in the returned error.
pub fn validate_geometry(id: &str, geom: &Geometry<f64>) -> Result<()> {
    let invalid = |reason: String| Error::InvalidGeometry {
        id: id.to_string(),
        reason,
    };

    match geom {
        Geometry::Point(p) => check_coord(p.0).map_err(invalid),
        Geometry::MultiPoint(mp) => mp.iter().try_for_each(|p| check_coord(p.0)).map_err(invalid),
        Geometry::Line(l) => check_coord(l.start)
            .and_then(|_| check_coord(l.end))
            .map_err(invalid),
        Geometry::LineString(ls) => check_line_string(ls).map_err(invalid),
        Geometry::MultiLineString(mls) => mls.iter().try_for_each(check_line_string).map_err(invalid),
        Geometry::Polygon(p) => check_polygon(p).map_err(invalid),
        Geometry::MultiPolygon(mp) => mp.iter().try_for_each(check_polygon).map_err(invalid),
        Geometry::Rect(r) => check_coord(r.min())
            .and_then(|_| check_coord(r.max()))
            .map_err(invalid),
        Geometry::Triangle(t) => t.to_array().into_iter().try_for_each(check_coord).map_err(invalid),
        Geometry::GeometryCollection(gc) => gc.iter().try_for_each(|g| validate_geometry(id, g)),
    }
}

fn check_coord(c: Coord<f64>) -> std::result::Result<(), String> {
    if c.x.is_finite() && c.y.is_finite() {
        Ok(())
    } else {
        Err(format!("non-finite coordinate ({}, {})", c.x, c.y))
    }
}

fn check_line_string(ls: &LineString<f64>) -> std::result::Result<(), String> {
    ls.0.iter().try_for_each(|c| check_coord(*c))?;
    if ls.0.len() < 2 {
        return Err("line string needs at least two coordinates".into());
    }
    Ok(())
}

fn check_polygon(poly: &Polygon<f64>) -> std::result::Result<(), String> {
    check_ring(poly.exterior(), "exterior")?;
    for (i, ring) in poly.interiors().iter().enumerate() {
        check_ring(ring, &format!("interior ring {}", i))?;
    }
    if poly.unsigned_area() <= 0.0 {
        return Err("polygon has zero area".into());
    }
    Ok(())
}

fn check_ring(ring: &LineString<f64>, label: &str) -> std::result::Result<(), String> {
    ring.0.iter().try_for_each(|c| check_coord(*c))?;
    // A repeated vertex is legal but carries no segment
    let ring = ring.remove_repeated_points();
    if ring.0.len() < 4 {
        return Err(format!("{} ring has fewer than four distinct coordinates", label));
    }
    if !ring.is_closed() {
        return Err(format!("{} ring is not closed", label));
    }
    match first_crossing(&ring) {
        Some(i) => Err(format!("{} ring self-intersects at segment {}", label, i)),
        None => Ok(()),
    }
}

/// First segment touching a non-adjacent segment of the same closed ring.
///
/// Segments are swept in order of their smallest x, so only pairs whose
/// x-extents overlap reach the exact intersection test.
fn first_crossing(ring: &LineString<f64>) -> Option<usize> {
    let segments: Vec<Line<f64>> = ring.lines().collect();
    let n = segments.len();
    let extent = |l: &Line<f64>| {
        (
            l.start.x.min(l.end.x),
            l.start.x.max(l.end.x),
            l.start.y.min(l.end.y),
            l.start.y.max(l.end.y),
        )
    };
    let extents: Vec<_> = segments.iter().map(extent).collect();

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| extents[a].0.total_cmp(&extents[b].0));

    let mut first: Option<usize> = None;
    for (k, &i) in order.iter().enumerate() {
        let (_, max_x, min_y, max_y) = extents[i];
        for &j in &order[k + 1..] {
            let (other_min_x, _, other_min_y, other_max_y) = extents[j];
            if other_min_x > max_x {
                break;
            }
            let gap = i.abs_diff(j);
            if gap == 1 || gap == n - 1 || other_min_y > max_y || other_max_y < min_y {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                let lower = i.min(j);
                first = Some(first.map_or(lower, |f| f.min(lower)));
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, LineString, MultiPolygon, Point};

    fn square(x: f64, y: f64, side: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: y),
            (x: x + side, y: y),
            (x: x + side, y: y + side),
            (x: x, y: y + side),
            (x: x, y: y),
        ]
    }

    #[test]
    fn test_area_square() {
        let a = area(&Geometry::Polygon(square(0.0, 0.0, 10.0)));
        assert!((a - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_multipolygon() {
        let mp = MultiPolygon::new(vec![square(0.0, 0.0, 10.0), square(20.0, 0.0, 5.0)]);
        assert!((area(&Geometry::MultiPolygon(mp)) - 125.0).abs() < 1e-10);
    }

    #[test]
    fn test_area_non_polygon() {
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (10.0, 10.0)]));
        assert_eq!(area(&line), 0.0);
    }

    #[test]
    fn test_valid_polygon() {
        assert!(validate_geometry("p", &Geometry::Polygon(square(0.0, 0.0, 3.0))).is_ok());
    }

    #[test]
    fn test_bowtie_is_invalid() {
        let bowtie = polygon![
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 10.0, y: 0.0),
            (x: 0.0, y: 10.0),
            (x: 0.0, y: 0.0),
        ];
        let err = validate_geometry("b7", &Geometry::Polygon(bowtie)).unwrap_err();
        assert!(matches!(err, Error::InvalidGeometry { ref id, .. } if id == "b7"));
    }

    #[test]
    fn test_repeated_vertex_is_valid() {
        let footprint = polygon![
            (x: 0.0, y: 0.0),
            (x: 40.0, y: 0.0),
            (x: 40.0, y: 0.0),
            (x: 40.0, y: 30.0),
            (x: 0.0, y: 30.0),
            (x: 0.0, y: 30.0),
            (x: 0.0, y: 0.0),
        ];
        assert!(validate_geometry("b1", &Geometry::Polygon(footprint)).is_ok());
    }

    #[test]
    fn test_crossing_found_in_many_vertex_ring() {
        // Closed zigzag whose last segment cuts back across the first tooth
        let mut coords: Vec<(f64, f64)> = (0..200)
            .map(|i| (i as f64, if i % 2 == 0 { 0.0 } else { 1.0 }))
            .collect();
        coords.push((199.0, 10.0));
        coords.push((0.5, -1.0));
        coords.push((0.0, 0.0));
        let ring = Polygon::new(LineString::from(coords), vec![]);
        assert!(validate_geometry("z", &Geometry::Polygon(ring)).is_err());

        let mut comb: Vec<(f64, f64)> = (0..200)
            .map(|i| (i as f64, if i % 2 == 0 { 0.0 } else { 1.0 }))
            .collect();
        comb.push((199.0, 10.0));
        comb.push((0.0, 10.0));
        comb.push((0.0, 0.0));
        let ring = Polygon::new(LineString::from(comb), vec![]);
        assert!(validate_geometry("c", &Geometry::Polygon(ring)).is_ok());
    }

    #[test]
    fn test_non_finite_point_is_invalid() {
        let p = Geometry::Point(Point::new(f64::NAN, 1.0));
        assert!(validate_geometry("n", &p).is_err());
    }

    #[test]
    fn test_degenerate_polygon_is_invalid() {
        let flat = polygon![(x: 0.0, y: 0.0), (x: 5.0, y: 0.0), (x: 10.0, y: 0.0), (x: 0.0, y: 0.0)];
        assert!(validate_geometry("f", &Geometry::Polygon(flat)).is_err());
    }
}
