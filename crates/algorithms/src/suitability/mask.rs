//! Rasterized exclusion zones

use geo::{Coord, Geometry, Intersects};
use geofuse_core::{FeatureCollection, Raster, RasterElement};

use crate::vector::BoundingBox;

/// Mark the cells whose centre intersects an exclusion geometry (1) and the
/// others (0). A centre lying exactly on a polygon boundary is excluded.
///
/// The mask shares the grid and CRS of `grid`.
pub fn exclusion_mask<T: RasterElement>(grid: &Raster<T>, exclusions: &[FeatureCollection]) -> Raster<u8> {
    let zones: Vec<(BoundingBox, &Geometry<f64>)> = exclusions
        .iter()
        .flat_map(|fc| fc.iter())
        .filter_map(|f| BoundingBox::of(&f.geometry).map(|bb| (bb, &f.geometry)))
        .collect();

    let mut mask = grid.with_same_meta::<u8>();
    if zones.is_empty() {
        return mask;
    }

    let transform = *grid.transform();
    for ((row, col), cell) in mask.data_mut().indexed_iter_mut() {
        let (x, y) = transform.pixel_to_geo(col, row);
        let centre = Coord { x, y };
        let excluded = zones
            .iter()
            .any(|(bb, geom)| bb.contains_point(x, y) && geom.intersects(&centre));
        if excluded {
            *cell = 1;
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use geofuse_core::{Feature, GeoTransform};

    fn grid() -> Raster<f64> {
        let mut g = Raster::new(4, 4);
        g.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        g
    }

    #[test]
    fn test_mask_marks_covered_centres() {
        // Covers centres with x in {0.5, 1.5} and y in {2.5, 3.5}: the top-left 2x2 block
        let zone = polygon![(x: 0.0, y: 2.0), (x: 2.0, y: 2.0), (x: 2.0, y: 4.0), (x: 0.0, y: 4.0)];
        let fc = FeatureCollection::from_features([Feature::new("park", zone)], None).unwrap();

        let mask = exclusion_mask(&grid(), &[fc]);
        let excluded: usize = mask.data().iter().map(|&v| v as usize).sum();
        assert_eq!(excluded, 4);
        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(1, 1).unwrap(), 1);
        assert_eq!(mask.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_centre_on_boundary_is_excluded() {
        // Right edge runs through the centres of column 1
        let zone = polygon![(x: 0.0, y: 0.0), (x: 1.5, y: 0.0), (x: 1.5, y: 4.0), (x: 0.0, y: 4.0)];
        let fc = FeatureCollection::from_features([Feature::new("z", zone)], None).unwrap();

        let mask = exclusion_mask(&grid(), &[fc]);
        assert_eq!(mask.get(2, 1).unwrap(), 1);
        assert_eq!(mask.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_no_exclusions() {
        let mask = exclusion_mask(&grid(), &[]);
        assert!(mask.data().iter().all(|&v| v == 0));
        assert!(mask.same_grid(&grid()));
    }
}
