//! Euclidean distance from every cell to the nearest feature
//!
//! Produces the distance-to-road style layer consumed by the suitability
//! overlay. Distances are planar, measured from cell centres in CRS units.

use geo::{Distance, Euclidean, Geometry, Point};
use geofuse_core::crs::compatible;
use geofuse_core::{EmptyReason, Error, FeatureCollection, Outcome, Raster, RasterElement, Result};
use ndarray::Array2;
use tracing::debug;

use crate::maybe_rayon::*;
use crate::vector::BoundingBox;

/// Distance from each cell centre of `grid` to the closest geometry in `features`.
///
/// Only the grid geometry of `grid` is used; its cell values are ignored. The
/// output shares the grid, its CRS, and carries NaN as no-data.
///
/// An empty feature set yields `Empty(NoReference)` and a grid with no cells
/// yields `Empty(NoCells)`.
pub fn distance_to_features<T: RasterElement>(
    grid: &Raster<T>,
    features: &FeatureCollection,
) -> Result<Outcome<Raster<f64>>> {
    if !compatible(grid.crs(), features.crs()) {
        return Err(Error::CrsMismatch(
            grid.crs().map(|c| c.identifier()).unwrap_or_default(),
            features.crs().map(|c| c.identifier()).unwrap_or_default(),
        ));
    }
    if features.is_empty() {
        return Ok(Outcome::empty("proximity", EmptyReason::NoReference));
    }
    if grid.is_empty() {
        return Ok(Outcome::empty("proximity", EmptyReason::NoCells));
    }

    let targets: Vec<(BoundingBox, &Geometry<f64>)> = features
        .iter()
        .filter_map(|f| BoundingBox::of(&f.geometry).map(|bb| (bb, &f.geometry)))
        .collect();
    if targets.is_empty() {
        return Ok(Outcome::empty("proximity", EmptyReason::NoReference));
    }

    let (rows, cols) = grid.shape();
    let transform = grid.transform();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                let centre = Point::new(x, y);

                let mut nearest = f64::INFINITY;
                for (bb, geom) in &targets {
                    // Envelope distance never exceeds the exact distance
                    if bb.distance_to_point(x, y) >= nearest {
                        continue;
                    }
                    nearest = nearest.min(Euclidean::distance(&centre, *geom));
                }
                *out = nearest;
            }
            row_data
        })
        .collect();

    debug!(
        "proximity: {}x{} cells against {} features",
        rows,
        cols,
        targets.len()
    );

    let mut output = grid.with_same_meta::<f64>();
    output.set_nodata(Some(f64::NAN));
    output.replace_data(Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?)?;
    Ok(Outcome::Complete(output))
}
