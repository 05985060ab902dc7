//! Min-max normalization of a continuous layer

use geofuse_core::{EmptyReason, Outcome, Raster};
use tracing::debug;

/// A layer rescaled to [0, 1]
#[derive(Debug, Clone)]
pub(crate) struct Normalized {
    pub(crate) raster: Raster<f64>,
    /// Every valid cell had the same value
    pub(crate) flat: bool,
}

/// Rescale valid cells to `(v - min) / (max - min)`.
///
/// Statistics come from the valid (non no-data) cells only. A flat layer
/// (`max == min`) becomes the zero field rather than a division by zero.
/// No-data cells stay no-data, marked NaN in the output.
///
/// A raster without cells is `Empty(NoCells)`; one whose cells are all
/// no-data is `Empty(NoValidCells)`.
pub fn minmax_normalize(raster: &Raster<f64>) -> Outcome<Raster<f64>> {
    normalize_layer(raster, "minmax_normalize").map(|n| n.raster)
}

pub(crate) fn normalize_layer(raster: &Raster<f64>, origin: &str) -> Outcome<Normalized> {
    if raster.is_empty() {
        return Outcome::empty(origin, EmptyReason::NoCells);
    }

    let stats = raster.statistics();
    let (min, max) = match (stats.min, stats.max) {
        (Some(min), Some(max)) if stats.valid_count > 0 => (min, max),
        _ => return Outcome::empty(origin, EmptyReason::NoValidCells),
    };

    let range = max - min;
    let flat = range <= 0.0;
    if flat {
        debug!("{}: flat layer (value {}), contributes zero", origin, min);
    }

    let data = raster.data().mapv(|v| {
        if raster.is_nodata(v) {
            f64::NAN
        } else if flat {
            0.0
        } else {
            (v - min) / range
        }
    });

    let mut output = Raster::from_array(data);
    output.set_transform(*raster.transform());
    output.set_crs(raster.crs().cloned());
    output.set_nodata(Some(f64::NAN));

    Outcome::Complete(Normalized { raster: output, flat })
}
