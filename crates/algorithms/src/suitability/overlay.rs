//! Weighted overlay of normalized layers

use std::collections::HashSet;

use geofuse_core::crs::compatible;
use geofuse_core::{Algorithm, Error, FeatureCollection, Outcome, Raster, Result, CRS};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::mask::exclusion_mask;
use super::normalize::{normalize_layer, Normalized};
use crate::maybe_rayon::*;
use crate::vector::validate_geometry;

/// One input layer of the overlay
#[derive(Debug, Clone)]
pub struct SuitabilityLayer {
    pub name: String,
    pub raster: Raster<f64>,
    pub weight: f64,
    /// Use `1 - normalized`, for layers where a larger raw value is worse
    pub invert: bool,
}

impl SuitabilityLayer {
    pub fn new(name: impl Into<String>, raster: Raster<f64>, weight: f64) -> Self {
        Self {
            name: name.into(),
            raster,
            weight,
            invert: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }
}

/// Parameters for the suitability overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityParams {
    /// Allowed distance of the weight sum from 1
    pub tolerance: f64,
}

impl Default for SuitabilityParams {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

fn check_weights(layers: &[SuitabilityLayer], params: &SuitabilityParams) -> Result<()> {
    if layers.len() < 2 {
        return Err(Error::Configuration(format!(
            "suitability needs at least two layers, got {}",
            layers.len()
        )));
    }
    if !params.tolerance.is_finite() || params.tolerance < 0.0 {
        return Err(Error::InvalidParameter {
            name: "tolerance",
            value: params.tolerance.to_string(),
            reason: "must be a finite, non-negative number".into(),
        });
    }

    let mut names = HashSet::new();
    for layer in layers {
        if !names.insert(layer.name.as_str()) {
            return Err(Error::Configuration(format!("layer '{}' is given twice", layer.name)));
        }
        if !layer.weight.is_finite() || layer.weight < 0.0 {
            return Err(Error::Configuration(format!(
                "layer '{}' has invalid weight {}",
                layer.name, layer.weight
            )));
        }
    }

    let total: f64 = layers.iter().map(|l| l.weight).sum();
    if (total - 1.0).abs() > params.tolerance {
        return Err(Error::Configuration(format!(
            "layer weights sum to {}, expected 1 (tolerance {})",
            total, params.tolerance
        )));
    }
    Ok(())
}

fn check_grids(layers: &[SuitabilityLayer], exclusions: &[FeatureCollection]) -> Result<()> {
    let base = &layers[0].raster;
    for layer in &layers[1..] {
        if layer.raster.shape() != base.shape() {
            return Err(Error::SizeMismatch {
                er: base.rows(),
                ec: base.cols(),
                ar: layer.raster.rows(),
                ac: layer.raster.cols(),
            });
        }
        if !layer.raster.same_grid(base) {
            return Err(Error::GridMismatch {
                layer: layer.name.clone(),
            });
        }
    }

    let mut grid_crs = None;
    for layer in layers {
        let crs = layer.raster.crs();
        if !compatible(grid_crs, crs) {
            return Err(Error::CrsMismatch(
                grid_crs.map(CRS::identifier).unwrap_or_default(),
                crs.map(CRS::identifier).unwrap_or_default(),
            ));
        }
        grid_crs = grid_crs.or(crs);
    }

    for zone in exclusions {
        if !compatible(grid_crs, zone.crs()) {
            return Err(Error::CrsMismatch(
                grid_crs.map(CRS::identifier).unwrap_or_default(),
                zone.crs().map(CRS::identifier).unwrap_or_default(),
            ));
        }
        for feature in zone.iter() {
            validate_geometry(&feature.id, &feature.geometry)?;
        }
    }
    Ok(())
}

/// Weighted sum of min-max normalized layers, with exclusion zones masked.
///
/// Configuration is checked before any cell is computed: at least two
/// layers, finite non-negative weights summing to 1 within
/// `params.tolerance`, one shared grid, and compatible CRSs.
///
/// Each layer is normalized over its own valid cells; inverted layers use
/// `1 - normalized`, except flat layers, which stay at zero. A cell that is
/// no-data in any layer is NaN in the output. Exclusions are applied last,
/// so the normalization statistics never depend on them: a cell outside the
/// exclusion zones has the same value with or without the mask.
///
/// A layer with no cells or no valid cells yields an empty result named
/// after that layer.
pub fn weighted_suitability(
    layers: &[SuitabilityLayer],
    exclusions: &[FeatureCollection],
    params: &SuitabilityParams,
) -> Result<Outcome<Raster<f64>>> {
    check_weights(layers, params)?;
    check_grids(layers, exclusions)?;

    let mut normalized: Vec<(Normalized, &SuitabilityLayer)> = Vec::with_capacity(layers.len());
    for layer in layers {
        match normalize_layer(&layer.raster, &layer.name) {
            Outcome::Complete(n) => normalized.push((n, layer)),
            Outcome::Empty(empty) => return Ok(Outcome::Empty(empty)),
        }
    }

    let (rows, cols) = layers[0].raster.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            'cells: for (col, out) in row_data.iter_mut().enumerate() {
                let mut sum = 0.0;
                for (n, layer) in &normalized {
                    let v = n.raster.data()[[row, col]];
                    if v.is_nan() {
                        continue 'cells;
                    }
                    let directed = if layer.invert && !n.flat { 1.0 - v } else { v };
                    sum += layer.weight * directed;
                }
                *out = sum;
            }
            row_data
        })
        .collect();

    let mut output = layers[0].raster.with_same_meta::<f64>();
    output.set_crs(layers.iter().find_map(|l| l.raster.crs().cloned()));
    output.set_nodata(Some(f64::NAN));
    output.replace_data(Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?)?;

    let mask = exclusion_mask(&output, exclusions);
    let mut excluded = 0usize;
    for (cell, &m) in output.data_mut().iter_mut().zip(mask.data().iter()) {
        if m == 1 {
            *cell = f64::NAN;
            excluded += 1;
        }
    }

    let stats = output.statistics();
    debug!(
        "suitability: {} layers, {} cells valid, {} masked by exclusions",
        layers.len(),
        stats.valid_count,
        excluded
    );
    if stats.valid_count == 0 {
        warn!("suitability: every cell is no-data or excluded");
    }

    Ok(Outcome::Complete(output))
}

/// Raster suitability algorithm
#[derive(Debug, Clone, Default)]
pub struct Suitability;

impl Algorithm for Suitability {
    type Input = (Vec<SuitabilityLayer>, Vec<FeatureCollection>);
    type Output = Outcome<Raster<f64>>;
    type Params = SuitabilityParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Suitability"
    }

    fn description(&self) -> &'static str {
        "Weighted overlay of min-max normalized layers with exclusion masking"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let (layers, exclusions) = input;
        weighted_suitability(&layers, &exclusions, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::polygon;
    use geofuse_core::{EmptyReason, Feature, GeoTransform};

    fn layer(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 2, 2).unwrap();
        r.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_weighted_sum() {
        let slope = layer(vec![0.0, 10.0, 20.0, 40.0]);
        let distance = layer(vec![0.0, 100.0, 200.0, 400.0]);
        let layers = vec![
            SuitabilityLayer::new("slope", slope, 0.6),
            SuitabilityLayer::new("roads", distance, 0.4).inverted(),
        ];

        let out = weighted_suitability(&layers, &[], &SuitabilityParams::default())
            .unwrap()
            .complete()
            .unwrap();
        // cell (0, 1): slope 0.25, roads 1 - 0.25
        assert_relative_eq!(out.get(0, 1).unwrap(), 0.6 * 0.25 + 0.4 * 0.75);
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.6);
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.4);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.5),
            SuitabilityLayer::new("b", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.4),
        ];
        let err = weighted_suitability(&layers, &[], &SuitabilityParams::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_requires_two_layers() {
        let layers = vec![SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 1.0)];
        assert!(matches!(
            weighted_suitability(&layers, &[], &SuitabilityParams::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 1.5),
            SuitabilityLayer::new("b", layer(vec![1.0, 2.0, 3.0, 4.0]), -0.5),
        ];
        assert!(matches!(
            weighted_suitability(&layers, &[], &SuitabilityParams::default()),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_grid_mismatch() {
        let mut shifted = layer(vec![1.0, 2.0, 3.0, 4.0]);
        shifted.set_transform(GeoTransform::new(10.0, 2.0, 1.0, -1.0));
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.5),
            SuitabilityLayer::new("b", shifted, 0.5),
        ];
        assert!(matches!(
            weighted_suitability(&layers, &[], &SuitabilityParams::default()),
            Err(Error::GridMismatch { .. })
        ));

        let wide = Raster::from_vec(vec![1.0; 6], 2, 3).unwrap();
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.5),
            SuitabilityLayer::new("b", wide, 0.5),
        ];
        assert!(matches!(
            weighted_suitability(&layers, &[], &SuitabilityParams::default()),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_flat_inverted_layer_contributes_zero() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![0.0, 1.0, 2.0, 4.0]), 0.5),
            SuitabilityLayer::new("flat", layer(vec![3.0; 4]), 0.5).inverted(),
        ];
        let out = weighted_suitability(&layers, &[], &SuitabilityParams::default())
            .unwrap()
            .complete()
            .unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 0.0);
        assert_relative_eq!(out.get(1, 1).unwrap(), 0.5);
    }

    #[test]
    fn test_nodata_propagates() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![f64::NAN, 1.0, 2.0, 4.0]), 0.5),
            SuitabilityLayer::new("b", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.5),
        ];
        let out = weighted_suitability(&layers, &[], &SuitabilityParams::default())
            .unwrap()
            .complete()
            .unwrap();
        assert!(out.get(0, 0).unwrap().is_nan());
        assert!(!out.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_exclusion_masks_after_combination() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![0.0, 1.0, 2.0, 4.0]), 0.5),
            SuitabilityLayer::new("b", layer(vec![4.0, 3.0, 2.0, 0.0]), 0.5),
        ];
        // Covers the centre of cell (1, 1) only
        let zone = polygon![(x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0)];
        let exclusions = vec![FeatureCollection::from_features([Feature::new("lake", zone)], None).unwrap()];

        let params = SuitabilityParams::default();
        let plain = weighted_suitability(&layers, &[], &params).unwrap().complete().unwrap();
        let masked = weighted_suitability(&layers, &exclusions, &params)
            .unwrap()
            .complete()
            .unwrap();

        assert!(masked.get(1, 1).unwrap().is_nan());
        for (row, col) in [(0, 0), (0, 1), (1, 0)] {
            assert_eq!(plain.get(row, col).unwrap(), masked.get(row, col).unwrap());
        }
    }

    #[test]
    fn test_all_nodata_layer_is_empty() {
        let layers = vec![
            SuitabilityLayer::new("a", layer(vec![1.0, 2.0, 3.0, 4.0]), 0.5),
            SuitabilityLayer::new("void", layer(vec![f64::NAN; 4]), 0.5),
        ];
        let outcome = weighted_suitability(&layers, &[], &SuitabilityParams::default()).unwrap();
        let empty = outcome.empty_result().unwrap();
        assert_eq!(empty.origin, "void");
        assert_eq!(empty.reason, EmptyReason::NoValidCells);
    }
}
