//! JSON job files for the fusion subcommands
//!
//! Paths inside a job are resolved against the directory holding the job
//! file, so a job and its inputs can be moved together.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use geofuse_algorithms::filter::StageKind;
use geofuse_algorithms::fusion::FEATURE_LEVEL;
use geofuse_algorithms::terrain::SlopeParams;
use geofuse_core::CRS;

/// A parsed job and the directory its relative paths start from
pub struct Job<T> {
    pub spec: T,
    base: PathBuf,
}

impl<T: DeserializeOwned> Job<T> {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Failed to read job file {}", path.display()))?;
        let spec = serde_json::from_str(&text).with_context(|| format!("Invalid job file {}", path.display()))?;
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self { spec, base })
    }
}

impl<T> Job<T> {
    /// Path relative to the job file, absolute paths unchanged
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base.join(path)
        }
    }
}

fn crs_from(epsg: Option<u32>) -> Option<CRS> {
    epsg.map(CRS::from_epsg)
}

fn default_bands() -> u32 {
    10
}

fn default_level() -> String {
    FEATURE_LEVEL.to_string()
}

fn default_true() -> bool {
    true
}

/// `geofuse need-score` job
#[derive(Debug, Deserialize)]
pub struct NeedScoreJob {
    /// GeoJSON with the region polygons
    pub regions: PathBuf,
    /// Property holding the region code; the GeoJSON feature id when absent
    #[serde(default)]
    pub key_field: Option<String>,
    #[serde(default)]
    pub epsg: Option<u32>,
    #[serde(default = "default_bands")]
    pub bands: u32,
    /// Coarser administrative levels as prefix lengths, e.g. `{"region": 4}`
    #[serde(default)]
    pub levels: BTreeMap<String, usize>,
    pub indicators: Vec<IndicatorEntry>,
}

impl NeedScoreJob {
    pub fn crs(&self) -> Option<CRS> {
        crs_from(self.epsg)
    }
}

#[derive(Debug, Deserialize)]
pub struct IndicatorEntry {
    pub name: String,
    /// JSON array of `{key, value, period}` records
    pub path: PathBuf,
    #[serde(default = "default_level")]
    pub granularity: String,
    #[serde(default)]
    pub reverse: bool,
}

/// `geofuse filter` job
#[derive(Debug, Deserialize)]
pub struct FilterJob {
    pub candidates: PathBuf,
    #[serde(default)]
    pub key_field: Option<String>,
    #[serde(default)]
    pub epsg: Option<u32>,
    pub stages: Vec<StageEntry>,
}

impl FilterJob {
    pub fn crs(&self) -> Option<CRS> {
        crs_from(self.epsg)
    }
}

#[derive(Debug, Deserialize)]
pub struct StageEntry {
    pub name: String,
    pub kind: StageKind,
    #[serde(default)]
    pub reference: Option<PathBuf>,
    #[serde(default)]
    pub reference_key: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

/// `geofuse suitability` job
#[derive(Debug, Deserialize)]
pub struct SuitabilityJob {
    /// Elevation GeoTIFF; fixes the output grid
    pub dem: PathBuf,
    /// GeoJSON line features the distance layer is measured to
    pub roads: PathBuf,
    #[serde(default)]
    pub exclusions: Vec<PathBuf>,
    pub slope_weight: f64,
    pub distance_weight: f64,
    /// Steeper terrain is less suitable
    #[serde(default = "default_true")]
    pub invert_slope: bool,
    /// Farther from roads is less suitable
    #[serde(default = "default_true")]
    pub invert_distance: bool,
    #[serde(default)]
    pub slope: SlopeParams,
    #[serde(default)]
    pub tolerance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geofuse_algorithms::terrain::SlopeUnits;
    use std::io::Write;

    fn write_job(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join("job.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(text.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_need_score_job_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"{
                "regions": "districts.geojson",
                "key_field": "code",
                "levels": {"region": 4},
                "indicators": [
                    {"name": "density", "path": "density.json"},
                    {"name": "income", "path": "/data/income.json", "granularity": "region", "reverse": true}
                ]
            }"#,
        );

        let job: Job<NeedScoreJob> = Job::load(&path).unwrap();
        assert_eq!(job.spec.bands, 10);
        assert_eq!(job.spec.levels.get("region"), Some(&4));
        assert_eq!(job.spec.indicators[0].granularity, FEATURE_LEVEL);
        assert!(job.spec.indicators[1].reverse);
        assert!(job.spec.crs().is_none());

        assert_eq!(job.resolve(&job.spec.regions), dir.path().join("districts.geojson"));
        assert_eq!(job.resolve(&job.spec.indicators[1].path), PathBuf::from("/data/income.json"));
    }

    #[test]
    fn test_filter_job_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"{
                "candidates": "buildings.geojson",
                "epsg": 25830,
                "stages": [
                    {"name": "parcel", "kind": "within", "reference": "parcels.geojson"},
                    {"name": "footprint", "kind": "area", "threshold": 1000}
                ]
            }"#,
        );

        let job: Job<FilterJob> = Job::load(&path).unwrap();
        assert_eq!(job.spec.stages[0].kind, StageKind::Containment);
        assert_eq!(job.spec.stages[1].threshold, Some(1000.0));
        assert_eq!(job.spec.crs().and_then(|c| c.epsg()), Some(25830));
    }

    #[test]
    fn test_unknown_stage_kind_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"{"candidates": "b.geojson", "stages": [{"name": "x", "kind": "buffer"}]}"#,
        );
        assert!(Job::<FilterJob>::load(&path).is_err());
    }

    #[test]
    fn test_suitability_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_job(
            dir.path(),
            r#"{
                "dem": "dem.tif",
                "roads": "roads.geojson",
                "exclusions": ["parks.geojson"],
                "slope_weight": 0.6,
                "distance_weight": 0.4,
                "slope": {"units": "percent"}
            }"#,
        );

        let job: Job<SuitabilityJob> = Job::load(&path).unwrap();
        assert!(job.spec.invert_slope && job.spec.invert_distance);
        assert_eq!(job.spec.slope.units, SlopeUnits::Percent);
        assert_eq!(job.spec.slope.z_factor, 1.0);
        assert_eq!(job.spec.exclusions.len(), 1);
    }
}
