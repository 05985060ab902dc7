//! GeoFuse CLI - indicator fusion over regions, buildings and rasters

mod jobs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use geofuse_algorithms::filter::{FilterPipeline, StageSpec};
use geofuse_algorithms::fusion::{need_score, Granularity, GranularityScheme, IndicatorSpec, NeedScoreParams};
use geofuse_algorithms::proximity::distance_to_features;
use geofuse_algorithms::suitability::{weighted_suitability, SuitabilityLayer, SuitabilityParams};
use geofuse_algorithms::terrain::slope;
use geofuse_core::io::{read_geojson, read_geotiff, read_indicator_table, write_geojson, write_geotiff};
use geofuse_core::{EmptyResult, FeatureCollection, Outcome, Raster, CRS};

use jobs::{FilterJob, Job, NeedScoreJob, SuitabilityJob};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geofuse")]
#[command(author, version, about = "Geospatial indicator fusion", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Score and band regions by composite need
    NeedScore {
        /// Job file (JSON)
        job: PathBuf,
        /// Output GeoJSON
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Narrow features through containment, area and distance stages
    Filter {
        /// Job file (JSON)
        job: PathBuf,
        /// Output GeoJSON
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Weighted slope / road-distance suitability with exclusion zones
    Suitability {
        /// Job file (JSON)
        job: PathBuf,
        /// Output GeoTIFF
        #[arg(short, long)]
        output: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f64> =
        read_geotiff(path).with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_features(path: &Path, key_field: Option<&str>, crs: Option<CRS>) -> Result<FeatureCollection> {
    let pb = spinner("Reading features...");
    let fc = read_geojson(path, key_field, crs)
        .with_context(|| format!("Failed to read features {}", path.display()))?;
    pb.finish_and_clear();
    info!("{}: {} features", path.display(), fc.len());
    Ok(fc)
}

fn write_features(fc: &FeatureCollection, path: &Path, key_field: Option<&str>) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geojson(fc, path, key_field).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn write_raster(raster: &Raster<f64>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// An empty outcome is a reported result, not a failure
fn nothing_written(name: &str, empty: &EmptyResult) {
    warn!("{} produced no output", name);
    println!("{}: empty result from '{}' ({})", name, empty.origin, empty.reason.as_str());
}

// ─── Subcommands ────────────────────────────────────────────────────────

fn run_need_score(job_path: &Path, output: &Path) -> Result<()> {
    let job: Job<NeedScoreJob> = Job::load(job_path)?;
    let spec = &job.spec;
    let key_field = spec.key_field.as_deref();

    let mut scheme = GranularityScheme::default();
    for (tag, &len) in &spec.levels {
        scheme
            .insert(tag.as_str(), Granularity::Prefix(len))
            .with_context(|| format!("Invalid level '{}'", tag))?;
    }

    let regions = read_features(&job.resolve(&spec.regions), key_field, spec.crs())?;
    let mut indicators = Vec::with_capacity(spec.indicators.len());
    for entry in &spec.indicators {
        let path = job.resolve(&entry.path);
        let table = read_indicator_table(&path, &entry.name)
            .with_context(|| format!("Failed to read indicator '{}' from {}", entry.name, path.display()))?;
        info!("Indicator '{}': {} records", entry.name, table.len());
        indicators.push(
            IndicatorSpec::new(table)
                .at_level(entry.granularity.as_str())
                .reversed(entry.reverse),
        );
    }

    let start = Instant::now();
    let params = NeedScoreParams {
        bands: spec.bands,
        scheme,
    };
    let run = need_score(&regions, &indicators, &params).context("Need score failed")?;
    let elapsed = start.elapsed();

    for skipped in &run.skipped {
        println!("Indicator '{}' skipped: {}", skipped.name, skipped.error);
    }

    match run.outcome {
        Outcome::Complete(scored) => {
            println!("Scored {} of {} regions", scored.len(), regions.len());
            write_features(&scored, output, key_field)?;
            done("Need score", output, elapsed);
        }
        Outcome::Empty(empty) => nothing_written("Need score", &empty),
    }
    Ok(())
}

fn run_filter(job_path: &Path, output: &Path) -> Result<()> {
    let job: Job<FilterJob> = Job::load(job_path)?;
    let spec = &job.spec;
    let key_field = spec.key_field.as_deref();

    let mut stages = Vec::with_capacity(spec.stages.len());
    for entry in &spec.stages {
        let reference = match &entry.reference {
            Some(path) => Some(read_features(&job.resolve(path), entry.reference_key.as_deref(), spec.crs())?),
            None => None,
        };
        stages.push(StageSpec {
            name: entry.name.clone(),
            kind: entry.kind,
            reference,
            threshold: entry.threshold,
        });
    }
    let pipeline = FilterPipeline::from_specs(stages).context("Invalid filter pipeline")?;

    let candidates = read_features(&job.resolve(&spec.candidates), key_field, spec.crs())?;

    let start = Instant::now();
    let report = pipeline.run(&candidates).context("Filter failed")?;
    let elapsed = start.elapsed();

    println!("{:<24} {:<20} {:>8} {:>8}", "stage", "kind", "in", "out");
    for count in &report.counts {
        println!("{:<24} {:<20} {:>8} {:>8}", count.stage, count.kind, count.input, count.output);
    }

    match report.outcome {
        Outcome::Complete(survivors) => {
            write_features(&survivors, output, key_field)?;
            done("Filtered features", output, elapsed);
        }
        Outcome::Empty(empty) => nothing_written("Filter", &empty),
    }
    Ok(())
}

fn run_suitability(job_path: &Path, output: &Path) -> Result<()> {
    let job: Job<SuitabilityJob> = Job::load(job_path)?;
    let spec = &job.spec;

    let dem = read_raster(&job.resolve(&spec.dem))?;
    let crs = dem.crs().cloned();
    let roads = read_features(&job.resolve(&spec.roads), None, crs.clone())?;
    let exclusions = spec
        .exclusions
        .iter()
        .map(|path| read_features(&job.resolve(path), None, crs.clone()))
        .collect::<Result<Vec<_>>>()?;

    let start = Instant::now();
    let slope_layer = slope(&dem, spec.slope.clone()).context("Slope failed")?;
    let distance_layer = match distance_to_features(&dem, &roads).context("Distance to roads failed")? {
        Outcome::Complete(raster) => raster,
        Outcome::Empty(empty) => {
            nothing_written("Suitability", &empty);
            return Ok(());
        }
    };

    let mut slope_input = SuitabilityLayer::new("slope", slope_layer, spec.slope_weight);
    slope_input.invert = spec.invert_slope;
    let mut distance_input = SuitabilityLayer::new("road_distance", distance_layer, spec.distance_weight);
    distance_input.invert = spec.invert_distance;

    let mut params = SuitabilityParams::default();
    if let Some(tolerance) = spec.tolerance {
        params.tolerance = tolerance;
    }

    let outcome = weighted_suitability(&[slope_input, distance_input], &exclusions, &params)
        .context("Suitability failed")?;
    let elapsed = start.elapsed();

    match outcome {
        Outcome::Complete(field) => {
            let stats = field.statistics();
            println!(
                "Suitable cells: {} of {} (no-data or excluded: {})",
                stats.valid_count,
                field.len(),
                stats.nodata_count
            );
            write_raster(&field, output)?;
            done("Suitability", output, elapsed);
        }
        Outcome::Empty(empty) => nothing_written("Suitability", &empty),
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                let kind = if crs.is_geographic() { "geographic" } else { "projected" };
                println!("CRS: {} ({})", crs, kind);
            }
            if let Some(nd) = raster.nodata() {
                println!("NoData: {}", nd);
            }
            if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
                println!("Min: {:.4}, Max: {:.4}, Mean: {:.4}", min, max, mean);
            }
            println!("Valid cells: {} ({} no-data)", stats.valid_count, stats.nodata_count);
        }
        Commands::NeedScore { job, output } => run_need_score(&job, &output)?,
        Commands::Filter { job, output } => run_filter(&job, &output)?,
        Commands::Suitability { job, output } => run_suitability(&job, &output)?,
    }

    Ok(())
}
