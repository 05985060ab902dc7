//! Benchmarks for the fusion engines

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::{polygon, LineString};
use geofuse_algorithms::prelude::*;

fn regions(n: usize) -> FeatureCollection {
    FeatureCollection::from_features(
        (0..n).map(|i| {
            let x = (i % 100) as f64 * 10.0;
            let y = (i / 100) as f64 * 10.0;
            Feature::new(
                format!("{:04}{:03}", i / 100, i % 100),
                polygon![(x: x, y: y), (x: x + 8.0, y: y), (x: x + 8.0, y: y + 8.0), (x: x, y: y + 8.0)],
            )
        }),
        None,
    )
    .unwrap()
}

fn bench_need_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("need_score");

    for n in [1_000usize, 10_000].iter() {
        let fc = regions(*n);
        let fine = IndicatorTable::single_period(
            "density",
            2023,
            fc.iter().enumerate().map(|(i, f)| (f.id.clone(), ((i * 37) % 1000) as f64)),
        );
        let coarse = IndicatorTable::single_period(
            "unemployment",
            2022,
            (0..(n / 100).max(1)).map(|r| (format!("{:04}", r), ((r * 13) % 29) as f64)),
        );
        let indicators = vec![
            IndicatorSpec::new(fine),
            IndicatorSpec::new(coarse).at_level("region"),
        ];
        let params = NeedScoreParams {
            scheme: GranularityScheme::default()
                .with_level("region", Granularity::Prefix(4))
                .unwrap(),
            ..Default::default()
        };

        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, _| {
            b.iter(|| need_score(black_box(&fc), &indicators, &params).unwrap())
        });
    }

    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let candidates = regions(5_000);
    let highway = FeatureCollection::from_features(
        [Feature::new("h", LineString::from(vec![(500.0, -10.0), (500.0, 600.0)]))],
        None,
    )
    .unwrap();
    let pipeline = FilterPipeline::from_specs(vec![
        StageSpec::area("area", 50.0),
        StageSpec::distance("highway", highway, 100.0),
    ])
    .unwrap();

    c.bench_function("filter_area_distance_5000", |b| {
        b.iter(|| pipeline.run(black_box(&candidates)).unwrap())
    });
}

fn bench_suitability(c: &mut Criterion) {
    let mut group = c.benchmark_group("suitability");

    for size in [256usize, 512].iter() {
        let mut dem = Raster::new(*size, *size);
        dem.set_transform(GeoTransform::new(0.0, *size as f64, 1.0, -1.0));
        for row in 0..*size {
            for col in 0..*size {
                let variation = ((row * 7 + col * 13) % 100) as f64 / 10.0;
                dem.set(row, col, (row + col) as f64 + variation).unwrap();
            }
        }
        let roads = FeatureCollection::from_features(
            [Feature::new("r", LineString::from(vec![(0.0, 0.0), (*size as f64, *size as f64)]))],
            None,
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let slope = slope(black_box(&dem), SlopeParams::default()).unwrap();
                let distance = distance_to_features(&dem, &roads).unwrap().complete().unwrap();
                let layers = vec![
                    SuitabilityLayer::new("slope", slope, 0.6).inverted(),
                    SuitabilityLayer::new("roads", distance, 0.4).inverted(),
                ];
                weighted_suitability(&layers, &[], &SuitabilityParams::default()).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_need_score, bench_filter, bench_suitability);
criterion_main!(benches);
