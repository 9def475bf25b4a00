use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array3;
use ndvi_timeseries::models::{GeoTransform, NdviRaster, PixelType, RasterImage, RasterMeta};
use ndvi_timeseries::processors::{CloudFilter, NdviCalculator, TemporalFilter};

const NODATA: i32 = 32767;

// Create a synthetic 13-band scene with a reflectance gradient and patchy clouds
fn create_test_scene(size: usize, seed: usize) -> RasterImage {
    let data = Array3::from_shape_fn((13, size, size), |(band, row, col)| match band {
        12 => ((row * 7 + col * 13 + seed * 31) % 100) as i32,
        7 => 1500 + ((row + col + seed) % 40) as i32 * 50,
        _ => 800 + ((row * col + band) % 20) as i32 * 10,
    });
    let meta = RasterMeta::new(size, size, 13, PixelType::U16)
        .with_transform(GeoTransform::new(450000.0, 3980000.0, 10.0, -10.0))
        .with_epsg(Some(32633));
    RasterImage::new(data, meta).unwrap()
}

fn create_ndvi_series(size: usize, dates: usize) -> Vec<NdviRaster> {
    let calculator = NdviCalculator::new(3, 7, NODATA);
    let cloud_filter = CloudFilter::new(50, 12, NODATA);

    (0..dates)
        .map(|seed| {
            let masked = cloud_filter.apply(&create_test_scene(size, seed)).unwrap();
            calculator.compute(&masked).unwrap()
        })
        .collect()
}

fn benchmark_cloud_filter(c: &mut Criterion) {
    let scene = create_test_scene(200, 0);
    let filter = CloudFilter::new(50, 12, NODATA);

    c.bench_function("cloud_filter", |b| {
        b.iter(|| black_box(filter.apply(&scene).unwrap()))
    });
}

fn benchmark_ndvi_calculator(c: &mut Criterion) {
    let scene = create_test_scene(200, 0);
    let calculator = NdviCalculator::new(3, 7, NODATA);

    c.bench_function("ndvi_calculator", |b| {
        b.iter(|| black_box(calculator.compute(&scene).unwrap().valid_count()))
    });
}

fn benchmark_temporal_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporal_filter_by_dates");
    let filter = TemporalFilter::new(1000, 2000);

    for &dates in &[2, 5, 12] {
        let series = create_ndvi_series(200, dates);
        group.bench_with_input(BenchmarkId::new("dates", dates), &series, |b, series| {
            b.iter(|| black_box(filter.apply(series).unwrap().len()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_cloud_filter,
    benchmark_ndvi_calculator,
    benchmark_temporal_filter
);
criterion_main!(benches);
