use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geoscan::{GeoCoordinate, GeoHash, KeyRange, MemoryRangeStore, QueryConfig, QueryPlan, RangeStore};

fn coord(lat: f64, lng: f64) -> GeoCoordinate {
    GeoCoordinate::new(lat, lng).unwrap()
}

fn benchmark_geohash(c: &mut Criterion) {
    let mut group = c.benchmark_group("geohash");
    let point = coord(37.7749, -122.4194);

    for precision in [5, 10, 12] {
        group.bench_with_input(
            BenchmarkId::new("encode", precision),
            &precision,
            |b, &precision| {
                b.iter(|| GeoHash::encode(black_box(&point), precision).unwrap());
            },
        );
    }

    let hash = GeoHash::encode(&point, 10).unwrap();
    group.bench_function("neighbors", |b| {
        b.iter(|| black_box(&hash).neighbors().unwrap());
    });

    group.finish();
}

fn benchmark_query_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_plan");
    let config = QueryConfig::default();

    let centers = [
        ("equator", coord(0.0, 0.0)),
        ("mid_latitude", coord(37.7749, -122.4194)),
        ("arctic", coord(78.2232, 15.6267)),
        ("antimeridian", coord(-16.5, 179.99)),
    ];

    for (name, center) in centers {
        for radius in [100.0, 1_000.0, 50_000.0] {
            group.bench_with_input(
                BenchmarkId::new(name, radius as u64),
                &radius,
                |b, &radius| {
                    b.iter(|| QueryPlan::new(black_box(&center), radius, &config).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn benchmark_range_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_range_reads");

    let store = MemoryRangeStore::new();
    for i in 0..100 {
        for j in 0..100 {
            let point = coord(37.70 + i as f64 * 0.001, -122.50 + j as f64 * 0.001);
            store.set_location(format!("p{}:{}", i, j), point).unwrap();
        }
    }

    let config = QueryConfig::default();
    let plan = QueryPlan::new(&coord(37.75, -122.45), 1_000.0, &config).unwrap();
    let ranges: Vec<KeyRange> = plan.ranges().to_vec();

    group.bench_function("plan_1km", |b| {
        b.iter(|| {
            let mut total = 0;
            for range in &ranges {
                let read = store.query_range("g", black_box(range), None);
                total += futures::executor::block_on(read).unwrap().len();
            }
            total
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_geohash,
    benchmark_query_plan,
    benchmark_range_reads
);
criterion_main!(benches);
