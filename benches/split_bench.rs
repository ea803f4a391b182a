use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use geo::Point;
use geotable::geometry::LatLngRect;
use geotable::{Covering, GeohashRange};

fn bench_try_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("try_split");

    // A leaf cell range near 59°N, the worst case grows with length.
    let range = GeohashRange::new(5177531549489041509, 5177531549489051509);

    for length in [2usize, 6, 9, 12] {
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &len| {
            b.iter(|| black_box(range.try_split(len)));
        });
    }

    group.finish();
}

fn bench_covering_ranges(c: &mut Criterion) {
    let mut group = c.benchmark_group("covering_ranges");

    for radius in [10.0, 1_000.0, 100_000.0] {
        let rect = LatLngRect::from_radius(&Point::new(0.0, 59.0), radius).unwrap();
        let covering = Covering::of_rect(&rect);

        group.bench_with_input(
            BenchmarkId::from_parameter(radius as u64),
            &covering,
            |b, covering| {
                b.iter(|| black_box(covering.geohash_ranges(6)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_try_split, bench_covering_ranges);
criterion_main!(benches);
