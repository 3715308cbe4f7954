use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use preprocess::{CpuFrameFilter, FilterKind, FrameFilter, to_blob};
use schema::Frame;

/// Gradient frame so filters have real work to do
fn create_test_frame(width: u32, height: u32) -> Frame {
    Frame::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_filter");

    let resolutions = [(640, 480), (1280, 720), (1920, 1080)];
    let filter = CpuFrameFilter::default();

    for (width, height) in resolutions.iter() {
        let frame = create_test_frame(*width, *height);

        for kind in [
            FilterKind::Gaussian,
            FilterKind::Median,
            FilterKind::Mean,
            FilterKind::None,
        ] {
            group.bench_with_input(
                BenchmarkId::new(kind.as_str(), format!("{}x{}", width, height)),
                &frame,
                |b, frame| {
                    b.iter(|| filter.apply(black_box(frame), black_box(kind)).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn benchmark_blob(c: &mut Criterion) {
    let frame = create_test_frame(416, 416);

    c.bench_function("to_blob_416", |b| {
        b.iter(|| to_blob(black_box(&frame)));
    });
}

criterion_group!(benches, benchmark_filters, benchmark_blob);
criterion_main!(benches);
