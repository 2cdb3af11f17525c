use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pixfix as px;

/// A noisy image with a centered square hole covering a quarter of its area
fn holed_image(dim: u32) -> (px::image::RgbImage, px::Mask) {
    let img = px::image::RgbImage::from_fn(dim, dim, |x, y| {
        px::image::Rgb([
            (x * 13 + y * 7) as u8,
            (x * y) as u8,
            (255 - (x + y) % 256) as u8,
        ])
    });

    let lo = dim / 4;
    let hi = dim - dim / 4;
    let mask = px::Mask::from_fn(px::Dims::square(dim), |x, y| {
        x >= lo && x < hi && y >= lo && y < hi
    });

    (img, mask)
}

fn inpaint(c: &mut Criterion) {
    static DIM: u32 = 25;

    let mut group = c.benchmark_group("inpaint");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let (img, mask) = holed_image(*dim);
        let params = px::InpaintParams::default();

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            b.iter(|| black_box(px::inpaint(&img, &mask, &params, None).unwrap()));
        });
    }
    group.finish();
}

fn bilateral(c: &mut Criterion) {
    static DIM: u32 = 50;

    let mut group = c.benchmark_group("bilateral");
    group.sample_size(10);

    let filter = px::BilateralFilter::default();
    for dim in [DIM, 2 * DIM, 4 * DIM].iter() {
        let (img, _) = holed_image(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, _| {
            b.iter(|| black_box(px::Smoother::smooth(&filter, &img)));
        });
    }
    group.finish();
}

fn treat(c: &mut Criterion) {
    // The reference is a quarter of the target resolution, so the mask is
    // both scaled and grown
    let reference = px::image::RgbImage::from_fn(25, 25, |x, y| {
        if (10..15).contains(&x) && (10..15).contains(&y) {
            px::MARKER
        } else {
            px::image::Rgb([0, 0, 0])
        }
    });

    let session = px::Session::builder()
        .reference(reference)
        .strength(0.5)
        .build()
        .unwrap();

    let (target, _) = holed_image(100);

    let mut group = c.benchmark_group("treat");
    group.sample_size(10);
    group.bench_function("100x100", |b| {
        b.iter(|| black_box(session.treat(target.clone()).unwrap()));
    });
    group.finish();
}

criterion_group!(benches, inpaint, bilateral, treat);
criterion_main!(benches);
