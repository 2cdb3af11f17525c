use pixfix as px;
use px::image::{Rgb, RgbImage};
use std::path::Path;

const GRAY: Rgb<u8> = Rgb([120, 110, 100]);

/// A dark reference with a bright square marker at `(x0..x0 + side)` in both
/// axes
fn reference(size: u32, x0: u32, side: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let inside = |v: u32| v >= x0 && v < x0 + side;
        if inside(x) && inside(y) {
            px::MARKER
        } else {
            Rgb([3, 3, 3])
        }
    })
}

/// A flat target at `scale` times the reference, carrying the marker
fn target(size: u32, x0: u32, side: u32, scale: u32) -> RgbImage {
    let r = reference(size, x0, side);
    RgbImage::from_fn(size * scale, size * scale, |x, y| {
        if *r.get_pixel(x / scale, y / scale) == px::MARKER {
            px::MARKER
        } else {
            GRAY
        }
    })
}

fn save(img: &RgbImage, path: &Path) {
    img.save(path).unwrap();
}

#[test]
fn treats_a_target_at_a_higher_resolution() {
    let session = px::Session::builder()
        .reference(reference(12, 4, 3))
        .strength(0.5)
        .build()
        .unwrap();

    let treated = session.treat(target(12, 4, 3, 3)).unwrap();

    // scale 3 and strength 0.5 grow the 9x9 direct block by 2 on each side
    assert_eq!(treated.mask().count(), 13 * 13);
    assert_eq!(treated.stats().unfilled, 0);
    for pixel in treated.as_ref().pixels() {
        assert_eq!(*pixel, GRAY);
    }
}

#[test]
fn stages_compose_like_the_session() {
    let reference = reference(10, 2, 4);
    let target = target(10, 2, 4, 2);

    let mask = px::extract_mask(&reference, 30);
    let mapped = px::map_mask(&mask, px::Dims::of(&target), 0.0).unwrap();
    assert_eq!(mapped.count(), 64);

    let inpainted = px::inpaint(&target, &mapped, &px::InpaintParams::default(), None).unwrap();
    let mut image = inpainted.image;
    let smoothed = px::Smoother::smooth(&px::BilateralFilter::default(), &image);
    px::blend_repaired(&mut image, &smoothed, &mapped).unwrap();

    let session = px::Session::builder()
        .reference(reference)
        .strength(0.0)
        .build()
        .unwrap();
    let treated = session.treat(target).unwrap();

    assert_eq!(treated.mask(), &mapped);
    assert_eq!(treated.into_image(), image);
}

#[test]
fn batch_over_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path();
    let out_dir = input.join("treated");

    save(&reference(8, 2, 2), &input.join("Ref.png"));
    save(&target(8, 2, 2, 1), &input.join("a.png"));
    save(&target(8, 2, 2, 2), &input.join("b.BMP"));
    save(&target(8, 2, 2, 4), &input.join("c.png"));
    std::fs::write(input.join("broken.png"), b"not an image").unwrap();
    std::fs::write(input.join("readme.txt"), b"ignored").unwrap();

    let reference_path = px::find_reference(input).unwrap();
    assert_eq!(reference_path, input.join("Ref.png"));

    let session = px::Session::builder()
        .reference(&reference_path)
        .max_thread_count(2)
        .build()
        .unwrap();

    let viz = session.save_visualization(&out_dir, "Ref").unwrap();
    assert!(viz.exists());

    let jobs: Vec<_> = px::collect_targets(input, &reference_path)
        .unwrap()
        .into_iter()
        .map(|path| px::BatchJob::in_dir(path, &out_dir))
        .collect();
    assert_eq!(jobs.len(), 4);

    let seen = std::sync::atomic::AtomicUsize::new(0);
    let progress = |_: &px::BatchOutcome, done: usize, total: usize| {
        assert!(done <= total);
        seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    };

    let outcomes = session.treat_batch(&jobs, Some(&progress)).unwrap();

    assert_eq!(seen.into_inner(), 4);
    let order: Vec<_> = outcomes.iter().map(|o| o.job.input.clone()).collect();
    let expected: Vec<_> = jobs.iter().map(|j| j.input.clone()).collect();
    assert_eq!(order, expected);

    for outcome in &outcomes {
        let name = outcome.job.input.file_name().unwrap().to_str().unwrap();
        if name == "broken.png" {
            assert!(matches!(outcome.result, Err(px::Error::Image(_))));
            assert!(!outcome.job.output.exists());
        } else {
            let stats = outcome.result.as_ref().unwrap();
            assert_eq!(stats.unfilled, 0);

            let saved = px::load_image(px::ImageSource::from_path(&outcome.job.output)).unwrap();
            let original =
                px::load_image(px::ImageSource::from_path(&outcome.job.input)).unwrap();
            assert_eq!(saved.dimensions(), original.dimensions());
            for pixel in saved.pixels() {
                assert_eq!(*pixel, GRAY);
            }
        }
    }
}

#[test]
fn empty_target_is_reported() {
    let session = px::Session::builder()
        .reference(reference(4, 1, 1))
        .build()
        .unwrap();

    assert!(matches!(
        session.treat(RgbImage::new(4, 0)),
        Err(px::Error::EmptyImage(_))
    ));
}
