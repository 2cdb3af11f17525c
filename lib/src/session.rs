use crate::*;
use log::info;
use std::path::Path;

/// JPEG quality used for the mask visualization.
const VISUALIZATION_QUALITY: u8 = 100;
/// JPEG quality used for treated images saved as `.jpg`/`.jpeg`.
const OUTPUT_JPEG_QUALITY: u8 = 95;

/// A treatment session bound to one reference mask.
///
/// The session derives the mask from the reference image once, every call
/// to `treat` then maps that mask onto the target, fills the masked area and
/// smooths it. A session holds no per-image state, so it can treat any
/// number of images, including from several threads at once.
///
/// # Example
/// ```no_run
/// let session = pixfix::Session::builder()
///     .reference(&"original/ref.png")
///     .tolerance(30)
///     .strength(0.5)
///     .build().expect("failed to build session");
///
/// let treated = session.treat(&"original/1.png").expect("failed to treat image");
/// treated.save("treated/1.png").expect("failed to save image");
/// ```
pub struct Session {
    reference_mask: Mask,
    smoother: Box<dyn Smoother>,
    params: Parameters,
}

impl Session {
    /// Creates a new session with default parameters.
    pub fn builder<'a>() -> SessionBuilder<'a> {
        SessionBuilder::default()
    }

    /// The mask derived from the reference image
    pub fn reference_mask(&self) -> &Mask {
        &self.reference_mask
    }

    /// The dimensions of the reference image
    pub fn reference_dims(&self) -> Dims {
        self.reference_mask.dims()
    }

    /// The reference mask rendered green on black
    pub fn visualization(&self) -> image::RgbImage {
        visualize(&self.reference_mask)
    }

    /// Saves the visualization as `<stem>.jpg` in `dir` and returns its path
    pub fn save_visualization<P: AsRef<Path>>(
        &self,
        dir: P,
        stem: &str,
    ) -> Result<std::path::PathBuf, Error> {
        let path = dir.as_ref().join(format!("{}.jpg", stem));
        save_jpeg(&self.visualization(), &path, VISUALIZATION_QUALITY)?;
        info!("saved reference mask to {}", path.display());
        Ok(path)
    }

    /// Treats a single image.
    pub fn treat<'a, I: Into<ImageSource<'a>>>(&self, target: I) -> Result<TreatedImage, Error> {
        self.treat_with_progress(target, None)
    }

    /// Treats a single image, reporting every inpainting pass to `progress`.
    pub fn treat_with_progress<'a, I: Into<ImageSource<'a>>>(
        &self,
        target: I,
        progress: Option<&mut dyn InpaintProgress>,
    ) -> Result<TreatedImage, Error> {
        let img = load_image(target.into())?;
        let dims = Dims::of(&img);

        let mask = map_mask(&self.reference_mask, dims, self.params.strength)?;
        let Inpainted { mut image, stats } =
            inpaint(&img, &mask, &self.params.to_inpaint_params(), progress)?;

        if !mask.is_clear() {
            let smoothed = self.smoother.smooth(&image);
            blend_repaired(&mut image, &smoothed, &mask)?;
        }

        Ok(TreatedImage { image, mask, stats })
    }

    pub(crate) fn thread_count(&self) -> usize {
        self.params.thread_count()
    }
}

/// Builds a session by setting parameters and the reference image, calling
/// `build` checks the parameters and derives the reference mask.
#[derive(Default)]
pub struct SessionBuilder<'a> {
    reference: Option<ImageSource<'a>>,
    smoother: Option<Box<dyn Smoother>>,
    params: Parameters,
}

impl<'a> SessionBuilder<'a> {
    /// Creates a new `SessionBuilder`, can also be created via
    /// `Session::builder()`
    pub fn new() -> Self {
        Self::default()
    }

    /// The image the mask is derived from. Required.
    pub fn reference<I: Into<ImageSource<'a>>>(mut self, reference: I) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Pixels of the reference with any channel strictly above this value
    /// are masked.
    ///
    /// Default: 30
    pub fn tolerance(mut self, tolerance: u8) -> Self {
        self.params.tolerance = tolerance;
        self
    }

    /// How much the mask is grown when mapped onto a target. 0 maps the mask
    /// exactly, anything above grows it by at least one pixel, and more on
    /// targets larger than the reference.
    ///
    /// Default: 0.5
    pub fn strength(mut self, strength: f32) -> Self {
        self.params.strength = strength;
        self
    }

    /// The number of fill passes before the fallback pass.
    ///
    /// Default: 100
    pub fn max_passes(mut self, passes: u32) -> Self {
        self.params.max_passes = passes;
        self
    }

    /// The kernel size of the first fill pass.
    ///
    /// Default: 2
    pub fn start_ksize(mut self, ksize: u32) -> Self {
        self.params.start_ksize = ksize;
        self
    }

    /// Parameters of the bilateral filter applied to the repaired area.
    /// Ignored if a custom `smoother` is set.
    pub fn bilateral(mut self, filter: BilateralFilter) -> Self {
        self.params.bilateral = filter;
        self
    }

    /// Replaces the bilateral filter with another smoothing operator
    pub fn smoother<S: Smoother + 'static>(mut self, smoother: S) -> Self {
        self.smoother = Some(Box::new(smoother));
        self
    }

    /// Controls the maximum number of images treated in parallel by
    /// `Session::treat_batch`.
    ///
    /// Default: The number of logical cores on this system.
    pub fn max_thread_count(mut self, count: usize) -> Self {
        self.params.max_thread_count = Some(count);
        self
    }

    /// Creates a `Session`, or returns an error if invalid parameters or
    /// an unreadable reference image were specified.
    pub fn build(self) -> Result<Session, Error> {
        self.check_parameters_validity()?;

        let reference = self.reference.ok_or(Error::NoReference)?;
        let reference = load_image(reference)?;

        let dims = Dims::of(&reference);
        if dims.is_empty() {
            return Err(Error::EmptyImage(dims));
        }

        let reference_mask = extract_mask(&reference, self.params.tolerance);

        let smoother: Box<dyn Smoother> = match self.smoother {
            Some(smoother) => smoother,
            None => Box::new(self.params.bilateral),
        };

        Ok(Session {
            reference_mask,
            smoother,
            params: self.params,
        })
    }

    fn check_parameters_validity(&self) -> Result<(), Error> {
        errors::check_range("strength", self.params.strength, 0.0, f32::MAX)?;

        if self.params.max_passes == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: u32::MAX as f32,
                value: 0.0,
                name: "max-passes",
            }));
        }

        if self.params.start_ksize == 0 {
            return Err(Error::InvalidRange(errors::InvalidRange {
                min: 1.0,
                max: u32::MAX as f32,
                value: 0.0,
                name: "start-ksize",
            }));
        }

        if let Some(max_count) = self.params.max_thread_count {
            if max_count == 0 {
                return Err(Error::InvalidRange(errors::InvalidRange {
                    min: 1.0,
                    max: 1024.0,
                    value: max_count as f32,
                    name: "max-thread-count",
                }));
            }
        }

        if self.smoother.is_none() {
            self.params.bilateral.check_validity()?;
        }

        Ok(())
    }
}

/// An image treated by `Session::treat`
pub struct TreatedImage {
    image: image::RgbImage,
    mask: Mask,
    stats: InpaintStats,
}

impl TreatedImage {
    /// Saves the treated image to the specified path, the format is inferred
    /// from the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();

        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("jpg") | Some("jpeg") => save_jpeg(&self.image, path, OUTPUT_JPEG_QUALITY),
            Some(_) if is_supported_image(path) => {
                if let Some(parent_path) = path.parent() {
                    std::fs::create_dir_all(parent_path)?;
                }

                self.image.save(path)?;
                Ok(())
            }
            Some(other) => Err(Error::UnsupportedOutputFormat(other.to_owned())),
            None => Err(Error::UnsupportedOutputFormat(String::new())),
        }
    }

    /// The mask the image was treated with, at the image's resolution
    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn stats(&self) -> &InpaintStats {
        &self.stats
    }

    /// Returns the treated image
    pub fn into_image(self) -> image::RgbImage {
        self.image
    }
}

impl AsRef<image::RgbImage> for TreatedImage {
    fn as_ref(&self) -> &image::RgbImage {
        &self.image
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn reference() -> image::RgbImage {
        // a bright 2x2 marker on a dark 8x8 reference
        let mut img = image::RgbImage::from_pixel(8, 8, image::Rgb([5, 5, 5]));
        for y in 3..5 {
            for x in 3..5 {
                img.put_pixel(x, y, MARKER);
            }
        }
        img
    }

    #[test]
    fn builder_requires_a_reference() {
        assert!(matches!(Session::builder().build(), Err(Error::NoReference)));
    }

    #[test]
    fn builder_checks_ranges() {
        let bad = [
            Session::builder().reference(reference()).strength(-1.0),
            Session::builder().reference(reference()).max_passes(0),
            Session::builder().reference(reference()).start_ksize(0),
            Session::builder().reference(reference()).max_thread_count(0),
            Session::builder()
                .reference(reference())
                .bilateral(BilateralFilter::new(9, 0.0, 75.0)),
        ];

        for builder in bad {
            assert!(matches!(builder.build(), Err(Error::InvalidRange(_))));
        }
    }

    #[test]
    fn empty_reference_is_rejected() {
        let result = Session::builder()
            .reference(image::RgbImage::new(0, 4))
            .build();
        assert!(matches!(result, Err(Error::EmptyImage(_))));
    }

    #[test]
    fn reference_mask_follows_tolerance() {
        let session = Session::builder().reference(reference()).build().unwrap();
        assert_eq!(session.reference_mask().count(), 4);
        assert_eq!(session.reference_dims(), Dims::square(8));

        // nothing in the reference is above 255
        let session = Session::builder()
            .reference(reference())
            .tolerance(255)
            .build()
            .unwrap();
        assert!(session.reference_mask().is_clear());

        // everything is above 4
        let session = Session::builder()
            .reference(reference())
            .tolerance(4)
            .build()
            .unwrap();
        assert_eq!(session.reference_mask().count(), 64);
    }

    #[test]
    fn treat_restores_a_flat_target() {
        let session = Session::builder()
            .reference(reference())
            .strength(0.0)
            .build()
            .unwrap();

        // twice the reference resolution, with the marker scaled along
        let gray = image::Rgb([128, 128, 128]);
        let target = image::RgbImage::from_fn(16, 16, |x, y| {
            if (6..10).contains(&x) && (6..10).contains(&y) {
                MARKER
            } else {
                gray
            }
        });

        let treated = session.treat(target).unwrap();

        assert_eq!(treated.mask().count(), 16);
        assert_eq!(treated.stats().unfilled, 0);
        for px in treated.as_ref().pixels() {
            assert_eq!(*px, gray);
        }
    }

    #[test]
    fn smoothing_stays_inside_the_mask() {
        let session = Session::builder()
            .reference(reference())
            .strength(0.0)
            .smoother(|img: &image::RgbImage| {
                image::RgbImage::from_pixel(img.width(), img.height(), image::Rgb([1, 2, 3]))
            })
            .build()
            .unwrap();

        let target =
            image::RgbImage::from_fn(8, 8, |x, y| image::Rgb([x as u8 * 10, y as u8 * 10, 77]));
        let treated = session.treat(target.clone()).unwrap();

        for (x, y, px) in treated.as_ref().enumerate_pixels() {
            if treated.mask().get(x, y) {
                assert_eq!(*px, image::Rgb([1, 2, 3]));
            } else {
                assert_eq!(px, target.get_pixel(x, y));
            }
        }
    }

    #[test]
    fn save_picks_format_from_extension() {
        let session = Session::builder().reference(reference()).build().unwrap();
        let treated = session.treat(reference()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        treated.save(dir.path().join("out").join("a.png")).unwrap();
        treated.save(dir.path().join("b.JPG")).unwrap();
        assert!(dir.path().join("out").join("a.png").exists());
        assert!(dir.path().join("b.JPG").exists());

        assert!(matches!(
            treated.save(dir.path().join("c.webp")),
            Err(Error::UnsupportedOutputFormat(_))
        ));

        let viz = session.save_visualization(dir.path(), "ref").unwrap();
        assert_eq!(viz, dir.path().join("ref.jpg"));
        let loaded = load_image(ImageSource::from_path(&viz)).unwrap();
        assert_eq!(loaded.dimensions(), (8, 8));
    }
}
