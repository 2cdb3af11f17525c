use crate::Dims;
use log::info;

/// Color written on masked pixels by [`visualize`].
pub const MARKER: image::Rgb<u8> = image::Rgb([0, 255, 0]);

/// A per-pixel repair flag, `true` marks a pixel that has to be filled.
///
/// A mask always has the dimensions of the image it gates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    dims: Dims,
    flags: Vec<bool>,
}

impl Mask {
    /// Creates a mask with no masked pixels
    pub fn new(dims: Dims) -> Self {
        Self {
            dims,
            flags: vec![false; dims.area()],
        }
    }

    /// Creates a mask by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F: FnMut(u32, u32) -> bool>(dims: Dims, mut f: F) -> Self {
        let mut flags = Vec::with_capacity(dims.area());
        for y in 0..dims.height {
            for x in 0..dims.width {
                flags.push(f(x, y));
            }
        }

        Self { dims, flags }
    }

    #[inline]
    pub fn dims(&self) -> Dims {
        self.dims
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.dims.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.dims.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        self.flags[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, masked: bool) {
        let idx = self.index(x, y);
        self.flags[idx] = masked;
    }

    /// Number of masked pixels
    pub fn count(&self) -> usize {
        self.flags.iter().filter(|m| **m).count()
    }

    /// True if no pixel is masked
    pub fn is_clear(&self) -> bool {
        !self.flags.iter().any(|m| *m)
    }

    /// Coordinates of every masked pixel, in row-major order
    pub fn masked_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.dims.width as usize;
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, m)| **m)
            .map(move |(i, _)| ((i % width) as u32, (i / width) as u32))
    }

    /// True if every pixel masked in `self` is also masked in `other`
    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.dims == other.dims
            && self
                .flags
                .iter()
                .zip(other.flags.iter())
                .all(|(a, b)| !*a || *b)
    }

    #[inline]
    pub(crate) fn flags(&self) -> &[bool] {
        &self.flags
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.dims.width as usize + x as usize
    }
}

/// Masks every pixel that has at least one channel strictly brighter than
/// `tolerance`.
pub fn extract_mask(img: &image::RgbImage, tolerance: u8) -> Mask {
    let mask = Mask::from_fn(Dims::of(img), |x, y| {
        img.get_pixel(x, y).0.iter().any(|c| *c > tolerance)
    });

    info!(
        "reference mask: {} of {} pixels above tolerance {}",
        mask.count(),
        mask.dims().area(),
        tolerance
    );

    mask
}

/// Renders a mask as an image, [`MARKER`] green on masked pixels and black
/// everywhere else.
pub fn visualize(mask: &Mask) -> image::RgbImage {
    let black = image::Rgb([0, 0, 0]);
    image::RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        if mask.get(x, y) {
            MARKER
        } else {
            black
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bright_border_dark_center() {
        let mut img = image::RgbImage::from_pixel(3, 3, image::Rgb([100, 100, 100]));
        img.put_pixel(1, 1, image::Rgb([0, 0, 0]));

        let mask = extract_mask(&img, 30);

        assert_eq!(mask.count(), 8);
        assert!(!mask.get(1, 1));
        for (x, y) in [(0, 0), (1, 0), (2, 0), (0, 1), (2, 1), (0, 2), (1, 2), (2, 2)] {
            assert!(mask.get(x, y), "({}, {}) should be masked", x, y);
        }
    }

    #[test]
    fn any_single_channel_is_enough() {
        let mut img = image::RgbImage::new(3, 1);
        img.put_pixel(0, 0, image::Rgb([31, 0, 0]));
        img.put_pixel(1, 0, image::Rgb([0, 0, 31]));
        img.put_pixel(2, 0, image::Rgb([30, 30, 30]));

        let mask = extract_mask(&img, 30);

        assert!(mask.get(0, 0));
        assert!(mask.get(1, 0));
        // strictly greater than the tolerance
        assert!(!mask.get(2, 0));
    }

    #[test]
    fn visualization_is_marker_or_black() {
        let mut mask = Mask::new(Dims::new(4, 2));
        mask.set(1, 0, true);
        mask.set(3, 1, true);

        let viz = visualize(&mask);

        assert_eq!(viz.dimensions(), (4, 2));
        for (x, y, px) in viz.enumerate_pixels() {
            if mask.get(x, y) {
                assert_eq!(*px, MARKER);
            } else {
                assert_eq!(*px, image::Rgb([0, 0, 0]));
            }
        }
    }

    #[test]
    fn masked_pixels_are_row_major() {
        let mut mask = Mask::new(Dims::new(3, 3));
        mask.set(2, 0, true);
        mask.set(0, 2, true);
        mask.set(1, 1, true);

        let coords: Vec<_> = mask.masked_pixels().collect();
        assert_eq!(coords, vec![(2, 0), (1, 1), (0, 2)]);
        assert!(!mask.is_clear());
        assert!(Mask::new(Dims::new(3, 3)).is_clear());
    }
}
