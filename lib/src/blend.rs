use crate::{errors, Dims, Error, Mask};

/// An image-wide smoothing operator. The output must have the dimensions of
/// the input.
pub trait Smoother: Send + Sync {
    fn smooth(&self, img: &image::RgbImage) -> image::RgbImage;
}

impl<F> Smoother for F
where
    F: Fn(&image::RgbImage) -> image::RgbImage + Send + Sync,
{
    fn smooth(&self, img: &image::RgbImage) -> image::RgbImage {
        self(img)
    }
}

/// Edge-preserving bilateral filter.
///
/// Every output pixel is the average of its circular neighborhood, each
/// neighbor weighted by a gaussian of its distance and a gaussian of its
/// color difference (the sum of the absolute per channel differences).
/// Borders are reflected without repeating the edge pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BilateralFilter {
    /// Diameter of the neighborhood, if 0 or less it is derived from
    /// `sigma_space`.
    ///
    /// Default: 9
    pub diameter: i32,
    /// Default: 75.0
    pub sigma_color: f32,
    /// Default: 75.0
    pub sigma_space: f32,
}

const MAX_DIAMETER: i32 = 255;
const MAX_RADIUS: i32 = MAX_DIAMETER / 2;

impl Default for BilateralFilter {
    fn default() -> Self {
        Self {
            diameter: 9,
            sigma_color: 75.0,
            sigma_space: 75.0,
        }
    }
}

impl BilateralFilter {
    pub fn new(diameter: i32, sigma_color: f32, sigma_space: f32) -> Self {
        Self {
            diameter,
            sigma_color,
            sigma_space,
        }
    }

    /// The radius of the neighborhood, never more than that of the largest
    /// accepted diameter.
    fn radius(&self) -> i32 {
        let radius = if self.diameter <= 0 {
            (self.sigma_space * 1.5).round().min(MAX_RADIUS as f32) as i32
        } else {
            self.diameter / 2
        };

        radius.max(1).min(MAX_RADIUS)
    }

    pub(crate) fn check_validity(&self) -> Result<(), Error> {
        errors::check_range("sigma-color", self.sigma_color, f32::EPSILON, f32::MAX)?;
        errors::check_range("sigma-space", self.sigma_space, f32::EPSILON, f32::MAX)?;
        errors::check_range(
            "bilateral-diameter",
            self.diameter as f32,
            -1.0,
            MAX_DIAMETER as f32,
        )
    }
}

impl Smoother for BilateralFilter {
    fn smooth(&self, img: &image::RgbImage) -> image::RgbImage {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return img.clone();
        }

        // offsets past the image size only revisit reflected pixels
        let radius = self
            .radius()
            .min(width.max(height).min(MAX_RADIUS as u32) as i32);
        let space_coeff = -0.5 / (self.sigma_space * self.sigma_space);
        let color_coeff = -0.5 / (self.sigma_color * self.sigma_color);

        let mut offsets = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist2 = (i64::from(dx).pow(2) + i64::from(dy).pow(2)) as f32;
                if dist2.sqrt() <= radius as f32 {
                    offsets.push((dx, dy, (dist2 * space_coeff).exp()));
                }
            }
        }

        // indexed by the summed absolute difference of the three channels
        let color_weights: Vec<f32> = (0..=3 * 255)
            .map(|d| {
                let d = d as f32;
                (d * d * color_coeff).exp()
            })
            .collect();

        image::RgbImage::from_fn(width, height, |x, y| {
            let center = img.get_pixel(x, y);
            let mut sum = [0f32; 3];
            let mut weight_sum = 0f32;

            for &(dx, dy, space_weight) in &offsets {
                let nx = reflect_101(x as i32 + dx, width as i32);
                let ny = reflect_101(y as i32 + dy, height as i32);
                let neighbor = img.get_pixel(nx, ny);

                let diff: usize = center
                    .0
                    .iter()
                    .zip(neighbor.0.iter())
                    .map(|(a, b)| (i32::from(*a) - i32::from(*b)).abs() as usize)
                    .sum();

                let weight = space_weight * color_weights[diff];
                for (acc, value) in sum.iter_mut().zip(neighbor.0.iter()) {
                    *acc += f32::from(*value) * weight;
                }
                weight_sum += weight;
            }

            // the center always contributes with a weight of 1
            let mut out = [0u8; 3];
            for (o, acc) in out.iter_mut().zip(sum.iter()) {
                *o = (acc / weight_sum).round().max(0.0).min(255.0) as u8;
            }

            image::Rgb(out)
        })
    }
}

/// Reflects an out of range coordinate back into `0..len`, `-1` maps to `1`
#[inline]
fn reflect_101(i: i32, len: i32) -> u32 {
    if len == 1 {
        return 0;
    }

    let period = 2 * (len - 1);
    let i = i.rem_euclid(period);
    (if i >= len { period - i } else { i }) as u32
}

/// Copies the pixels of `smoothed` that are masked into `filled`, leaving
/// every other pixel of `filled` as is.
pub fn blend_repaired(
    filled: &mut image::RgbImage,
    smoothed: &image::RgbImage,
    mask: &Mask,
) -> Result<(), Error> {
    let dims = Dims::of(filled);
    errors::check_size("mask", dims, mask.dims())?;
    errors::check_size("smoothed image", dims, Dims::of(smoothed))?;

    for (x, y) in mask.masked_pixels() {
        filled.put_pixel(x, y, *smoothed.get_pixel(x, y));
    }

    Ok(())
}
