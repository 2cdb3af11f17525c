use crate::{errors, Dims, Error, Mask};
use log::{debug, warn};

/// Parameters of the iterative median fill.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InpaintParams {
    /// The number of passes before any pixel still masked is resolved by a
    /// single fallback pass.
    ///
    /// Default: 100
    pub max_passes: u32,
    /// The kernel size of the first pass. A pass looks `ksize / 2` pixels
    /// right and down, and `ksize / 2` rounded up left and up. The kernel
    /// grows by one after every pass that didn't resolve a single pixel.
    ///
    /// Default: 2
    pub start_ksize: u32,
}

impl Default for InpaintParams {
    fn default() -> Self {
        Self {
            max_passes: 100,
            start_ksize: 2,
        }
    }
}

/// The state of the fill after a pass
pub struct PassUpdate<'a> {
    /// 1-based number of the pass that just finished
    pub pass: u32,
    /// The number of pixels resolved by this pass
    pub corrected: usize,
    /// The number of pixels still masked
    pub remaining: usize,
    /// The number of pixels masked before the first pass
    pub initial: usize,
    /// The kernel size used by this pass
    pub ksize: u32,
    /// The kernel size the next pass will use
    pub next_ksize: u32,
    /// The image as of the end of this pass
    pub image: &'a image::RgbImage,
}

/// Allows the inpainter to update external callers after every pass
pub trait InpaintProgress {
    fn update(&mut self, info: PassUpdate<'_>);
}

impl<G> InpaintProgress for G
where
    G: FnMut(PassUpdate<'_>),
{
    fn update(&mut self, info: PassUpdate<'_>) {
        self(info)
    }
}

/// Summary of an inpainting run
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InpaintStats {
    /// The number of masked pixels before the first pass
    pub initial: usize,
    /// The number of regular passes that ran
    pub passes: u32,
    /// The kernel size after the last regular pass
    pub final_ksize: u32,
    /// The number of pixels resolved by the fallback pass
    pub fallback_filled: usize,
    /// The number of pixels the fallback pass found no resolved neighbor for,
    /// these keep their original color
    pub unfilled: usize,
}

/// A filled image along with how it was filled
pub struct Inpainted {
    pub image: image::RgbImage,
    pub stats: InpaintStats,
}

/// Fills every masked pixel of `img` with the clamped median of its resolved
/// neighbors.
///
/// Each pass considers the masked pixels against the state left by the
/// previous pass only: a pixel is resolved when strictly more than half of
/// its in-bounds window is already resolved, and all pixels resolved by a
/// pass are committed together once the pass is over. When a pass resolves
/// nothing the window grows by one for the next pass. Pixels still masked
/// after `max_passes` are resolved from whatever resolved pixels lie in a
/// window of `ksize + max_passes - 1`, without the majority requirement.
pub fn inpaint(
    img: &image::RgbImage,
    mask: &Mask,
    params: &InpaintParams,
    mut progress: Option<&mut dyn InpaintProgress>,
) -> Result<Inpainted, Error> {
    let dims = Dims::of(img);
    errors::check_size("mask", dims, mask.dims())?;

    let mut result = img.clone();
    // the resolved state as of the start of the current pass
    let mut pending = mask.flags().to_vec();
    let mut to_treat: Vec<(u32, u32)> = mask.masked_pixels().collect();

    let initial = to_treat.len();
    let mut ksize = params.start_ksize;
    let mut passes = 0;
    let mut samples = Samples::default();
    // the pixels resolved during the current pass
    let mut resolved = Vec::new();

    debug!("initial pixels to treat: {}", initial);

    for pass in 0..params.max_passes {
        passes = pass + 1;
        resolved.clear();

        for &(x, y) in &to_treat {
            let window = Window::around(x, y, ksize, dims);
            samples.gather(&result, &pending, &window);

            // a strict majority of the window implies at least one sample
            if samples.len() > window.area() / 2 {
                if let Some(color) = samples.clamped_median() {
                    resolved.push((x, y, color));
                }
            }
        }

        for &(x, y, color) in &resolved {
            result.put_pixel(x, y, color);
            pending[index(x, y, dims)] = false;
        }
        to_treat.retain(|&(x, y)| pending[index(x, y, dims)]);

        let corrected = resolved.len();
        let remaining = to_treat.len();
        let pass_ksize = ksize;

        debug!(
            "pass {}: corrected {} pixels, {} left",
            passes, corrected, remaining
        );

        if corrected == 0 && remaining > 0 {
            ksize = ksize.saturating_add(1);
            debug!("no pixels corrected, growing kernel to {}", ksize);
        }

        if let Some(ref mut progress) = progress {
            progress.update(PassUpdate {
                pass: passes,
                corrected,
                remaining,
                initial,
                ksize: pass_ksize,
                next_ksize: ksize,
                image: &result,
            });
        }

        if remaining == 0 {
            debug!("all pixels treated after {} passes", passes);
            break;
        }
    }

    let mut fallback_filled = 0;
    let mut unfilled = 0;

    if !to_treat.is_empty() {
        let final_ksize = ksize.saturating_add(params.max_passes).saturating_sub(1);
        debug!(
            "fallback pass: treating {} pixels with kernel {}",
            to_treat.len(),
            final_ksize
        );

        // `pending` is left untouched so that only pixels resolved before the
        // fallback are ever sampled
        for &(x, y) in &to_treat {
            let window = Window::around(x, y, final_ksize, dims);
            samples.gather(&result, &pending, &window);

            match samples.clamped_median() {
                Some(color) => {
                    result.put_pixel(x, y, color);
                    fallback_filled += 1;
                }
                None => unfilled += 1,
            }
        }

        if unfilled > 0 {
            warn!(
                "{} pixels had no resolved neighbor within kernel {} and were left as is",
                unfilled, final_ksize
            );
        }
    }

    Ok(Inpainted {
        image: result,
        stats: InpaintStats {
            initial,
            passes,
            final_ksize: ksize,
            fallback_filled,
            unfilled,
        },
    })
}

#[inline]
fn index(x: u32, y: u32, dims: Dims) -> usize {
    y as usize * dims.width as usize + x as usize
}

/// An inclusive, in-bounds square window around a pixel
struct Window {
    x0: u32,
    x1: u32,
    y0: u32,
    y1: u32,
}

impl Window {
    /// Offsets range over `-ceil(ksize / 2) ..= floor(ksize / 2)` on both
    /// axes. An even `ksize` gives a centered window of `ksize + 1`, an odd
    /// one a window of `ksize + 1` reaching one further up and left.
    fn around(x: u32, y: u32, ksize: u32, dims: Dims) -> Self {
        let before = ksize / 2 + ksize % 2;
        let after = ksize / 2;
        Self {
            x0: x.saturating_sub(before),
            x1: x.saturating_add(after).min(dims.width - 1),
            y0: y.saturating_sub(before),
            y1: y.saturating_add(after).min(dims.height - 1),
        }
    }

    fn area(&self) -> usize {
        (self.x1 - self.x0 + 1) as usize * (self.y1 - self.y0 + 1) as usize
    }
}

/// Per channel colors of the resolved pixels in a window
#[derive(Default)]
struct Samples {
    channels: [Vec<u8>; 3],
}

impl Samples {
    fn gather(&mut self, img: &image::RgbImage, pending: &[bool], window: &Window) {
        for channel in &mut self.channels {
            channel.clear();
        }

        let width = img.width() as usize;
        for y in window.y0..=window.y1 {
            let row = y as usize * width;
            for x in window.x0..=window.x1 {
                if pending[row + x as usize] {
                    continue;
                }

                let px = img.get_pixel(x, y);
                for (channel, value) in self.channels.iter_mut().zip(px.0.iter()) {
                    channel.push(*value);
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.channels[0].len()
    }

    fn clamped_median(&mut self) -> Option<image::Rgb<u8>> {
        if self.len() == 0 {
            return None;
        }

        let mut color = [0u8; 3];
        for (out, channel) in color.iter_mut().zip(self.channels.iter_mut()) {
            *out = clamped_median(channel);
        }

        Some(image::Rgb(color))
    }
}

/// Median of `values` rounded to the nearest integer (halves round up), then
/// clamped to the observed range. `values` must not be empty.
fn clamped_median(values: &mut [u8]) -> u8 {
    let len = values.len();
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(u8::MAX);

    let (lower, upper, _) = values.select_nth_unstable(len / 2);
    let upper = u16::from(*upper);

    // twice the median, so the even case stays in integers
    let doubled = if len % 2 == 1 {
        2 * upper
    } else {
        upper + u16::from(lower.iter().copied().max().unwrap_or(0))
    };

    let median = ((doubled + 1) / 2) as u8;
    median.clamp(min, max)
}
