use crate::{errors, Dims, Error, Mask};
use log::info;

/// How a reference mask is projected onto a target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapMode {
    /// Every target pixel takes the value of the reference pixel it falls in.
    Direct,
    /// The direct projection, dilated by a square of `2 * radius + 1` pixels.
    Expand { radius: u32 },
}

impl MapMode {
    fn new(strength: f32, scale: (f64, f64)) -> Self {
        if strength > 0.0 {
            Self::Expand {
                radius: expansion_radius(scale.0, scale.1, strength),
            }
        } else {
            Self::Direct
        }
    }
}

/// Dilation radius for a given scale and strength: the scale multiplied by
/// the strength, never less than 1, rounded up.
pub fn expansion_radius(scale_x: f64, scale_y: f64, strength: f32) -> u32 {
    let multiplier = (scale_x.max(scale_y) * f64::from(strength)).max(1.0);
    multiplier.ceil() as u32
}

/// Projects `reference` onto an image of `target` dimensions.
///
/// Each target pixel `(x, y)` samples the reference at
/// `(floor(x / scale_x), floor(y / scale_y))`. With a `strength` of 0 the
/// sampled value is used as is, otherwise the result is dilated by
/// [`expansion_radius`], so a larger strength always yields a superset.
pub fn map_mask(reference: &Mask, target: Dims, strength: f32) -> Result<Mask, Error> {
    errors::check_range("strength", strength, 0.0, f32::MAX)?;

    let ref_dims = reference.dims();
    if ref_dims.is_empty() {
        return Err(Error::EmptyImage(ref_dims));
    }
    if target.is_empty() {
        return Err(Error::EmptyImage(target));
    }

    let scale = (
        f64::from(target.width) / f64::from(ref_dims.width),
        f64::from(target.height) / f64::from(ref_dims.height),
    );

    // x / (tw / rw) == x * rw / tw, computed exactly so that coordinates on
    // a cell boundary aren't pushed into the previous cell by float error
    let ref_x: Vec<u32> = (0..target.width)
        .map(|x| source_coord(x, ref_dims.width, target.width))
        .collect();
    let ref_y: Vec<u32> = (0..target.height)
        .map(|y| source_coord(y, ref_dims.height, target.height))
        .collect();

    let direct = Mask::from_fn(target, |x, y| {
        reference.get(ref_x[x as usize], ref_y[y as usize])
    });

    let mode = MapMode::new(strength, scale);
    let mapped = match mode {
        MapMode::Direct => direct,
        MapMode::Expand { radius } => dilate(&direct, radius),
    };

    info!(
        "{:?} mapping {} -> {} (strength {}): {} pixels to treat",
        mode,
        ref_dims,
        target,
        strength,
        mapped.count()
    );

    Ok(mapped)
}

#[inline]
fn source_coord(target_coord: u32, ref_len: u32, target_len: u32) -> u32 {
    (u64::from(target_coord) * u64::from(ref_len) / u64::from(target_len)) as u32
}

/// Square (Chebyshev) dilation, done as a horizontal then a vertical pass
/// since a square window is separable.
fn dilate(mask: &Mask, radius: u32) -> Mask {
    let Dims { width, height } = mask.dims();
    let r = radius as usize;

    let rows = mask.flags();
    let mut horizontal = vec![false; rows.len()];
    let mut line = Vec::with_capacity(width.max(height) as usize);

    for y in 0..height as usize {
        let start = y * width as usize;
        let src = &rows[start..start + width as usize];
        dilate_line(src.iter().copied(), r, &mut line);
        horizontal[start..start + width as usize].copy_from_slice(&line);
    }

    let mut out = Mask::new(mask.dims());
    for x in 0..width as usize {
        let column = (0..height as usize).map(|y| horizontal[y * width as usize + x]);
        dilate_line(column, r, &mut line);
        for (y, masked) in line.iter().enumerate() {
            if *masked {
                out.set(x as u32, y as u32, true);
            }
        }
    }

    out
}

/// 1-D dilation through a running count of set flags
fn dilate_line<I: Iterator<Item = bool>>(src: I, radius: usize, out: &mut Vec<bool>) {
    // prefix[i] = number of set flags in src[..i]
    let mut prefix = vec![0u32];
    for flag in src {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + u32::from(flag));
    }

    let len = prefix.len() - 1;
    out.clear();
    out.extend((0..len).map(|i| {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius + 1).min(len);
        prefix[hi] > prefix[lo]
    }));
}
