// BEGIN - Embark standard lints v0.4
// do not change or add/remove here, but one can add exceptions after this section
// for more info see: <https://github.com/EmbarkStudios/rust-ecosystem/issues/59>
#![deny(unsafe_code)]
#![warn(
    clippy::all,
    clippy::await_holding_lock,
    clippy::char_lit_as_u8,
    clippy::checked_conversions,
    clippy::dbg_macro,
    clippy::debug_assert_with_mut_call,
    clippy::doc_markdown,
    clippy::empty_enum,
    clippy::enum_glob_use,
    clippy::exit,
    clippy::expl_impl_clone_on_copy,
    clippy::explicit_deref_methods,
    clippy::explicit_into_iter_loop,
    clippy::fallible_impl_from,
    clippy::filter_map_next,
    clippy::float_cmp_const,
    clippy::fn_params_excessive_bools,
    clippy::if_let_mutex,
    clippy::implicit_clone,
    clippy::imprecise_flops,
    clippy::inefficient_to_string,
    clippy::invalid_upcast_comparisons,
    clippy::large_types_passed_by_value,
    clippy::let_unit_value,
    clippy::linkedlist,
    clippy::lossy_float_literal,
    clippy::macro_use_imports,
    clippy::manual_ok_or,
    clippy::map_err_ignore,
    clippy::map_flatten,
    clippy::map_unwrap_or,
    clippy::match_on_vec_items,
    clippy::match_same_arms,
    clippy::match_wildcard_for_single_variants,
    clippy::mem_forget,
    clippy::mismatched_target_os,
    clippy::mut_mut,
    clippy::mutex_integer,
    clippy::needless_borrow,
    clippy::needless_continue,
    clippy::option_option,
    clippy::path_buf_push_overwrite,
    clippy::ptr_as_ptr,
    clippy::ref_option_ref,
    clippy::rest_pat_in_fully_bound_structs,
    clippy::same_functions_in_if_condition,
    clippy::semicolon_if_nothing_returned,
    clippy::string_add_assign,
    clippy::string_add,
    clippy::string_lit_as_bytes,
    clippy::string_to_string,
    clippy::todo,
    clippy::trait_duplication_in_bounds,
    clippy::unimplemented,
    clippy::unnested_or_patterns,
    clippy::unused_self,
    clippy::useless_transmute,
    clippy::verbose_file_reads,
    clippy::zero_sized_map_values,
    future_incompatible,
    nonstandard_style,
    rust_2018_idioms
)]
// END - Embark standard lints v0.4

//! `pixfix` removes a masked overlay (for example a chroma-key marker) from a
//! set of images and fills the hole with colors taken from the surrounding
//! pixels.
//!
//! The mask is derived once from a reference image: every pixel with a
//! channel brighter than the tolerance is masked. It is then projected onto
//! each target image, which may have a different resolution than the
//! reference, optionally dilated according to a strength factor. Masked
//! pixels are filled from the outside in by an iterative, clamped median
//! over their already resolved neighbors, and the repaired region is finally
//! smoothed with an edge-preserving filter.
//!
//! ## Usage
//!
//! ```no_run
//! let session = pixfix::Session::builder()
//!     .reference(&"original/ref.png")
//!     .strength(0.5)
//!     .build()
//!     .expect("failed to build session");
//!
//! let treated = session
//!     .treat(&"original/shot_01.jpg")
//!     .expect("failed to treat image");
//!
//! treated.save("treated/shot_01.jpg").expect("failed to save image");
//! ```
//!
//! The individual stages are also exposed on their own, see [`extract_mask`],
//! [`map_mask`], [`inpaint`] and [`blend_repaired`].
mod batch;
mod blend;
mod errors;
mod inpaint;
mod mapping;
mod mask;
pub mod session;
mod utils;

pub use image;

pub use batch::{collect_targets, find_reference, BatchJob, BatchOutcome, BatchProgress};
pub use blend::{blend_repaired, BilateralFilter, Smoother};
pub use errors::Error;
pub use inpaint::{inpaint, InpaintParams, InpaintProgress, InpaintStats, Inpainted, PassUpdate};
pub use mapping::{expansion_radius, map_mask, MapMode};
pub use mask::{extract_mask, visualize, Mask, MARKER};
pub use session::{Session, SessionBuilder, TreatedImage};
pub use utils::{is_supported_image, load_dynamic_image, load_image, save_jpeg, ImageSource};

/// Extensions, lower-cased, of the image files a batch will pick up.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "gif"];

/// Simple dimensions struct
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dims {
    pub width: u32,
    pub height: u32,
}

impl Dims {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of(img: &image::RgbImage) -> Self {
        Self::new(img.width(), img.height())
    }

    /// True if either side is zero, such an image can't take part in mask
    /// mapping
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub(crate) fn area(self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Dims {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

struct Parameters {
    tolerance: u8,
    strength: f32,
    max_passes: u32,
    start_ksize: u32,
    bilateral: BilateralFilter,
    max_thread_count: Option<usize>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            tolerance: 30,
            strength: 0.5,
            max_passes: 100,
            start_ksize: 2,
            bilateral: BilateralFilter::default(),
            max_thread_count: None,
        }
    }
}

impl Parameters {
    fn to_inpaint_params(&self) -> InpaintParams {
        InpaintParams {
            max_passes: self.max_passes,
            start_ksize: self.start_ksize,
        }
    }

    fn thread_count(&self) -> usize {
        self.max_thread_count.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod test {
    use super::Dims;

    #[test]
    fn dims_emptiness() {
        assert!(Dims::new(0, 10).is_empty());
        assert!(Dims::new(10, 0).is_empty());
        assert!(!Dims::square(1).is_empty());
        assert_eq!(Dims::new(3, 7).area(), 21);
        assert_eq!(Dims::new(640, 480).to_string(), "640x480");
    }
}
