use crate::Dims;
use std::{fmt, path::PathBuf};

#[derive(Debug)]
pub struct InvalidRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
    pub(crate) value: f32,
    pub(crate) name: &'static str,
}

impl fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter '{}' - value '{}' is outside the range of {}-{}",
            self.name, self.value, self.min, self.max
        )
    }
}

#[derive(Debug)]
pub struct SizeMismatch {
    pub(crate) what: &'static str,
    pub(crate) expected: Dims,
    pub(crate) actual: Dims,
}

impl fmt::Display for SizeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "the {} size ({}) must match the image size ({})",
            self.what, self.actual, self.expected
        )
    }
}

#[derive(Debug)]
pub enum Error {
    /// An error in the image library occurred, eg failed to load/save
    Image(image::ImageError),
    /// An input parameter had an invalid range specified
    InvalidRange(InvalidRange),
    /// A mask or a smoothed image doesn't have the dimensions of the image
    /// it applies to
    SizeMismatch(SizeMismatch),
    /// The reference or a target image has a zero width or height, so no
    /// scale factor can be computed between them
    EmptyImage(Dims),
    /// A session was built without a reference image
    NoReference,
    /// No file following the reference naming convention was found in the
    /// directory
    MissingReference(PathBuf),
    /// Io is notoriously error free with no problems, but we cover it just in case!
    Io(std::io::Error),
    /// The user specified an image format we don't support as the output
    UnsupportedOutputFormat(String),
    /// A batch worker thread panicked
    WorkerPanicked,
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image(ie) => write!(f, "{}", ie),
            Self::InvalidRange(ir) => write!(f, "{}", ir),
            Self::SizeMismatch(sm) => write!(f, "{}", sm),
            Self::EmptyImage(dims) => {
                write!(f, "image dimensions ({}) must both be non-zero", dims)
            }
            Self::NoReference => write!(f, "a reference image must be provided"),
            Self::MissingReference(dir) => write!(
                f,
                "no reference image (ref.*) was found in '{}'",
                dir.display()
            ),
            Self::Io(io) => write!(f, "{}", io),
            Self::UnsupportedOutputFormat(fmt) => {
                write!(f, "the output format '{}' is not supported", fmt)
            }
            Self::WorkerPanicked => write!(f, "a batch worker thread panicked"),
        }
    }
}

impl From<image::ImageError> for Error {
    fn from(ie: image::ImageError) -> Self {
        Self::Image(ie)
    }
}

impl From<std::io::Error> for Error {
    fn from(io: std::io::Error) -> Self {
        Self::Io(io)
    }
}

pub(crate) fn check_size(what: &'static str, expected: Dims, actual: Dims) -> Result<(), Error> {
    if expected != actual {
        return Err(Error::SizeMismatch(SizeMismatch {
            what,
            expected,
            actual,
        }));
    }

    Ok(())
}

pub(crate) fn check_range(
    name: &'static str,
    value: f32,
    min: f32,
    max: f32,
) -> Result<(), Error> {
    // written this way so NaN is rejected as well
    if !(value >= min && value <= max) {
        return Err(Error::InvalidRange(InvalidRange {
            min,
            max,
            value,
            name,
        }));
    }

    Ok(())
}
