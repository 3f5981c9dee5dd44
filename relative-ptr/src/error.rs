use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::num::TryFromIntError;
use std::path::{Path, PathBuf};
use zerocopy::ConvertError;

/// An error that can occur when loading a region or resolving references inside it
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Generic I/O error. Path contains an optional filename if applicable
    Io(std::io::Error, Option<PathBuf>),

    /// A reference points outside of the region, or the target doesn't fit
    DataOffset,

    /// A reference points to an address that is not aligned for its target type
    DataAlignment,

    /// The region is borrowed or memory-mapped and can't be modified
    ReadOnly,
}

impl Error {
    pub(crate) fn from_io_with_filename(filename: &Path) -> impl FnOnce(std::io::Error) -> Error {
        let path = filename.to_path_buf();
        move |err| Error::Io(err, Some(path))
    }
}

impl std::error::Error for Error {}

impl From<TryFromIntError> for Error {
    fn from(_err: TryFromIntError) -> Self {
        Self::DataOffset
    }
}

impl<A, S> From<ConvertError<A, S, Infallible>> for Error {
    fn from(err: ConvertError<A, S, Infallible>) -> Self {
        match err {
            ConvertError::Alignment(_) => Self::DataAlignment,
            ConvertError::Size(_) => Self::DataOffset,
            ConvertError::Validity(never) => match never {},
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err, path) => {
                if let Some(path) = path {
                    write!(f, "I/O error for file '{}': {}", path.display(), err)
                } else {
                    write!(f, "I/O error: {err}")
                }
            }
            Error::DataOffset => {
                write!(
                    f,
                    "Tried to access an invalid data offset. Most likely reason is a corrupted region"
                )
            }
            Error::DataAlignment => {
                write!(
                    f,
                    "Tried to read unaligned data. Most likely reason is a corrupted region"
                )
            }
            Error::ReadOnly => write!(f, "The region is read-only"),
        }
    }
}

/// The Result type for [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
