//! Error type shared by the codec, the planner and the filter pipeline.
//!
//! Every error is terminal for a run. The CLI maps each variant onto a
//! distinct process exit code via [`Error::exit_code`].

use std::io;
use std::path::PathBuf;

use crate::filters::kernels::FilterName;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
const EXIT_BASE: i32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot access image {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not enough arguments: <input> <output> <filter1> ... <filterK>")]
    InvalidArgumentCount,

    #[error("failed to allocate {bytes} bytes for the pixel buffer")]
    Allocation { bytes: usize },

    #[error(
        "filter \"{name}\" is an invalid filter name. Available filters: {}",
        FilterName::list()
    )]
    InvalidFilterName { name: String },

    #[error("invalid partition: {0}")]
    InvalidPartition(String),

    #[error("worker group failure: {0}")]
    WorkerGroup(String),

    #[error("malformed image: {0}")]
    Format(String),

    #[error("pixel buffer does not match image dimensions: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error, `100 + n` per variant.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io { .. } => EXIT_BASE + 1,
            Error::InvalidArgumentCount => EXIT_BASE + 2,
            Error::Allocation { .. } => EXIT_BASE + 3,
            Error::InvalidFilterName { .. } => EXIT_BASE + 4,
            Error::InvalidPartition(_) => EXIT_BASE + 5,
            Error::Format(_) | Error::Shape(_) => EXIT_BASE + 6,
            Error::WorkerGroup(_) => EXIT_BASE + 7,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Allocate a zeroed buffer, reporting failure instead of aborting.
pub(crate) fn try_alloc(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| Error::Allocation { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}
