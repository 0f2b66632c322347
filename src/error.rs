use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the decoding, calibration and
/// persistence layers.
///
/// None of these are fatal to a running monitor: a
/// malformed frame drops one cycle, and corrupt
/// persistence falls back to an empty region set.
#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("corrupt region file {}: {}", .path.display(), .source)]
    CorruptPersistence {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid calibration profile: {0}")]
    InvalidProfile(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
