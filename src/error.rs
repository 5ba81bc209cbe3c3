//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, climate-grid, and raster errors, and provides semantic
//! variants for argument validation and external tool failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Climate grid error: {0}")]
    Grid(#[from] crate::io::GridError),

    #[error("Raster error: {0}")]
    Raster(#[from] crate::io::RasterError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    pub(crate) fn invalid<V: std::fmt::Display>(arg: &'static str, value: V) -> Self {
        Error::InvalidArgument {
            arg,
            value: value.to_string(),
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Raster(crate::io::RasterError::Gdal(e))
    }
}
