//! Error types shared across the crate

use std::path::PathBuf;
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Database error: {0}")]
    Db(#[from] DbError),
    #[error("Invalid spectrum in {}: {reason}", path.display())]
    InvalidSpectrum { path: PathBuf, reason: String },
    #[error("No usable files found under {}", .0.display())]
    EmptyLibrary(PathBuf),
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while resolving or opening an audio asset.
///
/// None of these are fatal to a click: the spectrum is drawn regardless.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Invalid audio key: {0}")]
    InvalidKey(String),
    #[error("Audio file not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("Failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unplayable audio in {}: {reason}", path.display())]
    Unplayable { path: PathBuf, reason: String },
}
