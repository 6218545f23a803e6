//! Error types surfaced by the core.
//!
//! None of these are fatal: the frontend turns every one of them into a
//! notice and returns to an interactive state.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::models::RecordId;

/// A form or patch that would leave a record without its required fields.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The name is empty after trimming.
    #[error("game name is required")]
    MissingName,
    /// The platform is empty after trimming.
    #[error("platform is required")]
    MissingPlatform,
}

/// Failure reading or writing the backing file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Backing file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The file was read but is not a valid library.
    #[error("could not decode {}, the file might be corrupted: {source}", .path.display())]
    Parse {
        /// Backing file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The library could not be serialized.
    #[error("failed to serialize library for {}: {source}", .path.display())]
    Serialize {
        /// Backing file path.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// The directory holding the backing file could not be created.
    #[error("failed to create {}: {source}", .path.display())]
    CreateDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The new contents could not be written in place of the old ones.
    #[error("failed to save games to {}: {source}", .path.display())]
    Write {
        /// Backing file path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure mutating a single record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// No record carries the given id.
    #[error("no game with id {0}")]
    Unknown(RecordId),
    /// The mutation was rejected before touching the record.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Failure starting a game.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The record has no launch path.
    #[error("no launch path specified for this game")]
    NoPath,
    /// The launch path points at nothing on disk.
    #[error("the specified path does not exist: {}", .0.display())]
    NotFound(PathBuf),
    /// The shell could not hand a launcher URI to its handler.
    #[error("could not open {uri} ({source}); please ensure {launcher} is installed")]
    UriHandler {
        /// URI that was handed to the shell.
        uri: String,
        /// Human readable name of the launcher owning the scheme.
        launcher: &'static str,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The OS refused or could not start the process.
    #[error("could not launch {target}: {source}")]
    Spawn {
        /// Path or URI that was being started.
        target: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// Elevated launch failed and so did the standard launch tried after it.
    #[error("elevated launch failed ({elevation}) and standard launch failed: {fallback}")]
    ElevationFallback {
        /// Error from the elevation attempt.
        elevation: io::Error,
        /// Error from the standard launch.
        #[source]
        fallback: Box<LaunchError>,
    },
}
