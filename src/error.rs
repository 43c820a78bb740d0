//! The errors that can occur.

use std::time::Duration;
use thiserror::Error;

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// The possible errors that can occur.
#[derive(Debug, Error)]
pub enum Error {
    /// An error occurred while running the runtime.
    #[error("An error occurred while running the runtime: {0}")]
    Runtime(#[from] tokio::task::JoinError),
    /// An error occurred while interacting with the file system.
    #[error("An IO error occurred: {0}")]
    IO(#[from] std::io::Error),
    /// An error occurred while parsing JSON.
    #[error("An error occurred while parsing JSON: {0}")]
    Serde(#[from] serde_json::Error),

    /// The extraction engine could not resolve the URL.
    #[error("Extraction failed: {0}")]
    Extraction(String),
    /// The extraction engine could not retrieve a chosen stream.
    #[error("Stream download failed: {0}")]
    Download(String),
    /// The combiner exited with a non-zero status.
    #[error("Combiner failed: {diagnostics}")]
    Mux {
        /// The combiner's error output, verbatim.
        diagnostics: String,
    },

    /// An error occurred while running a command.
    #[error("Failed to execute command: {0}")]
    Command(String),
    /// An error occurred manipulating a path.
    #[error("An invalid path was provided: {0}")]
    Path(String),
    /// An error occurred due to a timeout.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// How an error should be reported by an embedding transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller supplied something the collaborators cannot work with.
    ClientInput,
    /// The pipeline itself failed.
    Internal,
}

impl Error {
    /// Classifies the error for the embedding transport.
    ///
    /// Extraction failures are the caller's input problem; everything else
    /// happened on this side of the request.
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Extraction(_) => ErrorClass::ClientInput,
            _ => ErrorClass::Internal,
        }
    }
}
