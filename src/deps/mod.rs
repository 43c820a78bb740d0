//! The external executables the pipeline drives.

use crate::utils;
use derive_more::Constructor;
use std::path::{Path, PathBuf};

/// The default executable name of the extraction engine.
pub const EXTRACTOR_EXECUTABLE: &str = "yt-dlp";
/// The default executable name of the combiner.
pub const COMBINER_EXECUTABLE: &str = "ffmpeg";

/// The two external executables every request depends on: the extraction
/// engine that resolves URLs and retrieves streams, and the combiner that
/// merges a video file and an audio file into one container.
///
/// # Examples
///
/// ```rust,no_run
/// # use fetchmux::deps::Binaries;
/// # use std::path::PathBuf;
/// let libraries_dir = PathBuf::from("libs");
///
/// let extractor = libraries_dir.join("yt-dlp");
/// let combiner = libraries_dir.join("ffmpeg");
///
/// let binaries = Binaries::new(extractor, combiner);
/// ```
#[derive(Constructor, Clone, Debug)]
pub struct Binaries {
    /// The path to the extraction engine executable.
    pub extractor: PathBuf,
    /// The path to the combiner executable.
    pub combiner: PathBuf,
}

impl Binaries {
    /// Resolves both executables inside the given directory, using the
    /// platform-specific executable names.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        Self {
            extractor: dir.join(utils::find_executable(EXTRACTOR_EXECUTABLE)),
            combiner: dir.join(utils::find_executable(COMBINER_EXECUTABLE)),
        }
    }

    /// Resolves both executables by bare name, deferring lookup to `PATH`.
    pub fn from_path() -> Self {
        Self {
            extractor: PathBuf::from(utils::find_executable(EXTRACTOR_EXECUTABLE)),
            combiner: PathBuf::from(utils::find_executable(COMBINER_EXECUTABLE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn in_dir_joins_the_executable_names() {
        let binaries = Binaries::in_dir("/opt/tools");

        assert_eq!(binaries.extractor, PathBuf::from("/opt/tools/yt-dlp"));
        assert_eq!(binaries.combiner, PathBuf::from("/opt/tools/ffmpeg"));
    }
}
