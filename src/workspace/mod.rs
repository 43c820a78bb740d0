//! The namespaced file area holding a job's intermediate and output files.
//!
//! Every job derives its paths from its id, so concurrently active jobs can
//! never collide. Reclamation is best-effort everywhere: a cleanup failure
//! is logged at most and never surfaces to the request.

use crate::error::Result;
use crate::utils::file_system;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How long a workspace file may sit untouched before the stale sweep
/// reclaims it.
pub const STALE_AFTER: Duration = Duration::from_secs(3600);

/// The files a single job may create, all namespaced by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    /// The fetched video stream.
    pub video: PathBuf,
    /// The fetched audio stream.
    pub audio: PathBuf,
    /// The merged output file.
    pub output: PathBuf,
    /// The job-scoped credential file.
    pub cookies: PathBuf,
}

impl JobPaths {
    /// All paths the job may have created, for purging.
    pub fn all(&self) -> [&Path; 4] {
        [&self.video, &self.audio, &self.output, &self.cookies]
    }
}

/// A directory of job-namespaced temporary files.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Opens the workspace, creating the root directory if necessary.
    ///
    /// # Errors
    ///
    /// This function will return an error if the root directory could not be created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        file_system::create_dir(&root)?;

        Ok(Self {
            root: root.as_ref().to_path_buf(),
        })
    }

    /// The root directory of the workspace.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derives the file paths for a job id.
    pub fn job_paths(&self, job_id: &str) -> JobPaths {
        JobPaths {
            video: self.root.join(format!("{job_id}_video.mp4")),
            audio: self.root.join(format!("{job_id}_audio.m4a")),
            output: self.root.join(format!("{job_id}_merged.mp4")),
            cookies: self.root.join(format!("{job_id}_cookies.txt")),
        }
    }

    /// Writes job-scoped credential content, returning the file's path.
    ///
    /// Each job gets its own credential file, so concurrent requests never
    /// overwrite each other's credentials.
    ///
    /// # Errors
    ///
    /// This function will return an error if the content could not be written.
    pub async fn materialize_cookies(&self, paths: &JobPaths, content: &str) -> Result<PathBuf> {
        tokio::fs::write(&paths.cookies, content).await?;
        Ok(paths.cookies.clone())
    }

    /// Sweeps the workspace, deleting regular files whose last modification
    /// is older than `max_age`. Per-file errors are suppressed.
    pub async fn purge_stale(&self, max_age: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Sweeping stale files under {:?}", self.root);

        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(_) => return,
        };

        let now = SystemTime::now();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                continue;
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age > max_age {
                file_system::remove_temp_file(entry.path()).await;
            }
        }
    }
}

/// Deletes a job's known paths. Absent paths are not an error.
pub async fn purge_job(paths: &JobPaths) {
    for path in paths.all() {
        file_system::remove_temp_file(path).await;
    }
}

/// Scoped cleanup for a job's files.
///
/// The guard purges the job's paths when dropped, which covers every exit
/// path of the pipeline: mid-pipeline failures, delivery failures and
/// consumer cancellation. The normal path calls [`JobCleanup::finish`]
/// instead, which purges immediately.
pub struct JobCleanup {
    paths: JobPaths,
    armed: bool,
}

impl JobCleanup {
    /// Takes responsibility for a job's files.
    pub fn new(paths: JobPaths) -> Self {
        Self { paths, armed: true }
    }

    /// The paths under this guard's responsibility.
    pub fn paths(&self) -> &JobPaths {
        &self.paths
    }

    /// Purges the job's files now and disarms the drop path.
    pub async fn finish(mut self) {
        self.armed = false;

        #[cfg(feature = "tracing")]
        tracing::debug!("Purging job files {:?}", self.paths);

        purge_job(&self.paths).await;
    }
}

impl Drop for JobCleanup {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!("Purging job files on abandoned exit {:?}", self.paths);

        for path in self.paths.all() {
            let _ = std::fs::remove_file(path);
        }
    }
}
