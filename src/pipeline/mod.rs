//! The acquisition pipeline and its job lifecycle.
//!
//! A job moves linearly through its states and ends in exactly one of
//! `Completed` or `Failed`; there is no retry transition. Whatever the exit
//! path, the job's workspace files are purged by the cleanup guard that
//! accompanies the pipeline.

use crate::FetchMux;
use crate::error::Result;
use crate::extractor::ExtractorOptions;
use crate::streamer::{self, ByteStream, DEFAULT_CHUNK_SIZE};
use crate::utils::file_system;
use crate::workspace::JobCleanup;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// The lifecycle states of a download-and-mux job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The job was created from a request.
    Created,
    /// The engine is resolving the URL's metadata.
    FetchingMetadata,
    /// The engine is retrieving the chosen video stream.
    DownloadingVideo,
    /// The engine is retrieving the chosen audio stream.
    DownloadingAudio,
    /// The combiner is merging the two streams.
    Muxing,
    /// The merged file is being delivered.
    Streaming,
    /// The job finished and its files are purged.
    Completed,
    /// The job failed and its files are purged.
    Failed,
}

impl JobState {
    /// Whether the job can no longer advance.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One download-and-mux request with its own workspace namespace and
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// The opaque id namespacing the job's workspace paths.
    pub job_id: String,
    /// The URL the streams come from.
    pub source_url: String,
    /// The chosen video stream.
    pub video_format_id: String,
    /// The chosen audio stream.
    pub audio_format_id: String,
    /// The proxy for engine traffic, if any.
    pub proxy: Option<String>,
    /// The current lifecycle state.
    pub state: JobState,
}

impl Job {
    /// Creates a job with a fresh id.
    pub fn new(
        source_url: impl Into<String>,
        video_format_id: impl Into<String>,
        audio_format_id: impl Into<String>,
        proxy: Option<String>,
    ) -> Self {
        Self {
            job_id: file_system::random_filename(8),
            source_url: source_url.into(),
            video_format_id: video_format_id.into(),
            audio_format_id: audio_format_id.into(),
            proxy,
            state: JobState::Created,
        }
    }

    /// Advances the job to the next pipeline state.
    pub fn advance(&mut self, state: JobState) {
        #[cfg(feature = "tracing")]
        tracing::debug!("Job {}: {} -> {}", self.job_id, self.state, state);

        self.state = state;
    }

    /// Marks the job failed.
    pub fn fail(&mut self) {
        self.advance(JobState::Failed);
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job(id = {}, url = {}, state = {})",
            self.job_id, self.source_url, self.state
        )
    }
}

static FILENAME_FORBIDDEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("a valid literal pattern"));

/// Strips filesystem-hostile characters from a title and truncates it to
/// 200 characters.
///
/// # Examples
///
/// ```
/// # use fetchmux::pipeline::sanitize_title;
/// assert_eq!(sanitize_title("My:Video/Title*"), "MyVideoTitle");
/// ```
pub fn sanitize_title(title: &str) -> String {
    let cleaned = FILENAME_FORBIDDEN.replace_all(title, "");
    cleaned.chars().take(200).collect()
}

impl FetchMux {
    /// Resolves the display title for a URL, sanitized for use as a
    /// filename.
    ///
    /// # Errors
    ///
    /// This function will return an error if the extraction engine cannot
    /// resolve the URL.
    pub async fn resolve_title(&self, url: &str, options: &ExtractorOptions) -> Result<String> {
        let metadata = self.probe_metadata(url, options).await?;
        let title = metadata.title.as_deref().unwrap_or("video");

        Ok(sanitize_title(title))
    }

    /// Drives the acquisition pipeline for one job: resolve the metadata,
    /// fetch the two chosen streams sequentially, merge them, and open the
    /// merged file as a delivery stream.
    ///
    /// The returned stream owns the job's cleanup guard; consuming or
    /// dropping it purges every job file. When this function fails instead,
    /// the guard going out of scope here does the same purge.
    pub(crate) async fn run_pipeline(&self, job: &mut Job) -> Result<(String, ByteStream)> {
        let paths = self.workspace.job_paths(&job.job_id);
        let cleanup = JobCleanup::new(paths.clone());
        let options = self.request_options(job.proxy.clone(), &paths).await?;

        job.advance(JobState::FetchingMetadata);
        let metadata = self.probe_metadata(&job.source_url, &options).await?;
        let title = sanitize_title(metadata.title.as_deref().unwrap_or("video"));

        job.advance(JobState::DownloadingVideo);
        self.fetch_stream(&job.source_url, &job.video_format_id, &options, &paths.video)
            .await?;

        job.advance(JobState::DownloadingAudio);
        self.fetch_stream(&job.source_url, &job.audio_format_id, &options, &paths.audio)
            .await?;

        job.advance(JobState::Muxing);
        self.mux(&paths.video, &paths.audio, &paths.output).await?;

        job.advance(JobState::Streaming);
        let stream = streamer::stream_file(&paths.output, DEFAULT_CHUNK_SIZE, cleanup).await?;

        Ok((title, stream))
    }
}
