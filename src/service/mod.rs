//! The request/response surface of the library.
//!
//! These are the shapes an embedding transport serializes; the wire framing
//! itself is the transport's business.

use crate::FetchMux;
use crate::catalog::FormatDescriptor;
use crate::error::Result;
use crate::pipeline::Job;
use crate::streamer::ByteStream;
use crate::utils::file_system;
use crate::workspace::{self, JobCleanup};
use serde::{Deserialize, Serialize};

/// The media container type of every merged delivery.
pub const MERGED_MEDIA_TYPE: &str = "video/mp4";

/// A request to list the downloadable stream variants of a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatsRequest {
    /// The media URL to resolve.
    pub url: String,
    /// The proxy to route engine traffic through.
    #[serde(default)]
    pub proxy: Option<String>,
}

/// The catalog of downloadable stream variants for a URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatsResponse {
    /// Always `"success"`; failures travel as classified errors instead.
    pub status: String,
    /// The display title of the media.
    pub title: String,
    /// The chosen thumbnail URL, possibly empty.
    pub thumbnail: String,
    /// The stream variants, ordered by height descending.
    pub formats: Vec<FormatDescriptor>,
}

/// A request to fetch a video stream and an audio stream and merge them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRequest {
    /// The media URL to fetch from.
    pub url: String,
    /// The chosen video stream.
    pub video_format_id: String,
    /// The chosen audio stream.
    pub audio_format_id: String,
    /// The proxy to route engine traffic through.
    #[serde(default)]
    pub proxy: Option<String>,
}

/// The merged file, ready for delivery.
pub struct MergedDelivery {
    /// The suggested filename for the saved file.
    pub filename: String,
    /// The media container type indicator.
    pub media_type: &'static str,
    /// The merged file's bytes; finite and single-pass. Consuming or
    /// dropping the stream purges the job's files.
    pub stream: ByteStream,
}

impl std::fmt::Debug for MergedDelivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedDelivery")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// Whether the combiner executable is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinerStatus {
    /// The combiner answered a version probe.
    Available,
    /// The combiner could not be invoked.
    NotFound,
}

/// The liveness report of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `"healthy"`: the service itself holds no state to degrade.
    pub status: String,
    /// Whether the combiner executable is reachable.
    pub combiner: CombinerStatus,
}

impl FetchMux {
    /// Lists the downloadable stream variants for a URL.
    ///
    /// Sweeps stale workspace files first, as routine maintenance.
    ///
    /// # Errors
    ///
    /// This function will return an error (classified as client input) if
    /// the extraction engine cannot resolve the URL.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use fetchmux::FetchMux;
    /// # use fetchmux::deps::Binaries;
    /// # use fetchmux::service::FormatsRequest;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let service = FetchMux::new(Binaries::from_path(), "/tmp/fetchmux")?;
    ///
    /// let response = service
    ///     .list_formats(FormatsRequest {
    ///         url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
    ///         proxy: None,
    ///     })
    ///     .await?;
    /// println!("{} formats for {}", response.formats.len(), response.title);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_formats(&self, request: FormatsRequest) -> Result<FormatsResponse> {
        self.workspace.purge_stale(workspace::STALE_AFTER).await;

        // The probe may materialize a credential file; give it a scratch
        // namespace and purge it like any job.
        let scratch = self.workspace.job_paths(&file_system::random_filename(8));
        let cleanup = JobCleanup::new(scratch.clone());

        let options = self.request_options(request.proxy.clone(), &scratch).await?;
        let catalog = self.extract(&request.url, &options).await?;
        cleanup.finish().await;

        Ok(FormatsResponse {
            status: "success".to_string(),
            title: catalog.title,
            thumbnail: catalog.thumbnail,
            formats: catalog.formats,
        })
    }

    /// Fetches the chosen video and audio streams, merges them, and returns
    /// the merged file as a finite delivery stream.
    ///
    /// Sweeps stale workspace files first, as routine maintenance. The job
    /// ends in exactly one terminal state, and its workspace files are gone
    /// once the delivery stream is consumed or dropped — or immediately,
    /// when the pipeline fails.
    ///
    /// # Errors
    ///
    /// This function will return an error (classified as internal) if a
    /// stream retrieval fails, if the combiner exits with a non-zero
    /// status, or if the merged file cannot be opened for delivery.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use fetchmux::FetchMux;
    /// # use fetchmux::deps::Binaries;
    /// # use fetchmux::service::DownloadRequest;
    /// # use futures_util::StreamExt;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let service = FetchMux::new(Binaries::from_path(), "/tmp/fetchmux")?;
    ///
    /// let mut delivery = service
    ///     .download_merged(DownloadRequest {
    ///         url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
    ///         video_format_id: "137".to_string(),
    ///         audio_format_id: "140".to_string(),
    ///         proxy: None,
    ///     })
    ///     .await?;
    ///
    /// println!("Delivering {}", delivery.filename);
    /// while let Some(chunk) = delivery.stream.next().await {
    ///     let _bytes = chunk?;
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn download_merged(&self, request: DownloadRequest) -> Result<MergedDelivery> {
        self.workspace.purge_stale(workspace::STALE_AFTER).await;

        let mut job = Job::new(
            request.url,
            request.video_format_id,
            request.audio_format_id,
            request.proxy,
        );

        #[cfg(feature = "tracing")]
        tracing::info!("Starting {}", job);

        match self.run_pipeline(&mut job).await {
            Ok((title, stream)) => Ok(MergedDelivery {
                filename: format!("{}.mp4", title),
                media_type: MERGED_MEDIA_TYPE,
                stream,
            }),
            Err(error) => {
                job.fail();

                #[cfg(feature = "tracing")]
                tracing::warn!("{} aborted: {}", job, error);

                Err(error)
            }
        }
    }

    /// Reports service liveness and whether the combiner is reachable.
    ///
    /// Never touches job processing.
    pub async fn health(&self) -> HealthReport {
        let combiner = if self.combiner_available().await {
            CombinerStatus::Available
        } else {
            CombinerStatus::NotFound
        };

        HealthReport {
            status: "healthy".to_string(),
            combiner,
        }
    }
}
