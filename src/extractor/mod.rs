//! The boundary to the stream-metadata extraction engine.
//!
//! The engine is an external executable: it resolves a URL into a JSON
//! metadata document, and retrieves one chosen stream into a destination
//! file. This module models the document leniently (the engine omits most
//! fields for most sources) and renders invocation options as arguments.

use crate::FetchMux;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::utils;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The recognized options for an extraction engine invocation.
///
/// Proxy and credential file apply to every call; format selector and
/// output path only make sense for a retrieval call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractorOptions {
    /// The proxy to route engine traffic through.
    pub proxy: Option<String>,
    /// The credential file handed to the engine.
    pub cookies: Option<PathBuf>,
    /// The format selector for a retrieval call.
    pub format: Option<String>,
    /// The destination path for a retrieval call.
    pub output: Option<PathBuf>,
}

impl ExtractorOptions {
    /// Creates options for a metadata probe.
    pub fn new(proxy: Option<String>, cookies: Option<PathBuf>) -> Self {
        Self {
            proxy,
            cookies,
            format: None,
            output: None,
        }
    }

    /// Extends the options with the format selector and destination of a
    /// retrieval call.
    pub fn with_retrieval(mut self, format: impl AsRef<str>, output: impl AsRef<Path>) -> Self {
        self.format = Some(format.as_ref().to_string());
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// Renders the options as engine command-line arguments.
    fn to_args(&self) -> Result<Vec<String>> {
        let mut args = Vec::new();

        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
        if let Some(cookies) = &self.cookies {
            let cookies = cookies
                .to_str()
                .ok_or(Error::Path("Invalid cookies path".to_string()))?;

            args.push("--cookies".to_string());
            args.push(cookies.to_string());
        }
        if let Some(format) = &self.format {
            args.push("-f".to_string());
            args.push(format.clone());
        }
        if let Some(output) = &self.output {
            let output = output
                .to_str()
                .ok_or(Error::Path("Invalid output path".to_string()))?;

            args.push("-o".to_string());
            args.push(output.to_string());
        }

        Ok(args)
    }
}

/// The engine's metadata document for a URL.
///
/// Only the fields the catalog needs are modeled; everything the engine may
/// omit is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    /// The display title of the media.
    pub title: Option<String>,
    /// The preferred thumbnail URL.
    pub thumbnail: Option<String>,
    /// All known thumbnails, ordered ascending by resolution for most sources.
    pub thumbnails: Vec<RawThumbnail>,
    /// The per-format listing.
    pub formats: Vec<RawFormat>,

    /// A direct retrievable URL, present when the source exposes no
    /// per-format listing.
    pub url: Option<String>,
    /// The container extension of the direct URL.
    pub ext: Option<String>,
    /// The width of the direct URL's video, if known.
    pub width: Option<u32>,
    /// The height of the direct URL's video, if known.
    pub height: Option<u32>,
    /// The size of the direct URL's payload in bytes, if known.
    pub filesize: Option<u64>,
}

/// One thumbnail of the engine's metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawThumbnail {
    /// The URL of the thumbnail.
    pub url: Option<String>,
    /// The width of the thumbnail, if known.
    pub width: Option<u32>,
    /// The height of the thumbnail, if known.
    pub height: Option<u32>,
}

/// One raw format record of the engine's metadata document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    /// The engine's identifier for the format, unique within a document.
    pub format_id: String,
    /// The container extension.
    pub ext: Option<String>,
    /// The video codec, `"none"` for audio-only formats.
    pub vcodec: Option<String>,
    /// The audio codec, `"none"` for video-only formats.
    pub acodec: Option<String>,
    /// The width in pixels, if known.
    pub width: Option<u32>,
    /// The height in pixels, if known.
    pub height: Option<u32>,
    /// The display resolution, e.g. `"1920x1080"`.
    pub resolution: Option<String>,
    /// The engine's free-text annotation, e.g. `"1080p"`.
    pub format_note: Option<String>,
    /// The total bitrate in kbps, if known.
    pub tbr: Option<f64>,
    /// The size in bytes, if known.
    pub filesize: Option<u64>,
}

impl FetchMux {
    /// Probes the extraction engine for the metadata document of a URL.
    ///
    /// No stream data is retrieved. A non-zero engine exit surfaces as an
    /// extraction error carrying the engine's message.
    ///
    /// # Errors
    ///
    /// This function will return an error if the engine could not be spawned,
    /// timed out, could not resolve the URL, or produced an unparsable document.
    pub async fn probe_metadata(
        &self,
        url: &str,
        options: &ExtractorOptions,
    ) -> Result<RawMetadata> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Probing metadata for {}", url);

        let mut args = self.args.clone();
        args.append(&mut utils::to_owned(vec![
            "--no-progress",
            "--no-warnings",
            "--dump-json",
        ]));
        args.append(&mut options.to_args()?);
        args.push(url.to_string());

        let executor = Executor {
            executable_path: self.binaries.extractor.clone(),
            timeout: self.timeout,
            args,
        };

        let output = executor.run().await?;
        if output.code != 0 {
            return Err(Error::Extraction(output.stderr.trim().to_string()));
        }

        let metadata = serde_json::from_str(&output.stdout)?;
        Ok(metadata)
    }

    /// Retrieves one chosen stream into the destination file.
    ///
    /// A single retry-free engine call; on success the destination contains
    /// exactly the selected stream's bytes.
    ///
    /// # Errors
    ///
    /// This function will return an error if the engine could not be spawned,
    /// timed out, or failed to retrieve the stream.
    pub async fn fetch_stream(
        &self,
        url: &str,
        format_selector: &str,
        options: &ExtractorOptions,
        destination: &Path,
    ) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Fetching stream {} of {} to {:?}",
            format_selector,
            url,
            destination
        );

        let retrieval = options.clone().with_retrieval(format_selector, destination);

        let mut args = self.args.clone();
        args.append(&mut utils::to_owned(vec!["--no-progress", "--no-warnings"]));
        args.append(&mut retrieval.to_args()?);
        args.push(url.to_string());

        let executor = Executor {
            executable_path: self.binaries.extractor.clone(),
            timeout: self.timeout,
            args,
        };

        let output = executor.run().await?;
        if output.code != 0 {
            return Err(Error::Download(output.stderr.trim().to_string()));
        }

        Ok(())
    }
}
