#![doc = include_str!("../README.md")]

use crate::deps::Binaries;
use crate::error::Result;
use crate::extractor::ExtractorOptions;
use crate::workspace::{JobPaths, Workspace};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod catalog;
pub mod deps;
pub mod error;
pub mod executor;
pub mod extractor;
pub mod muxer;
pub mod pipeline;
pub mod service;
pub mod streamer;
pub mod utils;
pub mod workspace;

/// Where the extraction engine's credential file comes from.
///
/// Credential content supplied out-of-band is materialized into each job's
/// workspace, so concurrent requests never contend on a shared file. A
/// fallback file on disk is handed to the engine as-is and never deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CredentialSource {
    /// No credentials are supplied.
    #[default]
    None,
    /// Credential content provided out-of-band, written per job.
    Content(String),
    /// An existing credential file on disk, used as-is.
    File(PathBuf),
}

impl CredentialSource {
    /// Reads the source from the environment: the `COOKIES_CONTENT`
    /// variable wins, else a `cookies.txt` next to the process, else none.
    pub fn from_env() -> Self {
        if let Ok(content) = std::env::var("COOKIES_CONTENT") {
            if !content.is_empty() {
                return Self::Content(content);
            }
        }

        let fallback = PathBuf::from("cookies.txt");
        if fallback.exists() {
            return Self::File(fallback);
        }

        Self::None
    }
}

/// A media acquisition service driving two external executables: an
/// extraction engine that resolves URLs and retrieves streams, and a
/// combiner that merges a video file and an audio file into one container.
///
/// The service owns a workspace of job-namespaced temporary files; nothing
/// a request creates outlives the request. The two operations — listing a
/// URL's downloadable formats and downloading-then-merging a chosen pair of
/// streams — live in the [`service`] module.
///
/// Jobs are independent: each request runs on its caller's task, and no
/// queue bounds how many run at once. Admission control is left to the
/// embedding application.
///
/// # Examples
///
/// ```rust,no_run
/// # use fetchmux::FetchMux;
/// # use fetchmux::deps::Binaries;
/// # use std::path::PathBuf;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let binaries = Binaries::in_dir(PathBuf::from("libs"));
/// let service = FetchMux::new(binaries, "/tmp/fetchmux")?;
///
/// let health = service.health().await;
/// println!("combiner: {:?}", health.combiner);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct FetchMux {
    /// The external executables.
    pub binaries: Binaries,
    /// The workspace holding job files.
    pub workspace: Workspace,
    /// Extra arguments passed to every extraction engine call.
    pub args: Vec<String>,
    /// The timeout for external command execution.
    pub timeout: Duration,
    /// Where engine credentials come from.
    pub credentials: CredentialSource,
}

impl fmt::Display for FetchMux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FetchMux: workspace={:?}, args={:?}",
            self.workspace.root(),
            self.args
        )
    }
}

impl FetchMux {
    /// Creates a new service around the given executables and workspace
    /// root.
    ///
    /// # Arguments
    ///
    /// * `binaries` - The extraction engine and combiner executables.
    /// * `workspace_root` - The directory for job files, created if absent.
    ///
    /// # Errors
    ///
    /// This function will return an error if the workspace root could not
    /// be created.
    pub fn new(binaries: Binaries, workspace_root: impl AsRef<Path>) -> Result<Self> {
        #[cfg(feature = "tracing")]
        tracing::debug!("Creating a new acquisition service");

        Ok(Self {
            binaries,
            workspace: Workspace::new(workspace_root)?,
            args: Vec::new(),
            timeout: Duration::from_secs(600),
            credentials: CredentialSource::None,
        })
    }

    /// Adds arguments to pass to every extraction engine call.
    pub fn with_args(&mut self, mut args: Vec<String>) -> &mut Self {
        self.args.append(&mut args);
        self
    }

    /// Adds an argument to pass to every extraction engine call.
    pub fn with_arg(&mut self, arg: impl AsRef<str>) -> &mut Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Sets the timeout for external command execution.
    pub fn with_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }

    /// Sets where engine credentials come from.
    pub fn with_credentials(&mut self, credentials: CredentialSource) -> &mut Self {
        self.credentials = credentials;
        self
    }

    /// Builds the engine options for one request, materializing job-scoped
    /// credentials when content was supplied.
    pub(crate) async fn request_options(
        &self,
        proxy: Option<String>,
        paths: &JobPaths,
    ) -> Result<ExtractorOptions> {
        let cookies = match &self.credentials {
            CredentialSource::Content(content) => {
                Some(self.workspace.materialize_cookies(paths, content).await?)
            }
            CredentialSource::File(path) => Some(path.clone()),
            CredentialSource::None => None,
        };

        Ok(ExtractorOptions::new(proxy, cookies))
    }
}
