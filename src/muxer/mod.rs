//! Invocation of the external combiner.

use crate::FetchMux;
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::utils;
use crate::utils::file_system;
use std::path::Path;

impl FetchMux {
    /// Merges a fetched video stream and a fetched audio stream into one
    /// playable container.
    ///
    /// The video stream is copied without re-encoding; the audio stream is
    /// re-encoded to AAC. An existing output file is overwritten. On
    /// success both input files are deleted immediately, whatever happens
    /// to the output downstream.
    ///
    /// # Arguments
    ///
    /// * `video` - The fetched video stream file.
    /// * `audio` - The fetched audio stream file.
    /// * `output` - The merged file to produce.
    ///
    /// # Errors
    ///
    /// This function will return an error carrying the combiner's error
    /// output when the combiner exits with a non-zero status or produces an
    /// empty output file.
    pub async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Combining {:?} and {:?} into {:?}",
            video,
            audio,
            output
        );

        let video_path = video
            .to_str()
            .ok_or(Error::Path("Invalid video path".to_string()))?;
        let audio_path = audio
            .to_str()
            .ok_or(Error::Path("Invalid audio path".to_string()))?;
        let output_path = output
            .to_str()
            .ok_or(Error::Path("Invalid output path".to_string()))?;

        let args = vec![
            "-y",
            "-i",
            video_path,
            "-i",
            audio_path,
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            output_path,
        ];

        let executor = Executor {
            executable_path: self.binaries.combiner.clone(),
            timeout: self.timeout,
            args: utils::to_owned(args),
        };

        let result = executor.run().await?;
        if result.code != 0 {
            return Err(Error::Mux {
                diagnostics: result.stderr,
            });
        }

        let produced = tokio::fs::metadata(output)
            .await
            .map(|metadata| metadata.len())
            .unwrap_or(0);
        if produced == 0 {
            return Err(Error::Mux {
                diagnostics: "combiner exited successfully but produced no output".to_string(),
            });
        }

        // The inputs are merged; nothing downstream reads them again.
        file_system::remove_temp_file(video).await;
        file_system::remove_temp_file(audio).await;

        Ok(())
    }

    /// Reports whether the combiner executable is reachable.
    pub async fn combiner_available(&self) -> bool {
        let executor = Executor {
            executable_path: self.binaries.combiner.clone(),
            timeout: self.timeout,
            args: utils::to_owned(vec!["-version"]),
        };

        executor.execute().await.is_ok()
    }
}
