//! Streamed delivery of the merged output file.

use crate::error::Result;
use crate::workspace::JobCleanup;
use futures_util::Stream;
use futures_util::stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// The default delivery chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// A finite, single-pass sequence of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// Opens the merged file as a finite, single-pass chunk stream.
///
/// The stream is not restartable. When it is exhausted the job's files are
/// purged; when the consumer drops it mid-delivery (a disconnect, say) the
/// same purge runs through the cleanup guard. Purge errors are suppressed
/// and never surface to the consumer.
///
/// # Arguments
///
/// * `path` - The merged file to deliver.
/// * `chunk_size` - The size of each yielded chunk, in bytes.
/// * `cleanup` - The guard owning the job's files.
///
/// # Errors
///
/// This function will return an error if the merged file could not be opened.
pub async fn stream_file(
    path: impl AsRef<Path>,
    chunk_size: usize,
    cleanup: JobCleanup,
) -> Result<ByteStream> {
    let file = File::open(path.as_ref()).await?;
    let chunk_size = chunk_size.max(1);

    let chunks = stream::unfold(Some((file, cleanup)), move |state| async move {
        let (mut file, cleanup) = state?;

        let mut chunk = vec![0u8; chunk_size];
        match file.read(&mut chunk).await {
            Ok(0) => {
                cleanup.finish().await;
                None
            }
            Ok(read) => {
                chunk.truncate(read);
                Some((Ok(chunk), Some((file, cleanup))))
            }
            Err(error) => {
                cleanup.finish().await;
                Some((Err(error), None))
            }
        }
    });

    Ok(Box::pin(chunks))
}
