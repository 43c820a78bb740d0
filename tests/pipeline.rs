//! End-to-end pipeline tests against fake collaborator executables.
//!
//! The fake extraction engine answers `--dump-json` probes with a canned
//! document and writes `stream:<format>` bytes for retrieval calls; the
//! fake combiner concatenates its two inputs. Shell scripts stand in for
//! the real binaries, so the suite is unix-only.

#![cfg(unix)]

use fetchmux::deps::Binaries;
use fetchmux::error::{Error, ErrorClass};
use fetchmux::service::{CombinerStatus, DownloadRequest, FormatsRequest};
use fetchmux::{CredentialSource, FetchMux};
use futures_util::StreamExt;
use std::path::{Path, PathBuf};

const PROBE_DOCUMENT: &str = r#"{"title":"Rust In Production: Chapter 1","thumbnail":"https://img.example.com/thumb.jpg","formats":[{"format_id":"137","ext":"mp4","vcodec":"avc1.640028","acodec":"none","height":1080,"width":1920,"format_note":"1080p","tbr":4400.5,"filesize":123456},{"format_id":"140","ext":"m4a","vcodec":"none","acodec":"mp4a.40.2","format_note":"medium","tbr":129.4},{"format_id":"18","ext":"mp4","vcodec":"avc1","acodec":"mp4a","height":360,"width":640},{"format_id":"sb0","ext":"mhtml","vcodec":"none","acodec":"none","height":48}]}"#;

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();

    let mut permissions = std::fs::metadata(&path).unwrap().permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions).unwrap();

    path
}

/// A fake engine: probes print the canned document, retrievals write
/// `stream:<format>` to the `-o` destination.
fn fake_extractor(dir: &Path) -> PathBuf {
    let body = format!(
        r#"#!/bin/sh
json='{PROBE_DOCUMENT}'
case " $* " in
  *" --dump-json "*) printf %s "$json"; exit 0;;
esac
fmt=""
out=""
prev=""
for a in "$@"; do
  [ "$prev" = "-f" ] && fmt="$a"
  [ "$prev" = "-o" ] && out="$a"
  prev="$a"
done
printf "stream:%s" "$fmt" > "$out"
"#
    );

    write_script(dir, "yt-dlp", &body)
}

/// A fake combiner: concatenates the two `-i` inputs into the last argument.
fn fake_combiner(dir: &Path) -> PathBuf {
    let body = r#"#!/bin/sh
[ "$1" = "-version" ] && exit 0
video=""
audio=""
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then
    if [ -z "$video" ]; then video="$a"; else audio="$a"; fi
  fi
  prev="$a"
  out="$a"
done
cat "$video" "$audio" > "$out"
"#;

    write_script(dir, "ffmpeg", body)
}

fn failing_combiner(dir: &Path) -> PathBuf {
    let body = r#"#!/bin/sh
[ "$1" = "-version" ] && exit 0
echo "invalid data found" >&2
exit 2
"#;

    write_script(dir, "ffmpeg", body)
}

fn failing_extractor(dir: &Path) -> PathBuf {
    let body = r#"#!/bin/sh
echo "Unsupported URL: https://example.invalid/clip" >&2
exit 1
"#;

    write_script(dir, "yt-dlp", body)
}

fn download_request() -> DownloadRequest {
    DownloadRequest {
        url: "https://example.com/watch?v=abc".to_string(),
        video_format_id: "137".to_string(),
        audio_format_id: "140".to_string(),
        proxy: None,
    }
}

fn workspace_files(service: &FetchMux) -> Vec<PathBuf> {
    std::fs::read_dir(service.workspace.root())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

#[tokio::test]
async fn formats_are_listed_sorted_and_classified() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let response = service
        .list_formats(FormatsRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            proxy: None,
        })
        .await
        .unwrap();

    assert_eq!(response.status, "success");
    assert_eq!(response.title, "Rust In Production: Chapter 1");
    assert_eq!(response.thumbnail, "https://img.example.com/thumb.jpg");

    // The storyboard record carries no codec at all and must be dropped.
    let ids: Vec<&str> = response
        .formats
        .iter()
        .map(|format| format.format_id.as_str())
        .collect();
    assert_eq!(ids, vec!["137", "18", "140"]);

    assert_eq!(response.formats[0].note, "1080p (4400kbps)");
    assert_eq!(response.formats[0].resolution, "1920x1080");
    assert_eq!(response.formats[2].height, 0);

    // Nothing of the request survives in the workspace.
    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn a_download_is_merged_delivered_and_purged() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let mut service = FetchMux::new(binaries, dir.path().join("work")).unwrap();
    service.with_credentials(CredentialSource::Content("# session cookies".to_string()));

    let mut delivery = service.download_merged(download_request()).await.unwrap();

    assert_eq!(delivery.filename, "Rust In Production Chapter 1.mp4");
    assert_eq!(delivery.media_type, "video/mp4");

    let mut delivered = Vec::new();
    while let Some(chunk) = delivery.stream.next().await {
        delivered.extend_from_slice(&chunk.unwrap());
    }

    assert_eq!(delivered, b"stream:137stream:140");
    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn dropping_the_delivery_mid_stream_still_purges() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let delivery = service.download_merged(download_request()).await.unwrap();

    // The consumer disconnects before reading a single chunk.
    drop(delivery);

    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn a_combiner_failure_surfaces_diagnostics_and_purges() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), failing_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let error = service.download_merged(download_request()).await.unwrap_err();

    match &error {
        Error::Mux { diagnostics } => assert!(diagnostics.contains("invalid data found")),
        other => panic!("expected a mux error, got {other:?}"),
    }
    assert_eq!(error.class(), ErrorClass::Internal);

    // The fetched intermediates are gone despite the failure.
    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn an_unresolvable_url_is_a_client_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(failing_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let error = service
        .list_formats(FormatsRequest {
            url: "https://example.invalid/clip".to_string(),
            proxy: None,
        })
        .await
        .unwrap_err();

    match &error {
        Error::Extraction(message) => assert!(message.contains("Unsupported URL")),
        other => panic!("expected an extraction error, got {other:?}"),
    }
    assert_eq!(error.class(), ErrorClass::ClientInput);
    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn a_failed_retrieval_purges_the_partial_workspace() {
    let dir = tempfile::tempdir().unwrap();

    // Probes succeed, retrievals fail.
    let body = format!(
        r#"#!/bin/sh
json='{PROBE_DOCUMENT}'
case " $* " in
  *" --dump-json "*) printf %s "$json"; exit 0;;
esac
echo "HTTP Error 403: Forbidden" >&2
exit 1
"#
    );
    let extractor = write_script(dir.path(), "yt-dlp", &body);
    let binaries = Binaries::new(extractor, fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let error = service.download_merged(download_request()).await.unwrap_err();

    match &error {
        Error::Download(message) => assert!(message.contains("403")),
        other => panic!("expected a download error, got {other:?}"),
    }
    assert!(workspace_files(&service).is_empty());
}

#[tokio::test]
async fn titles_are_sanitized_for_filenames() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let title = service
        .resolve_title(
            "https://example.com/watch?v=abc",
            &fetchmux::extractor::ExtractorOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(title, "Rust In Production Chapter 1");
}

#[tokio::test]
async fn health_reports_the_combiner_status() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let report = service.health().await;
    assert_eq!(report.status, "healthy");
    assert_eq!(report.combiner, CombinerStatus::Available);

    let missing = Binaries::new(
        fake_extractor(dir.path()),
        dir.path().join("no-such-combiner"),
    );
    let service = FetchMux::new(missing, dir.path().join("work")).unwrap();

    let report = service.health().await;
    assert_eq!(report.combiner, CombinerStatus::NotFound);
}

#[tokio::test]
async fn concurrent_downloads_do_not_collide() {
    let dir = tempfile::tempdir().unwrap();
    let binaries = Binaries::new(fake_extractor(dir.path()), fake_combiner(dir.path()));
    let service = FetchMux::new(binaries, dir.path().join("work")).unwrap();

    let (first, second) = tokio::join!(
        service.download_merged(download_request()),
        service.download_merged(download_request()),
    );

    for delivery in [first.unwrap(), second.unwrap()] {
        let mut stream = delivery.stream;
        let mut delivered = Vec::new();
        while let Some(chunk) = stream.next().await {
            delivered.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(delivered, b"stream:137stream:140");
    }

    assert!(workspace_files(&service).is_empty());
}
