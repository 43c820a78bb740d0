//! Normalization of the engine's format listing into a catalog.

use crate::FetchMux;
use crate::error::Result;
use crate::extractor::{ExtractorOptions, RawFormat, RawMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of payload a downloadable stream variant carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    /// A video track without audio.
    Video,
    /// An audio track without video.
    Audio,
    /// A single stream carrying both tracks.
    Combined,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamType::Video => write!(f, "video"),
            StreamType::Audio => write!(f, "audio"),
            StreamType::Combined => write!(f, "combined"),
        }
    }
}

/// One downloadable stream variant, normalized for catalog responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// The engine's opaque identifier for the stream.
    pub format_id: String,
    /// The container extension, possibly empty.
    #[serde(rename = "ext")]
    pub container_ext: String,
    /// The display resolution, `"WxH"` with `"?"` for unknown dimensions.
    pub resolution: String,
    /// The engine's annotation, with a bitrate suffix when one is known.
    pub note: String,
    /// The kind of payload the stream carries.
    #[serde(rename = "type")]
    pub stream_type: StreamType,
    /// The size in bytes, if known.
    pub filesize: Option<u64>,
    /// The height in pixels, 0 when unknown.
    pub height: u32,
}

/// The normalized catalog for a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// The display title of the media.
    pub title: String,
    /// The chosen thumbnail URL, possibly empty.
    pub thumbnail: String,
    /// The stream variants, ordered by height descending.
    pub formats: Vec<FormatDescriptor>,
}

/// Classifies a raw record by the presence of its codecs.
///
/// A codec counts as present when the field is set, non-empty and not the
/// engine's `"none"` sentinel. Records with neither codec are dropped.
fn classify(format: &RawFormat) -> Option<StreamType> {
    let has_video = format
        .vcodec
        .as_deref()
        .is_some_and(|codec| !codec.is_empty() && codec != "none");
    let has_audio = format
        .acodec
        .as_deref()
        .is_some_and(|codec| !codec.is_empty() && codec != "none");

    match (has_video, has_audio) {
        (true, false) => Some(StreamType::Video),
        (false, true) => Some(StreamType::Audio),
        (true, true) => Some(StreamType::Combined),
        (false, false) => None,
    }
}

fn dimension(value: Option<u32>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}

/// Normalizes one raw record, or drops it when it carries no codec at all.
fn describe(format: &RawFormat) -> Option<FormatDescriptor> {
    let stream_type = classify(format)?;
    let height = format.height.unwrap_or(0);

    let resolution = format
        .resolution
        .clone()
        .filter(|resolution| !resolution.is_empty())
        .unwrap_or_else(|| format!("{}x{}", dimension(format.width), height));

    let mut note = format.format_note.clone().unwrap_or_default();
    if let Some(tbr) = format.tbr {
        if tbr > 0.0 {
            note = format!("{} ({}kbps)", note, tbr as u64).trim().to_string();
        }
    }

    Some(FormatDescriptor {
        format_id: format.format_id.clone(),
        container_ext: format.ext.clone().unwrap_or_default(),
        resolution,
        note,
        stream_type,
        filesize: format.filesize,
        height,
    })
}

/// Synthesizes the single combined descriptor for sources that expose one
/// direct retrievable URL instead of a per-format listing.
fn synthesize_direct(metadata: &RawMetadata) -> FormatDescriptor {
    FormatDescriptor {
        format_id: "default".to_string(),
        container_ext: metadata.ext.clone().unwrap_or_else(|| "mp4".to_string()),
        resolution: format!(
            "{}x{}",
            dimension(metadata.width),
            dimension(metadata.height)
        ),
        note: "Default Source".to_string(),
        stream_type: StreamType::Combined,
        filesize: metadata.filesize,
        height: metadata.height.unwrap_or(0),
    }
}

/// Picks the thumbnail to report: the explicit field when present, else the
/// last element of the thumbnails sequence. Most engines order thumbnails
/// ascending by resolution, so the last one tends to be the sharpest; this
/// is a heuristic, not a contract.
fn select_thumbnail(metadata: &RawMetadata) -> String {
    if let Some(thumbnail) = metadata
        .thumbnail
        .clone()
        .filter(|thumbnail| !thumbnail.is_empty())
    {
        return thumbnail;
    }

    metadata
        .thumbnails
        .last()
        .and_then(|thumbnail| thumbnail.url.clone())
        .unwrap_or_default()
}

/// Builds the normalized catalog from the engine's metadata document.
///
/// Records are classified per their codecs, annotated with a bitrate suffix
/// when one is known, and stably sorted by height descending.
pub fn build_catalog(metadata: &RawMetadata) -> Catalog {
    let title = metadata
        .title
        .clone()
        .unwrap_or_else(|| "Unknown Title".to_string());
    let thumbnail = select_thumbnail(metadata);

    let mut formats: Vec<FormatDescriptor> = metadata.formats.iter().filter_map(describe).collect();

    if metadata.formats.is_empty() && metadata.url.is_some() {
        formats.push(synthesize_direct(metadata));
    }

    formats.sort_by(|a, b| b.height.cmp(&a.height));

    Catalog {
        title,
        thumbnail,
        formats,
    }
}

impl FetchMux {
    /// Resolves a URL into its normalized format catalog.
    ///
    /// # Errors
    ///
    /// This function will return an error if the extraction engine cannot
    /// resolve the URL.
    pub async fn extract(&self, url: &str, options: &ExtractorOptions) -> Result<Catalog> {
        let metadata = self.probe_metadata(url, options).await?;
        Ok(build_catalog(&metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::RawThumbnail;

    fn record(format_id: &str, vcodec: Option<&str>, acodec: Option<&str>) -> RawFormat {
        RawFormat {
            format_id: format_id.to_string(),
            vcodec: vcodec.map(String::from),
            acodec: acodec.map(String::from),
            ..RawFormat::default()
        }
    }

    #[test]
    fn classification_follows_the_codec_table() {
        assert_eq!(
            classify(&record("v", Some("avc1"), Some("none"))),
            Some(StreamType::Video)
        );
        assert_eq!(
            classify(&record("a", Some("none"), Some("mp4a"))),
            Some(StreamType::Audio)
        );
        assert_eq!(
            classify(&record("c", Some("avc1"), Some("mp4a"))),
            Some(StreamType::Combined)
        );
        assert_eq!(classify(&record("n", Some("none"), Some("none"))), None);
        assert_eq!(classify(&record("m", None, None)), None);
        assert_eq!(classify(&record("e", Some(""), Some(""))), None);
    }

    #[test]
    fn codecless_records_are_absent_from_the_catalog() {
        let metadata = RawMetadata {
            formats: vec![
                record("sb0", Some("none"), Some("none")),
                record("140", Some("none"), Some("mp4a")),
            ],
            ..RawMetadata::default()
        };

        let catalog = build_catalog(&metadata);
        assert_eq!(catalog.formats.len(), 1);
        assert_eq!(catalog.formats[0].format_id, "140");
    }

    #[test]
    fn formats_sort_by_height_descending() {
        let mut metadata = RawMetadata::default();
        for (format_id, height) in [("a", 720), ("b", 1080), ("c", 480)] {
            let mut format = record(format_id, Some("avc1"), Some("none"));
            format.height = Some(height);
            metadata.formats.push(format);
        }

        let catalog = build_catalog(&metadata);
        let heights: Vec<u32> = catalog.formats.iter().map(|f| f.height).collect();
        assert_eq!(heights, vec![1080, 720, 480]);
    }

    #[test]
    fn equal_heights_preserve_input_order() {
        let mut metadata = RawMetadata::default();
        for format_id in ["first", "second", "third"] {
            let mut format = record(format_id, Some("avc1"), Some("none"));
            format.height = Some(720);
            metadata.formats.push(format);
        }

        let catalog = build_catalog(&metadata);
        let ids: Vec<&str> = catalog
            .formats
            .iter()
            .map(|f| f.format_id.as_str())
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn a_known_bitrate_is_appended_to_the_note() {
        let mut format = record("140", Some("none"), Some("mp4a"));
        format.format_note = Some("medium".to_string());
        format.tbr = Some(129.4);

        let descriptor = describe(&format).unwrap();
        assert_eq!(descriptor.note, "medium (129kbps)");
    }

    #[test]
    fn a_bitrate_without_a_note_is_trimmed() {
        let mut format = record("140", Some("none"), Some("mp4a"));
        format.tbr = Some(64.9);

        let descriptor = describe(&format).unwrap();
        assert_eq!(descriptor.note, "(64kbps)");
    }

    #[test]
    fn missing_dimensions_fall_back_to_placeholders() {
        let format = record("140", Some("none"), Some("mp4a"));

        let descriptor = describe(&format).unwrap();
        assert_eq!(descriptor.resolution, "?x0");
        assert_eq!(descriptor.height, 0);
    }

    #[test]
    fn a_direct_url_synthesizes_one_combined_descriptor() {
        let metadata = RawMetadata {
            title: Some("clip".to_string()),
            url: Some("https://cdn.example.com/clip".to_string()),
            ext: None,
            width: Some(640),
            ..RawMetadata::default()
        };

        let catalog = build_catalog(&metadata);
        assert_eq!(catalog.formats.len(), 1);

        let format = &catalog.formats[0];
        assert_eq!(format.format_id, "default");
        assert_eq!(format.container_ext, "mp4");
        assert_eq!(format.resolution, "640x?");
        assert_eq!(format.note, "Default Source");
        assert_eq!(format.stream_type, StreamType::Combined);
    }

    #[test]
    fn no_listing_and_no_direct_url_yields_an_empty_catalog() {
        let metadata = RawMetadata {
            title: Some("members only".to_string()),
            ..RawMetadata::default()
        };

        let catalog = build_catalog(&metadata);
        assert!(catalog.formats.is_empty());
        assert_eq!(catalog.title, "members only");
    }

    #[test]
    fn a_missing_title_gets_the_default() {
        let catalog = build_catalog(&RawMetadata::default());
        assert_eq!(catalog.title, "Unknown Title");
    }

    #[test]
    fn the_explicit_thumbnail_wins_over_the_sequence() {
        let metadata = RawMetadata {
            thumbnail: Some("https://img.example.com/max.jpg".to_string()),
            thumbnails: vec![RawThumbnail {
                url: Some("https://img.example.com/small.jpg".to_string()),
                ..RawThumbnail::default()
            }],
            ..RawMetadata::default()
        };

        assert_eq!(select_thumbnail(&metadata), "https://img.example.com/max.jpg");
    }

    #[test]
    fn the_last_thumbnail_is_used_as_fallback() {
        let thumbnails = ["small", "medium", "large"]
            .into_iter()
            .map(|name| RawThumbnail {
                url: Some(format!("https://img.example.com/{name}.jpg")),
                ..RawThumbnail::default()
            })
            .collect();
        let metadata = RawMetadata {
            thumbnails,
            ..RawMetadata::default()
        };

        assert_eq!(
            select_thumbnail(&metadata),
            "https://img.example.com/large.jpg"
        );
    }

    #[test]
    fn no_thumbnail_information_yields_an_empty_string() {
        assert_eq!(select_thumbnail(&RawMetadata::default()), "");
    }
}
