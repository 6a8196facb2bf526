//! Archive listing contract (`GET /api/archive`) and per-file helpers.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::metadata::MediaKind;

/// Timestamp format the backend emits: naive local time, no offset.
const BACKEND_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn de_backend_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        NaiveDateTime::parse_from_str(&s, BACKEND_TIME_FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(&s).ok().map(|dt| dt.naive_local()))
    }))
}

/// The .nfo metadata map is assembled line-by-line on the backend, so
/// numeric values arrive as strings ("tracks": "12").  Unparseable text
/// degrades to `None` instead of failing the whole archive fetch.
fn de_lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }
    Ok(match Option::<Raw<T>>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// One ISO in the archive.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IsoFile {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub size: u64,
    /// Modification timestamp ("2024-01-02 03:04:05" as the backend
    /// sends it; an unparseable value degrades to `None`).
    #[serde(default, deserialize_with = "de_backend_time")]
    pub modified: Option<NaiveDateTime>,
    /// Embedded metadata summary, present once a .nfo exists for the file.
    #[serde(default)]
    pub metadata: Option<IsoMetadata>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Metadata summary attached to an archived ISO.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IsoMetadata {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub tracks: Option<u32>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub runtime: Option<u32>,
    #[serde(default, deserialize_with = "de_lenient_number")]
    pub rating: Option<f64>,
}

/// Archive files grouped by disc type.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveByType {
    #[serde(default)]
    pub audio: Vec<IsoFile>,
    #[serde(default)]
    pub dvd: Vec<IsoFile>,
    #[serde(default)]
    pub bluray: Vec<IsoFile>,
    #[serde(default)]
    pub data: Vec<IsoFile>,
}

/// Full `/api/archive` response body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub by_type: ArchiveByType,
}

impl IsoFile {
    /// Media kind inferred from the archive path segment the ripper sorts
    /// files into.  Data discs have no metadata workflow.
    pub fn media_kind(&self) -> Option<MediaKind> {
        if self.path.contains("/audio/") {
            Some(MediaKind::Audio)
        } else if self.path.contains("/dvd/") || self.path.contains("/bd/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// True when the file still carries an auto-generated name or has no
    /// metadata record — the candidates for the resolver workflow.
    pub fn needs_metadata(&self) -> bool {
        self.name.starts_with("Disc_") || self.name.starts_with("disc_") || self.metadata.is_none()
    }

    /// True when the metadata resolver can be opened for this file.
    pub fn metadata_eligible(&self) -> bool {
        self.needs_metadata() && self.media_kind().is_some()
    }
}

/// Timestamp rendering matching the web UI ("02.01.2024 03:04").
pub fn format_date(dt: &NaiveDateTime) -> String {
    dt.format("%d.%m.%Y %H:%M").to_string()
}

/// Human-readable size, matching the web UI's rendering ("1.5 KB").
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{} {}", rounded as u64, UNITS[exp])
    } else {
        format!("{} {}", rounded, UNITS[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iso(name: &str, path: &str) -> IsoFile {
        IsoFile {
            name: name.to_string(),
            path: path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn media_kind_from_path_segment() {
        assert_eq!(
            iso("a.iso", "/archive/audio/a.iso").media_kind(),
            Some(MediaKind::Audio)
        );
        assert_eq!(
            iso("b.iso", "/archive/dvd/b.iso").media_kind(),
            Some(MediaKind::Video)
        );
        assert_eq!(
            iso("c.iso", "/archive/bd/c.iso").media_kind(),
            Some(MediaKind::Video)
        );
        assert_eq!(iso("d.iso", "/archive/data/d.iso").media_kind(), None);
    }

    #[test]
    fn needs_metadata_heuristic() {
        assert!(iso("Disc_2024_01_01.iso", "/archive/dvd/x.iso").needs_metadata());
        assert!(iso("disc_0001.iso", "/archive/audio/x.iso").needs_metadata());
        // Named but still no metadata record.
        assert!(iso("some_movie.iso", "/archive/dvd/x.iso").needs_metadata());
        let mut named = iso("some_movie.iso", "/archive/dvd/x.iso");
        named.metadata = Some(IsoMetadata::default());
        assert!(!named.needs_metadata());
        // Data discs are never eligible even when unnamed.
        assert!(!iso("Disc_1.iso", "/archive/data/x.iso").metadata_eligible());
    }

    #[test]
    fn backend_archive_payload_deserializes() {
        // Literal shape of get_iso_files_by_type: naive local timestamps
        // and an all-string .nfo metadata map.
        let raw = r#"{
            "total": 2,
            "by_type": {
                "audio": [{
                    "name": "Disc_2024_01_02.iso",
                    "path": "/archive/audio/Disc_2024_01_02.iso",
                    "size": 734003200,
                    "created": "2024-01-02 03:04:05",
                    "modified": "2024-01-02 03:04:05",
                    "metadata": {
                        "type": "audio",
                        "title": "Some Album",
                        "tracks": "12",
                        "rating": "7.5"
                    }
                }],
                "dvd": [{
                    "name": "movie.iso",
                    "path": "/archive/dvd/movie.iso",
                    "size": 4700000000,
                    "modified": "2023-11-30 18:00:00"
                }]
            }
        }"#;
        let resp: ArchiveResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.total, 2);

        let audio = &resp.by_type.audio[0];
        assert!(audio.modified.is_some());
        let meta = audio.metadata.as_ref().unwrap();
        assert_eq!(meta.tracks, Some(12));
        assert_eq!(meta.rating, Some(7.5));

        assert_eq!(resp.by_type.dvd[0].size, 4_700_000_000);
    }

    #[test]
    fn malformed_values_degrade_instead_of_failing() {
        let raw = r#"{
            "name": "x.iso",
            "path": "/archive/audio/x.iso",
            "modified": "unknown",
            "metadata": {"type": "audio", "tracks": "twelve", "runtime": 95}
        }"#;
        let file: IsoFile = serde_json::from_str(raw).unwrap();
        assert!(file.modified.is_none());
        let meta = file.metadata.unwrap();
        assert_eq!(meta.tracks, None);
        // Plain numbers still accepted.
        assert_eq!(meta.runtime, Some(95));
    }

    #[test]
    fn format_date_matches_web_ui() {
        let dt = NaiveDateTime::parse_from_str("2024-01-02 03:04:05", BACKEND_TIME_FORMAT).unwrap();
        assert_eq!(format_date(&dt), "02.01.2024 03:04");
    }

    #[test]
    fn format_bytes_matches_web_ui() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1 MB");
        assert_eq!(format_bytes(4_700_000_000), "4.38 GB");
    }
}
