//! Wire types for the metadata search/apply endpoints.
//!
//! Audio goes through MusicBrainz, video through TMDB.  Candidates are
//! read-only result records; a search response replaces a session's
//! candidate list wholesale.

use serde::{Deserialize, Serialize};

/// Which metadata backend a file resolves against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// TMDB search flavour.  Serialized as the API's `type` values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum VideoKind {
    #[default]
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv")]
    Series,
}

impl VideoKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Series => "TV series",
        }
    }
}

/// One MusicBrainz release offered for selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AudioCandidate {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tracks: Option<u32>,
    /// Total release length in milliseconds.
    #[serde(default, rename = "duration")]
    pub duration_ms: Option<u64>,
}

/// One TMDB movie/series offered for selection.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoCandidate {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub local_poster: Option<String>,
}

/// A metadata record offered for user selection, keyed by media kind.
#[derive(Debug, Clone)]
pub enum Candidate {
    Audio(AudioCandidate),
    Video(VideoCandidate),
}

impl Candidate {
    pub fn id(&self) -> String {
        match self {
            Self::Audio(a) => a.id.clone(),
            Self::Video(v) => v.id.to_string(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Audio(a) => &a.title,
            Self::Video(v) => &v.title,
        }
    }
}

// ── MusicBrainz ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MusicBrainzSearchRequest {
    /// Optional — the backend falls back to the stored .mbquery disc data.
    pub artist: String,
    pub album: String,
    pub iso_path: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MusicBrainzSearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<AudioCandidate>,
    /// True when the backend answered from the stored disc query.
    #[serde(default)]
    pub used_mbquery: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MusicBrainzApplyRequest {
    pub iso_path: String,
    pub release_id: String,
}

// ── TMDB ─────────────────────────────────────────────────────────────────────

/// TMDB search body.  Two shapes share the endpoint: the automatic search
/// sends the raw ISO filename (the backend derives and caches the query),
/// a manual re-search sends an explicit title + type.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TmdbSearchRequest {
    ByFilename {
        iso_filename: String,
    },
    ByTitle {
        title: String,
        #[serde(rename = "type")]
        kind: VideoKind,
    },
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Vec<VideoCandidate>,
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub media_type: Option<VideoKind>,
    #[serde(default)]
    pub search_term: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TmdbApplyRequest {
    pub iso_path: String,
    pub tmdb_id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    /// The web UI never renames; keep the contract byte-identical.
    pub rename_iso: bool,
}

/// Shared apply response shape for both backends.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ApplyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Release length for display: H:MM:SS above an hour, MM:SS below.
pub fn format_duration_ms(ms: u64) -> String {
    let total = ms / 1000;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmdb_search_bodies() {
        let auto = TmdbSearchRequest::ByFilename {
            iso_filename: "foo_2019.iso".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&auto).unwrap(),
            r#"{"iso_filename":"foo_2019.iso"}"#
        );

        let manual = TmdbSearchRequest::ByTitle {
            title: "Foo".to_string(),
            kind: VideoKind::Series,
        };
        assert_eq!(
            serde_json::to_string(&manual).unwrap(),
            r#"{"title":"Foo","type":"tv"}"#
        );
    }

    #[test]
    fn tmdb_apply_never_renames() {
        let req = TmdbApplyRequest {
            iso_path: "/archive/dvd/foo.iso".to_string(),
            tmdb_id: 42,
            title: "Foo".to_string(),
            kind: VideoKind::Movie,
            rename_iso: false,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""rename_iso":false"#));
        assert!(json.contains(r#""type":"movie""#));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration_ms(3_723_000), "01:02:03");
        assert_eq!(format_duration_ms(245_000), "04:05");
        assert_eq!(format_duration_ms(0), "00:00");
    }

    #[test]
    fn search_response_defaults() {
        let r: MusicBrainzSearchResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(r.success);
        assert!(r.results.is_empty());
        assert!(!r.used_mbquery);
    }
}
