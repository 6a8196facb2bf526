//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this for backend state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use chrono::{DateTime, Local};
use d2iso_proto::archive::{ArchiveResponse, IsoFile};
use d2iso_proto::status::{ProgressView, ServiceView, StatusResponse};

use crate::resolver::Resolver;

/// One row of the flattened archive listing, tagged with the bucket the
/// ripper sorted it into.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub file: IsoFile,
    pub section: &'static str,
}

/// Flatten the grouped archive response into display order.
pub fn flatten_archive(resp: &ArchiveResponse) -> Vec<ArchiveEntry> {
    let sections: [(&'static str, &Vec<IsoFile>); 4] = [
        ("audio", &resp.by_type.audio),
        ("dvd", &resp.by_type.dvd),
        ("bluray", &resp.by_type.bluray),
        ("data", &resp.by_type.data),
    ];
    let mut out = Vec::with_capacity(resp.total as usize);
    for (section, files) in sections {
        for file in files {
            out.push(ArchiveEntry {
                file: file.clone(),
                section,
            });
        }
    }
    out
}

/// The full shared state of the application.
/// Components read this; only the App event-loop writes to it.
pub struct AppState {
    // ── Backend status (latest accepted poll) ──────────────────────────────
    pub status: StatusResponse,
    pub service: ServiceView,
    pub progress: ProgressView,
    /// False until the first poll succeeds, and after a poll fails.
    pub connected: bool,
    pub error_message: Option<String>,
    pub last_status_at: Option<DateTime<Local>>,

    // ── Archive ────────────────────────────────────────────────────────────
    pub archive: Vec<ArchiveEntry>,
    pub archive_total: u64,

    // ── Metadata resolver session ──────────────────────────────────────────
    pub resolver: Resolver,

    // ── UI ─────────────────────────────────────────────────────────────────
    pub show_keys: bool,
    pub backend_url: String,
}

impl AppState {
    pub fn new(backend_url: String, show_keys: bool) -> Self {
        Self {
            status: StatusResponse::default(),
            service: ServiceView::default(),
            progress: ProgressView::default(),
            connected: false,
            error_message: None,
            last_status_at: None,
            archive: Vec::new(),
            archive_total: 0,
            resolver: Resolver::new(),
            show_keys,
            backend_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_preserves_bucket_order() {
        let mut resp = ArchiveResponse::default();
        resp.by_type.dvd.push(IsoFile {
            name: "movie.iso".to_string(),
            ..Default::default()
        });
        resp.by_type.audio.push(IsoFile {
            name: "album.iso".to_string(),
            ..Default::default()
        });
        resp.total = 2;

        let flat = flatten_archive(&resp);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].section, "audio");
        assert_eq!(flat[0].file.name, "album.iso");
        assert_eq!(flat[1].section, "dvd");
    }
}
