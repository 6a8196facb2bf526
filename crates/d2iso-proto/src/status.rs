//! Backend status contract and the derivation of what the UI shows.
//!
//! `LiveStatus` is the backend's snapshot of the current rip; it is valid
//! only for the lifetime of one poll response.  `ServiceView` and
//! `ProgressView` are pure functions of one response — recomputed on every
//! poll, never persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Phase of the current rip as reported by the ripper service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiscStatus {
    #[default]
    Idle,
    Waiting,
    WaitingForMetadata,
    Copying,
    Completed,
    Error,
    /// Any status string this client doesn't know.  Tolerated so a newer
    /// backend can't break the whole poll.
    #[serde(other)]
    Unknown,
}

/// Snapshot of the current disc-copy operation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LiveStatus {
    #[serde(default)]
    pub status: DiscStatus,
    /// Rip method (e.g. "ddrescue", "cdparanoia"); "unknown" until a drive
    /// has ever been detected.
    #[serde(default)]
    pub method: String,
    /// Disc type (e.g. "audio-cd", "dvd-video"); "-" or empty when no disc.
    #[serde(default)]
    pub disc_type: String,
    #[serde(default)]
    pub disc_label: Option<String>,
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub progress_mb: f64,
    /// Total MB — or total tracks for audio CDs (the backend substitutes).
    #[serde(default)]
    pub total_mb: f64,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Full `/api/status` response body.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusResponse {
    #[serde(default)]
    pub service_running: bool,
    #[serde(default)]
    pub live_status: LiveStatus,
    #[serde(default)]
    pub iso_count: u64,
    /// Counts per archive bucket ("data", "audio", "dvd", "bluray").
    #[serde(default)]
    pub archive_counts: HashMap<String, u64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub output_dir: Option<String>,
}

/// Display class for the status indicator.  Mirrors the three CSS classes
/// of the original web UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Stopped,
    Copying,
    Running,
}

/// Derived display state for the service line: label + indicator class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceView {
    pub label: &'static str,
    pub class: StatusClass,
}

impl Default for ServiceView {
    fn default() -> Self {
        Self {
            label: "Unknown",
            class: StatusClass::Stopped,
        }
    }
}

impl ServiceView {
    /// Map `(service_running, live_status)` to a display state.
    ///
    /// Strict priority chain — first match wins.  A stopped service masks
    /// everything the ripper last wrote.
    pub fn derive(service_running: bool, live: &LiveStatus) -> Self {
        if !service_running {
            return Self {
                label: "Service stopped",
                class: StatusClass::Stopped,
            };
        }
        match live.status {
            DiscStatus::Idle => {
                if live.method.is_empty() || live.method == "unknown" {
                    Self {
                        label: "No drive detected",
                        class: StatusClass::Stopped,
                    }
                } else {
                    Self {
                        label: "Waiting for media...",
                        class: StatusClass::Stopped,
                    }
                }
            }
            DiscStatus::Waiting => Self {
                label: "Analyzing media...",
                class: StatusClass::Stopped,
            },
            DiscStatus::WaitingForMetadata => Self {
                label: "Waiting for metadata selection...",
                class: StatusClass::Stopped,
            },
            DiscStatus::Copying => Self {
                label: "Copying...",
                class: StatusClass::Copying,
            },
            DiscStatus::Completed => Self {
                label: "Completed",
                class: StatusClass::Running,
            },
            DiscStatus::Error => Self {
                label: "Error occurred",
                class: StatusClass::Stopped,
            },
            DiscStatus::Unknown => Self {
                label: "Unknown",
                class: StatusClass::Stopped,
            },
        }
    }
}

/// Unit shown next to the progress counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUnit {
    Mb,
    Tracks,
}

impl ProgressUnit {
    pub fn label(self) -> &'static str {
        match self {
            Self::Mb => "MB",
            Self::Tracks => "Tracks",
        }
    }
}

/// Derived progress display.  The bar overlay is inverted: it covers the
/// *remaining* portion, so an idle bar shows 100% overlay (fully empty).
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressView {
    pub active: bool,
    pub percent: f64,
    pub done: f64,
    pub total: f64,
    pub eta: Option<String>,
    pub unit: ProgressUnit,
    pub remaining_percent: f64,
}

impl Default for ProgressView {
    fn default() -> Self {
        Self {
            active: false,
            percent: 0.0,
            done: 0.0,
            total: 0.0,
            eta: None,
            unit: ProgressUnit::Mb,
            remaining_percent: 100.0,
        }
    }
}

impl ProgressView {
    /// Progress is shown only while copying with nonzero percent; every
    /// other state resets all four fields to their placeholders.
    pub fn from_live(live: &LiveStatus) -> Self {
        let unit = if live.disc_type == "audio-cd" {
            ProgressUnit::Tracks
        } else {
            ProgressUnit::Mb
        };
        if live.status == DiscStatus::Copying && live.progress_percent > 0.0 {
            let percent = live.progress_percent.clamp(0.0, 100.0);
            Self {
                active: true,
                percent,
                done: live.progress_mb,
                total: live.total_mb,
                eta: live.eta.clone().filter(|e| !e.is_empty()),
                unit,
                remaining_percent: 100.0 - percent,
            }
        } else {
            Self {
                unit,
                ..Self::default()
            }
        }
    }
}

/// Disc mode row: "disc_type (method)", or None when no disc type is known.
pub fn disc_mode_line(live: &LiveStatus) -> Option<String> {
    if live.disc_type.is_empty() || live.disc_type == "-" {
        return None;
    }
    if live.method.is_empty() || live.method == "unknown" {
        Some(live.disc_type.clone())
    } else {
        Some(format!("{} ({})", live.disc_type, live.method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live(status: DiscStatus) -> LiveStatus {
        LiveStatus {
            status,
            method: "ddrescue".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn stopped_service_masks_live_status() {
        for status in [
            DiscStatus::Idle,
            DiscStatus::Copying,
            DiscStatus::Completed,
            DiscStatus::Error,
        ] {
            let view = ServiceView::derive(false, &live(status));
            assert_eq!(view.label, "Service stopped");
            assert_eq!(view.class, StatusClass::Stopped);
        }
    }

    #[test]
    fn idle_without_method_means_no_drive() {
        let mut l = live(DiscStatus::Idle);
        l.method = "unknown".to_string();
        assert_eq!(ServiceView::derive(true, &l).label, "No drive detected");
        l.method = String::new();
        assert_eq!(ServiceView::derive(true, &l).label, "No drive detected");
    }

    #[test]
    fn idle_with_method_waits_for_media() {
        let view = ServiceView::derive(true, &live(DiscStatus::Idle));
        assert_eq!(view.label, "Waiting for media...");
        assert_eq!(view.class, StatusClass::Stopped);
    }

    #[test]
    fn copying_is_the_only_copying_class() {
        assert_eq!(
            ServiceView::derive(true, &live(DiscStatus::Copying)).class,
            StatusClass::Copying
        );
        assert_eq!(
            ServiceView::derive(true, &live(DiscStatus::Completed)).class,
            StatusClass::Running
        );
        assert_eq!(
            ServiceView::derive(true, &live(DiscStatus::Error)).class,
            StatusClass::Stopped
        );
    }

    #[test]
    fn progress_gated_on_copying_with_nonzero_percent() {
        let mut l = live(DiscStatus::Copying);
        l.progress_percent = 42.0;
        l.progress_mb = 1900.0;
        l.total_mb = 4500.0;
        l.eta = Some("12:30".to_string());
        let p = ProgressView::from_live(&l);
        assert!(p.active);
        assert_eq!(p.percent, 42.0);
        assert_eq!(p.remaining_percent, 58.0);
        assert_eq!(p.eta.as_deref(), Some("12:30"));

        // Copying but 0% — still hidden, overlay fully covers the bar.
        l.progress_percent = 0.0;
        let p = ProgressView::from_live(&l);
        assert!(!p.active);
        assert_eq!(p.done, 0.0);
        assert_eq!(p.total, 0.0);
        assert_eq!(p.remaining_percent, 100.0);

        // Completed with stale counters — hidden too.
        l.status = DiscStatus::Completed;
        l.progress_percent = 100.0;
        let p = ProgressView::from_live(&l);
        assert!(!p.active);
        assert_eq!(p.remaining_percent, 100.0);
    }

    #[test]
    fn audio_cd_counts_tracks() {
        let mut l = live(DiscStatus::Copying);
        l.progress_percent = 50.0;
        l.disc_type = "audio-cd".to_string();
        assert_eq!(ProgressView::from_live(&l).unit, ProgressUnit::Tracks);
        l.disc_type = "dvd-video".to_string();
        assert_eq!(ProgressView::from_live(&l).unit, ProgressUnit::Mb);
    }

    #[test]
    fn disc_mode_includes_method_when_known() {
        let mut l = live(DiscStatus::Copying);
        l.disc_type = "dvd-video".to_string();
        assert_eq!(disc_mode_line(&l).as_deref(), Some("dvd-video (ddrescue)"));
        l.method = "unknown".to_string();
        assert_eq!(disc_mode_line(&l).as_deref(), Some("dvd-video"));
        l.disc_type = "-".to_string();
        assert_eq!(disc_mode_line(&l), None);
    }

    #[test]
    fn unknown_status_string_deserializes() {
        let json = r#"{"status":"defragmenting","method":"ddrescue"}"#;
        let l: LiveStatus = serde_json::from_str(json).unwrap();
        assert_eq!(l.status, DiscStatus::Unknown);
        assert_eq!(ServiceView::derive(true, &l).label, "Unknown");
    }

    #[test]
    fn status_response_tolerates_missing_fields() {
        let r: StatusResponse = serde_json::from_str(r#"{"service_running":true}"#).unwrap();
        assert!(r.service_running);
        assert_eq!(r.live_status.status, DiscStatus::Idle);
        assert_eq!(r.iso_count, 0);
    }
}
