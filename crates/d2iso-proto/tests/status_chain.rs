//! Table test of the full status-to-display mapping.
//!
//! Every (service_running, status, method) combination must resolve
//! through the priority chain in order, with the stopped-service case
//! winning over everything.

use d2iso_proto::status::{DiscStatus, LiveStatus, ProgressView, ServiceView, StatusClass};

fn live(status: DiscStatus, method: &str) -> LiveStatus {
    LiveStatus {
        status,
        method: method.to_string(),
        ..Default::default()
    }
}

#[test]
fn priority_chain_full_grid() {
    use DiscStatus::*;
    use StatusClass::*;

    #[rustfmt::skip]
    let cases: &[(bool, DiscStatus, &str, &str, StatusClass)] = &[
        (false, Idle,               "ddrescue", "Service stopped",                   Stopped),
        (false, DiscStatus::Copying, "ddrescue", "Service stopped",                  Stopped),
        (true,  Idle,               "",         "No drive detected",                 Stopped),
        (true,  Idle,               "unknown",  "No drive detected",                 Stopped),
        (true,  Idle,               "ddrescue", "Waiting for media...",              Stopped),
        (true,  Waiting,            "ddrescue", "Analyzing media...",                Stopped),
        (true,  WaitingForMetadata, "ddrescue", "Waiting for metadata selection...", Stopped),
        (true,  DiscStatus::Copying, "ddrescue", "Copying...",                       StatusClass::Copying),
        (true,  Completed,          "ddrescue", "Completed",                         Running),
        (true,  Error,              "ddrescue", "Error occurred",                    Stopped),
        (true,  Unknown,            "ddrescue", "Unknown",                           Stopped),
        // Method only matters in the idle branch.
        (true,  DiscStatus::Copying, "unknown",  "Copying...",                       StatusClass::Copying),
        (true,  Error,              "",         "Error occurred",                    Stopped),
    ];

    for (running, status, method, label, class) in cases {
        let view = ServiceView::derive(*running, &live(*status, method));
        assert_eq!(view.label, *label, "({running}, {status:?}, {method:?})");
        assert_eq!(view.class, *class, "({running}, {status:?}, {method:?})");
    }
}

#[test]
fn progress_visible_only_while_copying() {
    for status in [
        DiscStatus::Idle,
        DiscStatus::Waiting,
        DiscStatus::WaitingForMetadata,
        DiscStatus::Completed,
        DiscStatus::Error,
        DiscStatus::Unknown,
    ] {
        let mut l = live(status, "ddrescue");
        l.progress_percent = 75.0;
        l.progress_mb = 3000.0;
        l.total_mb = 4000.0;
        l.eta = Some("05:00".to_string());
        let p = ProgressView::from_live(&l);
        assert!(!p.active, "{status:?} must not display progress");
        assert_eq!(p.percent, 0.0);
        assert_eq!(p.done, 0.0);
        assert_eq!(p.total, 0.0);
        assert_eq!(p.eta, None);
        assert_eq!(p.remaining_percent, 100.0);
    }

    let mut l = live(DiscStatus::Copying, "ddrescue");
    l.progress_percent = 75.0;
    l.progress_mb = 3000.0;
    l.total_mb = 4000.0;
    let p = ProgressView::from_live(&l);
    assert!(p.active);
    assert_eq!(p.remaining_percent, 25.0);
    assert_eq!(p.done, 3000.0);
    assert_eq!(p.total, 4000.0);
}
