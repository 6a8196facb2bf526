//! Action enum — all user-initiated intents and internal events.

use d2iso_proto::metadata::{MediaKind, VideoKind};

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    StatusPanel,
    ArchiveList,
    MetadataModal,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),
    /// Result-list navigation inside the metadata popup.
    SelectUp(usize),
    SelectDown(usize),

    // ── Data refresh ─────────────────────────────────────────────────────────
    PollNow,
    RefreshArchive,

    // ── Metadata resolver ────────────────────────────────────────────────────
    /// Open a resolver session for an archive file.
    OpenResolver { path: String, kind: MediaKind },
    /// Manual MusicBrainz search with user-entered criteria.
    SearchAudio { artist: String, album: String },
    /// Manual TMDB re-search with explicit title + type.
    SearchVideo { title: String, kind: VideoKind },
    /// Apply the selected candidate.
    ApplySelected,
    CloseResolver,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleHelp,
    ToggleKeys,

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
