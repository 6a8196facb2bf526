//! Metadata resolution workflow — the state machine behind the modal.
//!
//! One session at a time: opening a new session implicitly discards the
//! old one.  The resolver is pure — it never performs I/O itself.  Every
//! transition returns `Effect`s (search/apply requests, archive refresh)
//! that the app event-loop executes; async results come back through
//! `on_search_result` / `on_apply_result` stamped with the session epoch,
//! so a superseded session's response is detected and dropped instead of
//! overwriting newer state.
//!
//! States:
//! ```text
//! Closed → Opening → Searching → {NoResults, ManyResults}
//!                         └─(auto video, exactly 1 hit)─→ Applying
//! ManyResults → Applying → AppliedSuccess → Closed (after fixed delay)
//!                     └─(failure)─→ back to ManyResults with inline error
//! ```

use std::time::{Duration, Instant};

use d2iso_proto::metadata::{
    ApplyResponse, Candidate, MediaKind, MusicBrainzSearchResponse, TmdbSearchResponse, VideoKind,
};
use d2iso_proto::titles::{classify_video_kind, extract_display_title};
use tracing::{debug, info, warn};

/// Fixed delay between a successful apply and the session auto-closing.
pub const APPLY_CLOSE_DELAY: Duration = Duration::from_secs(2);

/// Where the workflow currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// No session.
    Closed,
    /// Modal open, waiting for the user to fill search fields (audio path).
    Opening,
    /// A search request is in flight.
    Searching { auto: bool },
    /// Search finished with nothing usable — message + retry affordance.
    NoResults,
    /// Two or more candidates (or one audio candidate) awaiting selection.
    ManyResults,
    /// An apply request is in flight.
    Applying,
    /// Apply succeeded; session closes at `close_at`.
    AppliedSuccess { close_at: Instant },
}

/// Network requests the app must issue on the resolver's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    MusicBrainz {
        iso_path: String,
        artist: String,
        album: String,
    },
    /// Automatic video search keyed off the raw ISO filename.
    TmdbFilename { iso_filename: String },
    /// Manual re-search with explicit title + movie/tv selection.
    TmdbTitle { title: String, kind: VideoKind },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApplyRequest {
    MusicBrainz {
        iso_path: String,
        release_id: String,
    },
    Tmdb {
        iso_path: String,
        tmdb_id: u64,
        title: String,
        kind: VideoKind,
    },
}

/// Side effects requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Search(SearchRequest),
    Apply(ApplyRequest),
    /// Re-fetch the archive listing (after a successful apply).
    RefreshArchive,
}

/// Result of a search task, fed back by the app.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Audio(MusicBrainzSearchResponse),
    Video(TmdbSearchResponse),
    /// Transport or decode failure.
    Failed(String),
}

/// Result of an apply task, fed back by the app.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Done(ApplyResponse),
    Failed(String),
}

/// The in-memory record of which file is being matched and what results
/// have been fetched.  Candidates are replaced wholesale by each search
/// response, never merged.
#[derive(Debug)]
pub struct Resolver {
    phase: Phase,
    /// Incremented on every open/close; stamps in-flight requests.
    epoch: u64,
    target_path: String,
    media_kind: Option<MediaKind>,
    /// Pre-filled title suggestion (video path).
    suggested_title: String,
    /// Default for the movie/tv selector; user may override.
    video_kind: VideoKind,
    candidates: Vec<Candidate>,
    selected: usize,
    /// Inline message shown in the modal (error or status).
    message: Option<String>,
    /// Search answered from the stored .mbquery disc data.
    used_mbquery: bool,
    /// Confirmation text shown while the success-close delay runs.
    success_message: Option<String>,
    /// False when an auto-applying video session has already dismissed the
    /// modal; the apply still runs in the background.
    visible: bool,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            phase: Phase::Closed,
            epoch: 0,
            target_path: String::new(),
            media_kind: None,
            suggested_title: String::new(),
            video_kind: VideoKind::Movie,
            candidates: Vec::new(),
            selected: 0,
            message: None,
            used_mbquery: false,
            success_message: None,
            visible: false,
        }
    }

    // ── Read accessors (for rendering) ───────────────────────────────────────

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_open(&self) -> bool {
        self.phase != Phase::Closed
    }

    /// True when the modal should be drawn.
    pub fn is_visible(&self) -> bool {
        self.is_open() && self.visible
    }

    pub fn target_path(&self) -> &str {
        &self.target_path
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        self.media_kind
    }

    pub fn suggested_title(&self) -> &str {
        &self.suggested_title
    }

    pub fn video_kind(&self) -> VideoKind {
        self.video_kind
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn used_mbquery(&self) -> bool {
        self.used_mbquery
    }

    pub fn success_message(&self) -> Option<&str> {
        self.success_message.as_deref()
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Open a session for `path`.  Any existing session is discarded —
    /// last write wins, in-flight responses of the old session become
    /// stale by epoch.  Video sessions immediately fire the automatic
    /// filename search; audio waits for user-entered criteria.
    pub fn open(&mut self, path: &str, kind: MediaKind) -> Vec<Effect> {
        if self.is_open() {
            debug!("resolver: discarding session for {}", self.target_path);
        }
        self.reset();
        self.epoch += 1;
        self.target_path = path.to_string();
        self.media_kind = Some(kind);
        self.visible = true;

        match kind {
            MediaKind::Audio => {
                self.phase = Phase::Opening;
                Vec::new()
            }
            MediaKind::Video => {
                self.suggested_title = extract_display_title(path);
                self.video_kind = classify_video_kind(path);
                self.phase = Phase::Searching { auto: true };
                let iso_filename = path.rsplit('/').next().unwrap_or(path).to_string();
                info!("resolver: auto TMDB search for {iso_filename}");
                vec![Effect::Search(SearchRequest::TmdbFilename { iso_filename })]
            }
        }
    }

    /// Manual search with user-entered criteria.  Valid whenever the modal
    /// is open and no apply is in flight; replaces any previous results.
    pub fn search_audio(&mut self, artist: &str, album: &str) -> Vec<Effect> {
        if !self.can_search() || self.media_kind != Some(MediaKind::Audio) {
            return Vec::new();
        }
        self.candidates.clear();
        self.message = None;
        self.phase = Phase::Searching { auto: false };
        vec![Effect::Search(SearchRequest::MusicBrainz {
            iso_path: self.target_path.clone(),
            artist: artist.to_string(),
            album: album.to_string(),
        })]
    }

    /// Manual video re-search.  Never auto-applies, even on a single hit.
    pub fn search_video(&mut self, title: &str, kind: VideoKind) -> Vec<Effect> {
        if !self.can_search() || self.media_kind != Some(MediaKind::Video) {
            return Vec::new();
        }
        if title.trim().is_empty() {
            self.message = Some("Please enter a title".to_string());
            return Vec::new();
        }
        self.candidates.clear();
        self.message = None;
        self.video_kind = kind;
        self.phase = Phase::Searching { auto: false };
        vec![Effect::Search(SearchRequest::TmdbTitle {
            title: title.trim().to_string(),
            kind,
        })]
    }

    fn can_search(&self) -> bool {
        matches!(
            self.phase,
            Phase::Opening | Phase::NoResults | Phase::ManyResults | Phase::Searching { .. }
        )
    }

    /// Feed back a completed search.  `epoch` must match the session that
    /// issued the request; stale responses are dropped.
    pub fn on_search_result(&mut self, epoch: u64, outcome: SearchOutcome) -> Vec<Effect> {
        if epoch != self.epoch || !self.is_open() {
            warn!("resolver: dropping stale search response (epoch {epoch})");
            return Vec::new();
        }
        let auto = matches!(self.phase, Phase::Searching { auto: true });

        match outcome {
            SearchOutcome::Failed(err) => {
                self.phase = Phase::NoResults;
                self.message = Some(format!("Search failed: {err}"));
                Vec::new()
            }
            SearchOutcome::Audio(resp) => {
                if !resp.success {
                    self.phase = Phase::NoResults;
                    self.message =
                        Some(resp.message.unwrap_or_else(|| "Search failed".to_string()));
                    return Vec::new();
                }
                self.used_mbquery = resp.used_mbquery;
                self.candidates = resp.results.into_iter().map(Candidate::Audio).collect();
                self.finish_search(auto)
            }
            SearchOutcome::Video(resp) => {
                if !resp.success {
                    self.phase = Phase::NoResults;
                    self.message =
                        Some(resp.message.unwrap_or_else(|| "Search failed".to_string()));
                    return Vec::new();
                }
                if let Some(kind) = resp.media_type {
                    self.video_kind = kind;
                }
                if self.candidates.is_empty() && resp.results.is_empty() {
                    if let Some(term) = resp.search_term {
                        self.message = Some(format!("No matches for \"{term}\""));
                    }
                }
                self.candidates = resp.results.into_iter().map(Candidate::Video).collect();
                self.finish_search(auto)
            }
        }
    }

    fn finish_search(&mut self, auto: bool) -> Vec<Effect> {
        self.selected = 0;
        if self.candidates.is_empty() {
            self.phase = Phase::NoResults;
            if self.message.is_none() {
                self.message = Some("No matches found".to_string());
            }
            return Vec::new();
        }
        // Deliberate UX shortcut: only the automatic video search applies
        // a single hit without confirmation.  Audio and manual searches
        // always require an explicit selection.
        if auto && self.candidates.len() == 1 && self.media_kind == Some(MediaKind::Video) {
            info!("resolver: single auto result, applying directly");
            self.visible = false;
            return self.apply_candidate(0);
        }
        self.phase = Phase::ManyResults;
        self.message = None;
        Vec::new()
    }

    pub fn select_up(&mut self) {
        if self.phase == Phase::ManyResults {
            self.selected = self.selected.saturating_sub(1);
        }
    }

    pub fn select_down(&mut self) {
        if self.phase == Phase::ManyResults && !self.candidates.is_empty() {
            self.selected = (self.selected + 1).min(self.candidates.len() - 1);
        }
    }

    /// Apply the currently selected candidate (user confirmation).
    pub fn apply_selected(&mut self) -> Vec<Effect> {
        if self.phase != Phase::ManyResults {
            return Vec::new();
        }
        self.apply_candidate(self.selected)
    }

    fn apply_candidate(&mut self, index: usize) -> Vec<Effect> {
        let Some(candidate) = self.candidates.get(index) else {
            return Vec::new();
        };
        let request = match candidate {
            Candidate::Audio(a) => ApplyRequest::MusicBrainz {
                iso_path: self.target_path.clone(),
                release_id: a.id.clone(),
            },
            Candidate::Video(v) => ApplyRequest::Tmdb {
                iso_path: self.target_path.clone(),
                tmdb_id: v.id,
                title: v.title.clone(),
                kind: self.video_kind,
            },
        };
        self.message = None;
        self.phase = Phase::Applying;
        vec![Effect::Apply(request)]
    }

    /// Feed back a completed apply.  On success the session lingers for
    /// `APPLY_CLOSE_DELAY` showing the confirmation, then `tick` closes it
    /// and requests an archive refresh.  On failure the session returns to
    /// its pre-apply result state so the user can retry without reopening.
    pub fn on_apply_result(&mut self, epoch: u64, outcome: ApplyOutcome, now: Instant) -> Vec<Effect> {
        if epoch != self.epoch || self.phase != Phase::Applying {
            warn!("resolver: dropping stale apply response (epoch {epoch})");
            return Vec::new();
        }
        let (success, message) = match outcome {
            ApplyOutcome::Done(resp) => (resp.success, resp.message),
            ApplyOutcome::Failed(err) => (false, Some(err)),
        };

        if success {
            self.success_message =
                Some(message.unwrap_or_else(|| "Metadata applied".to_string()));
            self.phase = Phase::AppliedSuccess {
                close_at: now + APPLY_CLOSE_DELAY,
            };
            return Vec::new();
        }

        let err = message.unwrap_or_else(|| "Apply failed".to_string());
        if !self.visible {
            // The auto-apply path already dismissed the modal; nothing to
            // return to, so end the session.  The caller surfaces the error.
            warn!("resolver: background apply failed: {err}");
            self.close();
            return Vec::new();
        }
        self.message = Some(err);
        self.phase = if self.candidates.is_empty() {
            Phase::NoResults
        } else {
            Phase::ManyResults
        };
        Vec::new()
    }

    /// Periodic tick; drives the post-apply close deadline.
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        if let Phase::AppliedSuccess { close_at } = self.phase {
            if now >= close_at {
                self.close();
                return vec![Effect::RefreshArchive];
            }
        }
        Vec::new()
    }

    /// Close from any state.  Bumps the epoch so in-flight responses of
    /// this session are discarded when they land.
    pub fn close(&mut self) {
        self.reset();
        self.epoch += 1;
    }

    fn reset(&mut self) {
        self.phase = Phase::Closed;
        self.target_path.clear();
        self.media_kind = None;
        self.suggested_title.clear();
        self.video_kind = VideoKind::Movie;
        self.candidates.clear();
        self.selected = 0;
        self.message = None;
        self.used_mbquery = false;
        self.success_message = None;
        self.visible = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use d2iso_proto::metadata::{AudioCandidate, VideoCandidate};

    fn video_resp(n: usize) -> TmdbSearchResponse {
        TmdbSearchResponse {
            success: true,
            results: (0..n)
                .map(|i| VideoCandidate {
                    id: 100 + i as u64,
                    title: format!("Result {i}"),
                    year: Some("2015".to_string()),
                    ..Default::default()
                })
                .collect(),
            total_results: n as u64,
            media_type: Some(VideoKind::Series),
            ..Default::default()
        }
    }

    fn audio_resp(n: usize) -> MusicBrainzSearchResponse {
        MusicBrainzSearchResponse {
            success: true,
            results: (0..n)
                .map(|i| AudioCandidate {
                    id: format!("mbid-{i}"),
                    title: format!("Album {i}"),
                    artist: "Artist".to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn ok_apply() -> ApplyOutcome {
        ApplyOutcome::Done(ApplyResponse {
            success: true,
            message: Some("done".to_string()),
        })
    }

    fn failed_apply(msg: &str) -> ApplyOutcome {
        ApplyOutcome::Done(ApplyResponse {
            success: false,
            message: Some(msg.to_string()),
        })
    }

    #[test]
    fn video_open_fires_auto_search_with_raw_filename() {
        let mut r = Resolver::new();
        let effects = r.open("/archive/dvd/foo_season_2_disc_1.iso", MediaKind::Video);
        assert_eq!(r.suggested_title(), "Foo");
        assert_eq!(r.video_kind(), VideoKind::Series);
        assert_eq!(
            effects,
            vec![Effect::Search(SearchRequest::TmdbFilename {
                iso_filename: "foo_season_2_disc_1.iso".to_string()
            })]
        );
        assert!(matches!(r.phase(), Phase::Searching { auto: true }));
    }

    #[test]
    fn audio_open_waits_for_user_criteria() {
        let mut r = Resolver::new();
        let effects = r.open("/archive/audio/Disc_1.iso", MediaKind::Audio);
        assert!(effects.is_empty());
        assert_eq!(*r.phase(), Phase::Opening);
    }

    #[test]
    fn single_auto_video_hit_applies_and_hides_modal() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/heat_1995.iso", MediaKind::Video);
        let epoch = r.epoch();
        let effects = r.on_search_result(epoch, SearchOutcome::Video(video_resp(1)));
        assert_eq!(effects.len(), 1);
        match &effects[0] {
            Effect::Apply(ApplyRequest::Tmdb { tmdb_id, kind, .. }) => {
                assert_eq!(*tmdb_id, 100);
                assert_eq!(*kind, VideoKind::Series);
            }
            other => panic!("expected apply effect, got {other:?}"),
        }
        assert_eq!(*r.phase(), Phase::Applying);
        assert!(!r.is_visible());
    }

    #[test]
    fn single_audio_hit_requires_explicit_selection() {
        let mut r = Resolver::new();
        r.open("/archive/audio/Disc_1.iso", MediaKind::Audio);
        let effects = r.search_audio("Artist", "Album");
        assert_eq!(effects.len(), 1);
        let epoch = r.epoch();
        let effects = r.on_search_result(epoch, SearchOutcome::Audio(audio_resp(1)));
        assert!(effects.is_empty(), "audio must never auto-apply");
        assert_eq!(*r.phase(), Phase::ManyResults);
        assert!(r.is_visible());
    }

    #[test]
    fn manual_video_search_does_not_auto_apply_single_hit() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/foo.iso", MediaKind::Video);
        let epoch = r.epoch();
        // Auto search found nothing, user retries manually.
        r.on_search_result(epoch, SearchOutcome::Video(video_resp(0)));
        assert_eq!(*r.phase(), Phase::NoResults);
        let effects = r.search_video("Foo", VideoKind::Movie);
        assert_eq!(effects.len(), 1);
        let effects = r.on_search_result(epoch, SearchOutcome::Video(video_resp(1)));
        assert!(effects.is_empty());
        assert_eq!(*r.phase(), Phase::ManyResults);
    }

    #[test]
    fn reopen_discards_previous_session() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/first.iso", MediaKind::Video);
        let first_epoch = r.epoch();
        r.on_search_result(first_epoch, SearchOutcome::Video(video_resp(3)));
        assert_eq!(r.candidates().len(), 3);

        r.open("/archive/audio/second.iso", MediaKind::Audio);
        assert_eq!(r.target_path(), "/archive/audio/second.iso");
        assert_eq!(r.media_kind(), Some(MediaKind::Audio));
        assert!(r.candidates().is_empty(), "stale candidates discarded");

        // The first session's late search response must be dropped.
        let effects = r.on_search_result(first_epoch, SearchOutcome::Video(video_resp(5)));
        assert!(effects.is_empty());
        assert!(r.candidates().is_empty());
        assert_eq!(*r.phase(), Phase::Opening);
    }

    #[test]
    fn transport_failure_degrades_to_retryable_state() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/foo.iso", MediaKind::Video);
        let epoch = r.epoch();
        r.on_search_result(epoch, SearchOutcome::Failed("connection refused".to_string()));
        assert_eq!(*r.phase(), Phase::NoResults);
        assert!(r.message().unwrap().contains("connection refused"));
        // Retry is possible from here.
        let effects = r.search_video("Foo", VideoKind::Movie);
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn apply_failure_restores_results_and_allows_retry() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/foo.iso", MediaKind::Video);
        let epoch = r.epoch();
        r.on_search_result(epoch, SearchOutcome::Video(video_resp(3)));
        r.select_down();
        let effects = r.apply_selected();
        assert_eq!(effects.len(), 1);
        assert_eq!(*r.phase(), Phase::Applying);

        let now = Instant::now();
        let effects = r.on_apply_result(epoch, failed_apply("backend says no"), now);
        assert!(effects.is_empty());
        assert_eq!(*r.phase(), Phase::ManyResults);
        assert_eq!(r.candidates().len(), 3);
        assert_eq!(r.selected(), 1);
        assert_eq!(r.message(), Some("backend says no"));

        // Retry without reopening.
        let effects = r.apply_selected();
        assert_eq!(effects.len(), 1);
    }

    #[test]
    fn successful_apply_closes_after_fixed_delay_and_refreshes() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/foo.iso", MediaKind::Video);
        let epoch = r.epoch();
        r.on_search_result(epoch, SearchOutcome::Video(video_resp(2)));
        r.apply_selected();

        let now = Instant::now();
        r.on_apply_result(epoch, ok_apply(), now);
        assert!(matches!(r.phase(), Phase::AppliedSuccess { .. }));
        assert_eq!(r.success_message(), Some("done"));

        // Not yet.
        assert!(r.tick(now + Duration::from_millis(500)).is_empty());
        assert!(r.is_open());

        // Deadline passed: close + refresh.
        let effects = r.tick(now + APPLY_CLOSE_DELAY);
        assert_eq!(effects, vec![Effect::RefreshArchive]);
        assert_eq!(*r.phase(), Phase::Closed);
        assert!(r.target_path().is_empty());
    }

    #[test]
    fn close_invalidates_in_flight_responses() {
        let mut r = Resolver::new();
        r.open("/archive/dvd/foo.iso", MediaKind::Video);
        let epoch = r.epoch();
        r.close();
        let effects = r.on_search_result(epoch, SearchOutcome::Video(video_resp(2)));
        assert!(effects.is_empty());
        assert_eq!(*r.phase(), Phase::Closed);
    }

    #[test]
    fn mbquery_hint_is_surfaced() {
        let mut r = Resolver::new();
        r.open("/archive/audio/Disc_1.iso", MediaKind::Audio);
        r.search_audio("", "");
        let epoch = r.epoch();
        let mut resp = audio_resp(2);
        resp.used_mbquery = true;
        r.on_search_result(epoch, SearchOutcome::Audio(resp));
        assert!(r.used_mbquery());
        assert_eq!(*r.phase(), Phase::ManyResults);
    }

    #[test]
    fn end_to_end_many_results_selection() {
        let mut r = Resolver::new();
        let effects = r.open("/archive/dvd/foo_season_2_disc_1.iso", MediaKind::Video);
        assert_eq!(r.suggested_title(), "Foo");
        assert!(matches!(effects[0], Effect::Search(_)));

        let epoch = r.epoch();
        r.on_search_result(epoch, SearchOutcome::Video(video_resp(3)));
        assert_eq!(*r.phase(), Phase::ManyResults);
        assert_eq!(r.candidates().len(), 3);

        // Pick entry 2 (index 1) and confirm.
        r.select_down();
        let effects = r.apply_selected();
        match &effects[0] {
            Effect::Apply(ApplyRequest::Tmdb { tmdb_id, .. }) => assert_eq!(*tmdb_id, 101),
            other => panic!("expected apply, got {other:?}"),
        }

        let now = Instant::now();
        r.on_apply_result(epoch, ok_apply(), now);
        let effects = r.tick(now + APPLY_CLOSE_DELAY);
        assert_eq!(effects, vec![Effect::RefreshArchive]);
        assert!(!r.is_open());
    }
}
