//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Resolver transitions return `Effect`s; App turns them into spawned
//!   HTTP tasks whose results come back stamped with the session epoch.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Paragraph},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use d2iso_proto::archive::ArchiveResponse;
use d2iso_proto::client::ApiClient;
use d2iso_proto::config::Config;
use d2iso_proto::status::{DiscStatus, ProgressView, ServiceView, StatusResponse};

use crate::{
    action::{Action, ComponentId},
    app_state::{flatten_archive, AppState},
    component::Component,
    components::{
        archive_list::ArchiveList, help_overlay::HelpOverlay, metadata_modal::MetadataModal,
        status_panel::StatusPanel,
    },
    poll::PollGate,
    resolver::{ApplyOutcome, ApplyRequest, Effect, SearchOutcome, SearchRequest},
    theme::{C_BG, C_MUTED, C_PRIMARY},
    widgets::toast::{Severity, ToastManager},
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// `/api/status` response, stamped with the poll sequence that issued it.
    StatusFetched(u64, Result<StatusResponse, String>),
    ArchiveLoaded(Result<ArchiveResponse, String>),
    /// Metadata search finished, stamped with the resolver epoch.
    SearchCompleted(u64, SearchOutcome),
    ApplyCompleted(u64, ApplyOutcome),
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    pub state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    status_panel: StatusPanel,
    archive_list: ArchiveList,
    metadata_modal: MetadataModal,
    help_overlay: HelpOverlay,

    focused: ComponentId,

    client: Arc<ApiClient>,
    poll_gate: PollGate,
    poll_interval: Duration,
    archive_refresh: Duration,

    /// Sender for background task results; set once in `run`.
    msg_tx: Option<mpsc::Sender<AppMessage>>,

    toast: ToastManager,
    should_quit: bool,

    /// Last disc status seen — used to detect transitions for toasts.
    prev_disc_status: DiscStatus,
    prev_connected: bool,
}

impl App {
    pub fn new(config: &Config, client: ApiClient) -> Self {
        let state = AppState::new(client.base_url().to_string(), config.ui.show_keys);
        Self {
            state,
            status_panel: StatusPanel::new(),
            archive_list: ArchiveList::new(),
            metadata_modal: MetadataModal::new(),
            help_overlay: HelpOverlay::new(),
            focused: ComponentId::ArchiveList,
            client: Arc::new(client),
            poll_gate: PollGate::new(),
            poll_interval: Duration::from_secs(config.backend.poll_interval_secs.max(1)),
            archive_refresh: Duration::from_secs(config.backend.archive_refresh_secs.max(5)),
            msg_tx: None,
            toast: ToastManager::new(),
            should_quit: false,
            prev_disc_status: DiscStatus::Idle,
            prev_connected: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);
        self.msg_tx = Some(tx.clone());

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut status_poll = tokio::time::interval(self.poll_interval);
        status_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut archive_refresh = tokio::time::interval(self.archive_refresh);
        archive_refresh.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // Toast expiry + resolver close-delay check: 100ms keeps both snappy.
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    // Drain whatever else is queued before redrawing.
                    while let Ok(next) = rx.try_recv() {
                        self.handle_message(next).await;
                    }
                }

                // First tick fires immediately, so the dashboard fills in
                // without waiting a full interval.
                _ = status_poll.tick() => {
                    self.spawn_status_poll();
                }

                _ = archive_refresh.tick() => {
                    self.spawn_archive_fetch();
                }

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    let effects = self.state.resolver.tick(Instant::now());
                    self.run_effects(effects);
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ── Background task spawners ──────────────────────────────────────────────

    fn spawn_status_poll(&mut self) {
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let seq = self.poll_gate.next_seq();
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.get_status().await.map_err(|e| format!("{e:#}"));
            let _ = tx.send(AppMessage::StatusFetched(seq, result)).await;
        });
    }

    fn spawn_archive_fetch(&self) {
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.get_archive().await.map_err(|e| format!("{e:#}"));
            let _ = tx.send(AppMessage::ArchiveLoaded(result)).await;
        });
    }

    /// Execute resolver effects: searches and applies become HTTP tasks
    /// stamped with the current session epoch.
    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Search(request) => self.spawn_search(request),
                Effect::Apply(request) => {
                    // An auto-apply has no modal to show its progress in;
                    // a spinner toast stands in until the result lands.
                    if !self.state.resolver.is_visible() {
                        self.toast.spinner("Applying metadata...");
                    }
                    self.spawn_apply(request);
                }
                Effect::RefreshArchive => self.spawn_archive_fetch(),
            }
        }
    }

    fn spawn_search(&self, request: SearchRequest) {
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let epoch = self.state.resolver.epoch();
        let client = self.client.clone();
        tokio::spawn(async move {
            let outcome = match request {
                SearchRequest::MusicBrainz {
                    iso_path,
                    artist,
                    album,
                } => match client.musicbrainz_search(&artist, &album, &iso_path).await {
                    Ok(resp) => SearchOutcome::Audio(resp),
                    Err(e) => SearchOutcome::Failed(format!("{e:#}")),
                },
                SearchRequest::TmdbFilename { iso_filename } => {
                    match client.tmdb_search_by_filename(&iso_filename).await {
                        Ok(resp) => SearchOutcome::Video(resp),
                        Err(e) => SearchOutcome::Failed(format!("{e:#}")),
                    }
                }
                SearchRequest::TmdbTitle { title, kind } => {
                    match client.tmdb_search_by_title(&title, kind).await {
                        Ok(resp) => SearchOutcome::Video(resp),
                        Err(e) => SearchOutcome::Failed(format!("{e:#}")),
                    }
                }
            };
            let _ = tx.send(AppMessage::SearchCompleted(epoch, outcome)).await;
        });
    }

    fn spawn_apply(&self, request: ApplyRequest) {
        let Some(tx) = self.msg_tx.clone() else {
            return;
        };
        let epoch = self.state.resolver.epoch();
        let client = self.client.clone();
        tokio::spawn(async move {
            let outcome = match request {
                ApplyRequest::MusicBrainz {
                    iso_path,
                    release_id,
                } => match client.musicbrainz_apply(&iso_path, &release_id).await {
                    Ok(resp) => ApplyOutcome::Done(resp),
                    Err(e) => ApplyOutcome::Failed(format!("{e:#}")),
                },
                ApplyRequest::Tmdb {
                    iso_path,
                    tmdb_id,
                    title,
                    kind,
                } => match client.tmdb_apply(&iso_path, tmdb_id, &title, kind).await {
                    Ok(resp) => ApplyOutcome::Done(resp),
                    Err(e) => ApplyOutcome::Failed(format!("{e:#}")),
                },
            };
            let _ = tx.send(AppMessage::ApplyCompleted(epoch, outcome)).await;
        });
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key).await,
            AppMessage::Event(_) => {}

            AppMessage::StatusFetched(seq, result) => {
                if !self.poll_gate.accept(seq) {
                    debug!("dropping out-of-order status response (seq {seq})");
                    return;
                }
                match result {
                    Ok(status) => self.apply_status(status),
                    Err(e) => {
                        if self.prev_connected {
                            self.toast.warning("Lost connection to appliance");
                            warn!("status poll failed: {e}");
                        }
                        self.state.connected = false;
                        self.prev_connected = false;
                        self.state.error_message = Some(e);
                    }
                }
            }

            AppMessage::ArchiveLoaded(result) => match result {
                Ok(resp) => {
                    self.state.archive_total = resp.total;
                    self.state.archive = flatten_archive(&resp);
                    self.archive_list.sync(&self.state);
                }
                Err(e) => {
                    warn!("archive fetch failed: {e}");
                    self.toast.error(format!("Archive load failed: {e}"));
                }
            },

            AppMessage::SearchCompleted(epoch, outcome) => {
                let effects = self.state.resolver.on_search_result(epoch, outcome);
                self.run_effects(effects);
            }

            AppMessage::ApplyCompleted(epoch, outcome) => {
                // The auto-apply path has no modal left to show the result
                // in.  A spinner can also be orphaned when a new session
                // takes the modal over while its apply is still in flight;
                // the late result must clear it either way.
                let background = !self.state.resolver.is_visible() || self.toast.has_spinner();
                let failed = match &outcome {
                    ApplyOutcome::Done(resp) => !resp.success,
                    ApplyOutcome::Failed(_) => true,
                };
                let detail = match &outcome {
                    ApplyOutcome::Done(resp) => resp.message.clone(),
                    ApplyOutcome::Failed(e) => Some(e.clone()),
                };
                let effects =
                    self.state
                        .resolver
                        .on_apply_result(epoch, outcome, Instant::now());
                self.run_effects(effects);
                if background {
                    if failed {
                        self.toast.resolve_spinner(
                            Severity::Error,
                            detail.unwrap_or_else(|| "Failed to apply metadata".to_string()),
                            Duration::from_secs(5),
                        );
                    } else {
                        self.toast.resolve_spinner(
                            Severity::Success,
                            detail.unwrap_or_else(|| "Metadata applied".to_string()),
                            Duration::from_secs(3),
                        );
                    }
                }
            }
        }
    }

    /// Apply an accepted poll response and derive the display views.
    fn apply_status(&mut self, status: StatusResponse) {
        if !self.prev_connected {
            info!("connected to {}", self.state.backend_url);
            self.prev_connected = true;
        }
        let new_status = status.live_status.status;
        if new_status != self.prev_disc_status {
            match new_status {
                DiscStatus::Completed => {
                    self.toast.success("Copy completed");
                    // A finished rip lands in the archive; pick it up now
                    // instead of waiting for the next scheduled refresh.
                    self.spawn_archive_fetch();
                }
                DiscStatus::Error => {
                    let msg = status
                        .live_status
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "Copy failed".to_string());
                    self.toast.error(msg);
                }
                _ => {}
            }
            self.prev_disc_status = new_status;
        }

        self.state.service = ServiceView::derive(status.service_running, &status.live_status);
        self.state.progress = ProgressView::from_live(&status.live_status);
        self.state.connected = true;
        self.state.error_message = None;
        self.state.last_status_at = Some(chrono::Local::now());
        self.state.status = status;
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        // Ctrl+C always quits, regardless of focus.
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // Overlays consume keys exclusively, modal before help would be
        // unreachable anyway (help closes on any toggle key).
        if self.help_overlay.visible {
            let actions = self.help_overlay.handle_key(key, &self.state);
            self.dispatch_all(actions).await;
            return;
        }
        if self.state.resolver.is_visible() {
            let actions = self.metadata_modal.handle_key(key, &self.state);
            self.dispatch_all(actions).await;
            return;
        }

        // While the archive filter is being edited, every key belongs to it.
        if self.archive_list.filter_active() {
            let actions = self.archive_list.handle_key(key, &self.state);
            self.dispatch_all(actions).await;
            return;
        }

        // Global keys.
        let global = match key.code {
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('?') => Some(Action::ToggleHelp),
            KeyCode::Char('r') => Some(Action::PollNow),
            KeyCode::Char('a') => Some(Action::RefreshArchive),
            KeyCode::Char('K') => Some(Action::ToggleKeys),
            KeyCode::Tab => Some(Action::FocusNext),
            KeyCode::BackTab => Some(Action::FocusPrev),
            KeyCode::Char('1') => Some(Action::FocusPane(ComponentId::StatusPanel)),
            KeyCode::Char('2') => Some(Action::FocusPane(ComponentId::ArchiveList)),
            _ => None,
        };
        if let Some(action) = global {
            self.dispatch(action).await;
            return;
        }

        // Focused component gets the rest.
        let actions = match self.focused {
            ComponentId::StatusPanel => self.status_panel.handle_key(key, &self.state),
            ComponentId::ArchiveList => self.archive_list.handle_key(key, &self.state),
            _ => vec![],
        };
        self.dispatch_all(actions).await;
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch_all(&mut self, actions: Vec<Action>) {
        for action in actions {
            Box::pin(self.dispatch(action)).await;
        }
    }

    async fn dispatch(&mut self, action: Action) {
        match &action {
            Action::Quit => {
                self.should_quit = true;
                return;
            }
            Action::FocusNext | Action::FocusPrev => {
                self.focused = match self.focused {
                    ComponentId::StatusPanel => ComponentId::ArchiveList,
                    _ => ComponentId::StatusPanel,
                };
                return;
            }
            Action::FocusPane(id) => {
                self.focused = *id;
                return;
            }
            Action::PollNow => {
                self.spawn_status_poll();
                return;
            }
            Action::RefreshArchive => {
                self.spawn_archive_fetch();
                return;
            }
            Action::ToggleKeys => {
                self.state.show_keys = !self.state.show_keys;
                return;
            }
            Action::OpenResolver { path, kind } => {
                info!("opening metadata search for {path}");
                let effects = self.state.resolver.open(path, *kind);
                self.run_effects(effects);
                // Fall through so the modal can seed its input fields.
            }
            Action::SearchAudio { artist, album } => {
                let effects = self.state.resolver.search_audio(artist, album);
                self.run_effects(effects);
                return;
            }
            Action::SearchVideo { title, kind } => {
                let effects = self.state.resolver.search_video(title, *kind);
                self.run_effects(effects);
                return;
            }
            Action::ApplySelected => {
                let effects = self.state.resolver.apply_selected();
                self.run_effects(effects);
                return;
            }
            Action::CloseResolver => {
                self.state.resolver.close();
                return;
            }
            Action::SelectUp(n) => {
                for _ in 0..*n {
                    self.state.resolver.select_up();
                }
                return;
            }
            Action::SelectDown(n) => {
                for _ in 0..*n {
                    self.state.resolver.select_down();
                }
                return;
            }
            Action::ToggleHelp => {}
        }

        // Broadcast to all components; collect follow-up actions.
        let mut follow_ups = Vec::new();
        follow_ups.extend(self.status_panel.on_action(&action, &self.state));
        follow_ups.extend(self.archive_list.on_action(&action, &self.state));
        follow_ups.extend(self.metadata_modal.on_action(&action, &self.state));
        follow_ups.extend(self.help_overlay.on_action(&action, &self.state));
        for follow_up in follow_ups {
            Box::pin(self.dispatch(follow_up)).await;
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();
        // Fill the entire terminal with the base background colour.
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let keys_h = u16::from(self.state.show_keys);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.status_panel.min_height() + 2),
                Constraint::Min(self.archive_list.min_height()),
                Constraint::Length(keys_h),
            ])
            .split(area);

        self.status_panel.draw(
            frame,
            chunks[0],
            self.focused == ComponentId::StatusPanel,
            &self.state,
        );
        self.archive_list.draw(
            frame,
            chunks[1],
            self.focused == ComponentId::ArchiveList,
            &self.state,
        );
        if self.state.show_keys {
            self.draw_keys_bar(frame, chunks[2]);
        }

        // Overlays on top of everything.
        self.metadata_modal.draw(frame, area, true, &self.state);
        self.help_overlay.draw(frame, area, true, &self.state);
        self.toast.draw(frame, area);
    }

    fn draw_keys_bar(&self, frame: &mut ratatui::Frame, area: Rect) {
        if area.height == 0 {
            return;
        }
        let pairs: &[(&str, &str)] = if self.state.resolver.is_visible() {
            &[
                ("tab", "fields"),
                ("enter", "search/apply"),
                ("esc", "close"),
            ]
        } else {
            &[
                ("j/k", "move"),
                ("enter", "metadata"),
                ("/", "filter"),
                ("r", "poll"),
                ("a", "archive"),
                ("?", "help"),
                ("q", "quit"),
            ]
        };
        let mut spans = Vec::new();
        for (key, desc) in pairs {
            spans.push(Span::styled(
                format!(" {key} "),
                Style::default().fg(C_PRIMARY),
            ));
            spans.push(Span::styled(
                format!("{desc}  "),
                Style::default().fg(C_MUTED),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use d2iso_proto::metadata::{ApplyResponse, MediaKind, TmdbSearchResponse, VideoCandidate};

    fn test_app() -> App {
        App::new(&Config::default(), ApiClient::new("http://127.0.0.1:1"))
    }

    fn one_hit() -> TmdbSearchResponse {
        TmdbSearchResponse {
            success: true,
            results: vec![VideoCandidate {
                id: 7,
                title: "Heat".to_string(),
                ..Default::default()
            }],
            total_results: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn late_apply_result_clears_spinner_after_session_change() {
        let mut app = test_app();

        // Auto-applying video session: the single hit dismisses the modal
        // and leaves the apply running behind a spinner toast.
        let effects = app
            .state
            .resolver
            .open("/archive/dvd/heat_1995.iso", MediaKind::Video);
        app.run_effects(effects);
        let epoch = app.state.resolver.epoch();
        let effects = app
            .state
            .resolver
            .on_search_result(epoch, SearchOutcome::Video(one_hit()));
        app.run_effects(effects);
        assert!(!app.state.resolver.is_visible());
        assert!(app.toast.has_spinner());

        // A new session takes the modal over before the apply lands.
        app.dispatch(Action::OpenResolver {
            path: "/archive/audio/Disc_1.iso".to_string(),
            kind: MediaKind::Audio,
        })
        .await;
        assert!(app.state.resolver.is_visible());

        // The stale apply result must still clear the spinner.
        app.handle_message(AppMessage::ApplyCompleted(
            epoch,
            ApplyOutcome::Done(ApplyResponse {
                success: true,
                message: Some("done".to_string()),
            }),
        ))
        .await;
        assert!(!app.toast.has_spinner());
        // The new session is untouched by the stale result.
        assert!(app.state.resolver.is_visible());
        assert_eq!(app.state.resolver.target_path(), "/archive/audio/Disc_1.iso");
    }
}
