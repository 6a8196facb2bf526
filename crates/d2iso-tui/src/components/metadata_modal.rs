//! MetadataModal component — the resolver session rendered as a centered
//! popup over the dashboard.
//!
//! The modal owns only its input widgets and focus row; everything about
//! the session itself (phase, candidates, selection) lives in the resolver
//! and is read from `AppState`.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use d2iso_proto::metadata::{format_duration_ms, Candidate, MediaKind, VideoKind};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    resolver::Phase,
    theme::{
        style_selected_focused, C_ACCENT, C_BG, C_MUTED, C_PANEL_BORDER, C_PRIMARY, C_RUNNING,
        C_SECONDARY, C_STOPPED,
    },
    widgets::field_input::{FieldAction, FieldInput},
};

/// Which row of the modal has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusRow {
    FieldA,
    FieldB,
    Results,
}

pub struct MetadataModal {
    artist: FieldInput,
    album: FieldInput,
    title: FieldInput,
    kind: VideoKind,
    focus: FocusRow,
}

impl MetadataModal {
    pub fn new() -> Self {
        Self {
            artist: FieldInput::new("artist", "artist name..."),
            album: FieldInput::new("album", "album name..."),
            title: FieldInput::new("title", "search title..."),
            kind: VideoKind::Movie,
            focus: FocusRow::FieldA,
        }
    }

    fn reset_for(&mut self, state: &AppState) {
        self.artist.clear();
        self.album.clear();
        self.title.clear();
        self.title.set_value(state.resolver.suggested_title());
        self.kind = state.resolver.video_kind();
        self.focus = FocusRow::FieldA;
    }

    fn search_action(&self, state: &AppState) -> Vec<Action> {
        match state.resolver.media_kind() {
            Some(MediaKind::Audio) => vec![Action::SearchAudio {
                artist: self.artist.text().to_string(),
                album: self.album.text().to_string(),
            }],
            Some(MediaKind::Video) => vec![Action::SearchVideo {
                title: self.title.text().to_string(),
                kind: self.kind,
            }],
            None => vec![],
        }
    }

    fn cycle_focus(&mut self, state: &AppState, forward: bool) {
        let has_results = !state.resolver.candidates().is_empty()
            && *state.resolver.phase() == Phase::ManyResults;
        let rows: &[FocusRow] = if has_results {
            &[FocusRow::FieldA, FocusRow::FieldB, FocusRow::Results]
        } else {
            &[FocusRow::FieldA, FocusRow::FieldB]
        };
        let pos = rows.iter().position(|r| *r == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % rows.len()
        } else {
            (pos + rows.len() - 1) % rows.len()
        };
        self.focus = rows[next];
    }

    fn field_for_focus(&mut self, kind: Option<MediaKind>) -> Option<&mut FieldInput> {
        match (kind, self.focus) {
            (Some(MediaKind::Audio), FocusRow::FieldA) => Some(&mut self.artist),
            (Some(MediaKind::Audio), FocusRow::FieldB) => Some(&mut self.album),
            (Some(MediaKind::Video), FocusRow::FieldA) => Some(&mut self.title),
            _ => None,
        }
    }
}

impl Component for MetadataModal {
    fn id(&self) -> ComponentId {
        ComponentId::MetadataModal
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release || !state.resolver.is_visible() {
            return vec![];
        }

        // Terminal states consume everything except close.
        match state.resolver.phase() {
            Phase::Applying | Phase::AppliedSuccess { .. } | Phase::Searching { .. } => {
                return match key.code {
                    KeyCode::Esc => vec![Action::CloseResolver],
                    _ => vec![],
                };
            }
            _ => {}
        }

        match key.code {
            KeyCode::Tab => {
                self.cycle_focus(state, true);
                return vec![];
            }
            KeyCode::BackTab => {
                self.cycle_focus(state, false);
                return vec![];
            }
            _ => {}
        }

        let media_kind = state.resolver.media_kind();
        match self.focus {
            FocusRow::Results => match key.code {
                KeyCode::Up | KeyCode::Char('k') => vec![Action::SelectUp(1)],
                KeyCode::Down | KeyCode::Char('j') => vec![Action::SelectDown(1)],
                KeyCode::Enter => vec![Action::ApplySelected],
                KeyCode::Esc => vec![Action::CloseResolver],
                _ => vec![],
            },
            // The video type selector row.
            FocusRow::FieldB if media_kind == Some(MediaKind::Video) => match key.code {
                KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                    self.kind = match self.kind {
                        VideoKind::Movie => VideoKind::Series,
                        VideoKind::Series => VideoKind::Movie,
                    };
                    vec![]
                }
                KeyCode::Enter => self.search_action(state),
                KeyCode::Esc => vec![Action::CloseResolver],
                _ => vec![],
            },
            _ => {
                let Some(field) = self.field_for_focus(media_kind) else {
                    return match key.code {
                        KeyCode::Esc => vec![Action::CloseResolver],
                        _ => vec![],
                    };
                };
                match field.handle_key(key) {
                    FieldAction::Confirmed => self.search_action(state),
                    FieldAction::Cancelled => vec![Action::CloseResolver],
                    FieldAction::Changed(_) => vec![],
                }
            }
        }
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        if let Action::OpenResolver { .. } = action {
            self.reset_for(state);
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !state.resolver.is_visible() {
            return;
        }
        let popup = centered_rect(70, 24, area);
        frame.render_widget(Clear, popup);

        let filename = state
            .resolver
            .target_path()
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(C_PANEL_BORDER))
            .style(Style::default().bg(C_BG))
            .title(Span::styled(
                format!(" metadata — {filename} "),
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);
        if inner.height < 4 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // field A
                Constraint::Length(1), // field B / type selector
                Constraint::Length(1), // status / hint line
                Constraint::Min(1),    // results
            ])
            .split(inner);

        match state.resolver.media_kind() {
            Some(MediaKind::Audio) => {
                self.artist
                    .draw(frame, chunks[0], self.focus == FocusRow::FieldA);
                self.album
                    .draw(frame, chunks[1], self.focus == FocusRow::FieldB);
            }
            Some(MediaKind::Video) => {
                self.title
                    .draw(frame, chunks[0], self.focus == FocusRow::FieldA);
                let kind_style = if self.focus == FocusRow::FieldB {
                    Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(C_SECONDARY)
                };
                frame.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled("type: ", Style::default().fg(C_MUTED)),
                        Span::styled(self.kind.label(), kind_style),
                        Span::styled("  (←/→ to switch)", Style::default().fg(C_MUTED)),
                    ])),
                    chunks[1],
                );
            }
            None => {}
        }

        // Status line: phase, error, or the .mbquery hint.
        let status_line = match state.resolver.phase() {
            Phase::Searching { .. } => Some(Line::from(Span::styled(
                "searching...",
                Style::default().fg(C_SECONDARY),
            ))),
            Phase::Applying => Some(Line::from(Span::styled(
                "applying...",
                Style::default().fg(C_SECONDARY),
            ))),
            Phase::AppliedSuccess { .. } => state.resolver.success_message().map(|m| {
                Line::from(Span::styled(
                    m.to_string(),
                    Style::default().fg(C_RUNNING).add_modifier(Modifier::BOLD),
                ))
            }),
            _ => state
                .resolver
                .message()
                .map(|m| Line::from(Span::styled(m.to_string(), Style::default().fg(C_STOPPED))))
                .or_else(|| {
                    state.resolver.used_mbquery().then(|| {
                        Line::from(Span::styled(
                            "matched from disc query data",
                            Style::default().fg(C_MUTED),
                        ))
                    })
                }),
        };
        if let Some(line) = status_line {
            frame.render_widget(Paragraph::new(line), chunks[2]);
        }

        // Results list.
        let candidates = state.resolver.candidates();
        if candidates.is_empty() || *state.resolver.phase() != Phase::ManyResults {
            return;
        }
        let selected = state.resolver.selected();
        let height = chunks[3].height as usize;
        let offset = selected.saturating_sub(height.saturating_sub(1));
        let mut lines: Vec<Line> = Vec::new();
        for (i, candidate) in candidates.iter().enumerate().skip(offset).take(height) {
            let row_style = if i == selected && self.focus == FocusRow::Results {
                style_selected_focused()
            } else if i == selected {
                Style::default().fg(C_PRIMARY)
            } else {
                Style::default().fg(C_SECONDARY)
            };
            lines.push(candidate_line(candidate).style(row_style));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), chunks[3]);
    }
}

fn candidate_line(candidate: &Candidate) -> Line<'static> {
    match candidate {
        Candidate::Audio(a) => {
            let mut text = format!("{} — {}", a.title, a.artist);
            if let Some(date) = &a.date {
                text.push_str(&format!(" ({date})"));
            }
            let mut extras = Vec::new();
            if let Some(tracks) = a.tracks {
                extras.push(format!("{tracks} tracks"));
            }
            if let Some(ms) = a.duration_ms {
                extras.push(format_duration_ms(ms));
            }
            if let Some(country) = &a.country {
                extras.push(country.clone());
            }
            // The backend fills "Unknown" for releases without a label.
            if let Some(label) = a
                .label
                .as_deref()
                .filter(|l| !l.eq_ignore_ascii_case("unknown"))
            {
                extras.push(label.to_string());
            }
            if !extras.is_empty() {
                text.push_str(&format!("  [{}]", extras.join(", ")));
            }
            Line::from(text)
        }
        Candidate::Video(v) => {
            let mut text = v.title.clone();
            if let Some(year) = &v.year {
                text.push_str(&format!(" ({year})"));
            }
            if let Some(overview) = &v.overview {
                let snippet: String = overview.chars().take(80).collect();
                text.push_str(&format!("  {snippet}"));
            }
            Line::from(text)
        }
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use d2iso_proto::metadata::AudioCandidate;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn audio_candidate_row_includes_release_label() {
        let c = Candidate::Audio(AudioCandidate {
            id: "mbid".to_string(),
            title: "Album".to_string(),
            artist: "Artist".to_string(),
            date: Some("1997".to_string()),
            country: Some("DE".to_string()),
            label: Some("Parlophone".to_string()),
            tracks: Some(12),
            duration_ms: Some(245_000),
        });
        assert_eq!(
            line_text(&candidate_line(&c)),
            "Album — Artist (1997)  [12 tracks, 04:05, DE, Parlophone]"
        );
    }

    #[test]
    fn unknown_release_label_is_dropped() {
        let c = Candidate::Audio(AudioCandidate {
            id: "mbid".to_string(),
            title: "Album".to_string(),
            artist: "Artist".to_string(),
            label: Some("Unknown".to_string()),
            tracks: Some(8),
            ..Default::default()
        });
        assert_eq!(line_text(&candidate_line(&c)), "Album — Artist  [8 tracks]");
    }
}
