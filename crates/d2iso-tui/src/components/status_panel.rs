//! StatusPanel component — service state, disc mode and copy progress.
//!
//! Everything shown here is recomputed from the latest accepted poll; the
//! panel itself holds no state worth persisting.

use ratatui::crossterm::event::KeyEvent;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use d2iso_proto::status::{disc_mode_line, StatusClass};

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{C_BADGE_ERR, C_BADGE_LIVE, C_COPYING, C_MUTED, C_RUNNING, C_SECONDARY, C_STOPPED},
    widgets::pane_chrome::{pane_chrome, Badge},
    widgets::progress_bar::draw_progress,
};

pub struct StatusPanel;

impl StatusPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Component for StatusPanel {
    fn id(&self) -> ComponentId {
        ComponentId::StatusPanel
    }

    // Refresh keys are global; the panel itself has nothing interactive.
    fn handle_key(&mut self, _key: KeyEvent, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = if state.connected {
            Badge {
                text: "LIVE",
                color: C_BADGE_LIVE,
            }
        } else {
            Badge {
                text: "OFFLINE",
                color: C_BADGE_ERR,
            }
        };
        let block = pane_chrome("status", Some('1'), focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let indicator_color = match state.service.class {
            StatusClass::Stopped => C_STOPPED,
            StatusClass::Copying => C_COPYING,
            StatusClass::Running => C_RUNNING,
        };

        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("● ", Style::default().fg(indicator_color)),
            Span::styled(
                state.service.label,
                Style::default()
                    .fg(indicator_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));

        let live = &state.status.live_status;
        if let Some(mode) = disc_mode_line(live) {
            lines.push(Line::from(vec![
                Span::styled("disc  ", Style::default().fg(C_MUTED)),
                Span::styled(mode, Style::default().fg(C_SECONDARY)),
            ]));
        }
        if let Some(label) = live.disc_label.as_deref().filter(|l| !l.is_empty()) {
            lines.push(Line::from(vec![
                Span::styled("label ", Style::default().fg(C_MUTED)),
                Span::styled(label.to_string(), Style::default().fg(C_SECONDARY)),
            ]));
        }
        if let Some(err) = live.error_message.as_deref().filter(|e| !e.is_empty()) {
            lines.push(Line::from(Span::styled(
                err.to_string(),
                Style::default().fg(C_STOPPED),
            )));
        }

        let mut counts: Vec<String> = state
            .status
            .archive_counts
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(k, n)| format!("{k} {n}"))
            .collect();
        counts.sort();
        let counts_line = if counts.is_empty() {
            format!("{} ISOs archived", state.status.iso_count)
        } else {
            format!(
                "{} ISOs archived  ({})",
                state.status.iso_count,
                counts.join(", ")
            )
        };
        lines.push(Line::from(Span::styled(
            counts_line,
            Style::default().fg(C_MUTED),
        )));

        if let Some(at) = state.last_status_at {
            lines.push(Line::from(Span::styled(
                format!("updated {}", at.format("%H:%M:%S")),
                Style::default().fg(C_MUTED),
            )));
        }

        let text_height = (lines.len() as u16).min(inner.height);
        let text_area = Rect {
            height: text_height,
            ..inner
        };
        frame.render_widget(Paragraph::new(lines), text_area);

        // Progress bar on the last row, only while a copy is running.
        if state.progress.active && inner.height > text_height {
            let bar_area = Rect {
                x: inner.x,
                y: inner.y + inner.height - 1,
                width: inner.width,
                height: 1,
            };
            draw_progress(frame, bar_area, &state.progress);
        }
    }

    fn min_height(&self) -> u16 {
        7
    }
}
