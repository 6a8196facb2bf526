//! ArchiveList component — the ISO archive, grouped by bucket, with a
//! filter bar and the entry point into the metadata resolver.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use d2iso_proto::archive::{format_bytes, format_date};

use crate::{
    action::{Action, ComponentId},
    app_state::{AppState, ArchiveEntry},
    component::Component,
    theme::{style_selected, style_selected_focused, C_ACCENT, C_MUTED, C_SECONDARY, C_TAG},
    widgets::field_input::{FieldAction, FieldInput},
    widgets::pane_chrome::pane_chrome,
    widgets::scrollable_list::ScrollableList,
};

pub struct ArchiveList {
    list: ScrollableList<ArchiveEntry>,
    filter: FieldInput,
    filter_active: bool,
}

impl ArchiveList {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|entry: &ArchiveEntry, q: &str| {
                let q = q.to_lowercase();
                entry.file.name.to_lowercase().contains(&q)
                    || entry
                        .file
                        .metadata
                        .as_ref()
                        .and_then(|m| m.title.as_deref())
                        .map(|t| t.to_lowercase().contains(&q))
                        .unwrap_or(false)
            }),
            filter: FieldInput::new("filter", "name or title..."),
            filter_active: false,
        }
    }

    pub fn filter_active(&self) -> bool {
        self.filter_active
    }

    /// Replace the backing items after an archive refresh, keeping the
    /// selection on the same path when it survives.
    pub fn sync(&mut self, state: &AppState) {
        let selected_path = self.list.selected_item().map(|e| e.file.path.clone());
        self.list.set_items(state.archive.clone());
        if let Some(path) = selected_path {
            if let Some(idx) = self
                .list
                .items
                .iter()
                .position(|e| e.file.path == path)
            {
                self.list.set_selected_by_original(idx);
            }
        }
    }

    fn open_selected(&self) -> Vec<Action> {
        let Some(entry) = self.list.selected_item() else {
            return vec![];
        };
        let Some(kind) = entry.file.media_kind() else {
            return vec![];
        };
        vec![Action::OpenResolver {
            path: entry.file.path.clone(),
            kind,
        }]
    }
}

impl Component for ArchiveList {
    fn id(&self) -> ComponentId {
        ComponentId::ArchiveList
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }
        if self.filter_active {
            return match self.filter.handle_key(key) {
                FieldAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FieldAction::Confirmed | FieldAction::Cancelled => {
                    self.filter_active = false;
                    vec![]
                }
            };
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.list.select_up(1);
                vec![]
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.list.select_down(1);
                vec![]
            }
            KeyCode::PageUp => {
                self.list.select_up(10);
                vec![]
            }
            KeyCode::PageDown => {
                self.list.select_down(10);
                vec![]
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.list.select_first();
                vec![]
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.list.select_last();
                vec![]
            }
            KeyCode::Char('/') => {
                self.filter_active = true;
                vec![]
            }
            KeyCode::Enter | KeyCode::Char('m') => self.open_selected(),
            _ => vec![],
        }
    }

    fn on_action(&mut self, _action: &Action, _state: &AppState) -> Vec<Action> {
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let title = format!("archive ({})", state.archive_total);
        let block = pane_chrome(&title, Some('2'), focused, None);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.height == 0 {
            return;
        }

        let mut list_area = inner;
        if self.filter_active || !self.filter.is_empty() {
            let filter_area = Rect {
                height: 1,
                ..inner
            };
            self.filter.draw(frame, filter_area, self.filter_active);
            list_area.y += 1;
            list_area.height = list_area.height.saturating_sub(1);
        }

        let height = list_area.height as usize;
        self.list.ensure_visible(height);

        if self.list.is_empty() {
            let msg = if self.list.total_len() == 0 {
                "no ISOs archived yet"
            } else {
                "no matches"
            };
            frame.render_widget(
                Paragraph::new(Span::styled(msg, Style::default().fg(C_MUTED))),
                list_area,
            );
            return;
        }

        let selected = self.list.selected;
        let offset = self.list.scroll_offset;
        let mut lines: Vec<Line> = Vec::new();
        for (row, (_, entry)) in self.list.visible_items(height).into_iter().enumerate() {
            let is_selected = offset + row == selected;
            let row_style = if is_selected && focused {
                style_selected_focused()
            } else if is_selected {
                style_selected()
            } else {
                Style::default()
            };

            let display_name = entry
                .file
                .metadata
                .as_ref()
                .and_then(|m| m.title.clone())
                .unwrap_or_else(|| entry.file.name.clone());

            let mut spans = vec![
                Span::styled(format!("{:<6} ", entry.section), Style::default().fg(C_TAG)),
                Span::styled(display_name, row_style.fg(C_SECONDARY)),
            ];
            if entry.file.metadata_eligible() {
                spans.push(Span::styled(
                    "  [m]",
                    Style::default().fg(C_ACCENT).add_modifier(Modifier::DIM),
                ));
            }
            spans.push(Span::styled(
                format!("  {}", format_bytes(entry.file.size)),
                Style::default().fg(C_MUTED),
            ));
            if let Some(modified) = &entry.file.modified {
                spans.push(Span::styled(
                    format!("  {}", format_date(modified)),
                    Style::default().fg(C_MUTED),
                ));
            }
            lines.push(Line::from(spans).style(row_style));
        }
        frame.render_widget(Paragraph::new(lines), list_area);
    }

    fn min_height(&self) -> u16 {
        5
    }
}
