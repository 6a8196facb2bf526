//! FieldInput — wraps tui-input for labelled text fields (modal form rows
//! and the archive filter bar).

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_INPUT_BG, C_INPUT_FG, C_MUTED, C_SECONDARY};

pub enum FieldAction {
    Changed(String),
    Confirmed,
    Cancelled,
}

pub struct FieldInput {
    input: Input,
    label: String,
    placeholder: String,
}

impl FieldInput {
    pub fn new(label: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            label: label.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Handle a key event while this field has edit focus.
    ///
    /// Esc behaviour:
    ///   - text present: clear it, emit `Changed("")`
    ///   - already empty: emit `Cancelled`
    pub fn handle_key(&mut self, key: KeyEvent) -> FieldAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    FieldAction::Changed(String::new())
                } else {
                    FieldAction::Cancelled
                }
            }
            KeyCode::Enter => FieldAction::Confirmed,
            _ => {
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                FieldAction::Changed(self.input.value().to_string())
            }
        }
    }

    /// Render the field as "label: value" into `area`; shows the cursor
    /// when `focused`.
    pub fn draw(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let label_w = self.label.chars().count() as u16 + 2;
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(label_w + 2) as usize);
        let value = self.input.value();

        let label_style = if focused {
            Style::default().fg(C_INPUT_FG).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_SECONDARY)
        };
        let value_span = if value.is_empty() {
            Span::styled(self.placeholder.clone(), Style::default().fg(C_MUTED))
        } else {
            Span::styled(value[scroll..].to_string(), Style::default().fg(C_INPUT_FG))
        };

        let paragraph = Paragraph::new(Line::from(vec![
            Span::styled(format!("{}: ", self.label), label_style),
            value_span,
        ]))
        .style(Style::default().bg(C_INPUT_BG));
        frame.render_widget(paragraph, area);

        if focused {
            let cursor_x = area.x + label_w + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(1)), area.y));
        }
    }
}
