//! Smooth Unicode progress bar for the copy operation.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use d2iso_proto::status::ProgressView;

use crate::theme::{C_MUTED, C_PROGRESS_DONE, C_PROGRESS_REMAINING, C_SECONDARY};

/// Render the copy progress bar in `area`.
///
/// The fill is computed from the inverse: the uncovered (remaining) span
/// shrinks from the right as `remaining_percent` drops, so an inactive
/// view (remaining 100%) renders a fully empty bar.
pub fn draw_progress(frame: &mut Frame, area: Rect, progress: &ProgressView) {
    if area.width < 8 || area.height == 0 {
        return;
    }

    let left_label = format!("{:.0}%", progress.percent);
    let right_label = if progress.active {
        let unit = progress.unit.label();
        match &progress.eta {
            Some(eta) => format!(
                "{:.0}/{:.0} {} eta {}",
                progress.done, progress.total, unit, eta
            ),
            None => format!("{:.0}/{:.0} {}", progress.done, progress.total, unit),
        }
    } else {
        String::new()
    };

    let label_w = (left_label.len() + right_label.len() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    // Unicode smooth fill: 8 eighths per cell.
    let covered = (100.0 - progress.remaining_percent.clamp(0.0, 100.0)) / 100.0;
    let eighths = (covered * bar_w as f64 * 8.0) as usize;
    let full_blocks = eighths / 8;
    let partial = eighths % 8;

    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

    let mut filled = String::with_capacity(bar_w + 4);
    for _ in 0..full_blocks {
        filled.push('█');
    }
    if full_blocks < bar_w {
        filled.push(BLOCKS[partial]);
    }
    let rest = bar_w.saturating_sub(full_blocks + usize::from(full_blocks < bar_w));
    let empty: String = "░".repeat(rest);

    let mut spans = vec![
        Span::styled(
            format!("{} ", left_label),
            Style::default().fg(C_SECONDARY),
        ),
        Span::styled(filled, Style::default().fg(C_PROGRESS_DONE)),
        Span::styled(empty, Style::default().fg(C_PROGRESS_REMAINING)),
    ];
    if !right_label.is_empty() {
        spans.push(Span::styled(
            format!(" {}", right_label),
            Style::default().fg(C_MUTED),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
