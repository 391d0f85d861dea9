use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::{AppState, ToastLevel};

/// One-line footer: async status spinner, toast, drag indicator, unsaved
/// marker and the key hints for the current mode.
pub fn draw_footer_combined(f: &mut Frame, area: Rect, state: &AppState, help_text: &str) {
    let theme = &state.theme;
    let mut spans: Vec<Span> = Vec::new();
    if let Some(msg) = &state.status_text {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(" {spinner} {msg}")));
        spans.push(Span::raw("  |  "));
    }
    if let Some(t) = &state.toast {
        let color = theme.toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    if let Some(source) = state.drag.source() {
        let node_name = |id: &str| {
            state
                .forest
                .find_section(id)
                .map(|s| s.name.clone())
                .or_else(|| state.forest.find_field(id).map(|f| f.name.clone()))
                .unwrap_or_else(|| id.to_string())
        };
        let mut label = format!("moving: {}", node_name(&source.id));
        if let Some(target) = state.drag.hovered() {
            let onto = match target {
                crate::tree::drag::HoverTarget::Section(id)
                | crate::tree::drag::HoverTarget::Field(id) => node_name(id),
                crate::tree::drag::HoverTarget::Outside => "top level".to_string(),
            };
            label.push_str(&format!(" → {onto}"));
        }
        label.push_str("  |  ");
        spans.push(Span::styled(label, theme.text_editing_bold()));
    }
    if state.dirty {
        spans.push(Span::styled("unsaved  |  ", theme.text_error()));
    }
    spans.push(Span::styled(
        help_text.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    let p = Paragraph::new(Line::from(spans));
    f.render_widget(p, area);
}
