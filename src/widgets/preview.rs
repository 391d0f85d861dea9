use crate::ui::{AppState, PreviewTab};
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::sync::OnceLock;

// syntect setup (lazy)
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style as SynStyle, Theme as SynTheme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
static THEME: OnceLock<SynTheme> = OnceLock::new();

fn get_syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn get_theme() -> &'static SynTheme {
    THEME.get_or_init(|| {
        let ts = THEME_SET.get_or_init(ThemeSet::load_defaults);
        ts.themes
            .get("base16-ocean.dark")
            .cloned()
            .unwrap_or_else(|| ts.themes.values().next().cloned().unwrap_or_default())
    })
}

fn syn_to_tui_color(c: syntect::highlighting::Color) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Highlights a JSON document line by line for the preview pane.
pub fn highlight_json(text: &str) -> Vec<Line<'static>> {
    let ps = get_syntax_set();
    let theme = get_theme();
    let syn: &SyntaxReference = ps
        .find_syntax_by_token("json")
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut high = HighlightLines::new(syn, theme);
    let mut out: Vec<Line<'static>> = Vec::new();
    for line in text.split('\n') {
        let regions: Vec<(SynStyle, &str)> = high.highlight_line(line, ps).unwrap_or_default();
        let mut spans: Vec<Span<'static>> = Vec::new();
        for (st, seg) in regions {
            spans.push(Span::styled(
                seg.to_string(),
                Style::default().fg(syn_to_tui_color(st.foreground)),
            ));
        }
        out.push(Line::from(spans));
    }
    out
}

pub fn draw_preview(f: &mut Frame, area: Rect, state: &mut AppState, focused: bool) {
    let title = match state.preview_tab {
        PreviewTab::Configuration => "Configuration JSON [1]",
        PreviewTab::Standard => "Standard Export [2]",
    };
    let inner_h = area.height.saturating_sub(2);
    let total = state.preview_lines.len() as u16;
    let max_scroll = total.saturating_sub(inner_h);
    if state.preview_scroll > max_scroll {
        state.preview_scroll = max_scroll;
    }
    state.preview_viewport_h = inner_h;
    let block = panel_block(title, focused, &state.theme);
    let p = Paragraph::new(state.preview_lines.clone())
        .block(block)
        .wrap(Wrap {
            trim: !state.preview_wrap,
        })
        .scroll((state.preview_scroll, 0));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_keeps_one_line_per_input_line() {
        let text = "{\n  \"sections\": []\n}";
        let lines = highlight_json(text);
        assert_eq!(lines.len(), 3);
        let joined: String = lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.clone().into_owned())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(joined, text);
    }

    #[test]
    fn highlight_is_deterministic() {
        let text = "{\"FieldType\": \"string\"}";
        let a = highlight_json(text);
        let b = highlight_json(text);
        assert_eq!(a.len(), b.len());
        for (la, lb) in a.iter().zip(b.iter()) {
            assert_eq!(la.spans.len(), lb.spans.len());
        }
    }
}
