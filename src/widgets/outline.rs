use crate::nav::flatten::{flatten_forest, FlatRow};
use crate::tree::drag::DragOp;
use crate::ui::AppState;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;

pub(crate) fn compute_scroll_window(total: usize, offset: usize, inner_h: u16) -> (usize, usize) {
    if inner_h == 0 || total == 0 {
        return (0, 0);
    }
    let ih = inner_h as usize;
    let max_start = total.saturating_sub(ih);
    let start = offset.min(max_start);
    let end = (start + ih).min(total);
    (start, end)
}

fn drop_hint(op: &DragOp) -> &'static str {
    match op {
        DragOp::ReorderSection { .. } | DragOp::ReorderField { .. } => "reorder before",
        DragOp::NestSection { .. } => "nest inside",
        DragOp::MoveFieldBefore { .. } | DragOp::AppendField { .. } => "move here",
        DragOp::PromoteSection { .. } => "promote",
    }
}

pub fn draw_outline(f: &mut Frame, area: Rect, state: &AppState, focused: bool) {
    let theme = &state.theme;
    let rows = flatten_forest(&state.forest, &state.collapsed);
    let inner_h = area.height.saturating_sub(2);
    let (start, end) = compute_scroll_window(rows.len(), state.outline_offset, inner_h);
    let dragged_id = state.drag.source().map(|s| s.id.clone());
    let provisional = state.drag.provisional(&state.forest);

    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(idx, row)| {
            let is_sel = idx == state.selected;
            let sel = if is_sel { "> " } else { "  " };
            let indent = "  ".repeat(row.depth());
            let is_dragged = dragged_id.as_deref() == Some(row.node_id());
            match row {
                FlatRow::Section { id, .. } => {
                    let Some(section) = state.forest.find_section(id) else {
                        return ListItem::new(format!("{sel}{indent}?"));
                    };
                    let has_body = !section.fields.is_empty() || !section.children.is_empty();
                    let chevron = if !has_body {
                        "·"
                    } else if state.collapsed.contains(id) {
                        "▸"
                    } else {
                        "▾"
                    };
                    let mut text = format!("{sel}{indent}{chevron} {}", section.name);
                    if section.disabled {
                        text.push_str(" (locked)");
                    }
                    if is_dragged {
                        text.push_str("  ⇅ moving");
                        return ListItem::new(text).style(theme.text_editing_bold());
                    }
                    if is_sel && state.drag.is_dragging() {
                        if let Some(op) = &provisional {
                            text.push_str(&format!("  ⇣ {}", drop_hint(op)));
                            return ListItem::new(text).style(theme.text_active_bold());
                        }
                    }
                    if section.disabled {
                        ListItem::new(text).style(theme.text_muted())
                    } else if is_sel {
                        ListItem::new(text).style(theme.list_cursor_style())
                    } else {
                        ListItem::new(text).style(Style::default().fg(theme.primary))
                    }
                }
                FlatRow::Field { id, .. } => {
                    let Some(field) = state.forest.find_field(id) else {
                        return ListItem::new(format!("{sel}{indent}?"));
                    };
                    let req = if field.required { " *" } else { "" };
                    let rep = if field.repeated { " ≡" } else { "" };
                    let mut text = format!(
                        "{sel}{indent}• {}  [{}]{}{}",
                        field.name,
                        field.data_type.label(),
                        req,
                        rep
                    );
                    if is_dragged {
                        text.push_str("  ⇅ moving");
                        return ListItem::new(text).style(theme.text_editing_bold());
                    }
                    if is_sel && state.drag.is_dragging() {
                        if let Some(op) = &provisional {
                            text.push_str(&format!("  ⇣ {}", drop_hint(op)));
                            return ListItem::new(text).style(theme.text_active_bold());
                        }
                    }
                    if is_sel {
                        ListItem::new(text).style(theme.list_cursor_style())
                    } else {
                        ListItem::new(text)
                    }
                }
            }
        })
        .collect();

    let title = if state.dirty {
        "Display Order *"
    } else {
        "Display Order"
    };
    let block = panel_block(title, focused, theme);
    let list = List::new(items).block(block);
    f.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Forest;

    #[test]
    fn window_clamps_offset_to_content() {
        assert_eq!(compute_scroll_window(20, 0, 5), (0, 5));
        assert_eq!(compute_scroll_window(20, 17, 5), (15, 20));
        assert_eq!(compute_scroll_window(3, 9, 5), (0, 3));
        assert_eq!(compute_scroll_window(0, 0, 5), (0, 0));
    }

    #[test]
    fn renders_seed_template_without_panicking() {
        let mut state = AppState {
            forest: Forest::template_default(),
            ..Default::default()
        };
        state.selected = 1;
        let backend = ratatui::backend::TestBackend::new(60, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                let area = Rect {
                    x: 0,
                    y: 0,
                    width: 60,
                    height: 20,
                };
                draw_outline(f, area, &state, true);
            })
            .unwrap();
        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Chief Complaint"));
        assert!(text.contains("(locked)"));
    }
}
