use crate::model::{DataType, Field, FieldDraft};
use crate::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use ratatui::widgets::*;
use tui_textarea::TextArea;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    // Digits only; parsed to u32 on submit.
    Number,
    Checkbox,
    Select { options: Vec<String>, selected: usize },
    TextArea,
}

#[derive(Clone, Debug)]
pub struct FormField {
    pub key: &'static str,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub error: Option<String>,
}

impl FormField {
    fn text(key: &'static str, label: &str, value: &str, required: bool) -> Self {
        Self {
            key,
            label: label.to_string(),
            required,
            kind: FieldKind::Text,
            value: FieldValue::Text(value.to_string()),
            error: None,
        }
    }

    fn textarea(key: &'static str, label: &str, value: &str) -> Self {
        Self {
            kind: FieldKind::TextArea,
            ..Self::text(key, label, value, false)
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormState {
    pub title: String,
    pub fields: Vec<FormField>,
    pub selected: usize,
    pub editing: bool,
    pub message: Option<String>,
}

impl FormState {
    fn new(title: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            fields,
            selected: 0,
            editing: false,
            message: None,
        }
    }

    pub fn text_of(&self, key: &str) -> String {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| match &f.value {
                FieldValue::Text(s) => Some(s.clone()),
                FieldValue::Bool(_) => None,
            })
            .unwrap_or_default()
    }

    pub fn bool_of(&self, key: &str) -> bool {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| matches!(f.value, FieldValue::Bool(true)))
            .unwrap_or(false)
    }

    pub fn select_index_of(&self, key: &str) -> usize {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .and_then(|f| match &f.kind {
                FieldKind::Select { selected, .. } => Some(*selected),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Form for adding a section (also used for subsections).
pub fn section_form(title: &str) -> FormState {
    FormState::new(
        title,
        vec![
            FormField::text("name", "Section Name", "", true),
            FormField::textarea("description", "Description", ""),
        ],
    )
}

/// Single-field form for renaming a section in place.
pub fn rename_form(current: &str) -> FormState {
    FormState::new(
        "Rename Section",
        vec![FormField::text("name", "Section Name", current, true)],
    )
}

/// Form for adding or editing a field. Pre-filled from `existing` when
/// editing.
pub fn field_form(title: &str, existing: Option<&Field>) -> FormState {
    let name = existing.map(|f| f.name.as_str()).unwrap_or("");
    let description = existing.map(|f| f.description.as_str()).unwrap_or("");
    let data_type = existing.map(|f| f.data_type).unwrap_or_default();
    let type_idx = DataType::ALL
        .iter()
        .position(|d| *d == data_type)
        .unwrap_or(0);
    let max_length = existing
        .and_then(|f| f.max_length)
        .map(|n| n.to_string())
        .unwrap_or_default();
    let default_value = existing.map(|f| f.default_value.as_str()).unwrap_or("");
    let options = existing
        .map(|f| f.dropdown_options.join("\n"))
        .unwrap_or_default();
    FormState::new(
        title,
        vec![
            FormField::text("name", "Field Name", name, true),
            FormField::textarea("description", "Description", description),
            FormField {
                key: "data_type",
                label: "Data Type".to_string(),
                required: true,
                kind: FieldKind::Select {
                    options: DataType::ALL.iter().map(|d| d.label().to_string()).collect(),
                    selected: type_idx,
                },
                value: FieldValue::Text(String::new()),
                error: None,
            },
            FormField {
                kind: FieldKind::Number,
                ..FormField::text("max_length", "Max Length", &max_length, false)
            },
            FormField::text("default_value", "Default Value", default_value, false),
            FormField {
                key: "required",
                label: "Required Field".to_string(),
                required: false,
                kind: FieldKind::Checkbox,
                value: FieldValue::Bool(existing.map(|f| f.required).unwrap_or(false)),
                error: None,
            },
            FormField {
                key: "repeated",
                label: "Repeated Field".to_string(),
                required: false,
                kind: FieldKind::Checkbox,
                value: FieldValue::Bool(existing.map(|f| f.repeated).unwrap_or(false)),
                error: None,
            },
            FormField::textarea("dropdown_options", "Dropdown Options (one per line)", &options),
        ],
    )
}

/// Checks shape rules and marks offending fields. Returns true when the
/// form can be submitted.
pub fn validate(form: &mut FormState) -> bool {
    let mut ok = true;
    let data_type = DataType::ALL[form.select_index_of("data_type").min(DataType::ALL.len() - 1)];
    let options_blank = form
        .text_of("dropdown_options")
        .lines()
        .all(|l| l.trim().is_empty());
    for f in &mut form.fields {
        f.error = None;
        match (&f.kind, &f.value) {
            (FieldKind::Text, FieldValue::Text(s)) if f.required && s.trim().is_empty() => {
                f.error = Some("required".to_string());
                ok = false;
            }
            (FieldKind::Number, FieldValue::Text(s))
                if !s.trim().is_empty() && s.trim().parse::<u32>().is_err() =>
            {
                f.error = Some("not a number".to_string());
                ok = false;
            }
            _ => {}
        }
        if f.key == "dropdown_options" && data_type == DataType::Dropdown && options_blank {
            f.error = Some("dropdown needs at least one option".to_string());
            ok = false;
        }
    }
    if !ok {
        form.message = Some("Fix the highlighted fields".to_string());
    } else {
        form.message = None;
    }
    ok
}

/// Folds the form back into the draft the tree operations consume.
pub fn to_field_draft(form: &FormState) -> FieldDraft {
    let idx = form.select_index_of("data_type").min(DataType::ALL.len() - 1);
    FieldDraft {
        name: form.text_of("name"),
        description: form.text_of("description"),
        data_type: DataType::ALL[idx],
        max_length: form.text_of("max_length").trim().parse::<u32>().ok(),
        required: form.bool_of("required"),
        repeated: form.bool_of("repeated"),
        default_value: form.text_of("default_value"),
        options_raw: form.text_of("dropdown_options"),
    }
}

/// What a key press did to the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Pending,
    Cancelled,
    Submitted,
}

/// A form plus the transient textarea overlay used while editing multi-line
/// values.
pub struct FormModal {
    pub form: FormState,
    ta: Option<TextArea<'static>>,
}

impl FormModal {
    pub fn new(form: FormState) -> Self {
        Self { form, ta: None }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> FormOutcome {
        // Textarea overlay captures everything except commit/cancel.
        if self.ta.is_some() {
            match (key.code, key.modifiers) {
                (KeyCode::Char('s'), m) if m.contains(KeyModifiers::CONTROL) => {
                    self.commit_textarea();
                }
                (KeyCode::Esc, _) => {
                    self.ta = None;
                    self.form.editing = false;
                }
                _ => {
                    if let (Some(ta), Some(ev)) = (self.ta.as_mut(), to_ta_key(key)) {
                        let _ = ta.input(ev);
                    }
                }
            }
            return FormOutcome::Pending;
        }
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(f) = self.form.fields.get_mut(sel) {
                match key.code {
                    KeyCode::Enter | KeyCode::Esc => {
                        self.form.editing = false;
                    }
                    KeyCode::Backspace => {
                        if let FieldValue::Text(s) = &mut f.value {
                            s.pop();
                        }
                    }
                    KeyCode::Char(c) => {
                        let accepts = match f.kind {
                            FieldKind::Number => c.is_ascii_digit(),
                            _ => true,
                        };
                        if accepts {
                            if let FieldValue::Text(s) = &mut f.value {
                                s.push(c);
                            }
                        }
                    }
                    _ => {}
                }
            }
            return FormOutcome::Pending;
        }
        match key.code {
            KeyCode::Up => {
                if self.form.selected > 0 {
                    self.form.selected -= 1;
                }
            }
            KeyCode::Down => {
                if self.form.selected + 1 < self.form.fields.len() {
                    self.form.selected += 1;
                }
            }
            KeyCode::Left => self.cycle_select(-1),
            KeyCode::Right => self.cycle_select(1),
            KeyCode::Char(' ') => {
                if !self.toggle_checkbox() {
                    self.cycle_select(1);
                }
            }
            KeyCode::Enter => {
                let sel = self.form.selected;
                let Some(f) = self.form.fields.get(sel) else {
                    return FormOutcome::Pending;
                };
                match f.kind {
                    FieldKind::Text | FieldKind::Number => self.form.editing = true,
                    FieldKind::Checkbox => {
                        self.toggle_checkbox();
                    }
                    FieldKind::Select { .. } => self.cycle_select(1),
                    FieldKind::TextArea => self.open_textarea(),
                }
            }
            KeyCode::Char('s') => {
                if validate(&mut self.form) {
                    return FormOutcome::Submitted;
                }
            }
            KeyCode::Esc => return FormOutcome::Cancelled,
            _ => {}
        }
        FormOutcome::Pending
    }

    fn toggle_checkbox(&mut self) -> bool {
        let sel = self.form.selected;
        if let Some(f) = self.form.fields.get_mut(sel) {
            if matches!(f.kind, FieldKind::Checkbox) {
                if let FieldValue::Bool(b) = &mut f.value {
                    *b = !*b;
                }
                return true;
            }
        }
        false
    }

    fn cycle_select(&mut self, step: isize) {
        let sel = self.form.selected;
        if let Some(f) = self.form.fields.get_mut(sel) {
            if let FieldKind::Select { options, selected } = &mut f.kind {
                let len = options.len() as isize;
                if len > 0 {
                    let next = (*selected as isize + step).rem_euclid(len);
                    *selected = next as usize;
                }
            }
        }
    }

    fn open_textarea(&mut self) {
        let sel = self.form.selected;
        let Some(f) = self.form.fields.get(sel) else {
            return;
        };
        let mut ta = TextArea::default();
        if let FieldValue::Text(txt) = &f.value {
            if !txt.is_empty() {
                ta.insert_str(txt);
            }
        }
        ta.set_block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Editing: {} — Ctrl+S Save • Esc Cancel", f.label)),
        );
        self.ta = Some(ta);
        self.form.editing = true;
    }

    fn commit_textarea(&mut self) {
        let sel = self.form.selected;
        if let (Some(ta), Some(f)) = (self.ta.take(), self.form.fields.get_mut(sel)) {
            f.value = FieldValue::Text(ta.lines().join("\n"));
        }
        self.form.editing = false;
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, theme: &Theme, tick: u64) {
        let rect = centered_rect(60, 70, area);
        f.render_widget(Clear, rect);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.form.title.clone())
            .border_style(theme.border_focused())
            .style(theme.base_style());
        let inner = block.inner(rect);
        f.render_widget(block, rect);

        let cursor_on = tick % 2 == 0 && self.ta.is_none();
        let mut lines: Vec<Line> = Vec::new();
        for (i, fld) in self.form.fields.iter().enumerate() {
            let selected = i == self.form.selected;
            let marker = if selected { "> " } else { "  " };
            let label = if fld.required {
                format!("{}*", fld.label)
            } else {
                fld.label.clone()
            };
            let shown = match (&fld.kind, &fld.value) {
                (FieldKind::Checkbox, FieldValue::Bool(b)) => {
                    if *b {
                        "[x]".to_string()
                    } else {
                        "[ ]".to_string()
                    }
                }
                (FieldKind::Select { options, selected }, _) => {
                    format!("< {} >", options.get(*selected).cloned().unwrap_or_default())
                }
                (FieldKind::TextArea, FieldValue::Text(s)) => {
                    let mut first = s.lines().next().unwrap_or("").to_string();
                    if s.lines().count() > 1 {
                        first.push('…');
                    }
                    first
                }
                (_, FieldValue::Text(s)) => s.clone(),
                (_, FieldValue::Bool(b)) => b.to_string(),
            };
            let value_style = if selected && self.form.editing {
                theme.text_editing_bold()
            } else if selected {
                theme.text_active_bold()
            } else {
                Style::default()
            };
            let mut spans = vec![
                Span::raw(marker.to_string()),
                Span::styled(format!("{label:<32} "), theme.text_muted()),
                Span::styled(shown, value_style),
            ];
            if selected && self.form.editing && self.ta.is_none() && cursor_on {
                spans.push(Span::styled("▏", theme.text_editing_bold()));
            }
            if let Some(err) = &fld.error {
                spans.push(Span::styled(format!("  ← {err}"), theme.text_error()));
            }
            lines.push(Line::from(spans));
        }
        lines.push(Line::from(""));
        if let Some(msg) = &self.form.message {
            lines.push(Line::from(Span::styled(msg.clone(), theme.text_error())));
        }
        lines.push(Line::from(Span::styled(
            "↑/↓ field  Enter edit  Space toggle  s save  Esc cancel",
            theme.text_muted(),
        )));
        let p = Paragraph::new(lines).wrap(Wrap { trim: false });
        f.render_widget(p, inner);

        // Multi-line editor overlay.
        if let Some(ta) = self.ta.as_mut() {
            let edit_rect = centered_rect(80, 60, area);
            f.render_widget(Clear, edit_rect);
            f.render_widget(&*ta, edit_rect);
        }
    }
}

fn to_ta_key(key: KeyEvent) -> Option<rt_event::KeyEvent> {
    let code = match key.code {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    };
    let mut mods = rt_event::KeyModifiers::NONE;
    if key.modifiers.contains(KeyModifiers::SHIFT) {
        mods |= rt_event::KeyModifiers::SHIFT;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        mods |= rt_event::KeyModifiers::CONTROL;
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        mods |= rt_event::KeyModifiers::ALT;
    }
    Some(rt_event::KeyEvent::new(code, mods))
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn submit_requires_a_name() {
        let mut modal = FormModal::new(field_form("Add Field", None));
        assert_eq!(modal.on_key(key(KeyCode::Char('s'))), FormOutcome::Pending);
        assert_eq!(modal.form.fields[0].error.as_deref(), Some("required"));
        // Type a name inline and submit again.
        let _ = modal.on_key(key(KeyCode::Enter));
        for c in "Severity".chars() {
            let _ = modal.on_key(key(KeyCode::Char(c)));
        }
        let _ = modal.on_key(key(KeyCode::Enter));
        assert_eq!(modal.on_key(key(KeyCode::Char('s'))), FormOutcome::Submitted);
        assert_eq!(to_field_draft(&modal.form).name, "Severity");
    }

    #[test]
    fn checkbox_toggles_and_select_cycles() {
        let mut modal = FormModal::new(field_form("Add Field", None));
        // Move to the data type select (index 2) and cycle.
        let _ = modal.on_key(key(KeyCode::Down));
        let _ = modal.on_key(key(KeyCode::Down));
        let _ = modal.on_key(key(KeyCode::Right));
        assert_eq!(modal.form.select_index_of("data_type"), 1);
        let _ = modal.on_key(key(KeyCode::Left));
        let _ = modal.on_key(key(KeyCode::Left));
        // Wraps around backwards.
        assert_eq!(
            modal.form.select_index_of("data_type"),
            DataType::ALL.len() - 1
        );
        // Move to "required" (index 5) and toggle with Space.
        let _ = modal.on_key(key(KeyCode::Down));
        let _ = modal.on_key(key(KeyCode::Down));
        let _ = modal.on_key(key(KeyCode::Down));
        let _ = modal.on_key(key(KeyCode::Char(' ')));
        assert!(modal.form.bool_of("required"));
    }

    #[test]
    fn dropdown_without_options_fails_validation() {
        let mut form = field_form("Add Field", None);
        // Name filled; type set to dropdown; no options.
        form.fields[0].value = FieldValue::Text("Choice".into());
        if let FieldKind::Select { selected, .. } = &mut form.fields[2].kind {
            *selected = DataType::ALL
                .iter()
                .position(|d| *d == DataType::Dropdown)
                .unwrap();
        }
        assert!(!validate(&mut form));
        let opt_field = form
            .fields
            .iter()
            .find(|f| f.key == "dropdown_options")
            .unwrap();
        assert!(opt_field.error.is_some());
    }

    #[test]
    fn number_field_accepts_digits_only_and_parses() {
        let mut modal = FormModal::new(field_form("Add Field", None));
        modal.form.selected = 3; // max_length
        let _ = modal.on_key(key(KeyCode::Enter));
        for c in "12a4".chars() {
            let _ = modal.on_key(key(KeyCode::Char(c)));
        }
        let _ = modal.on_key(key(KeyCode::Enter));
        assert_eq!(modal.form.text_of("max_length"), "124");
        assert_eq!(to_field_draft(&modal.form).max_length, Some(124));
    }

    #[test]
    fn edit_form_prefills_from_existing_field() {
        let existing = Field {
            id: "f1".into(),
            name: "Severity".into(),
            data_type: DataType::Dropdown,
            required: true,
            dropdown_options: vec!["mild".into(), "severe".into()],
            ..Default::default()
        };
        let form = field_form("Edit Field", Some(&existing));
        assert_eq!(form.text_of("name"), "Severity");
        assert_eq!(form.text_of("dropdown_options"), "mild\nsevere");
        assert!(form.bool_of("required"));
        let draft = to_field_draft(&form);
        assert_eq!(draft.data_type, DataType::Dropdown);
        assert_eq!(draft.dropdown_options(), vec!["mild", "severe"]);
    }

    #[test]
    fn escape_cancels_when_not_editing() {
        let mut modal = FormModal::new(section_form("Add Section"));
        assert_eq!(modal.on_key(key(KeyCode::Esc)), FormOutcome::Cancelled);
    }
}
