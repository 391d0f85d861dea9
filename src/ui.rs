use crate::app::{update, AppMsg, Effect};
use crate::model::{validate_app_config, AppConfig, Forest, ViewMode, ViewSettings};
use crate::nav::flatten::{flatten_forest, FlatRow};
use crate::serialize;
use crate::services::store_client::{spawn_fetch_config, spawn_store_config, StoreMsg};
use crate::theme::{Theme, ThemeMode};
use crate::tree::drag::{DragSession, HoverTarget, NodeKind};
use crate::widgets::form::{field_form, rename_form, section_form, FormModal, FormOutcome};
use crate::widgets::outline::draw_outline;
use crate::widgets::preview::draw_preview;
use crate::widgets::status_bar::draw_footer_combined;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::HashSet;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use std::{env, fs};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Pane {
    #[default]
    Outline,
    Preview,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PreviewTab {
    #[default]
    Configuration,
    Standard,
}

/// Which modal form is open and what it will commit to.
pub(crate) enum ModalKind {
    AddSection { parent: Option<String> },
    AddField { section_id: String },
    EditField { section_id: String, field_id: String },
    RenameSection { id: String },
}

pub(crate) struct ModalState {
    pub(crate) kind: ModalKind,
    pub(crate) form: FormModal,
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) forest: Forest,
    pub(crate) settings: ViewSettings,
    pub(crate) drag: DragSession,
    pub(crate) collapsed: HashSet<String>,
    pub(crate) selected: usize,
    pub(crate) outline_offset: usize,
    pub(crate) outline_viewport_h: u16,
    pub(crate) focus: Pane,
    pub(crate) preview_tab: PreviewTab,
    pub(crate) preview_lines: Vec<Line<'static>>,
    pub(crate) preview_scroll: u16,
    pub(crate) preview_viewport_h: u16,
    pub(crate) preview_wrap: bool,
    pub(crate) modal: Option<ModalState>,
    pub(crate) dirty: bool,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) tick: u64,
    pub(crate) theme: Theme,
    pub(crate) boot_fetch_done: bool,
    pub(crate) tx: Option<Sender<StoreMsg>>,
    pub(crate) rx: Option<Receiver<StoreMsg>>,
}

/// Rebuilds the highlighted JSON of the preview pane from the live tree.
/// Cheap enough to run after every committed mutation.
pub(crate) fn refresh_preview(state: &mut AppState) {
    let text = match state.preview_tab {
        PreviewTab::Configuration => serialize::save_tree_pretty(&state.settings, &state.forest),
        PreviewTab::Standard => serialize::export_standard_pretty(&state.forest),
    };
    state.preview_lines = crate::widgets::preview::highlight_json(&text);
}

fn preview_text(state: &AppState) -> String {
    match state.preview_tab {
        PreviewTab::Configuration => serialize::save_tree_pretty(&state.settings, &state.forest),
        PreviewTab::Standard => serialize::export_standard_pretty(&state.forest),
    }
}

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::FetchConfig {
                store_cmd,
                template_id,
            } => {
                state.status_text = Some(format!("Loading configuration for {template_id}..."));
                if let Some(tx) = &state.tx {
                    spawn_fetch_config(store_cmd, template_id, tx.clone());
                }
            }
            Effect::StoreConfig {
                store_cmd,
                template_id,
                payload,
            } => {
                state.status_text = Some("Saving configuration...".to_string());
                if let Some(tx) = &state.tx {
                    spawn_store_config(store_cmd, template_id, payload, tx.clone());
                }
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
        }
    }
}

// -------- outline selection helpers ----------------------------------------

fn visible_rows(state: &AppState) -> Vec<FlatRow> {
    flatten_forest(&state.forest, &state.collapsed)
}

fn row_target(row: &FlatRow) -> HoverTarget {
    match row {
        FlatRow::Section { id, .. } => HoverTarget::Section(id.clone()),
        FlatRow::Field { id, .. } => HoverTarget::Field(id.clone()),
    }
}

/// Section the selected row belongs to: the section itself, or a field's
/// owner.
fn selected_section_id(state: &AppState, rows: &[FlatRow]) -> Option<String> {
    match rows.get(state.selected)? {
        FlatRow::Section { id, .. } => Some(id.clone()),
        FlatRow::Field { section_id, .. } => Some(section_id.clone()),
    }
}

fn keep_selected_visible(state: &mut AppState, total: usize) {
    let ih = state.outline_viewport_h as usize;
    if ih == 0 || total == 0 {
        state.outline_offset = 0;
        return;
    }
    state.selected = state.selected.min(total.saturating_sub(1));
    if state.selected < state.outline_offset {
        state.outline_offset = state.selected;
    } else if state.selected >= state.outline_offset.saturating_add(ih) {
        state.outline_offset = state.selected.saturating_sub(ih.saturating_sub(1));
    }
}

fn move_selection(state: &mut AppState, delta: isize) {
    let rows = visible_rows(state);
    if rows.is_empty() {
        state.selected = 0;
        return;
    }
    let cur = state.selected.min(rows.len() - 1) as isize;
    let next = (cur + delta).clamp(0, rows.len() as isize - 1) as usize;
    state.selected = next;
    keep_selected_visible(state, rows.len());
    // While a drag is active the cursor doubles as the hover target.
    if state.drag.is_dragging() {
        if let Some(row) = rows.get(state.selected) {
            let effs = update(
                state,
                AppMsg::HoverDrag {
                    target: row_target(row),
                },
            );
            run_effects(state, effs);
        }
    }
}

fn apply_msg(state: &mut AppState, msg: AppMsg) {
    let effects = update(state, msg);
    run_effects(state, effects);
}

fn copy_preview_to_clipboard(state: &mut AppState) {
    let content = preview_text(state);
    if !content.is_empty() {
        if let Ok(mut clipboard) = arboard::Clipboard::new() {
            let _ = clipboard.set_text(&content);
            state.status_text = Some("Copied to clipboard!".to_string());
        }
    }
}

fn submit_modal(state: &mut AppState, kind: ModalKind, form: &FormModal) {
    let msg = match kind {
        ModalKind::AddSection { parent } => AppMsg::AddSection {
            parent,
            name: form.form.text_of("name"),
            description: form.form.text_of("description"),
        },
        ModalKind::AddField { section_id } => AppMsg::AddField {
            section_id,
            draft: crate::widgets::form::to_field_draft(&form.form),
        },
        ModalKind::EditField {
            section_id,
            field_id,
        } => AppMsg::EditField {
            section_id,
            field_id,
            draft: crate::widgets::form::to_field_draft(&form.form),
        },
        ModalKind::RenameSection { id } => AppMsg::RenameSection {
            id,
            name: form.form.text_of("name"),
        },
    };
    apply_msg(state, msg);
}

/// Routes one key event. Returns true when the app should quit.
pub(crate) fn handle_key(state: &mut AppState, key: KeyEvent) -> bool {
    // An open modal captures everything.
    if let Some(mut modal) = state.modal.take() {
        match modal.form.on_key(key) {
            FormOutcome::Pending => {
                state.modal = Some(modal);
            }
            FormOutcome::Cancelled => {}
            FormOutcome::Submitted => {
                submit_modal(state, modal.kind, &modal.form);
            }
        }
        return false;
    }

    // Drag mode: the cursor picks the target; Enter drops, t promotes,
    // Esc cancels with zero effect.
    if state.drag.is_dragging() {
        match key.code {
            KeyCode::Up => move_selection(state, -1),
            KeyCode::Down => move_selection(state, 1),
            KeyCode::PageUp => move_selection(state, -(state.outline_viewport_h as isize).max(1)),
            KeyCode::PageDown => move_selection(state, (state.outline_viewport_h as isize).max(1)),
            KeyCode::Enter => apply_msg(state, AppMsg::Drop),
            KeyCode::Char('t') => {
                apply_msg(
                    state,
                    AppMsg::HoverDrag {
                        target: HoverTarget::Outside,
                    },
                );
                apply_msg(state, AppMsg::Drop);
            }
            KeyCode::Esc => apply_msg(state, AppMsg::CancelDrag),
            _ => {}
        }
        return false;
    }

    // Ctrl+C copies the focused preview JSON, as in the JSON output modal
    // of the web builder.
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        copy_preview_to_clipboard(state);
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => {
            state.focus = match state.focus {
                Pane::Outline => Pane::Preview,
                Pane::Preview => Pane::Outline,
            };
        }
        KeyCode::Up => match state.focus {
            Pane::Outline => move_selection(state, -1),
            Pane::Preview => state.preview_scroll = state.preview_scroll.saturating_sub(1),
        },
        KeyCode::Down => match state.focus {
            Pane::Outline => move_selection(state, 1),
            Pane::Preview => state.preview_scroll = state.preview_scroll.saturating_add(1),
        },
        KeyCode::PageUp => match state.focus {
            Pane::Outline => move_selection(state, -(state.outline_viewport_h as isize).max(1)),
            Pane::Preview => {
                state.preview_scroll = state
                    .preview_scroll
                    .saturating_sub(state.preview_viewport_h)
            }
        },
        KeyCode::PageDown => match state.focus {
            Pane::Outline => move_selection(state, (state.outline_viewport_h as isize).max(1)),
            Pane::Preview => {
                state.preview_scroll = state
                    .preview_scroll
                    .saturating_add(state.preview_viewport_h)
            }
        },
        KeyCode::Home => match state.focus {
            Pane::Outline => {
                state.selected = 0;
                let total = visible_rows(state).len();
                keep_selected_visible(state, total);
            }
            Pane::Preview => state.preview_scroll = 0,
        },
        KeyCode::End => match state.focus {
            Pane::Outline => {
                let total = visible_rows(state).len();
                state.selected = total.saturating_sub(1);
                keep_selected_visible(state, total);
            }
            Pane::Preview => {
                let total = state.preview_lines.len() as u16;
                state.preview_scroll = total.saturating_sub(state.preview_viewport_h);
            }
        },
        KeyCode::Left | KeyCode::Right | KeyCode::Enter if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            if let Some(FlatRow::Section { id, .. }) = rows.get(state.selected) {
                let fold = match key.code {
                    KeyCode::Left => true,
                    KeyCode::Right => false,
                    _ => !state.collapsed.contains(id),
                };
                if fold {
                    state.collapsed.insert(id.clone());
                } else {
                    state.collapsed.remove(id);
                }
            }
        }
        KeyCode::Char('g') if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            if let Some(row) = rows.get(state.selected) {
                let (kind, id) = match row {
                    FlatRow::Section { id, .. } => (NodeKind::Section, id.clone()),
                    FlatRow::Field { id, .. } => (NodeKind::Field, id.clone()),
                };
                apply_msg(state, AppMsg::BeginDrag { kind, id });
            }
        }
        KeyCode::Char('a') if state.focus == Pane::Outline => {
            state.modal = Some(ModalState {
                kind: ModalKind::AddSection { parent: None },
                form: FormModal::new(section_form("Add Section")),
            });
        }
        KeyCode::Char('A') if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            if let Some(parent) = selected_section_id(state, &rows) {
                state.modal = Some(ModalState {
                    kind: ModalKind::AddSection {
                        parent: Some(parent),
                    },
                    form: FormModal::new(section_form("Add Subsection")),
                });
            }
        }
        KeyCode::Char('f') if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            if let Some(section_id) = selected_section_id(state, &rows) {
                state.modal = Some(ModalState {
                    kind: ModalKind::AddField { section_id },
                    form: FormModal::new(field_form("Add Field", None)),
                });
            }
        }
        KeyCode::Char('e') if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            match rows.get(state.selected) {
                Some(FlatRow::Field { section_id, id, .. }) => {
                    let existing = state.forest.find_field(id).cloned();
                    state.modal = Some(ModalState {
                        kind: ModalKind::EditField {
                            section_id: section_id.clone(),
                            field_id: id.clone(),
                        },
                        form: FormModal::new(field_form("Edit Field", existing.as_ref())),
                    });
                }
                Some(FlatRow::Section { id, .. }) => {
                    let current = state
                        .forest
                        .find_section(id)
                        .map(|s| s.name.clone())
                        .unwrap_or_default();
                    state.modal = Some(ModalState {
                        kind: ModalKind::RenameSection { id: id.clone() },
                        form: FormModal::new(rename_form(&current)),
                    });
                }
                None => {}
            }
        }
        KeyCode::Char('x') | KeyCode::Delete if state.focus == Pane::Outline => {
            let rows = visible_rows(state);
            match rows.get(state.selected).cloned() {
                Some(FlatRow::Section { id, .. }) => {
                    apply_msg(state, AppMsg::DeleteSection { id });
                    let total = visible_rows(state).len();
                    keep_selected_visible(state, total);
                }
                Some(FlatRow::Field { section_id, id, .. }) => {
                    apply_msg(
                        state,
                        AppMsg::DeleteField {
                            section_id,
                            field_id: id,
                        },
                    );
                    let total = visible_rows(state).len();
                    keep_selected_visible(state, total);
                }
                None => {}
            }
        }
        KeyCode::Char('s') => apply_msg(state, AppMsg::SaveRequested),
        KeyCode::Char('u') => apply_msg(state, AppMsg::FetchRequested),
        KeyCode::Char('1') => {
            state.preview_tab = PreviewTab::Configuration;
            state.preview_scroll = 0;
            refresh_preview(state);
        }
        KeyCode::Char('2') => {
            state.preview_tab = PreviewTab::Standard;
            state.preview_scroll = 0;
            refresh_preview(state);
        }
        KeyCode::Char('m') => {
            let next = match state.settings.view_mode {
                ViewMode::Paragraph => ViewMode::Bullets,
                ViewMode::Bullets => ViewMode::Paragraph,
            };
            apply_msg(state, AppMsg::SetViewMode(next));
        }
        KeyCode::Char('b') => apply_msg(state, AppMsg::ToggleHpiBullets),
        KeyCode::Char('H') => apply_msg(state, AppMsg::ToggleShowHeaders),
        KeyCode::Char('w') => {
            state.preview_wrap = !state.preview_wrap;
        }
        _ => {}
    }
    false
}

// -------- config discovery -------------------------------------------------

fn parse_config_file(path: &std::path::Path) -> Result<AppConfig> {
    let s = fs::read_to_string(path).with_context(|| format!("reading config: {path:?}"))?;
    let cfg: AppConfig =
        serde_yaml::from_str(&s).with_context(|| format!("parsing config: {path:?}"))?;
    validate_app_config(&cfg).map_err(|e| anyhow!("invalid config {path:?}: {e}"))?;
    Ok(cfg)
}

/// Finds `scribe.yaml` via SCRIBE_TUI_CONFIG_DIR, then CWD and ancestors
/// (plain or under `.scribe/`), then the home directory. A missing file is
/// not an error: the editor runs with in-memory defaults and no store.
fn load_config() -> Result<AppConfig> {
    if let Ok(base) = env::var("SCRIBE_TUI_CONFIG_DIR") {
        let entry = std::path::PathBuf::from(&base).join("scribe.yaml");
        return parse_config_file(&entry);
    }
    let cwd = env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let mut candidates = vec![
        cwd.join("scribe.yaml"),
        cwd.join(".scribe").join("scribe.yaml"),
    ];
    let mut cur = cwd.as_path();
    while let Some(parent) = cur.parent() {
        candidates.push(parent.join(".scribe").join("scribe.yaml"));
        cur = parent;
    }
    if let Some(home) = env::var("HOME")
        .ok()
        .or_else(|| env::var("USERPROFILE").ok())
    {
        candidates.push(std::path::PathBuf::from(home).join(".scribe").join("scribe.yaml"));
    }
    for p in &candidates {
        if p.exists() {
            return parse_config_file(p);
        }
    }
    Ok(AppConfig::default())
}

// -------- drawing ----------------------------------------------------------

fn help_text(state: &AppState) -> String {
    if state.modal.is_some() {
        return "↑/↓ field  Enter edit  Space toggle  s save  Esc cancel".to_string();
    }
    if state.drag.is_dragging() {
        return "↑/↓ choose target  Enter drop  t drop at top level  Esc cancel".to_string();
    }
    match state.focus {
        Pane::Outline => {
            "↑/↓ select  ←/→ fold  g grab  a/A add section  f add field  e edit  x delete  s save  u reload  1/2 preview  q quit"
                .to_string()
        }
        Pane::Preview => {
            "↑/↓ scroll  w wrap  Ctrl+C copy  1/2 tab  Tab outline  q quit".to_string()
        }
    }
}

fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let title = state
        .config
        .header
        .clone()
        .unwrap_or_else(|| "Scribe Studio".to_string());
    let target = match (&state.config.store_cmd, &state.config.template_id) {
        (Some(_), Some(id)) => format!("template: {id}"),
        _ => "no store configured".to_string(),
    };
    let line = Line::from(vec![
        Span::styled(title, theme.title_style().add_modifier(Modifier::BOLD)),
        Span::raw("  —  "),
        Span::styled(target, theme.text_muted()),
    ]);
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(theme.border_unfocused());
    let p = Paragraph::new(line).block(block);
    f.render_widget(p, area);
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }

    let screen = f.area();
    let bg = Block::default().style(Style::default().bg(state.theme.bg));
    f.render_widget(bg, screen);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(screen);

    draw_header(f, layout[0], state);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(layout[1]);

    state.outline_viewport_h = panes[0].height.saturating_sub(2);
    {
        let rows_len = visible_rows(state).len();
        keep_selected_visible(state, rows_len);
    }
    draw_outline(f, panes[0], state, state.focus == Pane::Outline);
    draw_preview(f, panes[1], state, state.focus == Pane::Preview);

    let help = help_text(state);
    draw_footer_combined(f, layout[2], state, &help);

    if let Some(modal) = &mut state.modal {
        let theme = state.theme.clone();
        modal.form.render(f, screen, &theme, state.tick);
    }
}

// -------- main loop --------------------------------------------------------

fn drain_store_msgs(state: &mut AppState) {
    let mut drained: Vec<StoreMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let app_msg = match msg {
            StoreMsg::Fetched { outcome } => AppMsg::LoadedConfig { outcome },
            StoreMsg::Stored { outcome } => AppMsg::StoredConfig { outcome },
        };
        apply_msg(state, app_msg);
    }
}

fn boot_fetch(state: &mut AppState) {
    if state.boot_fetch_done {
        return;
    }
    state.boot_fetch_done = true;
    if state.config.fetch_on_start
        && state.config.store_cmd.is_some()
        && state.config.template_id.is_some()
    {
        apply_msg(state, AppMsg::FetchRequested);
    }
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    let theme = match cfg.theme.as_deref() {
        Some("light") => Theme::from_mode(ThemeMode::Light),
        _ => Theme::from_mode(ThemeMode::Dark),
    };
    let mut state = AppState {
        config: cfg,
        forest: Forest::template_default(),
        theme,
        ..Default::default()
    };
    refresh_preview(&mut state);
    let (tx, rx) = mpsc::channel::<StoreMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    // Headless smoke mode
    let headless = env::var("SCRIBE_TUI_HEADLESS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    let headless_ticks: u64 = env::var("SCRIBE_TUI_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let headless_summary: bool = env::var("SCRIBE_TUI_SMOKE_SUMMARY")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false);
    if headless {
        let backend = ratatui::backend::TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend)?;
        for _ in 0..headless_ticks {
            boot_fetch(&mut state);
            terminal.draw(|f| ui(f, &mut state))?;
            drain_store_msgs(&mut state);
            state.tick = state.tick.wrapping_add(1);
            std::thread::sleep(Duration::from_millis(200));
        }
        if headless_summary {
            let summary = serde_json::json!({
                "ok": true,
                "sections": state.forest.section_ids().len(),
                "fields": state.forest.field_ids().len(),
                "rows": visible_rows(&state).len(),
                "dirty": state.dirty,
                "store_wired": state.config.store_cmd.is_some(),
            });
            println!("{summary}");
        }
        return Ok(());
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    let res = loop {
        boot_fetch(&mut state);
        terminal.draw(|f| ui(f, &mut state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut state, key) {
                    break Ok(());
                }
            }
        }
        drain_store_msgs(&mut state);
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    };
    // Restore
    disable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    res
}
