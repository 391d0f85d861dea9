use crate::model::{FieldDraft, Forest, ViewMode, ViewSettings};
use crate::serialize;
use crate::tree::drag::{DragOp, HoverTarget, NodeKind};
use crate::ui::{AppState, ToastLevel};
use serde_json::Value as JsonValue;

/// Everything the UI (or the headless driver) can ask the app to do, plus
/// the async outcomes reported back by the store client.
pub enum AppMsg {
    // Gesture entry points
    BeginDrag {
        kind: NodeKind,
        id: String,
    },
    HoverDrag {
        target: HoverTarget,
    },
    Drop,
    CancelDrag,
    // Structural entry points
    AddSection {
        parent: Option<String>,
        name: String,
        description: String,
    },
    AddField {
        section_id: String,
        draft: FieldDraft,
    },
    EditField {
        section_id: String,
        field_id: String,
        draft: FieldDraft,
    },
    DeleteSection {
        id: String,
    },
    DeleteField {
        section_id: String,
        field_id: String,
    },
    RenameSection {
        id: String,
        name: String,
    },
    // View settings
    SetViewMode(ViewMode),
    ToggleHpiBullets,
    ToggleShowHeaders,
    // Persistence
    SaveRequested,
    FetchRequested,
    LoadedConfig {
        outcome: Result<Option<JsonValue>, String>,
    },
    StoredConfig {
        outcome: Result<(), String>,
    },
}

pub enum Effect {
    FetchConfig {
        store_cmd: String,
        template_id: String,
    },
    StoreConfig {
        store_cmd: String,
        template_id: String,
        payload: JsonValue,
    },
    ShowToast {
        text: String,
        level: ToastLevel,
        seconds: u64,
    },
}

fn toast(text: impl Into<String>, level: ToastLevel) -> Effect {
    Effect::ShowToast {
        text: text.into(),
        level,
        seconds: 3,
    }
}

fn store_target(state: &AppState) -> Option<(String, String)> {
    let cmd = state.config.store_cmd.clone()?;
    if cmd.trim().is_empty() {
        return None;
    }
    let id = state.config.template_id.clone()?;
    Some((cmd, id))
}

fn store_effect(state: &AppState) -> Option<Effect> {
    let (store_cmd, template_id) = store_target(state)?;
    match serialize::save_tree(&state.settings, &state.forest) {
        Ok(payload) => Some(Effect::StoreConfig {
            store_cmd,
            template_id,
            payload,
        }),
        Err(e) => Some(toast(format!("{e}"), ToastLevel::Error)),
    }
}

// A committed edit: mark the document dirty, rebuild the preview and, when
// autosave is wired, push the new configuration to the store.
fn after_mutation(state: &mut AppState, effects: &mut Vec<Effect>) {
    state.dirty = true;
    crate::ui::refresh_preview(state);
    if state.config.autosave {
        if let Some(eff) = store_effect(state) {
            effects.push(eff);
        }
    }
}

fn drop_message(state: &AppState, op: &DragOp) -> String {
    let section_name = |id: &str| {
        state
            .forest
            .find_section(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let field_name = |id: &str| {
        state
            .forest
            .find_field(id)
            .map(|f| f.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    match op {
        DragOp::PromoteSection { id } => {
            format!("\"{}\" promoted to top level", section_name(id))
        }
        DragOp::ReorderSection { moved, .. } => format!("\"{}\" reordered", section_name(moved)),
        DragOp::NestSection { moved, parent } => format!(
            "\"{}\" nested inside \"{}\"",
            section_name(moved),
            section_name(parent)
        ),
        DragOp::ReorderField { moved, .. } => format!("\"{}\" reordered", field_name(moved)),
        DragOp::MoveFieldBefore { moved, section, .. } | DragOp::AppendField { moved, section } => {
            format!(
                "\"{}\" moved to \"{}\"",
                field_name(moved),
                section_name(section)
            )
        }
    }
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        BeginDrag { kind, id } => {
            if let Err(e) = state.drag.begin(&state.forest, kind, &id) {
                effects.push(toast(format!("{e}"), ToastLevel::Error));
            }
        }
        HoverDrag { target } => {
            state.drag.hover(target);
        }
        Drop => {
            // At most one mutation per drop; a rejected drop is a normal
            // outcome and stays silent.
            if let Some(op) = state.drag.drop_on_target(&mut state.forest) {
                let text = drop_message(state, &op);
                after_mutation(state, &mut effects);
                effects.push(toast(text, ToastLevel::Success));
            }
        }
        CancelDrag => {
            state.drag.cancel();
        }
        AddSection {
            parent,
            name,
            description,
        } => match state
            .forest
            .add_section(parent.as_deref(), &name, &description)
        {
            Ok(section) => {
                after_mutation(state, &mut effects);
                effects.push(toast(
                    format!("Section \"{}\" added", section.name),
                    ToastLevel::Success,
                ));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        AddField { section_id, draft } => match state.forest.add_field(&section_id, &draft) {
            Ok(field) => {
                after_mutation(state, &mut effects);
                effects.push(toast(
                    format!("Field \"{}\" added", field.name),
                    ToastLevel::Success,
                ));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        EditField {
            section_id,
            field_id,
            draft,
        } => match state
            .forest
            .update_field_from_draft(&section_id, &field_id, &draft)
        {
            Ok(()) => {
                after_mutation(state, &mut effects);
                effects.push(toast("Field updated", ToastLevel::Success));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        DeleteSection { id } => match state.forest.delete_section(&id) {
            Ok(removed) => {
                state.collapsed.remove(&removed.id);
                after_mutation(state, &mut effects);
                effects.push(toast(
                    format!("Section \"{}\" deleted", removed.name),
                    ToastLevel::Success,
                ));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        DeleteField {
            section_id,
            field_id,
        } => match state.forest.delete_field(&section_id, &field_id) {
            Ok(removed) => {
                after_mutation(state, &mut effects);
                effects.push(toast(
                    format!("Field \"{}\" deleted", removed.name),
                    ToastLevel::Success,
                ));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        RenameSection { id, name } => match state.forest.rename_section(&id, &name) {
            Ok(()) => {
                after_mutation(state, &mut effects);
                effects.push(toast("Section renamed", ToastLevel::Success));
            }
            Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
        },
        SetViewMode(mode) => {
            if state.settings.view_mode != mode {
                state.settings.view_mode = mode;
                after_mutation(state, &mut effects);
            }
        }
        ToggleHpiBullets => {
            state.settings.show_hpi_bullets = !state.settings.show_hpi_bullets;
            after_mutation(state, &mut effects);
        }
        ToggleShowHeaders => {
            state.settings.show_headers = !state.settings.show_headers;
            after_mutation(state, &mut effects);
        }
        SaveRequested => {
            if store_target(state).is_some() {
                if let Some(eff) = store_effect(state) {
                    effects.push(eff);
                }
            } else {
                effects.push(toast(
                    "Store not configured — edits stay in memory",
                    ToastLevel::Info,
                ));
            }
        }
        FetchRequested => {
            if let Some((store_cmd, template_id)) = store_target(state) {
                effects.push(Effect::FetchConfig {
                    store_cmd,
                    template_id,
                });
            } else {
                effects.push(toast("Store not configured", ToastLevel::Info));
            }
        }
        LoadedConfig { outcome } => {
            state.status_text = None;
            match outcome {
                // Some stores hand the blob back as a JSON string rather
                // than an embedded object.
                Ok(Some(doc)) => match doc
                    .as_str()
                    .map(serialize::load_tree)
                    .unwrap_or_else(|| serialize::load_tree_value(&doc))
                {
                    Ok((settings, forest)) => {
                        state.settings = settings;
                        state.forest = forest;
                        state.collapsed.clear();
                        state.selected = 0;
                        state.outline_offset = 0;
                        state.dirty = false;
                        crate::ui::refresh_preview(state);
                        effects.push(toast("Configuration loaded", ToastLevel::Success));
                    }
                    // All-or-nothing: a bad document never touches the tree.
                    Err(e) => effects.push(toast(format!("{e}"), ToastLevel::Error)),
                },
                Ok(None) => {
                    state.settings = ViewSettings::default();
                    state.forest = Forest::template_default();
                    state.collapsed.clear();
                    state.selected = 0;
                    state.outline_offset = 0;
                    state.dirty = false;
                    crate::ui::refresh_preview(state);
                    effects.push(toast(
                        "No saved configuration — template defaults loaded",
                        ToastLevel::Info,
                    ));
                }
                Err(e) => effects.push(toast(format!("Fetch failed: {e}"), ToastLevel::Error)),
            }
        }
        StoredConfig { outcome } => {
            state.status_text = None;
            match outcome {
                Ok(()) => {
                    state.dirty = false;
                    effects.push(toast("Configuration saved", ToastLevel::Success));
                }
                // The in-memory tree stays authoritative; a failed save is
                // retryable and never rolls anything back.
                Err(e) => effects.push(toast(format!("Save failed: {e}"), ToastLevel::Error)),
            }
        }
    }
    effects
}
