use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use std::{collections::HashMap, env};

// External persistence collaborator: a store CLI speaking JSON envelopes on
// stdout. The core only ever asks it two things — fetch the configuration
// document for a template id, and store one — and treats the payload as an
// opaque blob. Both run off-thread; results come back as StoreMsg.

/// Outcome of an asynchronous store call, drained by the UI loop.
pub enum StoreMsg {
    /// `Ok(None)` means the store has no configuration for the template yet.
    Fetched {
        outcome: Result<Option<JsonValue>, String>,
    },
    Stored {
        outcome: Result<(), String>,
    },
}

fn expand_cmdline_env(cmdline: &str) -> String {
    // Expand ${VAR} from environment; special-case ${STORE_BIN}
    // -> SCRIBE_STORE_BIN (quoted if contains whitespace) or default
    // "scribe-store"
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(cmdline, |caps: &regex::Captures| {
        let key = &caps[1];
        if key == "STORE_BIN" {
            if let Some(v) = env_map.get("SCRIBE_STORE_BIN") {
                // Quote if contains whitespace to keep it a single arg in shlex::split
                let needs_quote = v.chars().any(|c| c.is_whitespace());
                if needs_quote {
                    let escaped = v.replace('"', "\\\"");
                    return format!("\"{escaped}\"");
                }
                return v.to_string();
            }
            return "scribe-store".to_string();
        }
        env_map.get(key).cloned().unwrap_or_default()
    })
    .to_string()
}

/// Runs the store command with extra args appended after shlex splitting, so
/// JSON payloads survive as single arguments. Parses stdout as one JSON
/// document.
pub fn run_store_to_json(base_cmdline: &str, extra_args: &[String]) -> Result<JsonValue> {
    let expanded = expand_cmdline_env(base_cmdline);
    let mut parts =
        shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    if parts.is_empty() {
        return Err(anyhow!("Empty command line"));
    }
    parts.extend(extra_args.iter().cloned());
    let program = &parts[0];
    let args = &parts[1..];
    let output = Command::new(program)
        .args(args)
        .env("SCRIBE_TUI_JSON", "1")
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("spawning {expanded}"))?;
    if !output.status.success() {
        // The store reports structured errors on stderr when it can.
        let err_text = String::from_utf8_lossy(&output.stderr).to_string();
        if let Ok(v) = serde_json::from_str::<JsonValue>(&err_text) {
            return Err(anyhow!("{}", envelope_message(&v)));
        }
        return Err(anyhow!("Command failed: {}\n{}", base_cmdline, err_text));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let v: JsonValue = serde_json::from_str(&text).with_context(|| "parsing store JSON")?;
    Ok(v)
}

pub fn get_by_path<'a>(v: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut cur = v;
    for seg in path.split('.') {
        cur = cur.get(seg)?;
    }
    Some(cur)
}

fn envelope_message(v: &JsonValue) -> String {
    get_by_path(v, "data.message")
        .or_else(|| v.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("store call failed")
        .to_string()
}

/// Pulls the configuration document out of a fetch envelope. A successful
/// envelope without one means nothing has been saved for the template yet.
pub(crate) fn unwrap_configuration(v: &JsonValue) -> Result<Option<JsonValue>, String> {
    if v.get("ok").and_then(|b| b.as_bool()) == Some(false) {
        return Err(envelope_message(v));
    }
    let cfg = get_by_path(v, "data.configuration")
        .or_else(|| v.get("configuration"))
        .filter(|c| !c.is_null());
    Ok(cfg.cloned())
}

/// Fetches the configuration for a template id off-thread.
pub fn spawn_fetch_config(store_cmd: String, template_id: String, tx: Sender<StoreMsg>) {
    thread::spawn(move || {
        let outcome = (|| -> Result<Option<JsonValue>, String> {
            let v = run_store_to_json(&store_cmd, &["get-config".into(), template_id])
                .map_err(|e| format!("{e}"))?;
            unwrap_configuration(&v)
        })();
        let _ = tx.send(StoreMsg::Fetched { outcome });
    });
}

/// Stores the configuration payload for a template id off-thread. The
/// in-memory tree is the source of truth; a failure here is reported and
/// nothing is rolled back.
pub fn spawn_store_config(
    store_cmd: String,
    template_id: String,
    payload: JsonValue,
    tx: Sender<StoreMsg>,
) {
    thread::spawn(move || {
        let outcome = (|| -> Result<(), String> {
            let body = payload.to_string();
            let v = run_store_to_json(
                &store_cmd,
                &[
                    "put-config".into(),
                    template_id,
                    "--config-json".into(),
                    body,
                ],
            )
            .map_err(|e| format!("{e}"))?;
            if v.get("ok").and_then(|b| b.as_bool()) == Some(false) {
                return Err(envelope_message(&v));
            }
            Ok(())
        })();
        let _ = tx.send(StoreMsg::Stored { outcome });
    });
}

#[cfg(test)]
mod store_client_tests;
