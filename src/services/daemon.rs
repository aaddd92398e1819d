use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::env;
use std::process::Command;

fn expand_cmdline_env(cmdline: &str) -> String {
    // Expand ${VAR} from environment; special-case ${DAEMON_BIN}
    // -> BWM_DAEMON_BIN (quoted if it contains whitespace) or default "bwmd"
    let re = Regex::new(r"\$\{([A-Z0-9_]+)\}").unwrap();
    let env_map: HashMap<String, String> = env::vars().collect();
    re.replace_all(cmdline, |caps: &regex::Captures| {
        let key = &caps[1];
        if key == "DAEMON_BIN" {
            if let Some(v) = env_map.get("BWM_DAEMON_BIN") {
                let needs_quote = v.chars().any(|c| c.is_whitespace());
                if needs_quote {
                    let escaped = v.replace('"', "\\\"");
                    return format!("\"{escaped}\"");
                }
                return v.to_string();
            }
            return "bwmd".to_string();
        }
        env_map.get(key).cloned().unwrap_or_default()
    })
    .to_string()
}

pub fn run_cmdline_to_json(cmdline: &str) -> Result<JsonValue> {
    let expanded = expand_cmdline_env(cmdline);
    let parts = shlex::split(&expanded).ok_or_else(|| anyhow!("Failed to parse command line"))?;
    if parts.is_empty() {
        return Err(anyhow!("Empty command line"));
    }
    let program = &parts[0];
    let args = &parts[1..];
    let output = Command::new(program)
        .args(args)
        .env("BWM_JSON", "1")
        .output()
        .with_context(|| format!("spawning {expanded}"))?;
    if !output.status.success() {
        let err = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(anyhow!("Command failed: {}\n{}", cmdline, err));
    }
    let text = String::from_utf8_lossy(&output.stdout).to_string();
    let v: JsonValue = serde_json::from_str(&text).with_context(|| "parsing daemon JSON")?;
    Ok(v)
}

/// Unwrap the daemon's `{"data": ...}` envelope.
pub fn envelope_data(v: JsonValue) -> Result<JsonValue> {
    match v {
        JsonValue::Object(mut obj) => obj
            .remove("data")
            .ok_or_else(|| anyhow!("daemon response has no 'data' field")),
        other => Err(anyhow!("daemon response is not an object: {other}")),
    }
}

/// Full configuration, one object per section keyed by section id.
pub fn get_config() -> Result<JsonValue> {
    envelope_data(run_cmdline_to_json("${DAEMON_BIN} get-config")?)
}

pub fn list_streams() -> Result<JsonValue> {
    envelope_data(run_cmdline_to_json("${DAEMON_BIN} list-streams")?)
}

pub fn get_history() -> Result<JsonValue> {
    envelope_data(run_cmdline_to_json("${DAEMON_BIN} get-history")?)
}

/// Persist one section's payload. The daemon replies with the stored
/// section under `data`; callers treat a clean exit as success.
pub fn save_section(section_id: &str, payload: &JsonValue) -> Result<()> {
    let json = payload.to_string().replace('\'', "'\\''");
    let cmdline = format!("${{DAEMON_BIN}} set-config --section {section_id} --json '{json}'");
    run_cmdline_to_json(&cmdline)
        .with_context(|| format!("saving section '{section_id}'"))
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_data_unwraps_payload() {
        let v = json!({"data": {"delays": {"episode_end": 600}}});
        let data = envelope_data(v).unwrap();
        assert_eq!(data["delays"]["episode_end"], json!(600));
    }

    #[test]
    fn envelope_without_data_is_an_error() {
        assert!(envelope_data(json!({"ok": true})).is_err());
        assert!(envelope_data(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn env_placeholders_expand() {
        std::env::set_var("BWM_TUI_TEST_TOKEN", "abc");
        let out = expand_cmdline_env("prog --token ${BWM_TUI_TEST_TOKEN}");
        assert_eq!(out, "prog --token abc");
        let missing = expand_cmdline_env("prog ${BWM_TUI_TEST_MISSING}");
        assert_eq!(missing, "prog ");
    }
}
