use serde::Deserialize;

/// One editable field of a settings section, as declared in YAML.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    // text | password | number | checkbox | select | textarea (default: text)
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub required: bool,
    // Number constraints
    #[serde(default)]
    pub integer: bool,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    // Select: display labels and (optionally) distinct submitted values
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
    // Text constraints
    #[serde(default)]
    pub pattern: Option<String>,
    // Shown after the value, e.g. "s" or "Mbit/s"
    #[serde(default)]
    pub unit: Option<String>,
    // Textarea editor height
    #[serde(default)]
    pub edit_lines: Option<usize>,
}

impl FieldSpec {
    pub fn kind_str(&self) -> &str {
        self.kind.as_deref().unwrap_or("text")
    }
}

/// One settings section ("tab"). `id` doubles as the daemon config key
/// and the registry tab id, so it must be unique and stable.
#[derive(Debug, Deserialize, Clone)]
pub struct SectionItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default = "default_sections")]
    pub sections: Vec<SectionItem>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            header: Some("BWM — Bandwidth Manager".to_string()),
            sections: default_sections(),
        }
    }
}

fn num(name: &str, label: &str, integer: bool, min: f64, max: f64, unit: &str) -> FieldSpec {
    FieldSpec {
        name: name.into(),
        label: label.into(),
        kind: Some("number".into()),
        integer,
        minimum: Some(min),
        maximum: Some(max),
        unit: if unit.is_empty() {
            None
        } else {
            Some(unit.into())
        },
        ..Default::default()
    }
}

fn default_sections() -> Vec<SectionItem> {
    vec![
        SectionItem {
            id: "general".into(),
            title: "General".into(),
            fields: vec![
                FieldSpec {
                    name: "server_host".into(),
                    label: "Server host".into(),
                    required: true,
                    ..Default::default()
                },
                num("port", "Port", true, 1.0, 65535.0, ""),
                num("max_total_mbps", "Total limit", false, 0.0, 10000.0, "Mbit/s"),
                FieldSpec {
                    name: "enforce_limits".into(),
                    label: "Enforce limits".into(),
                    kind: Some("checkbox".into()),
                    ..Default::default()
                },
                FieldSpec {
                    name: "log_level".into(),
                    label: "Log level".into(),
                    kind: Some("select".into()),
                    options: Some(vec![
                        "Debug".into(),
                        "Info".into(),
                        "Warning".into(),
                        "Error".into(),
                    ]),
                    values: Some(vec![
                        "debug".into(),
                        "info".into(),
                        "warning".into(),
                        "error".into(),
                    ]),
                    ..Default::default()
                },
            ],
        },
        SectionItem {
            id: "delays".into(),
            title: "Delays".into(),
            fields: vec![
                num("episode_end", "After episode ends", true, 0.0, 86400.0, "s"),
                num("movie_end", "After movie ends", true, 0.0, 86400.0, "s"),
                num("paused_grace", "Paused grace", true, 0.0, 3600.0, "s"),
            ],
        },
        SectionItem {
            id: "schedule".into(),
            title: "Schedule".into(),
            fields: vec![
                FieldSpec {
                    name: "peak_start".into(),
                    label: "Peak starts".into(),
                    required: true,
                    pattern: Some(r"^([01]\d|2[0-3]):[0-5]\d$".into()),
                    ..Default::default()
                },
                FieldSpec {
                    name: "peak_end".into(),
                    label: "Peak ends".into(),
                    required: true,
                    pattern: Some(r"^([01]\d|2[0-3]):[0-5]\d$".into()),
                    ..Default::default()
                },
                num("peak_limit_mbps", "Peak limit", false, 0.0, 10000.0, "Mbit/s"),
                FieldSpec {
                    name: "weekend_unlimited".into(),
                    label: "Unlimited on weekends".into(),
                    kind: Some("checkbox".into()),
                    ..Default::default()
                },
            ],
        },
        SectionItem {
            id: "account".into(),
            title: "Account".into(),
            fields: vec![
                FieldSpec {
                    name: "username".into(),
                    label: "Username".into(),
                    required: true,
                    ..Default::default()
                },
                FieldSpec {
                    name: "password".into(),
                    label: "Password".into(),
                    kind: Some("password".into()),
                    ..Default::default()
                },
                FieldSpec {
                    name: "throttle_message".into(),
                    label: "Throttle notice".into(),
                    kind: Some("textarea".into()),
                    edit_lines: Some(4),
                    ..Default::default()
                },
            ],
        },
    ]
}

const FIELD_KINDS: [&str; 6] = ["text", "password", "number", "checkbox", "select", "textarea"];

pub(crate) fn validate_app_config(cfg: &AppConfig) -> Result<(), String> {
    use std::collections::HashSet;
    let mut ids = HashSet::new();
    for (i, s) in cfg.sections.iter().enumerate() {
        if !ids.insert(&s.id) {
            return Err(format!("duplicate section id: '{}' at index {}", s.id, i));
        }
        let mut names = HashSet::new();
        for f in &s.fields {
            if !names.insert(&f.name) {
                return Err(format!("section '{}' has duplicate field '{}'", s.id, f.name));
            }
            let kind = f.kind_str();
            if !FIELD_KINDS.contains(&kind) {
                return Err(format!(
                    "section '{}' field '{}' has unknown kind '{}'",
                    s.id, f.name, kind
                ));
            }
            if kind == "select" {
                let opts = f.options.as_deref().unwrap_or_default();
                if opts.is_empty() {
                    return Err(format!(
                        "section '{}' select field '{}' needs options",
                        s.id, f.name
                    ));
                }
                if let Some(vals) = &f.values {
                    if vals.len() != opts.len() {
                        return Err(format!(
                            "section '{}' field '{}': values/options length mismatch",
                            s.id, f.name
                        ));
                    }
                }
            }
            if let (Some(min), Some(max)) = (f.minimum, f.maximum) {
                if min > max {
                    return Err(format!(
                        "section '{}' field '{}': minimum {} above maximum {}",
                        s.id, f.name, min, max
                    ));
                }
            }
            if let Some(pat) = &f.pattern {
                if regex::Regex::new(pat).is_err() {
                    return Err(format!(
                        "section '{}' field '{}': invalid pattern '{}'",
                        s.id, f.name, pat
                    ));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(validate_app_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn validate_detects_duplicate_section_ids() {
        let mut cfg = AppConfig::default();
        let dup = cfg.sections[0].clone();
        cfg.sections.push(dup);
        let err = validate_app_config(&cfg).unwrap_err();
        assert!(err.contains("duplicate section id"));
    }

    #[test]
    fn validate_select_requires_options() {
        let cfg = AppConfig {
            header: None,
            sections: vec![SectionItem {
                id: "s".into(),
                title: "S".into(),
                fields: vec![FieldSpec {
                    name: "mode".into(),
                    label: "Mode".into(),
                    kind: Some("select".into()),
                    ..Default::default()
                }],
            }],
        };
        let err = validate_app_config(&cfg).unwrap_err();
        assert!(err.contains("needs options"));
    }

    #[test]
    fn validate_rejects_unknown_kind_and_bad_bounds() {
        let cfg = AppConfig {
            header: None,
            sections: vec![SectionItem {
                id: "s".into(),
                title: "S".into(),
                fields: vec![FieldSpec {
                    name: "x".into(),
                    label: "X".into(),
                    kind: Some("slider".into()),
                    ..Default::default()
                }],
            }],
        };
        assert!(validate_app_config(&cfg).unwrap_err().contains("unknown kind"));

        let cfg = AppConfig {
            header: None,
            sections: vec![SectionItem {
                id: "s".into(),
                title: "S".into(),
                fields: vec![FieldSpec {
                    name: "x".into(),
                    label: "X".into(),
                    kind: Some("number".into()),
                    minimum: Some(10.0),
                    maximum: Some(1.0),
                    ..Default::default()
                }],
            }],
        };
        assert!(validate_app_config(&cfg).unwrap_err().contains("above maximum"));
    }

    #[test]
    fn config_parses_from_yaml() {
        let yaml = r#"
header: "Ops"
sections:
  - id: delays
    title: Delays
    fields:
      - name: episode_end
        label: After episode ends
        kind: number
        integer: true
        minimum: 0
        maximum: 86400
        unit: s
"#;
        let cfg: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.sections.len(), 1);
        assert_eq!(cfg.sections[0].fields[0].name, "episode_end");
        assert!(cfg.sections[0].fields[0].integer);
        assert!(validate_app_config(&cfg).is_ok());
    }
}
