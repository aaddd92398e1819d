use crate::model::FieldSpec;
use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
}

#[derive(Clone, Debug)]
pub enum FieldKind {
    Text,
    Password,
    Number {
        is_integer: bool,
        minimum: Option<f64>,
        maximum: Option<f64>,
    },
    Checkbox,
    Select {
        options: Vec<String>,
        values: Vec<String>,
        cursor: usize,
        selected: usize,
        offset: usize,
    },
    TextArea {
        edit_lines: usize,
    },
}

pub const OPTIONS_VISIBLE: usize = 8;

#[derive(Clone, Debug)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub error: Option<String>,
    pub pattern: Option<String>,
    pub unit: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmAction {
    Discard,
}

#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub title: String,
    pub fields: Vec<FormField>,
    pub selected: usize,
    pub editing: bool,
    pub message: Option<String>,
    pub disabled: bool,
    pub confirm: Option<ConfirmAction>,
}

pub fn save_button_index(form: &FormState) -> usize {
    form.fields.len()
}

pub fn discard_button_index(form: &FormState) -> usize {
    form.fields.len() + 1
}

/// Build fields from the section's YAML declaration. Values start empty
/// and are filled in from the daemon's config once it arrives.
pub fn fields_from_specs(specs: &[FieldSpec]) -> Vec<FormField> {
    specs
        .iter()
        .map(|s| {
            let kind = match s.kind_str() {
                "password" => FieldKind::Password,
                "checkbox" => FieldKind::Checkbox,
                "textarea" => FieldKind::TextArea {
                    edit_lines: s.edit_lines.unwrap_or(4),
                },
                "number" => FieldKind::Number {
                    is_integer: s.integer,
                    minimum: s.minimum,
                    maximum: s.maximum,
                },
                "select" => {
                    let options = s.options.clone().unwrap_or_default();
                    let values = s.values.clone().unwrap_or_else(|| options.clone());
                    FieldKind::Select {
                        options,
                        values,
                        cursor: 0,
                        selected: 0,
                        offset: 0,
                    }
                }
                _ => FieldKind::Text,
            };
            let value = match kind {
                FieldKind::Checkbox => FieldValue::Bool(false),
                _ => FieldValue::Text(String::new()),
            };
            FormField {
                name: s.name.clone(),
                label: s.label.clone(),
                required: s.required,
                kind,
                value,
                error: None,
                pattern: s.pattern.clone(),
                unit: s.unit.clone(),
            }
        })
        .collect()
}

fn trim_float(v: f64) -> String {
    let mut s = format!("{v:.6}");
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s.is_empty() {
        s.push('0');
    }
    s
}

/// The form's working value as a JSON object, one entry per field.
/// Numbers whose text parses land as JSON numbers (whole floats collapse
/// to integers so a round-trip through the daemon compares equal);
/// anything unparsable stays a string, which correctly reads as dirty.
pub fn section_value(form: &FormState) -> JsonValue {
    let mut obj = serde_json::Map::new();
    for f in &form.fields {
        let v = match (&f.kind, &f.value) {
            (FieldKind::Checkbox, FieldValue::Bool(b)) => JsonValue::Bool(*b),
            (FieldKind::Number { is_integer, .. }, FieldValue::Text(s)) => {
                let t = s.trim();
                if *is_integer {
                    t.parse::<i64>()
                        .map(JsonValue::from)
                        .unwrap_or_else(|_| JsonValue::String(t.to_string()))
                } else {
                    match t.parse::<f64>() {
                        Ok(n) if n.fract() == 0.0 && n.abs() < 9e15 => JsonValue::from(n as i64),
                        Ok(n) => serde_json::Number::from_f64(n)
                            .map(JsonValue::Number)
                            .unwrap_or_else(|| JsonValue::String(t.to_string())),
                        Err(_) => JsonValue::String(t.to_string()),
                    }
                }
            }
            (
                FieldKind::Select {
                    values, selected, ..
                },
                _,
            ) => JsonValue::String(values.get(*selected).cloned().unwrap_or_default()),
            (_, FieldValue::Text(s)) => JsonValue::String(s.clone()),
            (_, FieldValue::Bool(b)) => JsonValue::Bool(*b),
        };
        obj.insert(f.name.clone(), v);
    }
    JsonValue::Object(obj)
}

/// Push a JSON object's entries into the form's fields by name. Unknown
/// JSON keys are ignored; fields the object lacks keep their value.
pub fn apply_section_value(form: &mut FormState, v: &JsonValue) {
    for f in &mut form.fields {
        let Some(val) = v.get(&f.name) else { continue };
        match &mut f.kind {
            FieldKind::Checkbox => {
                if let Some(b) = val.as_bool() {
                    f.value = FieldValue::Bool(b);
                }
            }
            FieldKind::Number { .. } => {
                let text = if let Some(i) = val.as_i64() {
                    Some(i.to_string())
                } else {
                    val.as_f64().map(trim_float)
                };
                if let Some(t) = text {
                    f.value = FieldValue::Text(t);
                }
            }
            FieldKind::Select {
                values,
                cursor,
                selected,
                offset,
                ..
            } => {
                if let Some(s) = val.as_str() {
                    if let Some(idx) = values.iter().position(|v| v == s) {
                        *selected = idx;
                        *cursor = idx;
                        *offset = 0;
                    }
                }
            }
            _ => {
                if let Some(s) = val.as_str() {
                    f.value = FieldValue::Text(s.to_string());
                }
            }
        }
        f.error = None;
    }
}

pub fn validate_form(form: &mut FormState) -> bool {
    let mut ok = true;
    for fld in &mut form.fields {
        fld.error = None;
        match (&fld.kind, &mut fld.value) {
            (FieldKind::Text, FieldValue::Text(s))
            | (FieldKind::Password, FieldValue::Text(s))
            | (FieldKind::TextArea { .. }, FieldValue::Text(s)) => {
                let st = s.trim();
                if fld.required && st.is_empty() {
                    fld.error = Some("This field is required".into());
                    ok = false;
                } else if let Some(pat) = &fld.pattern {
                    if let Ok(re) = regex::Regex::new(pat) {
                        if !st.is_empty() && !re.is_match(st) {
                            fld.error = Some("Does not match required format".into());
                            ok = false;
                        }
                    }
                }
            }
            (
                FieldKind::Number {
                    is_integer,
                    minimum,
                    maximum,
                },
                FieldValue::Text(s),
            ) => {
                let raw = s.trim();
                if fld.required && raw.is_empty() {
                    fld.error = Some("This field is required".into());
                    ok = false;
                } else if !raw.is_empty() {
                    if *is_integer {
                        match raw.parse::<i64>() {
                            Ok(mut v) => {
                                if let Some(minv) = minimum {
                                    let m = minv.floor() as i64;
                                    if v < m {
                                        v = m;
                                    }
                                }
                                if let Some(maxv) = maximum {
                                    let m = maxv.ceil() as i64;
                                    if v > m {
                                        v = m;
                                    }
                                }
                                *s = v.to_string();
                            }
                            Err(_) => {
                                fld.error = Some("Invalid integer".into());
                                ok = false;
                            }
                        }
                    } else {
                        match raw.parse::<f64>() {
                            Ok(mut v) => {
                                if let Some(minv) = minimum {
                                    if v < *minv {
                                        v = *minv;
                                    }
                                }
                                if let Some(maxv) = maximum {
                                    if v > *maxv {
                                        v = *maxv;
                                    }
                                }
                                *s = trim_float(v);
                            }
                            Err(_) => {
                                fld.error = Some("Invalid number".into());
                                ok = false;
                            }
                        }
                    }
                }
            }
            (FieldKind::Select { options, .. }, _) => {
                if fld.required && options.is_empty() {
                    fld.error = Some("No options available".into());
                    ok = false;
                }
            }
            _ => {}
        }
    }
    if !ok {
        form.message = Some("Please fix the highlighted errors".into());
    } else {
        form.message = None;
    }
    ok
}

// Inline feedback while typing into a text-like field.
pub fn validate_text_inline(fld: &mut FormField) {
    if let FieldValue::Text(s) = &fld.value {
        let st = s.trim();
        fld.error = None;
        if fld.required && st.is_empty() {
            fld.error = Some("This field is required".into());
            return;
        }
        if let Some(pat) = &fld.pattern {
            if let Ok(re) = regex::Regex::new(pat) {
                if !st.is_empty() && !re.is_match(st) {
                    fld.error = Some("Does not match required format".into());
                }
            }
        }
    }
}

pub fn draw_form(
    f: &mut Frame,
    area: Rect,
    form: &mut FormState,
    theme: &Theme,
    highlight: bool,
    cursor_on: bool,
    dirty: bool,
) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, fld) in form.fields.iter().enumerate() {
        let sel = if i == form.selected { '›' } else { ' ' };
        let req = if fld.required { " *" } else { "" };
        let value_style = if i == form.selected {
            if form.editing {
                theme.text_editing_bold()
            } else {
                theme.text_active_bold()
            }
        } else {
            Style::default()
        };
        match &fld.kind {
            FieldKind::Text | FieldKind::Number { .. } => {
                let mut val = match &fld.value {
                    FieldValue::Text(s) => s.clone(),
                    FieldValue::Bool(b) => if *b { "On".into() } else { "Off".into() },
                };
                if form.editing && i == form.selected && cursor_on {
                    val.push('▏');
                }
                let mut spans = vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(val, value_style),
                ];
                if let Some(unit) = &fld.unit {
                    spans.push(Span::styled(format!(" {unit}"), theme.text_muted()));
                }
                lines.push(Line::from(spans));
            }
            FieldKind::Password => {
                let mut masked = String::new();
                if let FieldValue::Text(s) = &fld.value {
                    masked = "•".repeat(s.chars().count());
                }
                if form.editing && i == form.selected && cursor_on {
                    masked.push('▏');
                }
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(masked, value_style),
                ]));
            }
            FieldKind::Checkbox => {
                let checked = matches!(fld.value, FieldValue::Bool(true));
                let val = if checked { "[x]" } else { "[ ]" };
                let style = if i == form.selected {
                    theme.text_active_bold()
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(val.to_string(), style),
                ]));
            }
            FieldKind::Select {
                options,
                cursor,
                selected,
                offset,
                ..
            } => {
                let summary = options
                    .get(*selected)
                    .cloned()
                    .unwrap_or_else(|| "(none)".into());
                lines.push(Line::from(vec![
                    Span::raw(format!("{sel} {}{req}: ", fld.label)),
                    Span::styled(summary, value_style),
                ]));
                if form.editing && i == form.selected {
                    let start = (*offset).min(options.len());
                    let end = (start + OPTIONS_VISIBLE).min(options.len());
                    for (oi, opt) in options.iter().enumerate().take(end).skip(start) {
                        let mark = if oi == *selected { "(•)" } else { "( )" };
                        let cur = if oi == *cursor { '›' } else { ' ' };
                        let st = if oi == *cursor {
                            theme.list_cursor_style()
                        } else {
                            theme.text_muted()
                        };
                        lines.push(Line::from(Span::styled(
                            format!("  {cur} {mark} {opt}"),
                            st,
                        )));
                    }
                }
            }
            FieldKind::TextArea { .. } => {
                lines.push(Line::from(Span::raw(format!("{sel} {}{req}:", fld.label))));
                let text = match &fld.value {
                    FieldValue::Text(s) => s.clone(),
                    FieldValue::Bool(_) => String::new(),
                };
                if text.is_empty() {
                    lines.push(Line::from(Span::styled("  (empty)", theme.text_muted())));
                } else {
                    for l in text.lines() {
                        lines.push(Line::from(vec![
                            Span::raw("  "),
                            Span::styled(l.to_string(), value_style),
                        ]));
                    }
                }
            }
        }
        if let Some(err) = &fld.error {
            lines.push(Line::from(Span::styled(
                format!("  ! {err}"),
                theme.text_error(),
            )));
        }
    }
    // Buttons: Save | Discard
    if !form.fields.is_empty() {
        lines.push(Line::from(""));
    }
    let save_idx = save_button_index(form);
    let discard_idx = discard_button_index(form);
    let can_save = dirty && !form.disabled;
    let mut save_style = if can_save {
        theme.text_active_bold()
    } else {
        theme.text_muted()
    };
    let mut discard_style = if can_save {
        Style::default().fg(theme.accent)
    } else {
        theme.text_muted()
    };
    if form.selected == save_idx {
        save_style = theme.list_cursor_style();
    }
    if form.selected == discard_idx {
        discard_style = theme.list_cursor_style();
    }
    lines.push(Line::from(vec![
        Span::styled("  [ Save ]  ", save_style),
        Span::styled("Discard", discard_style),
    ]));
    if let Some(msg) = &form.message {
        lines.push(Line::from(Span::styled(msg.clone(), theme.text_muted())));
    }
    let title = if form.editing {
        format!("{} — editing", form.title)
    } else {
        form.title.clone()
    };
    let block = panel_block(&title, highlight, theme);
    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delays_form() -> FormState {
        let specs = vec![
            FieldSpec {
                name: "episode_end".into(),
                label: "After episode ends".into(),
                kind: Some("number".into()),
                integer: true,
                minimum: Some(0.0),
                maximum: Some(86400.0),
                ..Default::default()
            },
            FieldSpec {
                name: "movie_end".into(),
                label: "After movie ends".into(),
                kind: Some("number".into()),
                integer: true,
                minimum: Some(0.0),
                maximum: Some(86400.0),
                ..Default::default()
            },
        ];
        FormState {
            title: "Delays".into(),
            fields: fields_from_specs(&specs),
            ..Default::default()
        }
    }

    #[test]
    fn section_value_round_trips_through_apply() {
        let mut form = delays_form();
        let v = json!({"episode_end": 600, "movie_end": 1800});
        apply_section_value(&mut form, &v);
        assert_eq!(section_value(&form), v);
    }

    #[test]
    fn whole_floats_collapse_to_integers() {
        let specs = vec![FieldSpec {
            name: "limit".into(),
            label: "Limit".into(),
            kind: Some("number".into()),
            ..Default::default()
        }];
        let mut form = FormState {
            title: "t".into(),
            fields: fields_from_specs(&specs),
            ..Default::default()
        };
        apply_section_value(&mut form, &json!({"limit": 1800}));
        assert_eq!(section_value(&form), json!({"limit": 1800}));
        form.fields[0].value = FieldValue::Text("2.5".into());
        assert_eq!(section_value(&form), json!({"limit": 2.5}));
    }

    #[test]
    fn select_maps_between_value_and_label_position() {
        let specs = vec![FieldSpec {
            name: "log_level".into(),
            label: "Log level".into(),
            kind: Some("select".into()),
            options: Some(vec!["Debug".into(), "Info".into()]),
            values: Some(vec!["debug".into(), "info".into()]),
            ..Default::default()
        }];
        let mut form = FormState {
            title: "t".into(),
            fields: fields_from_specs(&specs),
            ..Default::default()
        };
        apply_section_value(&mut form, &json!({"log_level": "info"}));
        match &form.fields[0].kind {
            FieldKind::Select { selected, .. } => assert_eq!(*selected, 1),
            _ => panic!("not a select"),
        }
        assert_eq!(section_value(&form), json!({"log_level": "info"}));
    }

    #[test]
    fn validate_clamps_integer_bounds() {
        let mut form = delays_form();
        form.fields[0].value = FieldValue::Text("100000".into());
        form.fields[1].value = FieldValue::Text("1800".into());
        assert!(validate_form(&mut form));
        assert_eq!(form.fields[0].value, FieldValue::Text("86400".into()));
    }

    #[test]
    fn validate_flags_garbage_numbers() {
        let mut form = delays_form();
        form.fields[0].value = FieldValue::Text("soon".into());
        assert!(!validate_form(&mut form));
        assert!(form.fields[0].error.as_deref().unwrap().contains("integer"));
    }

    #[test]
    fn validate_checks_required_and_pattern() {
        let specs = vec![FieldSpec {
            name: "peak_start".into(),
            label: "Peak starts".into(),
            required: true,
            pattern: Some(r"^([01]\d|2[0-3]):[0-5]\d$".into()),
            ..Default::default()
        }];
        let mut form = FormState {
            title: "t".into(),
            fields: fields_from_specs(&specs),
            ..Default::default()
        };
        assert!(!validate_form(&mut form));
        form.fields[0].value = FieldValue::Text("25:99".into());
        assert!(!validate_form(&mut form));
        form.fields[0].value = FieldValue::Text("17:30".into());
        assert!(validate_form(&mut form));
    }

    #[test]
    fn unknown_json_keys_are_ignored() {
        let mut form = delays_form();
        apply_section_value(
            &mut form,
            &json!({"episode_end": 600, "movie_end": 1800, "legacy_flag": true}),
        );
        assert_eq!(
            section_value(&form),
            json!({"episode_end": 600, "movie_end": 1800})
        );
    }
}
