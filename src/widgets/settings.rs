use crate::guard::draft::DraftTracker;
use crate::model::SectionItem;
use crate::theme::Theme;
use crate::widgets::chrome::{centered_rect, panel_block};
use crate::widgets::form::{
    self, discard_button_index, save_button_index, FieldKind, FieldValue, FormState,
    OPTIONS_VISIBLE,
};
use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use ratatui::widgets::*;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tui_textarea::TextArea;

/// What a key press asked the shell to do with this panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelAction {
    None,
    Save,
    Discard,
}

/// One settings section: its form, its draft baseline, and its local
/// load state. Held behind `Rc<RefCell<..>>` so the registry's callbacks
/// can close over a live handle.
pub struct SettingsPanel {
    pub section_id: String,
    pub title: String,
    pub form: FormState,
    pub tracker: DraftTracker,
    pub load_error: Option<String>,
    ta_map: HashMap<String, TextArea<'static>>,
}

impl SettingsPanel {
    pub fn from_section(spec: &SectionItem) -> Self {
        let form = FormState {
            title: spec.title.clone(),
            fields: form::fields_from_specs(&spec.fields),
            ..Default::default()
        };
        let mut ta_map = HashMap::new();
        for f in &form.fields {
            if let FieldKind::TextArea { .. } = f.kind {
                ta_map.insert(f.name.clone(), TextArea::default());
            }
        }
        Self {
            section_id: spec.id.clone(),
            title: spec.title.clone(),
            form,
            tracker: DraftTracker::new(),
            load_error: None,
            ta_map,
        }
    }

    /// The working value this panel would submit right now.
    pub fn value_json(&self) -> JsonValue {
        form::section_value(&self.form)
    }

    pub fn is_dirty(&self) -> bool {
        self.tracker.has_unsaved_changes(Some(&self.value_json()))
    }

    /// Adopt a freshly loaded section: fill the form, then take the
    /// form's own normalization of it as the baseline so later
    /// comparisons are projection-to-projection.
    pub fn apply_loaded(&mut self, v: &JsonValue) {
        form::apply_section_value(&mut self.form, v);
        self.load_error = None;
        let normalized = self.value_json();
        self.tracker.reset_original(&normalized);
    }

    /// A panel that failed to load shows the error locally and, with no
    /// baseline set, can never read as dirty.
    pub fn set_load_error(&mut self, err: String) {
        self.load_error = Some(err);
    }

    /// Validate, persist via the daemon, and make the saved payload the
    /// new baseline. Errors bubble to the caller; the draft is untouched
    /// on failure.
    pub fn save(&mut self) -> Result<()> {
        if !form::validate_form(&mut self.form) {
            return Err(anyhow!("'{}' has invalid fields", self.title));
        }
        let payload = self.value_json();
        crate::services::daemon::save_section(&self.section_id, &payload)?;
        self.tracker.reset_original(&payload);
        self.form.message = Some("Saved".into());
        Ok(())
    }

    /// Synchronously drop the draft and restore the last-saved values.
    pub fn discard(&mut self) {
        if let Some(baseline) = self.tracker.discard_changes() {
            form::apply_section_value(&mut self.form, &baseline);
            self.form.editing = false;
            self.form.confirm = None;
            self.form.message = Some("Reverted to last saved".into());
        }
    }

    /// Move the cursor onto the Save button, leaving any edit mode.
    pub fn focus_save_control(&mut self) {
        self.form.editing = false;
        self.form.confirm = None;
        self.form.selected = save_button_index(&self.form);
    }

    fn open_textarea(&mut self, name: &str, label: &str, current: &str) {
        if let Some(ta) = self.ta_map.get_mut(name) {
            *ta = TextArea::default();
            if !current.is_empty() {
                ta.insert_str(current);
            }
            ta.set_block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Editing: {label} — Ctrl+S Save • Esc Cancel")),
            );
        }
    }

    /// Copy the textarea buffer back into the field and leave edit mode.
    pub fn commit_textarea(&mut self) -> bool {
        if !self.form.editing {
            return false;
        }
        let sel = self.form.selected;
        if let Some(fld) = self.form.fields.get_mut(sel) {
            if let FieldKind::TextArea { .. } = fld.kind {
                if let Some(ta) = self.ta_map.get(&fld.name) {
                    fld.value = FieldValue::Text(ta.lines().join("\n"));
                    self.form.editing = false;
                    self.form.message = None;
                    return true;
                }
            }
        }
        false
    }

    fn editing_textarea(&self) -> Option<&str> {
        if !self.form.editing {
            return None;
        }
        self.form
            .fields
            .get(self.form.selected)
            .and_then(|f| match f.kind {
                FieldKind::TextArea { .. } => Some(f.name.as_str()),
                _ => None,
            })
    }

    fn feed_textarea(&mut self, code: KeyCode) -> bool {
        let Some(name) = self.editing_textarea().map(str::to_string) else {
            return false;
        };
        let Some(ta) = self.ta_map.get_mut(&name) else {
            return false;
        };
        let rt_code = match code {
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
            _ => return false,
        };
        let _ = ta.input(rt_event::KeyEvent::new(rt_code, rt_event::KeyModifiers::NONE));
        true
    }

    pub fn on_key(&mut self, code: KeyCode) -> PanelAction {
        // Textarea editing swallows everything except Esc (and the
        // shell-level Ctrl+S commit).
        if !matches!(code, KeyCode::Esc) && self.feed_textarea(code) {
            return PanelAction::None;
        }
        match code {
            KeyCode::Up => self.key_up(),
            KeyCode::Down => self.key_down(),
            KeyCode::Left => self.key_left(),
            KeyCode::Right => self.key_right(),
            KeyCode::Enter => return self.key_enter(),
            KeyCode::Backspace => self.key_backspace(),
            KeyCode::Esc => {
                if self.form.confirm.is_some() {
                    self.form.confirm = None;
                    self.form.message = None;
                } else if self.form.editing {
                    self.form.editing = false;
                    self.form.message = None;
                }
            }
            KeyCode::Char(c) => self.key_char(c),
            _ => {}
        }
        PanelAction::None
    }

    fn key_up(&mut self) {
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(fld) = self.form.fields.get_mut(sel) {
                if matches!(fld.kind, FieldKind::Number { .. }) {
                    step_number(fld, 1);
                } else if let FieldKind::Select { cursor, offset, .. } = &mut fld.kind {
                    if *cursor > 0 {
                        *cursor -= 1;
                    }
                    if *cursor < *offset {
                        *offset = *cursor;
                    }
                }
            }
        } else if self.form.selected > 0 {
            self.form.selected -= 1;
        }
    }

    fn key_down(&mut self) {
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(fld) = self.form.fields.get_mut(sel) {
                if matches!(fld.kind, FieldKind::Number { .. }) {
                    step_number(fld, -1);
                } else if let FieldKind::Select {
                    cursor,
                    options,
                    offset,
                    ..
                } = &mut fld.kind
                {
                    if *cursor + 1 < options.len() {
                        *cursor += 1;
                    }
                    if *cursor >= *offset + OPTIONS_VISIBLE {
                        *offset = *cursor + 1 - OPTIONS_VISIBLE;
                    }
                }
            }
        } else {
            let max_idx = discard_button_index(&self.form);
            if self.form.selected < max_idx {
                self.form.selected += 1;
            }
        }
    }

    fn key_left(&mut self) {
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(fld) = self.form.fields.get_mut(sel) {
                if let FieldKind::Select {
                    cursor, selected, ..
                } = &mut fld.kind
                {
                    *selected = *cursor;
                    self.form.editing = false;
                }
            }
        } else if self.form.selected == discard_button_index(&self.form) {
            self.form.selected = save_button_index(&self.form);
        } else if let Some(fld) = self.form.fields.get_mut(self.form.selected) {
            // quick change for Select when browsing
            if let FieldKind::Select {
                options, selected, ..
            } = &mut fld.kind
            {
                if !options.is_empty() {
                    *selected = if *selected == 0 {
                        options.len() - 1
                    } else {
                        *selected - 1
                    };
                }
            }
        }
    }

    fn key_right(&mut self) {
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(fld) = self.form.fields.get_mut(sel) {
                if let FieldKind::Select {
                    cursor, selected, ..
                } = &mut fld.kind
                {
                    *selected = *cursor;
                    self.form.editing = false;
                }
            }
        } else if self.form.selected == save_button_index(&self.form) {
            self.form.selected = discard_button_index(&self.form);
        } else if let Some(fld) = self.form.fields.get_mut(self.form.selected) {
            if let FieldKind::Select {
                options, selected, ..
            } = &mut fld.kind
            {
                if !options.is_empty() {
                    *selected = (*selected + 1) % options.len();
                }
            }
        }
    }

    fn key_enter(&mut self) -> PanelAction {
        let save_idx = save_button_index(&self.form);
        let discard_idx = discard_button_index(&self.form);
        if !self.form.editing && self.form.selected == save_idx {
            if self.is_dirty() && !self.form.disabled {
                return PanelAction::Save;
            }
            return PanelAction::None;
        }
        if !self.form.editing && self.form.selected == discard_idx {
            if !self.is_dirty() {
                return PanelAction::None;
            }
            // two-step confirm
            if self.form.confirm == Some(form::ConfirmAction::Discard) {
                self.form.confirm = None;
                return PanelAction::Discard;
            }
            self.form.confirm = Some(form::ConfirmAction::Discard);
            self.form.message = Some("Press Enter to confirm Discard • Esc to keep editing".into());
            return PanelAction::None;
        }
        let sel = self.form.selected;
        let mut open_ta: Option<(String, String, String)> = None;
        if let Some(fld) = self.form.fields.get_mut(sel) {
            match (&mut fld.kind, &mut fld.value) {
                (FieldKind::Checkbox, FieldValue::Bool(b)) => {
                    *b = !*b;
                }
                (FieldKind::Text, FieldValue::Text(_))
                | (FieldKind::Password, FieldValue::Text(_))
                | (FieldKind::Number { .. }, FieldValue::Text(_)) => {
                    self.form.editing = !self.form.editing;
                }
                (FieldKind::TextArea { .. }, FieldValue::Text(s)) => {
                    if !self.form.editing {
                        self.form.editing = true;
                        open_ta = Some((fld.name.clone(), fld.label.clone(), s.clone()));
                    }
                }
                (
                    FieldKind::Select {
                        cursor, selected, ..
                    },
                    _,
                ) => {
                    if self.form.editing {
                        *selected = *cursor;
                        self.form.editing = false;
                    } else {
                        *cursor = *selected;
                        self.form.editing = true;
                    }
                }
                _ => {}
            }
        }
        if let Some((name, label, current)) = open_ta {
            self.open_textarea(&name, &label, &current);
        }
        PanelAction::None
    }

    fn key_backspace(&mut self) {
        if self.form.editing {
            let sel = self.form.selected;
            if let Some(fld) = self.form.fields.get_mut(sel) {
                if let FieldValue::Text(s) = &mut fld.value {
                    s.pop();
                }
                form::validate_text_inline(fld);
            }
        }
    }

    fn key_char(&mut self, c: char) {
        if !self.form.editing {
            return;
        }
        let sel = self.form.selected;
        if let Some(fld) = self.form.fields.get_mut(sel) {
            match (&fld.kind, &mut fld.value) {
                (FieldKind::Text, FieldValue::Text(s))
                | (FieldKind::Password, FieldValue::Text(s)) => {
                    s.push(c);
                    form::validate_text_inline(fld);
                }
                (FieldKind::Number { is_integer, .. }, FieldValue::Text(s)) => {
                    if c.is_ascii_digit()
                        || (c == '.' && !*is_integer && !s.contains('.'))
                        || (c == '-' && s.is_empty())
                    {
                        s.push(c);
                    }
                    form::validate_text_inline(fld);
                }
                _ => {}
            }
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, theme: &Theme, focused: bool, tick: u64) {
        if let Some(err) = &self.load_error {
            let block = panel_block(&self.title, focused, theme);
            let lines = vec![
                Line::from(Span::styled(
                    format!("Failed to load: {err}"),
                    theme.text_error(),
                )),
                Line::from(""),
                Line::from(Span::styled("Press r to retry", theme.text_muted())),
            ];
            f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
            return;
        }
        if !self.tracker.is_loaded() {
            let block = panel_block(&self.title, focused, theme);
            f.render_widget(
                Paragraph::new(Span::styled("Loading…", theme.text_muted())).block(block),
                area,
            );
            return;
        }
        let mut cursor_on = tick % 2 == 0;
        let in_textarea = self.editing_textarea().is_some();
        if in_textarea {
            cursor_on = false;
        }
        let dirty = self.is_dirty();
        form::draw_form(f, area, &mut self.form, theme, focused, cursor_on, dirty);
        if let Some(name) = self.editing_textarea().map(str::to_string) {
            if let Some(ta) = self.ta_map.get(&name) {
                let rect = centered_rect(80, 60, area);
                f.render_widget(Clear, rect);
                f.render_widget(ta, rect);
            }
        }
    }
}

fn step_number(fld: &mut crate::widgets::form::FormField, dir: i32) {
    let (is_integer, minimum, maximum) = match &fld.kind {
        FieldKind::Number {
            is_integer,
            minimum,
            maximum,
        } => (*is_integer, *minimum, *maximum),
        _ => return,
    };
    let mut cur = if let FieldValue::Text(s) = &fld.value {
        s.trim().parse::<f64>().unwrap_or(0.0)
    } else {
        0.0
    };
    let step = if is_integer { 1.0 } else { 0.1 };
    cur += step * (if dir >= 0 { 1.0 } else { -1.0 });
    if let Some(minv) = minimum {
        if cur < minv {
            cur = minv;
        }
    }
    if let Some(maxv) = maximum {
        if cur > maxv {
            cur = maxv;
        }
    }
    let s = if is_integer {
        format!("{cur:.0}")
    } else {
        format!("{cur:.1}")
    };
    fld.value = FieldValue::Text(s);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AppConfig;
    use serde_json::json;

    fn delays_panel() -> SettingsPanel {
        let cfg = AppConfig::default();
        let spec = cfg.sections.iter().find(|s| s.id == "delays").unwrap();
        SettingsPanel::from_section(spec)
    }

    #[test]
    fn panel_is_clean_until_loaded_and_edited() {
        let mut p = delays_panel();
        assert!(!p.is_dirty());
        p.apply_loaded(&json!({"episode_end": 600, "movie_end": 1800, "paused_grace": 60}));
        assert!(!p.is_dirty());

        p.form.fields[0].value = FieldValue::Text("900".into());
        assert!(p.is_dirty());
    }

    #[test]
    fn discard_restores_the_loaded_snapshot() {
        let mut p = delays_panel();
        p.apply_loaded(&json!({"episode_end": 600, "movie_end": 1800, "paused_grace": 60}));
        p.form.fields[0].value = FieldValue::Text("900".into());
        p.discard();
        assert!(!p.is_dirty());
        assert_eq!(
            p.value_json(),
            json!({"episode_end": 600, "movie_end": 1800, "paused_grace": 60})
        );
    }

    #[test]
    fn load_error_panel_never_reads_dirty() {
        let mut p = delays_panel();
        p.set_load_error("boom".into());
        p.form.fields[0].value = FieldValue::Text("900".into());
        assert!(!p.is_dirty());
    }

    #[test]
    fn focus_save_control_targets_the_save_button() {
        let mut p = delays_panel();
        p.form.editing = true;
        p.focus_save_control();
        assert!(!p.form.editing);
        assert_eq!(p.form.selected, save_button_index(&p.form));
    }

    #[test]
    fn enter_on_save_requires_a_dirty_form() {
        let mut p = delays_panel();
        p.apply_loaded(&json!({"episode_end": 600, "movie_end": 1800, "paused_grace": 60}));
        p.focus_save_control();
        assert_eq!(p.on_key(KeyCode::Enter), PanelAction::None);

        p.form.fields[0].value = FieldValue::Text("900".into());
        assert_eq!(p.on_key(KeyCode::Enter), PanelAction::Save);
    }

    #[test]
    fn discard_button_asks_for_confirmation() {
        let mut p = delays_panel();
        p.apply_loaded(&json!({"episode_end": 600, "movie_end": 1800, "paused_grace": 60}));
        p.form.fields[0].value = FieldValue::Text("900".into());
        p.form.selected = discard_button_index(&p.form);
        assert_eq!(p.on_key(KeyCode::Enter), PanelAction::None);
        assert!(p.form.confirm.is_some());
        assert_eq!(p.on_key(KeyCode::Enter), PanelAction::Discard);
    }
}
