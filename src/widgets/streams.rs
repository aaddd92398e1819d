use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Cell, Paragraph, Row, Table, Wrap};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default)]
pub struct StreamRow {
    pub user: String,
    pub title: String,
    pub quality: String,
    pub rate_kbps: u64,
    pub throttled: bool,
}

/// Read-only view of the daemon's active sessions.
#[derive(Default)]
pub struct StreamsView {
    pub rows: Vec<StreamRow>,
    pub raw: Option<JsonValue>,
    pub last_error: Option<String>,
    pub selected: usize,
}

fn parse_row(v: &JsonValue) -> StreamRow {
    StreamRow {
        user: v
            .get("user")
            .and_then(|s| s.as_str())
            .unwrap_or("?")
            .to_string(),
        title: v
            .get("title")
            .and_then(|s| s.as_str())
            .unwrap_or("?")
            .to_string(),
        quality: v
            .get("quality")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_string(),
        rate_kbps: v.get("rate_kbps").and_then(|n| n.as_u64()).unwrap_or(0),
        throttled: v
            .get("throttled")
            .and_then(|b| b.as_bool())
            .unwrap_or(false),
    }
}

pub fn fmt_rate(kbps: u64) -> String {
    if kbps >= 1000 {
        format!("{:.1} Mbit/s", kbps as f64 / 1000.0)
    } else {
        format!("{kbps} kbit/s")
    }
}

impl StreamsView {
    pub fn apply(&mut self, data: &JsonValue) {
        self.last_error = None;
        self.raw = Some(data.clone());
        self.rows = data
            .as_array()
            .map(|arr| arr.iter().map(parse_row).collect())
            .unwrap_or_default();
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    pub fn set_error(&mut self, err: String) {
        self.last_error = Some(err);
    }

    pub fn raw_pretty(&self) -> Option<String> {
        self.raw
            .as_ref()
            .map(|v| serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()))
    }

    pub fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.rows.len() {
                    self.selected += 1;
                }
            }
            _ => {}
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let block = panel_block("Active streams", focused, theme);
        if let Some(err) = &self.last_error {
            let p = Paragraph::new(Span::styled(err.clone(), theme.text_error()))
                .block(block)
                .wrap(Wrap { trim: false });
            f.render_widget(p, area);
            return;
        }
        if self.rows.is_empty() {
            let p = Paragraph::new(Span::styled("No active streams", theme.text_muted()))
                .block(block);
            f.render_widget(p, area);
            return;
        }
        let header = Row::new(["User", "Title", "Quality", "Rate", "State"])
            .style(theme.text_active_bold());
        let rows: Vec<Row> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let state_cell = if r.throttled {
                    Cell::from("throttled").style(theme.text_warning())
                } else {
                    Cell::from("direct").style(theme.text_success())
                };
                let row = Row::new(vec![
                    Cell::from(r.user.clone()),
                    Cell::from(r.title.clone()),
                    Cell::from(r.quality.clone()),
                    Cell::from(fmt_rate(r.rate_kbps)),
                    state_cell,
                ]);
                if i == self.selected {
                    row.style(theme.list_cursor_style())
                } else {
                    row
                }
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(14),
                Constraint::Min(20),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(block);
        f.render_widget(table, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn apply_parses_session_rows() {
        let mut v = StreamsView::default();
        v.apply(&json!([
            {"user": "ada", "title": "S01E02", "quality": "1080p", "rate_kbps": 8200, "throttled": false},
            {"user": "bob", "title": "Movie", "quality": "4k", "rate_kbps": 24000, "throttled": true},
        ]));
        assert_eq!(v.rows.len(), 2);
        assert_eq!(v.rows[0].user, "ada");
        assert!(v.rows[1].throttled);
        assert!(v.last_error.is_none());
    }

    #[test]
    fn apply_tolerates_missing_fields_and_non_arrays() {
        let mut v = StreamsView::default();
        v.apply(&json!([{"user": "ada"}]));
        assert_eq!(v.rows[0].rate_kbps, 0);
        v.apply(&json!({"unexpected": true}));
        assert!(v.rows.is_empty());
    }

    #[test]
    fn rate_formatting_switches_units() {
        assert_eq!(fmt_rate(900), "900 kbit/s");
        assert_eq!(fmt_rate(8200), "8.2 Mbit/s");
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut v = StreamsView::default();
        v.apply(&json!([{"user": "a"}, {"user": "b"}]));
        v.on_key(KeyCode::Down);
        v.on_key(KeyCode::Down);
        assert_eq!(v.selected, 1);
        v.apply(&json!([{"user": "a"}]));
        assert_eq!(v.selected, 0);
    }
}
