use crate::theme::Theme;
use crate::widgets::chrome::panel_block;
use crossterm::event::KeyCode;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Row, Table, Wrap};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default)]
pub struct HistoryRow {
    pub date: String,
    pub total_gb: f64,
    pub peak_mbps: f64,
    pub throttled_minutes: u64,
}

/// Per-day transfer summary from `get-history`.
#[derive(Default)]
pub struct HistoryView {
    pub rows: Vec<HistoryRow>,
    pub last_error: Option<String>,
    pub offset: usize,
}

fn parse_row(v: &JsonValue) -> HistoryRow {
    HistoryRow {
        date: v
            .get("date")
            .and_then(|s| s.as_str())
            .unwrap_or("?")
            .to_string(),
        total_gb: v.get("total_gb").and_then(|n| n.as_f64()).unwrap_or(0.0),
        peak_mbps: v.get("peak_mbps").and_then(|n| n.as_f64()).unwrap_or(0.0),
        throttled_minutes: v
            .get("throttled_minutes")
            .and_then(|n| n.as_u64())
            .unwrap_or(0),
    }
}

impl HistoryView {
    pub fn apply(&mut self, data: &JsonValue) {
        self.last_error = None;
        self.rows = data
            .as_array()
            .map(|arr| arr.iter().map(parse_row).collect())
            .unwrap_or_default();
        self.offset = 0;
    }

    pub fn set_error(&mut self, err: String) {
        self.last_error = Some(err);
    }

    pub fn on_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.offset = self.offset.saturating_sub(1),
            KeyCode::Down => {
                if self.offset + 1 < self.rows.len() {
                    self.offset += 1;
                }
            }
            _ => {}
        }
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, theme: &Theme, focused: bool) {
        let block = panel_block("Transfer history", focused, theme);
        if let Some(err) = &self.last_error {
            let p = Paragraph::new(Span::styled(err.clone(), theme.text_error()))
                .block(block)
                .wrap(Wrap { trim: false });
            f.render_widget(p, area);
            return;
        }
        if self.rows.is_empty() {
            let p =
                Paragraph::new(Span::styled("No history yet", theme.text_muted())).block(block);
            f.render_widget(p, area);
            return;
        }
        let header =
            Row::new(["Date", "Total", "Peak", "Throttled"]).style(theme.text_active_bold());
        let rows: Vec<Row> = self
            .rows
            .iter()
            .skip(self.offset)
            .map(|r| {
                Row::new(vec![
                    r.date.clone(),
                    format!("{:.1} GB", r.total_gb),
                    format!("{:.1} Mbit/s", r.peak_mbps),
                    format!("{} min", r.throttled_minutes),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Length(14),
                Constraint::Length(12),
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
    fn apply_parses_day_rows() {
        let mut v = HistoryView::default();
        v.apply(&json!([
            {"date": "2024-05-01", "total_gb": 41.5, "peak_mbps": 87.2, "throttled_minutes": 12},
        ]));
        assert_eq!(v.rows.len(), 1);
        assert_eq!(v.rows[0].date, "2024-05-01");
        assert_eq!(v.rows[0].throttled_minutes, 12);
    }

    #[test]
    fn scroll_offset_is_bounded() {
        let mut v = HistoryView::default();
        v.apply(&json!([{"date": "a"}, {"date": "b"}]));
        v.on_key(KeyCode::Down);
        v.on_key(KeyCode::Down);
        assert_eq!(v.offset, 1);
        v.on_key(KeyCode::Up);
        v.on_key(KeyCode::Up);
        assert_eq!(v.offset, 0);
    }
}
