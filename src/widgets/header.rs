use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::AppState;

pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let title = state
        .config
        .header
        .clone()
        .unwrap_or_else(|| "BWM — Bandwidth Manager".to_string());
    let line = Line::from(vec![
        Span::styled(
            title,
            state.theme.title_style().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(state.route.path(), state.theme.text_muted()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
