use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Tabs};

use crate::nav::routes::Route;
use crate::ui::AppState;

pub fn draw_route_tabs(f: &mut Frame, area: Rect, state: &AppState) {
    let theme = &state.theme;
    let current_index = Route::ALL
        .iter()
        .position(|r| *r == state.route)
        .unwrap_or(0);

    let mut titles: Vec<Line> = Vec::new();
    for (i, route) in Route::ALL.iter().enumerate() {
        let is_selected = i == current_index;
        let fn_key = format!("F{}", i + 1);

        let text_style = if is_selected {
            Style::default()
                .fg(theme.selected)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };
        let key_style = if is_selected {
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.muted)
        };

        let mut spans = vec![
            Span::styled("[", Style::default().fg(theme.frame)),
            Span::styled(fn_key, key_style),
            Span::styled("]", Style::default().fg(theme.frame)),
            Span::raw(" "),
            Span::styled(route.title(), text_style),
        ];
        // Unsaved-changes marker on the Settings tab.
        if *route == Route::Settings && state.guard.has_dirty_tabs() {
            spans.push(Span::styled(" •", theme.text_warning()));
        }
        titles.push(Line::from(spans));
    }

    let tabs = Tabs::new(titles)
        .select(current_index)
        .style(Style::default().fg(theme.fg))
        .highlight_style(
            Style::default()
                .fg(theme.selected)
                .add_modifier(Modifier::BOLD),
        )
        .divider(Span::styled(" │ ", Style::default().fg(theme.frame)));

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(theme.frame));

    f.render_widget(tabs.block(block), area);
}
