use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::ui::AppState;
use crate::widgets::chrome::centered_rect;

pub const WARNING_BUTTONS: [&str; 3] = ["Cancel", "Save & leave", "Discard & leave"];

/// The modal asking what to do with the blocking tab's draft. Stays up
/// until the user picks a button (or a save attempt fails, in which case
/// the error is shown inline and the choices remain).
pub fn draw_unsaved_dialog(f: &mut Frame, state: &AppState) {
    let theme = &state.theme;
    let area = centered_rect(64, 45, f.area());
    f.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    let blocking_title = state
        .guard
        .current_dirty_tab()
        .and_then(|id| state.settings.panel_title(id))
        .unwrap_or_else(|| "a settings section".to_string());
    lines.push(Line::from(vec![
        Span::raw("'"),
        Span::styled(blocking_title, theme.text_active_bold()),
        Span::raw("' has unsaved changes."),
    ]));

    if let Some(path) = state.guard.pending_navigation() {
        lines.push(Line::from(Span::styled(
            format!("You are leaving for {path}."),
            theme.text_muted(),
        )));
    } else if let Some(id) = state.guard.pending_tab_change() {
        let target = state
            .settings
            .panel_title(id)
            .unwrap_or_else(|| id.to_string());
        lines.push(Line::from(Span::styled(
            format!("You are switching to '{target}'."),
            theme.text_muted(),
        )));
    }

    if let Some(err) = &state.warning_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("Save failed: {err}"),
            theme.text_error(),
        )));
    }

    lines.push(Line::from(""));
    let mut buttons: Vec<Span> = Vec::new();
    for (i, label) in WARNING_BUTTONS.iter().enumerate() {
        if i > 0 {
            buttons.push(Span::raw("   "));
        }
        let style = if i == state.warning_selected {
            theme.list_cursor_style()
        } else {
            theme.text_muted()
        };
        buttons.push(Span::styled(format!(" {label} "), style));
    }
    lines.push(Line::from(buttons));
    lines.push(Line::from(Span::styled(
        "←/→ choose • Enter confirm • Esc stay",
        theme.text_muted(),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.text_warning())
        .title("Unsaved changes");
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

/// Quit-time confirmation, the in-terminal stand-in for the browser's
/// native "leave site?" prompt.
pub fn draw_quit_confirm(f: &mut Frame, state: &AppState) {
    let theme = &state.theme;
    let area = centered_rect(46, 22, f.area());
    f.render_widget(Clear, area);
    let dirty = state.guard.dirty_tabs().len();
    let lines = vec![
        Line::from(Span::raw(format!(
            "{dirty} settings section{} with unsaved changes.",
            if dirty == 1 { "" } else { "s" }
        ))),
        Line::from(""),
        Line::from(vec![
            Span::raw("Quit anyway? "),
            Span::styled("[y/N]", theme.text_active_bold()),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.text_error())
        .title("Quit");
    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}
