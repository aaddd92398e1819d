use crate::app::{update, AppMsg, Effect};
use crate::guard::registry::TabRegistry;
use crate::model::AppConfig;
use crate::nav::routes::Route;
use crate::widgets::settings::{PanelAction, SettingsPanel};
use crate::widgets::streams::StreamsView;
use anyhow::{anyhow, Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug)]
pub enum LoadKind {
    Config,
    Streams,
    History,
}

pub struct LoadMsg {
    pub kind: LoadKind,
    pub outcome: Result<JsonValue, String>,
}

#[derive(Clone, Copy)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettingsFocus {
    #[default]
    List,
    Form,
}

/// The settings screen: one panel per configured section, all mounted
/// (and registered) while the screen is up.
#[derive(Default)]
pub(crate) struct SettingsState {
    pub(crate) panels: Vec<Rc<RefCell<SettingsPanel>>>,
    pub(crate) active: usize,
    pub(crate) cursor: usize,
    pub(crate) focus: SettingsFocus,
}

impl SettingsState {
    pub(crate) fn mount(&mut self, sections: &[crate::model::SectionItem]) {
        self.panels = sections
            .iter()
            .map(|s| Rc::new(RefCell::new(SettingsPanel::from_section(s))))
            .collect();
        self.active = 0;
        self.cursor = 0;
        self.focus = SettingsFocus::List;
    }

    pub(crate) fn active_panel(&self) -> Option<Rc<RefCell<SettingsPanel>>> {
        self.panels.get(self.active).cloned()
    }

    pub(crate) fn index_of(&self, section_id: &str) -> Option<usize> {
        self.panels
            .iter()
            .position(|p| p.borrow().section_id == section_id)
    }

    pub(crate) fn activate_section(&mut self, section_id: &str) {
        if let Some(idx) = self.index_of(section_id) {
            self.active = idx;
            self.cursor = idx;
        }
    }

    pub(crate) fn panel_title(&self, section_id: &str) -> Option<String> {
        self.panels
            .iter()
            .find(|p| p.borrow().section_id == section_id)
            .map(|p| p.borrow().title.clone())
    }
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) route: Route,
    pub(crate) settings: SettingsState,
    pub(crate) streams: StreamsView,
    pub(crate) history: crate::widgets::history::HistoryView,
    pub(crate) guard: TabRegistry,
    pub(crate) warning_selected: usize,
    pub(crate) warning_error: Option<String>,
    pub(crate) quit_confirm: bool,
    pub(crate) should_quit: bool,
    pub(crate) status_text: Option<String>,
    pub(crate) toast: Option<Toast>,
    pub(crate) tick: u64,
    pub(crate) theme: crate::theme::Theme,
    pub(crate) show_debug: bool,
    pub(crate) debug_log: VecDeque<String>,
    tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
    nav_rx: Option<Receiver<String>>,
}

impl AppState {
    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg.into());
    }
}

/// Re-register every mounted panel with a fresh dirty flag and fresh
/// callbacks closing over its live handle. Runs once per loop iteration
/// and again right before any guard decision, which is this app's
/// rendering of "panels re-register on every render".
pub(crate) fn sync_tab_registrations(state: &mut AppState) {
    if state.route != Route::Settings {
        return;
    }
    for panel in &state.settings.panels {
        let (id, dirty) = {
            let p = panel.borrow();
            (p.section_id.clone(), p.is_dirty())
        };
        let pf = Rc::clone(panel);
        let ps = Rc::clone(panel);
        let pd = Rc::clone(panel);
        state.guard.register_tab(
            id,
            dirty,
            Some(Box::new(move || pf.borrow_mut().focus_save_control())),
            Some(Box::new(move || ps.borrow_mut().save())),
            Some(Box::new(move || pd.borrow_mut().discard())),
        );
    }
}

fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::LoadConfig => {
                state.dbg("load: config".to_string());
                state.status_text = Some("Loading configuration…".into());
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_load(LoadKind::Config, tx.clone());
                }
            }
            Effect::LoadStreams => {
                state.dbg("load: streams".to_string());
                state.status_text = Some("Refreshing streams…".into());
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_load(LoadKind::Streams, tx.clone());
                }
            }
            Effect::LoadHistory => {
                state.dbg("load: history".to_string());
                state.status_text = Some("Refreshing history…".into());
                if let Some(tx) = &state.tx {
                    crate::services::loader::spawn_load(LoadKind::History, tx.clone());
                }
            }
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => {
                let ticks = seconds.saturating_mul(5); // ~200ms tick
                let exp = state.tick.saturating_add(ticks);
                state.toast = Some(Toast {
                    text,
                    level,
                    expires_at_tick: exp,
                });
            }
            Effect::Quit => state.should_quit = true,
        }
    }
}

/// Drain loader results and bridge navigations, then refresh the
/// registry. Deferred navigations queued by a save resolution are driven
/// here — after the update that queued them has fully committed.
fn pump_messages(state: &mut AppState) -> Result<()> {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    for msg in drained {
        let effects = match msg.kind {
            LoadKind::Config => update(state, AppMsg::LoadedConfig { outcome: msg.outcome }),
            LoadKind::Streams => update(state, AppMsg::LoadedStreams { outcome: msg.outcome }),
            LoadKind::History => update(state, AppMsg::LoadedHistory { outcome: msg.outcome }),
        };
        run_effects(state, effects);
    }

    state.guard.flush_deferred()?;
    let mut paths: Vec<String> = Vec::new();
    if let Some(rx) = &state.nav_rx {
        while let Ok(p) = rx.try_recv() {
            paths.push(p);
        }
    }
    for p in paths {
        match Route::from_path(&p) {
            Some(route) => {
                let effects = update(state, AppMsg::NavigateTo(route));
                run_effects(state, effects);
            }
            None => state.dbg(format!("bridge: unknown path {p}")),
        }
    }

    sync_tab_registrations(state);
    Ok(())
}

fn handle_key(state: &mut AppState, key: KeyEvent) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();

    // Quit confirmation has the last word over every other binding.
    if state.quit_confirm {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => update(state, AppMsg::QuitConfirmed),
            _ => update(state, AppMsg::QuitAborted),
        };
    }

    // The unsaved-changes dialog swallows all input while visible.
    if state.guard.warning_visible() {
        match key.code {
            KeyCode::Left | KeyCode::BackTab => {
                state.warning_selected = state.warning_selected.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Tab => {
                state.warning_selected = (state.warning_selected + 1)
                    .min(crate::widgets::warning::WARNING_BUTTONS.len() - 1);
            }
            KeyCode::Enter => {
                let msg = match state.warning_selected {
                    1 => AppMsg::WarningSave,
                    2 => AppMsg::WarningDiscard,
                    _ => AppMsg::WarningCancel,
                };
                return update(state, msg);
            }
            KeyCode::Esc => return update(state, AppMsg::WarningCancel),
            _ => {}
        }
        return effects;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return update(state, AppMsg::QuitRequested),
            KeyCode::Char('d') => {
                state.show_debug = !state.show_debug;
                return effects;
            }
            KeyCode::Char('s') => {
                if state.route == Route::Settings {
                    if let Some(panel) = state.settings.active_panel() {
                        panel.borrow_mut().commit_textarea();
                    }
                }
                return effects;
            }
            _ => {}
        }
    }

    if let KeyCode::F(n) = key.code {
        if let Some(route) = Route::ALL.get((n as usize).saturating_sub(1)).copied() {
            return update(state, AppMsg::RouteRequested(route));
        }
        return effects;
    }

    // While a form is capturing text, global single-char bindings are off.
    let form_capturing = state.route == Route::Settings
        && state.settings.focus == SettingsFocus::Form
        && state
            .settings
            .active_panel()
            .map(|p| {
                let p = p.borrow();
                p.form.editing || p.form.confirm.is_some()
            })
            .unwrap_or(false);
    if !form_capturing && matches!(key.code, KeyCode::Char('q')) {
        return update(state, AppMsg::QuitRequested);
    }

    match state.route {
        Route::Streams => match key.code {
            KeyCode::Char('r') => effects.push(Effect::LoadStreams),
            KeyCode::Char('c') => {
                if let Some(text) = state.streams.raw_pretty() {
                    if let Ok(mut clipboard) = arboard::Clipboard::new() {
                        let _ = clipboard.set_text(text);
                        effects.push(Effect::ShowToast {
                            text: "Raw JSON copied".into(),
                            level: ToastLevel::Info,
                            seconds: 2,
                        });
                    }
                }
            }
            KeyCode::Up | KeyCode::Down => state.streams.on_key(key.code),
            _ => {}
        },
        Route::History => match key.code {
            KeyCode::Char('r') => effects.push(Effect::LoadHistory),
            KeyCode::Up | KeyCode::Down => state.history.on_key(key.code),
            _ => {}
        },
        Route::Settings => effects.extend(settings_key(state, key)),
    }
    effects
}

fn settings_key(state: &mut AppState, key: KeyEvent) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    match state.settings.focus {
        SettingsFocus::List => match key.code {
            KeyCode::Up => state.settings.cursor = state.settings.cursor.saturating_sub(1),
            KeyCode::Down => {
                if state.settings.cursor + 1 < state.settings.panels.len() {
                    state.settings.cursor += 1;
                }
            }
            KeyCode::Enter | KeyCode::Right => {
                if state.settings.cursor == state.settings.active {
                    state.settings.focus = SettingsFocus::Form;
                } else {
                    let cursor = state.settings.cursor;
                    effects.extend(update(state, AppMsg::TabRequested(cursor)));
                }
            }
            KeyCode::Char('r') => effects.push(Effect::LoadConfig),
            _ => {}
        },
        SettingsFocus::Form => {
            let Some(panel) = state.settings.active_panel() else {
                return effects;
            };
            let leave = {
                let p = panel.borrow();
                key.code == KeyCode::Esc && !p.form.editing && p.form.confirm.is_none()
            };
            if leave {
                state.settings.focus = SettingsFocus::List;
                return effects;
            }
            let action = panel.borrow_mut().on_key(key.code);
            match action {
                PanelAction::Save => {
                    let res = panel.borrow_mut().save();
                    match res {
                        Ok(()) => effects.push(Effect::ShowToast {
                            text: "Changes saved".into(),
                            level: ToastLevel::Success,
                            seconds: 2,
                        }),
                        Err(e) => effects.push(Effect::ShowToast {
                            text: format!("Save failed: {e:#}"),
                            level: ToastLevel::Error,
                            seconds: 4,
                        }),
                    }
                }
                PanelAction::Discard => {
                    panel.borrow_mut().discard();
                    effects.push(Effect::ShowToast {
                        text: "Reverted to last saved".into(),
                        level: ToastLevel::Info,
                        seconds: 2,
                    });
                }
                PanelAction::None => {}
            }
        }
    }
    effects
}

fn draw_settings(f: &mut Frame, area: Rect, state: &mut AppState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(30)])
        .split(area);

    let theme = state.theme.clone();
    let list_focused = state.settings.focus == SettingsFocus::List;
    let mut lines: Vec<Line> = Vec::new();
    for (i, panel) in state.settings.panels.iter().enumerate() {
        let p = panel.borrow();
        let marker = if i == state.settings.active { '▸' } else { ' ' };
        let mut spans = vec![Span::raw(format!("{marker} {}", p.title))];
        if p.is_dirty() {
            spans.push(Span::styled(" ●", theme.text_warning()));
        }
        let mut line = Line::from(spans);
        if list_focused && i == state.settings.cursor {
            line = line.style(theme.list_cursor_style());
        }
        lines.push(line);
    }
    let block = crate::widgets::chrome::panel_block("Sections", list_focused, &theme);
    f.render_widget(Paragraph::new(lines).block(block), cols[0]);

    if let Some(panel) = state.settings.active_panel() {
        let form_focused = state.settings.focus == SettingsFocus::Form;
        panel
            .borrow_mut()
            .render(f, cols[1], &theme, form_focused, state.tick);
    }
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .rev()
        .take(area.height.saturating_sub(2) as usize)
        .rev()
        .map(|l| Line::from(Span::styled(l.clone(), state.theme.text_muted())))
        .collect();
    let block = crate::widgets::chrome::panel_block("Debug", false, &state.theme);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn help_text(state: &AppState) -> &'static str {
    match state.route {
        Route::Streams => "F1-F3 screens • r refresh • c copy JSON • q quit",
        Route::History => "F1-F3 screens • r refresh • q quit",
        Route::Settings => match state.settings.focus {
            SettingsFocus::List => "↑/↓ section • Enter open • r reload • q quit",
            SettingsFocus::Form => "↑/↓ field • Enter edit • Esc back • q quit",
        },
    }
}

fn ui(f: &mut Frame, state: &mut AppState) {
    let mut constraints = vec![
        Constraint::Length(1),
        Constraint::Length(2),
        Constraint::Min(5),
        Constraint::Length(1),
    ];
    if state.show_debug {
        constraints.insert(3, Constraint::Length(8));
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    crate::widgets::header::draw_header(f, chunks[0], state);
    crate::widgets::tab_bar::draw_route_tabs(f, chunks[1], state);
    match state.route {
        Route::Streams => {
            let theme = state.theme.clone();
            state.streams.render(f, chunks[2], &theme, true);
        }
        Route::History => {
            let theme = state.theme.clone();
            state.history.render(f, chunks[2], &theme, true);
        }
        Route::Settings => draw_settings(f, chunks[2], state),
    }
    if state.show_debug {
        draw_debug(f, chunks[3], state);
    }
    let footer = chunks[chunks.len() - 1];
    crate::widgets::status_bar::draw_footer(f, footer, state, help_text(state));

    if state.guard.warning_visible() {
        crate::widgets::warning::draw_unsaved_dialog(f, state);
    }
    if state.quit_confirm {
        crate::widgets::warning::draw_quit_confirm(f, state);
    }
}

fn load_config() -> Result<AppConfig> {
    if let Ok(dir) = std::env::var("BWM_TUI_CONFIG_DIR") {
        let path = PathBuf::from(dir).join("bwm-tui.yaml");
        if path.exists() {
            let s = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            let cfg: AppConfig = serde_yaml::from_str(&s)
                .with_context(|| format!("parsing {}", path.display()))?;
            return Ok(cfg);
        }
    }
    Ok(AppConfig::default())
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

pub fn run() -> Result<()> {
    let cfg = load_config()?;
    crate::model::validate_app_config(&cfg).map_err(|e| anyhow!("invalid app config: {e}"))?;
    let mut state = AppState {
        config: cfg,
        theme: crate::theme::Theme::harbor_dark(),
        ..Default::default()
    };
    let (tx, rx) = mpsc::channel::<LoadMsg>();
    state.tx = Some(tx);
    state.rx = Some(rx);

    // Navigation Bridge: resolved navigations land on this channel and
    // are applied by the loop, one tick after the resolution committed.
    let (nav_tx, nav_rx) = mpsc::channel::<String>();
    state.nav_rx = Some(nav_rx);
    state
        .guard
        .set_navigate_callback(Some(Box::new(move |path| {
            let _ = nav_tx.send(path.to_string());
        })));

    run_effects(&mut state, vec![Effect::LoadStreams]);

    // Headless smoke mode
    if env_flag("BWM_TUI_HEADLESS") {
        let ticks: u64 = std::env::var("BWM_TUI_TICKS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(10);
        let enter_route = std::env::var("BWM_TUI_HEADLESS_ROUTE")
            .ok()
            .and_then(|p| Route::from_path(&p));
        let backend = ratatui::backend::TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend)?;
        let mut entered = false;
        for _ in 0..ticks {
            if !entered {
                if let Some(route) = enter_route {
                    let effects = update(&mut state, AppMsg::RouteRequested(route));
                    run_effects(&mut state, effects);
                }
                entered = true;
            }
            terminal.draw(|f| ui(f, &mut state))?;
            pump_messages(&mut state)?;
            state.tick = state.tick.wrapping_add(1);
            std::thread::sleep(Duration::from_millis(200));
        }
        if env_flag("BWM_TUI_SMOKE_SUMMARY") {
            let summary = serde_json::json!({
                "ok": state.streams.last_error.is_none(),
                "route": state.route.path(),
                "dirty_tabs": state.guard.dirty_tabs().len(),
                "streams": state.streams.rows.len(),
            });
            println!("{summary}");
        }
        state.guard.set_navigate_callback(None);
        return Ok(());
    }

    // Interactive terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, &mut state);

    // Shell teardown: clear the bridge before the registry goes away.
    state.guard.set_navigate_callback(None);
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| ui(f, state))?;
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                let effects = handle_key(state, key);
                run_effects(state, effects);
            }
        }
        pump_messages(state)?;
        if last_tick.elapsed() >= tick_rate {
            state.tick = state.tick.wrapping_add(1);
            if let Some(t) = &state.toast {
                if t.expires_at_tick <= state.tick {
                    state.toast = None;
                }
            }
            last_tick = Instant::now();
        }
        if state.should_quit {
            return Ok(());
        }
    }
}
