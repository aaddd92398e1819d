use crate::nav::routes::Route;
use crate::ui::AppState;
use serde_json::Value as JsonValue;

pub enum AppMsg {
    /// The user asked for a screen change (function key / tab bar).
    RouteRequested(Route),
    /// A resolved navigation delivered through the Navigation Bridge.
    NavigateTo(Route),
    /// The user asked for a different settings section.
    TabRequested(usize),
    QuitRequested,
    QuitConfirmed,
    QuitAborted,
    /// Warning-dialog buttons.
    WarningCancel,
    WarningSave,
    WarningDiscard,
    LoadedConfig {
        outcome: Result<JsonValue, String>,
    },
    LoadedStreams {
        outcome: Result<JsonValue, String>,
    },
    LoadedHistory {
        outcome: Result<JsonValue, String>,
    },
}

pub enum Effect {
    LoadConfig,
    LoadStreams,
    LoadHistory,
    ShowToast {
        text: String,
        level: crate::ui::ToastLevel,
        seconds: u64,
    },
    Quit,
}

pub fn update(state: &mut AppState, msg: AppMsg) -> Vec<Effect> {
    use AppMsg::*;
    let mut effects: Vec<Effect> = Vec::new();
    match msg {
        RouteRequested(route) => {
            if state.route == route {
                return effects;
            }
            crate::ui::sync_tab_registrations(state);
            if state.guard.has_dirty_tabs() {
                // Record the destination, then hand the decision to the
                // warning flow. Only one pending slot is meaningful at a
                // time, so the other is cleared here.
                state.guard.set_pending_navigation(Some(route.path().to_string()));
                state.guard.set_pending_tab_change(None);
                open_warning(state);
                state.dbg(format!("navigation to {} blocked by unsaved changes", route.path()));
            } else {
                effects.extend(switch_route(state, route));
            }
        }
        NavigateTo(route) => {
            // Post-resolution navigation from the bridge; the blocking
            // tab was already saved, so this is not re-gated.
            state.dbg(format!("bridge: navigate to {}", route.path()));
            effects.extend(switch_route(state, route));
        }
        TabRequested(idx) => {
            if idx >= state.settings.panels.len() || idx == state.settings.active {
                return effects;
            }
            crate::ui::sync_tab_registrations(state);
            if state.guard.has_dirty_tabs() {
                let target_id = state.settings.panels[idx].borrow().section_id.clone();
                state.guard.set_pending_tab_change(Some(target_id));
                state.guard.set_pending_navigation(None);
                open_warning(state);
                state.dbg("tab switch blocked by unsaved changes".to_string());
            } else {
                state.settings.active = idx;
                state.settings.cursor = idx;
            }
        }
        QuitRequested => {
            crate::ui::sync_tab_registrations(state);
            if state.guard.has_dirty_tabs() {
                state.quit_confirm = true;
            } else {
                effects.push(Effect::Quit);
            }
        }
        QuitConfirmed => {
            state.quit_confirm = false;
            effects.push(Effect::Quit);
        }
        QuitAborted => {
            state.quit_confirm = false;
        }
        WarningCancel => {
            state.guard.dismiss_warning();
            state.warning_error = None;
        }
        WarningSave => match state.guard.handle_save_and_proceed() {
            Ok(()) => {
                state.warning_error = None;
                if let Some(id) = state.guard.pending_tab_change().map(str::to_string) {
                    state.guard.set_pending_tab_change(None);
                    state.settings.activate_section(&id);
                }
                effects.push(Effect::ShowToast {
                    text: "Changes saved".into(),
                    level: crate::ui::ToastLevel::Success,
                    seconds: 2,
                });
                state.dbg("warning resolved: save & proceed".to_string());
            }
            Err(e) => {
                // Keep the dialog up with the failure shown; the user can
                // retry or cancel.
                state.warning_error = Some(format!("{e:#}"));
                state.dbg(format!("save & proceed failed: {e:#}"));
            }
        },
        WarningDiscard => {
            state.guard.handle_discard_and_proceed();
            state.warning_error = None;
            // The panel is clean now; refresh its registration before
            // re-attempting the recorded action so the guard sees it.
            crate::ui::sync_tab_registrations(state);
            let nav = state.guard.pending_navigation().map(str::to_string);
            state.guard.set_pending_navigation(None);
            let tab = state.guard.pending_tab_change().map(str::to_string);
            state.guard.set_pending_tab_change(None);
            if let Some(path) = nav {
                if let Some(route) = Route::from_path(&path) {
                    effects.extend(update(state, AppMsg::RouteRequested(route)));
                } else {
                    state.dbg(format!("discard: unknown pending path {path}"));
                }
            } else if let Some(id) = tab {
                if let Some(idx) = state.settings.index_of(&id) {
                    effects.extend(update(state, AppMsg::TabRequested(idx)));
                }
            }
            state.dbg("warning resolved: discard & proceed".to_string());
        }
        LoadedConfig { outcome } => {
            state.status_text = None;
            match outcome {
                Ok(data) => {
                    for panel in &state.settings.panels {
                        let mut p = panel.borrow_mut();
                        match data.get(&p.section_id) {
                            Some(v) => p.apply_loaded(v),
                            None => {
                                let section_id = p.section_id.clone();
                                p.set_load_error(format!(
                                    "daemon config has no '{}' section",
                                    section_id
                                ))
                            }
                        }
                    }
                    state.dbg("configuration loaded".to_string());
                }
                Err(e) => {
                    for panel in &state.settings.panels {
                        panel.borrow_mut().set_load_error(e.clone());
                    }
                    state.dbg(format!("config load error: {e}"));
                    effects.push(Effect::ShowToast {
                        text: "Failed to load configuration".into(),
                        level: crate::ui::ToastLevel::Error,
                        seconds: 3,
                    });
                }
            }
        }
        LoadedStreams { outcome } => {
            state.status_text = None;
            match outcome {
                Ok(data) => {
                    state.streams.apply(&data);
                    state.dbg(format!("loaded {} stream(s)", state.streams.rows.len()));
                }
                Err(e) => {
                    state.dbg(format!("streams load error: {e}"));
                    state.streams.set_error(e);
                }
            }
        }
        LoadedHistory { outcome } => {
            state.status_text = None;
            match outcome {
                Ok(data) => {
                    state.history.apply(&data);
                    state.dbg(format!("loaded {} history day(s)", state.history.rows.len()));
                }
                Err(e) => {
                    state.dbg(format!("history load error: {e}"));
                    state.history.set_error(e);
                }
            }
        }
    }
    effects
}

fn open_warning(state: &mut AppState) {
    state.warning_error = None;
    state.warning_selected = 0;
    state.guard.trigger_warning();
    // Mirror the focus callback at screen level: make the blocking
    // section the visible one.
    if let Some(id) = state.guard.current_dirty_tab().map(str::to_string) {
        state.settings.activate_section(&id);
    }
}

fn switch_route(state: &mut AppState, route: Route) -> Vec<Effect> {
    let mut effects: Vec<Effect> = Vec::new();
    if state.route == Route::Settings && route != Route::Settings {
        // Unmount: panels unregister so none of them can ever be picked
        // as a blocking tab while the screen is gone.
        let ids: Vec<String> = state
            .settings
            .panels
            .iter()
            .map(|p| p.borrow().section_id.clone())
            .collect();
        for id in &ids {
            state.guard.unregister_tab(id);
        }
        state.settings.panels.clear();
    }
    state.route = route;
    match route {
        Route::Streams => effects.push(Effect::LoadStreams),
        Route::History => effects.push(Effect::LoadHistory),
        Route::Settings => {
            state.settings.mount(&state.config.sections);
            effects.push(Effect::LoadConfig);
        }
    }
    effects
}
