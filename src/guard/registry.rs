use anyhow::Result;
use std::collections::VecDeque;

use crate::guard::bridge::{NavigateFn, NavigationBridge};

pub type SaveFn = Box<dyn FnMut() -> Result<()>>;
pub type DiscardFn = Box<dyn FnMut()>;
pub type FocusFn = Box<dyn FnMut()>;

/// One entry per mounted settings panel. Re-registration with the same id
/// replaces every field, so callbacks always close over the panel's
/// latest state.
pub struct TabEntry {
    pub tab_id: String,
    pub is_dirty: bool,
    focus_save: Option<FocusFn>,
    on_save: Option<SaveFn>,
    on_discard: Option<DiscardFn>,
}

/// Process-wide registry of settings panels and the single point of
/// arbitration for leave-with-unsaved-changes decisions.
///
/// Owned by the shell's `AppState` (constructed once per run, fresh per
/// test). Entries keep first-registration order; `current_dirty_tab` is
/// recomputed from the live entries on every call, never cached, so reads
/// made while a save is still settling see the newest per-tab state.
#[derive(Default)]
pub struct TabRegistry {
    tabs: Vec<TabEntry>,
    warning_visible: bool,
    pending_tab_change: Option<String>,
    pending_navigation: Option<String>,
    bridge: NavigationBridge,
    deferred_nav: VecDeque<String>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent upsert keyed by `tab_id`. Safe to call once per loop
    /// iteration for every mounted panel: an existing entry keeps its
    /// position but has all fields replaced (callbacks are never merged).
    pub fn register_tab(
        &mut self,
        tab_id: impl Into<String>,
        is_dirty: bool,
        focus_save: Option<FocusFn>,
        on_save: Option<SaveFn>,
        on_discard: Option<DiscardFn>,
    ) {
        let tab_id = tab_id.into();
        let entry = TabEntry {
            tab_id,
            is_dirty,
            focus_save,
            on_save,
            on_discard,
        };
        if let Some(slot) = self.tabs.iter_mut().find(|t| t.tab_id == entry.tab_id) {
            *slot = entry;
        } else {
            self.tabs.push(entry);
        }
    }

    /// Panels must unregister on unmount so a dismounted panel can never
    /// be selected as the blocking tab.
    pub fn unregister_tab(&mut self, tab_id: &str) {
        self.tabs.retain(|t| t.tab_id != tab_id);
    }

    #[allow(dead_code)]
    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    /// Derived, never stored: true iff any registered entry is dirty.
    pub fn has_dirty_tabs(&self) -> bool {
        self.tabs.iter().any(|t| t.is_dirty)
    }

    /// All dirty tab ids, in first-registration order.
    pub fn dirty_tabs(&self) -> Vec<&str> {
        self.tabs
            .iter()
            .filter(|t| t.is_dirty)
            .map(|t| t.tab_id.as_str())
            .collect()
    }

    /// The first dirty tab in registration order, if any. Only this tab
    /// is surfaced, focused, saved or discarded by the warning flow;
    /// other dirty tabs stay dirty until the user visits them directly.
    pub fn current_dirty_tab(&self) -> Option<&str> {
        self.current_dirty_index()
            .map(|i| self.tabs[i].tab_id.as_str())
    }

    fn current_dirty_index(&self) -> Option<usize> {
        self.tabs.iter().position(|t| t.is_dirty)
    }

    /// Bring the blocking tab's save control into view (when there is
    /// one) and show the warning. Callers are expected to have checked
    /// `has_dirty_tabs` already; with no dirty tab this still shows the
    /// warning, and the resolution calls are then no-ops.
    pub fn trigger_warning(&mut self) {
        if let Some(idx) = self.current_dirty_index() {
            if let Some(focus) = self.tabs[idx].focus_save.as_mut() {
                focus();
            }
        }
        self.warning_visible = true;
    }

    /// Cancel: hide the warning and forget both recorded destinations.
    /// Tab dirty state is left untouched.
    pub fn dismiss_warning(&mut self) {
        self.warning_visible = false;
        self.pending_tab_change = None;
        self.pending_navigation = None;
    }

    pub fn warning_visible(&self) -> bool {
        self.warning_visible
    }

    /// Save the blocking tab, then proceed.
    ///
    /// `on_save` is invoked at most once per resolution; the target is
    /// resolved at this instant, not when the warning first appeared. On
    /// failure the error propagates and the warning plus both pending
    /// slots stay as they were, so the user can retry or cancel. On
    /// success the warning clears and a recorded navigation moves onto
    /// the deferred queue, to be driven through the bridge only after the
    /// current state transition has committed (see `flush_deferred`).
    /// A recorded tab change is left for the caller to take and apply.
    pub fn handle_save_and_proceed(&mut self) -> Result<()> {
        if let Some(idx) = self.current_dirty_index() {
            if let Some(save) = self.tabs[idx].on_save.as_mut() {
                save()?;
            }
        }
        self.warning_visible = false;
        if let Some(path) = self.pending_navigation.take() {
            self.deferred_nav.push_back(path);
        }
        Ok(())
    }

    /// Revert the blocking tab synchronously, then hide the warning.
    /// Neither pending slot is touched: the caller re-attempts the
    /// original action, which now finds the tab clean and proceeds.
    pub fn handle_discard_and_proceed(&mut self) {
        if let Some(idx) = self.current_dirty_index() {
            if let Some(discard) = self.tabs[idx].on_discard.as_mut() {
                discard();
            }
        }
        self.warning_visible = false;
    }

    pub fn set_pending_tab_change(&mut self, tab_id: Option<String>) {
        self.pending_tab_change = tab_id;
    }

    pub fn pending_tab_change(&self) -> Option<&str> {
        self.pending_tab_change.as_deref()
    }

    pub fn set_pending_navigation(&mut self, path: Option<String>) {
        self.pending_navigation = path;
    }

    pub fn pending_navigation(&self) -> Option<&str> {
        self.pending_navigation.as_deref()
    }

    /// Install (or clear) the shell's navigation hook.
    pub fn set_navigate_callback(&mut self, f: Option<NavigateFn>) {
        self.bridge.install(f);
    }

    /// Drain navigations deferred by `handle_save_and_proceed`. The event
    /// loop calls this once per iteration, after the updates from the
    /// current event have been applied, so the panel's own post-save
    /// state settles before the route changes. This is the bridge's sole
    /// call site; draining with no callback installed fails loudly.
    pub fn flush_deferred(&mut self) -> Result<()> {
        while let Some(path) = self.deferred_nav.pop_front() {
            self.bridge.navigate(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn counting_save(count: &Rc<Cell<u32>>, ok: bool) -> SaveFn {
        let count = Rc::clone(count);
        Box::new(move || {
            count.set(count.get() + 1);
            if ok {
                Ok(())
            } else {
                Err(anyhow!("daemon rejected the payload"))
            }
        })
    }

    fn counting_discard(count: &Rc<Cell<u32>>) -> DiscardFn {
        let count = Rc::clone(count);
        Box::new(move || count.set(count.get() + 1))
    }

    fn nav_sink(reg: &mut TabRegistry) -> Rc<RefCell<Vec<String>>> {
        let seen: Rc<RefCell<Vec<String>>> = Rc::default();
        let sink = Rc::clone(&seen);
        reg.set_navigate_callback(Some(Box::new(move |p| {
            sink.borrow_mut().push(p.to_string())
        })));
        seen
    }

    #[test]
    fn reregistration_keeps_a_single_entry_with_latest_fields() {
        let mut reg = TabRegistry::new();
        for dirty in [false, true, false, true] {
            reg.register_tab("delays", dirty, None, None, None);
        }
        assert_eq!(reg.tab_count(), 1);
        assert!(reg.has_dirty_tabs());
        assert_eq!(reg.dirty_tabs(), ["delays"]);
    }

    #[test]
    fn has_dirty_tabs_is_the_or_of_all_entries() {
        let mut reg = TabRegistry::new();
        reg.register_tab("general", false, None, None, None);
        reg.register_tab("delays", false, None, None, None);
        assert!(!reg.has_dirty_tabs());
        reg.register_tab("delays", true, None, None, None);
        assert!(reg.has_dirty_tabs());
        reg.register_tab("delays", false, None, None, None);
        assert!(!reg.has_dirty_tabs());
    }

    #[test]
    fn first_dirty_tab_wins_and_unregister_promotes_the_next() {
        let mut reg = TabRegistry::new();
        reg.register_tab("a", true, None, None, None);
        reg.register_tab("b", true, None, None, None);
        assert_eq!(reg.current_dirty_tab(), Some("a"));
        assert_eq!(reg.dirty_tabs(), ["a", "b"]);

        reg.unregister_tab("a");
        assert_eq!(reg.current_dirty_tab(), Some("b"));
    }

    #[test]
    fn reregistration_does_not_lose_tie_break_position() {
        let mut reg = TabRegistry::new();
        reg.register_tab("a", true, None, None, None);
        reg.register_tab("b", true, None, None, None);
        // "a" re-registers (as panels do every iteration); it must keep
        // its first-registration position.
        reg.register_tab("a", true, None, None, None);
        assert_eq!(reg.current_dirty_tab(), Some("a"));
    }

    #[test]
    fn trigger_warning_focuses_the_blocking_tab() {
        let focused = Rc::new(Cell::new(0u32));
        let f = Rc::clone(&focused);
        let mut reg = TabRegistry::new();
        reg.register_tab(
            "delays",
            true,
            Some(Box::new(move || f.set(f.get() + 1))),
            None,
            None,
        );
        reg.trigger_warning();
        assert!(reg.warning_visible());
        assert_eq!(focused.get(), 1);
    }

    #[test]
    fn resolution_with_no_dirty_tab_has_no_save_or_discard_effect() {
        let saves = Rc::new(Cell::new(0u32));
        let discards = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        reg.register_tab(
            "general",
            false,
            None,
            Some(counting_save(&saves, true)),
            Some(counting_discard(&discards)),
        );
        reg.trigger_warning();
        assert!(reg.warning_visible());
        reg.handle_save_and_proceed().unwrap();
        reg.handle_discard_and_proceed();
        assert_eq!(saves.get(), 0);
        assert_eq!(discards.get(), 0);
        assert!(!reg.warning_visible());
    }

    #[test]
    fn save_and_proceed_navigates_exactly_once_after_flush() {
        let saves = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        let seen = nav_sink(&mut reg);
        reg.register_tab("delays", true, None, Some(counting_save(&saves, true)), None);
        reg.set_pending_navigation(Some("/streams".into()));
        reg.trigger_warning();

        reg.handle_save_and_proceed().unwrap();
        assert_eq!(saves.get(), 1);
        assert!(!reg.warning_visible());
        assert!(reg.pending_navigation().is_none());
        // Nothing reaches the bridge until the deferred queue is pumped.
        assert!(seen.borrow().is_empty());

        reg.flush_deferred().unwrap();
        assert_eq!(seen.borrow().as_slice(), ["/streams"]);
        reg.flush_deferred().unwrap();
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn failed_save_keeps_warning_and_slots_and_never_navigates() {
        let saves = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        let seen = nav_sink(&mut reg);
        reg.register_tab(
            "delays",
            true,
            None,
            Some(counting_save(&saves, false)),
            None,
        );
        reg.set_pending_navigation(Some("/streams".into()));
        reg.trigger_warning();

        assert!(reg.handle_save_and_proceed().is_err());
        assert_eq!(saves.get(), 1);
        assert!(reg.warning_visible());
        assert_eq!(reg.pending_navigation(), Some("/streams"));
        reg.flush_deferred().unwrap();
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn discard_and_proceed_reverts_once_and_leaves_slots_alone() {
        let discards = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        reg.register_tab("delays", true, None, None, Some(counting_discard(&discards)));
        reg.set_pending_tab_change(Some("general".into()));
        reg.set_pending_navigation(Some("/history".into()));
        reg.trigger_warning();

        reg.handle_discard_and_proceed();
        assert_eq!(discards.get(), 1);
        assert!(!reg.warning_visible());
        assert_eq!(reg.pending_tab_change(), Some("general"));
        assert_eq!(reg.pending_navigation(), Some("/history"));
    }

    #[test]
    fn dismiss_clears_flag_and_both_slots_but_not_dirty_state() {
        let mut reg = TabRegistry::new();
        reg.register_tab("delays", true, None, None, None);
        reg.set_pending_tab_change(Some("general".into()));
        reg.set_pending_navigation(Some("/streams".into()));
        reg.trigger_warning();

        reg.dismiss_warning();
        assert!(!reg.warning_visible());
        assert!(reg.pending_tab_change().is_none());
        assert!(reg.pending_navigation().is_none());
        assert!(reg.has_dirty_tabs());
    }

    #[test]
    fn save_targets_the_tab_current_at_invocation_time() {
        // The blocking tab is re-resolved when the user clicks save, not
        // when the warning first appeared.
        let first = Rc::new(Cell::new(0u32));
        let second = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        reg.register_tab("a", true, None, Some(counting_save(&first, true)), None);
        reg.register_tab("b", true, None, Some(counting_save(&second, true)), None);
        reg.trigger_warning();
        // "a" re-registers clean while the warning is up (the user edited
        // elsewhere, or the panel saved itself).
        reg.register_tab("a", false, None, Some(counting_save(&first, true)), None);

        reg.handle_save_and_proceed().unwrap();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn flush_without_bridge_fails_loudly() {
        let saves = Rc::new(Cell::new(0u32));
        let mut reg = TabRegistry::new();
        reg.register_tab("delays", true, None, Some(counting_save(&saves, true)), None);
        reg.set_pending_navigation(Some("/streams".into()));
        reg.handle_save_and_proceed().unwrap();
        assert!(reg.flush_deferred().is_err());
    }
}
