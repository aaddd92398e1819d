use crate::services::daemon;
use crate::ui::{LoadKind, LoadMsg};
use std::sync::mpsc::Sender;
use std::thread;

/// Fetch one daemon dataset on a background thread and report back over
/// the shell's channel. Errors travel as strings; a failed load never
/// takes the UI down.
pub fn spawn_load(kind: LoadKind, tx: Sender<LoadMsg>) {
    thread::spawn(move || {
        let outcome = match kind {
            LoadKind::Config => daemon::get_config(),
            LoadKind::Streams => daemon::list_streams(),
            LoadKind::History => daemon::get_history(),
        }
        .map_err(|e| format!("{e:#}"));
        let _ = tx.send(LoadMsg { kind, outcome });
    });
}
