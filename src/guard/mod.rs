//! Unsaved-changes coordination: per-panel draft tracking, the process-wide
//! tab registry that arbitrates save-or-discard decisions, and the bridge
//! that hands resolved navigations back to the shell.

pub mod bridge;
pub mod draft;
pub mod registry;
