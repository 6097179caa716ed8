// src/ui/widgets/mod.rs

pub mod disclaimer_popup;
pub mod findings_view; // findings list with a detail pane
pub mod footer;
pub mod input;
pub mod summary; // score, per-operation status, issue counts
