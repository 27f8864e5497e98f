pub mod checklist;
pub mod common;
pub mod completions;
pub mod view;
