use std::fmt::Write as _;
use std::path::Path;

use atrium_core::hierarchy::{
    can_indent, can_unindent, cascade_completion, completion_progress, has_children, indent,
    move_subtree, remove_subtree, sort_by_priority, toggle_collapsed, unindent, visible_indices,
};
use atrium_core::models::ChecklistItem;
use chrono::{TimeZone, Utc};

use crate::cli::ChecklistAction;
use crate::commands::common::priority_label;
use crate::error::CliError;

pub fn load_checklist(path: &Path) -> Result<Vec<ChecklistItem>, CliError> {
    let payload = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&payload)?)
}

fn check_index(items: &[ChecklistItem], index: usize) -> Result<(), CliError> {
    if index < items.len() {
        Ok(())
    } else {
        Err(CliError::InvalidIndex {
            index,
            len: items.len(),
        })
    }
}

/// Apply one edit to the checklist, returning the new list.
pub fn apply_action(
    items: &[ChecklistItem],
    action: ChecklistAction,
) -> Result<Vec<ChecklistItem>, CliError> {
    match action {
        ChecklistAction::Complete { index } => {
            check_index(items, index)?;
            Ok(cascade_completion(items, index, true))
        }
        ChecklistAction::Uncomplete { index } => {
            check_index(items, index)?;
            Ok(cascade_completion(items, index, false))
        }
        ChecklistAction::Move { from, to } => {
            check_index(items, from)?;
            check_index(items, to)?;
            Ok(move_subtree(items, from, to))
        }
        ChecklistAction::Remove { index } => {
            check_index(items, index)?;
            Ok(remove_subtree(items, index))
        }
        ChecklistAction::Indent { index } => {
            check_index(items, index)?;
            if !can_indent(items, index) {
                return Err(CliError::InvalidChecklistAction {
                    action: "indent",
                    index,
                    reason: "it needs a sibling above and room below the maximum depth",
                });
            }
            Ok(indent(items, index))
        }
        ChecklistAction::Unindent { index } => {
            check_index(items, index)?;
            if !can_unindent(items, index) {
                return Err(CliError::InvalidChecklistAction {
                    action: "unindent",
                    index,
                    reason: "it is already at the top level",
                });
            }
            Ok(unindent(items, index))
        }
        ChecklistAction::Collapse { index } => {
            check_index(items, index)?;
            if !has_children(items, index) {
                return Err(CliError::InvalidChecklistAction {
                    action: "collapse",
                    index,
                    reason: "it has no children",
                });
            }
            Ok(toggle_collapsed(items, index))
        }
        ChecklistAction::Sort => Ok(sort_by_priority(items)),
        ChecklistAction::Show => Ok(items.to_vec()),
    }
}

/// Outline of the visible items, one line each, followed by a progress line.
pub fn format_outline(items: &[ChecklistItem]) -> Vec<String> {
    let mut lines: Vec<String> = visible_indices(items)
        .into_iter()
        .map(|index| format_item(items, index))
        .collect();
    let (done, total) = completion_progress(items);
    lines.push(format!("{done}/{total} done"));
    lines
}

fn format_item(items: &[ChecklistItem], index: usize) -> String {
    let item = &items[index];
    let check = if item.completed { "[x]" } else { "[ ]" };
    let fold = if item.collapsed { "+ " } else { "" };
    let mut line = format!(
        "{index:>3}  {}{fold}{check} {}",
        "  ".repeat(usize::from(item.indent)),
        item.text
    );
    if let Some(priority) = item.priority {
        let _ = write!(line, "  !{}", priority_label(priority));
    }
    if let Some(due) = item.due_date.and_then(|due| Utc.timestamp_millis_opt(due).single()) {
        let _ = write!(line, "  due {}", due.format("%Y-%m-%d"));
    }
    line
}

pub fn run_checklist(
    path: &Path,
    action: ChecklistAction,
    write: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let items = load_checklist(path)?;
    let next = apply_action(&items, action)?;
    tracing::debug!("Applied {action:?} to {}", path.display());

    if write && next != items {
        std::fs::write(path, serde_json::to_string_pretty(&next)?)?;
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&next)?);
    } else {
        for line in format_outline(&next) {
            println!("{line}");
        }
    }

    Ok(())
}
