//! Checklist hierarchy engine
//!
//! Checklist items carry no parent pointer: nesting is inferred from the
//! ordered list and each item's `indent`. Every function here is pure and
//! returns a fresh vector, so callers can hand the result straight to a
//! record update.

use std::cmp::Ordering;
use std::ops::Range;

use crate::models::{priority_rank, ChecklistItem, MAX_INDENT};

/// Index of the nearest preceding item with a smaller indent.
///
/// Top-level items (indent 0) have no parent.
pub fn parent_of(items: &[ChecklistItem], index: usize) -> Option<usize> {
    let indent = items.get(index)?.indent;
    if indent == 0 {
        return None;
    }
    items[..index].iter().rposition(|item| item.indent < indent)
}

/// Indices of the direct children of `index`.
pub fn children_of(items: &[ChecklistItem], index: usize) -> Vec<usize> {
    let Some(parent) = items.get(index) else {
        return Vec::new();
    };
    let child_indent = parent.indent.saturating_add(1);
    items
        .iter()
        .enumerate()
        .skip(index + 1)
        .take_while(|(_, item)| item.indent > parent.indent)
        .filter(|(_, item)| item.indent == child_indent)
        .map(|(position, _)| position)
        .collect()
}

/// Range covering `index` and all of its descendants.
pub fn subtree_of(items: &[ChecklistItem], index: usize) -> Range<usize> {
    let Some(root) = items.get(index) else {
        return index..index;
    };
    let end = items[index + 1..]
        .iter()
        .position(|item| item.indent <= root.indent)
        .map_or(items.len(), |offset| index + 1 + offset);
    index..end
}

pub fn has_children(items: &[ChecklistItem], index: usize) -> bool {
    subtree_of(items, index).len() > 1
}

/// Set the completion of `index` and propagate the change to its ancestors.
///
/// Completing an item completes its parent once every direct child of that
/// parent is complete, and so on upward. Un-completing an item un-completes
/// every completed ancestor above it. Descendants are never touched.
pub fn cascade_completion(
    items: &[ChecklistItem],
    index: usize,
    completed: bool,
) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    let Some(item) = next.get_mut(index) else {
        return next;
    };
    item.completed = completed;

    let mut current = index;
    while let Some(parent) = parent_of(&next, current) {
        if completed {
            let all_children_done = children_of(&next, parent)
                .iter()
                .all(|&child| next[child].completed);
            if !all_children_done {
                break;
            }
            next[parent].completed = true;
        } else {
            if !next[parent].completed {
                break;
            }
            next[parent].completed = false;
        }
        current = parent;
    }
    next
}

/// Flip the completion of `index`, cascading like [`cascade_completion`].
pub fn toggle_completion(items: &[ChecklistItem], index: usize) -> Vec<ChecklistItem> {
    match items.get(index) {
        Some(item) => cascade_completion(items, index, !item.completed),
        None => items.to_vec(),
    }
}

/// Move the subtree rooted at `from` so it lands around position `to`.
///
/// Moving down places the subtree after the full subtree of the item found
/// at the target once the moved rows are taken out. Moving up places it
/// before the target, stepping back over deeper rows so it never splits
/// another subtree. Targets inside the moved subtree leave the list as is.
pub fn move_subtree(items: &[ChecklistItem], from: usize, to: usize) -> Vec<ChecklistItem> {
    if from >= items.len() || items.is_empty() {
        return items.to_vec();
    }
    let to = to.min(items.len() - 1);
    let span = subtree_of(items, from);
    if span.contains(&to) {
        return items.to_vec();
    }

    let mut remaining = items.to_vec();
    let moved: Vec<ChecklistItem> = remaining.drain(span.clone()).collect();
    let root_indent = moved[0].indent;

    let insert_at = if to > from {
        let adjusted = to - span.len();
        subtree_of(&remaining, adjusted).end
    } else {
        let mut at = to;
        while at > 0 && remaining[at].indent > root_indent {
            at -= 1;
        }
        at
    };

    remaining.splice(insert_at..insert_at, moved);
    remaining
}

/// Remove `index` together with its descendants.
pub fn remove_subtree(items: &[ChecklistItem], index: usize) -> Vec<ChecklistItem> {
    let span = subtree_of(items, index);
    let mut next = items.to_vec();
    next.drain(span);
    next
}

/// Whether `index` can be nested one level deeper under the previous item.
pub fn can_indent(items: &[ChecklistItem], index: usize) -> bool {
    if index == 0 || index >= items.len() {
        return false;
    }
    let previous = &items[index - 1];
    let deepest = items[subtree_of(items, index)]
        .iter()
        .map(|item| item.indent)
        .max()
        .unwrap_or(0);
    items[index].indent <= previous.indent && deepest < MAX_INDENT
}

pub fn can_unindent(items: &[ChecklistItem], index: usize) -> bool {
    items.get(index).is_some_and(|item| item.indent > 0)
}

/// Nest `index` and its descendants one level deeper.
pub fn indent(items: &[ChecklistItem], index: usize) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    if can_indent(items, index) {
        for item in &mut next[subtree_of(items, index)] {
            item.indent += 1;
        }
    }
    next
}

/// Lift `index` and its descendants one level up.
pub fn unindent(items: &[ChecklistItem], index: usize) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    if can_unindent(items, index) {
        for item in &mut next[subtree_of(items, index)] {
            item.indent = item.indent.saturating_sub(1);
        }
    }
    next
}

/// Flip the collapsed flag of an item that has children; leaves are unchanged.
pub fn toggle_collapsed(items: &[ChecklistItem], index: usize) -> Vec<ChecklistItem> {
    let mut next = items.to_vec();
    if has_children(items, index) {
        next[index].collapsed = !next[index].collapsed;
    }
    next
}

/// An item is hidden when any of its ancestors is collapsed.
pub fn is_visible(items: &[ChecklistItem], index: usize) -> bool {
    let mut current = index;
    while let Some(parent) = parent_of(items, current) {
        if items[parent].collapsed {
            return false;
        }
        current = parent;
    }
    index < items.len()
}

/// Indices of every visible item, in order.
pub fn visible_indices(items: &[ChecklistItem]) -> Vec<usize> {
    let mut visible = Vec::with_capacity(items.len());
    let mut hidden_below: Option<u8> = None;
    for (index, item) in items.iter().enumerate() {
        if let Some(level) = hidden_below {
            if item.indent > level {
                continue;
            }
            hidden_below = None;
        }
        visible.push(index);
        if item.collapsed {
            hidden_below = Some(item.indent);
        }
    }
    visible
}

/// Split the list into consecutive top-level subtrees.
pub fn group_into_subtrees(items: &[ChecklistItem]) -> Vec<Vec<ChecklistItem>> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < items.len() {
        let span = subtree_of(items, start);
        start = span.end;
        groups.push(items[span].to_vec());
    }
    groups
}

/// Order whole subtrees by their most urgent priority, then earliest due date.
///
/// Both keys look at every item in the subtree. Subtrees with a due date sort
/// before those without; remaining ties keep their original order.
pub fn sort_subtrees_by_priority(mut groups: Vec<Vec<ChecklistItem>>) -> Vec<ChecklistItem> {
    groups.sort_by(|left, right| {
        subtree_rank(left)
            .cmp(&subtree_rank(right))
            .then_with(|| compare_due_dates(earliest_due(left), earliest_due(right)))
    });
    groups.into_iter().flatten().collect()
}

/// Group then sort in one step.
pub fn sort_by_priority(items: &[ChecklistItem]) -> Vec<ChecklistItem> {
    sort_subtrees_by_priority(group_into_subtrees(items))
}

/// `(completed, total)` over every item.
pub fn completion_progress(items: &[ChecklistItem]) -> (usize, usize) {
    let completed = items.iter().filter(|item| item.completed).count();
    (completed, items.len())
}

fn subtree_rank(group: &[ChecklistItem]) -> u8 {
    group
        .iter()
        .map(|item| priority_rank(item.priority))
        .min()
        .unwrap_or_else(|| priority_rank(None))
}

fn earliest_due(group: &[ChecklistItem]) -> Option<i64> {
    group.iter().filter_map(|item| item.due_date).min()
}

fn compare_due_dates(left: Option<i64>, right: Option<i64>) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
