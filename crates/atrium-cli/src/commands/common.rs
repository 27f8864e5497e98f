use std::fmt::Write as _;

use atrium_core::hierarchy::completion_progress;
use atrium_core::models::{Priority, Record, RecordKind};
use serde::Serialize;

const ID_PREFIX_LEN: usize = 8;
const TITLE_PREVIEW_LEN: usize = 48;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub title: String,
    pub kind: RecordKind,
    pub owner_id: String,
    pub color: String,
    pub pinned: bool,
    pub priority: Option<Priority>,
    pub labels: Vec<String>,
    pub updated_at: i64,
    pub relative_time: String,
    pub attachments: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_progress: Option<String>,
}

pub fn record_to_list_item(record: &Record, now_ms: i64) -> RecordListItem {
    RecordListItem {
        id: record.id.to_string(),
        title: record.title.clone(),
        kind: record.kind,
        owner_id: record.owner_id.to_string(),
        color: record.color.clone(),
        pinned: record.pinned,
        priority: record.priority,
        labels: record.labels.iter().cloned().collect(),
        updated_at: record.updated_at,
        relative_time: format_relative_time(record.updated_at, now_ms),
        attachments: record.attachments.len(),
        checklist_progress: checklist_progress(record),
    }
}

fn checklist_progress(record: &Record) -> Option<String> {
    if record.checklist.is_empty() {
        return None;
    }
    let (done, total) = completion_progress(&record.checklist);
    Some(format!("{done}/{total}"))
}

pub fn format_record_lines<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    now_ms: i64,
) -> Vec<String> {
    records
        .into_iter()
        .map(|record| format_record_line(record, now_ms))
        .collect()
}

fn format_record_line(record: &Record, now_ms: i64) -> String {
    let marker = if record.pinned { '*' } else { ' ' };
    let mut line = format!(
        "{marker} {}  {:<width$}  {}",
        short_id(record.id.as_str()),
        title_preview(&record.title),
        format_relative_time(record.updated_at, now_ms),
        width = TITLE_PREVIEW_LEN,
    );
    if let Some(priority) = record.priority {
        let _ = write!(line, "  !{}", priority_label(priority));
    }
    if let Some(progress) = checklist_progress(record) {
        let _ = write!(line, "  [{progress}]");
    }
    if !record.labels.is_empty() {
        let labels: Vec<String> = record.labels.iter().map(|label| format!("#{label}")).collect();
        let _ = write!(line, "  {}", labels.join(" "));
    }
    line
}

pub fn short_id(id: &str) -> String {
    id.chars().take(ID_PREFIX_LEN).collect()
}

pub fn title_preview(title: &str) -> String {
    let title = title.trim();
    if title.is_empty() {
        return "(untitled)".to_string();
    }
    if title.chars().count() > TITLE_PREVIEW_LEN {
        let truncated: String = title.chars().take(TITLE_PREVIEW_LEN - 3).collect();
        format!("{truncated}...")
    } else {
        title.to_string()
    }
}

pub const fn priority_label(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "high",
        Priority::Medium => "medium",
        Priority::Low => "low",
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
