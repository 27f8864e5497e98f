use std::io::Write;
use std::path::PathBuf;

use atrium_core::models::{ChecklistItem, Priority};
use atrium_core::EngineConfig;
use clap::Parser;
use pretty_assertions::assert_eq;

use crate::cli::{ChecklistAction, Cli, Commands, CompletionShell, SortArg, ViewArgs};
use crate::commands::checklist::{apply_action, format_outline, load_checklist};
use crate::commands::common::{format_relative_time, short_id, title_preview};
use crate::commands::completions::render_completions;
use crate::commands::view::{build_projection, build_report, ViewSection};
use crate::error::CliError;

const FIXTURE: &str = r#"[
    {"id": "pinned-low", "owner_id": "me", "title": "Low pin", "pinned": true, "priority": "low", "created_at": 1, "updated_at": 50},
    {"id": "pinned-high", "owner_id": "me", "title": "High pin", "pinned": true, "priority": "high", "created_at": 1, "updated_at": 10},
    {"id": "groceries", "owner_id": "me", "title": "Groceries", "labels": ["home"], "color": "green", "created_at": 2, "updated_at": 40},
    {"id": "report", "owner_id": "me", "title": "Quarterly report", "labels": ["work"], "created_at": 3, "updated_at": 30},
    {"id": "gone", "owner_id": "me", "title": "Old idea", "deleted_at": 99, "created_at": 4, "updated_at": 20},
    {"id": "shelved", "owner_id": "me", "title": "Shelved", "archived": true, "created_at": 5, "updated_at": 15},
    {"id": "team-plan", "owner_id": "bob", "space_id": "team", "title": "Team plan", "created_at": 6, "updated_at": 60},
    {"id": "broken", "title": "missing owner"}
]"#;

fn fixture_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FIXTURE.as_bytes()).unwrap();
    file
}

fn view_args(fixture: PathBuf) -> ViewArgs {
    ViewArgs {
        fixture,
        user: "me".to_string(),
        search: None,
        label: None,
        colors: Vec::new(),
        kind: None,
        sort: SortArg::Updated,
        ascending: false,
        space: None,
        trash: false,
        archived: false,
        all: false,
        json: false,
    }
}

fn report_ids(args: &ViewArgs, config: EngineConfig) -> (ViewSection, Vec<String>, bool) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let projection = runtime.block_on(build_projection(args, config)).unwrap();
    let report = build_report(args, &projection, 100);
    let ids = report.records.into_iter().map(|item| item.id).collect();
    (report.section, ids, report.has_more)
}

#[test]
fn view_lists_pinned_by_priority_then_unpinned() {
    let file = fixture_file();
    let args = view_args(file.path().to_path_buf());
    let (section, ids, has_more) = report_ids(&args, EngineConfig::default());
    assert_eq!(section, ViewSection::Active);
    assert_eq!(ids, vec!["pinned-high", "pinned-low", "groceries", "report"]);
    assert!(!has_more);
}

#[test]
fn view_paginates_unless_all_is_requested() {
    let file = fixture_file();
    let config = EngineConfig {
        page_size: 1,
        ..EngineConfig::default()
    };
    let mut args = view_args(file.path().to_path_buf());
    let (_, ids, has_more) = report_ids(&args, config);
    assert_eq!(ids, vec!["pinned-high", "pinned-low", "groceries"]);
    assert!(has_more);

    args.all = true;
    let (_, ids, has_more) = report_ids(&args, config);
    assert_eq!(ids.len(), 4);
    assert!(!has_more);
}

#[test]
fn view_applies_search_label_and_sort() {
    let file = fixture_file();
    let mut args = view_args(file.path().to_path_buf());
    args.label = Some("work".to_string());
    assert_eq!(report_ids(&args, EngineConfig::default()).1, vec!["report"]);

    let mut args = view_args(file.path().to_path_buf());
    args.search = Some("GROC".to_string());
    assert_eq!(report_ids(&args, EngineConfig::default()).1, vec!["groceries"]);

    let mut args = view_args(file.path().to_path_buf());
    args.sort = SortArg::Title;
    args.ascending = true;
    let ids = report_ids(&args, EngineConfig::default()).1;
    assert_eq!(&ids[2..], ["groceries", "report"]);
}

#[test]
fn view_shows_trash_archive_and_spaces() {
    let file = fixture_file();
    let mut args = view_args(file.path().to_path_buf());
    args.trash = true;
    assert_eq!(
        report_ids(&args, EngineConfig::default()),
        (ViewSection::Trash, vec!["gone".to_string()], false)
    );

    let mut args = view_args(file.path().to_path_buf());
    args.archived = true;
    assert_eq!(report_ids(&args, EngineConfig::default()).1, vec!["shelved"]);

    let mut args = view_args(file.path().to_path_buf());
    args.space = Some("team".to_string());
    assert_eq!(report_ids(&args, EngineConfig::default()).1, vec!["team-plan"]);
}

#[test]
fn cli_parses_view_flags() {
    let cli = Cli::try_parse_from([
        "atrium", "view", "records.json", "--color", "red", "--color", "blue", "--sort", "title",
        "--ascending", "--all",
    ])
    .unwrap();
    let Commands::View(args) = cli.command else {
        panic!("expected view command");
    };
    assert_eq!(args.colors, vec!["red", "blue"]);
    assert_eq!(args.sort, SortArg::Title);
    assert!(args.ascending && args.all);
    assert_eq!(args.user, "me");
}

#[test]
fn cli_rejects_trash_with_archived() {
    assert!(Cli::try_parse_from(["atrium", "view", "r.json", "--trash", "--archived"]).is_err());
}

#[test]
fn cli_parses_checklist_actions() {
    let cli = Cli::try_parse_from(["atrium", "checklist", "list.json", "move", "0", "3", "--write"])
        .unwrap();
    let Commands::Checklist {
        action, write, json, ..
    } = cli.command
    else {
        panic!("expected checklist command");
    };
    assert_eq!(action, ChecklistAction::Move { from: 0, to: 3 });
    assert!(write);
    assert!(!json);
}

fn outline() -> Vec<ChecklistItem> {
    vec![
        ChecklistItem::new("P"),
        ChecklistItem::new("A").with_indent(1).with_completed(true),
        ChecklistItem::new("B").with_indent(1),
        ChecklistItem::new("Q").with_priority(Priority::High),
    ]
}

#[test]
fn completing_last_child_completes_parent() {
    let next = apply_action(&outline(), ChecklistAction::Complete { index: 2 }).unwrap();
    assert!(next[0].completed);

    let reopened = apply_action(&next, ChecklistAction::Uncomplete { index: 1 }).unwrap();
    assert!(!reopened[0].completed);
    assert!(reopened[2].completed);
}

#[test]
fn invalid_checklist_edits_are_reported() {
    assert!(matches!(
        apply_action(&outline(), ChecklistAction::Remove { index: 9 }),
        Err(CliError::InvalidIndex { index: 9, len: 4 })
    ));
    assert!(matches!(
        apply_action(&outline(), ChecklistAction::Indent { index: 0 }),
        Err(CliError::InvalidChecklistAction { action: "indent", .. })
    ));
    assert!(matches!(
        apply_action(&outline(), ChecklistAction::Collapse { index: 3 }),
        Err(CliError::InvalidChecklistAction { action: "collapse", .. })
    ));
}

#[test]
fn sort_moves_prioritised_group_first() {
    let sorted = apply_action(&outline(), ChecklistAction::Sort).unwrap();
    let texts: Vec<&str> = sorted.iter().map(|item| item.text.as_str()).collect();
    assert_eq!(texts, vec!["Q", "P", "A", "B"]);
}

#[test]
fn outline_hides_collapsed_children() {
    let collapsed = apply_action(&outline(), ChecklistAction::Collapse { index: 0 }).unwrap();
    let lines = format_outline(&collapsed);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("+ [ ] P"));
    assert!(lines[1].contains("Q  !high"));
    assert_eq!(lines[2], "1/4 done");
}

#[test]
fn load_checklist_clamps_indent_and_fills_ids() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"[{"text": "root"}, {"text": "deep", "indent": 7}]"#)
        .unwrap();
    let items = load_checklist(file.path()).unwrap();
    assert_eq!(items[1].indent, 3);
    assert_ne!(items[0].id, items[1].id);
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("atrium"));
}

#[test]
fn relative_time_buckets() {
    assert_eq!(format_relative_time(0, 30_000), "just now");
    assert_eq!(format_relative_time(0, 5 * 60_000), "5m ago");
    assert_eq!(format_relative_time(0, 3 * 86_400_000), "3d ago");
}

#[test]
fn list_helpers_truncate() {
    assert_eq!(short_id("0192f0c4-aaaa"), "0192f0c4");
    assert_eq!(title_preview("   "), "(untitled)");
    assert!(title_preview(&"x".repeat(80)).ends_with("..."));
}
