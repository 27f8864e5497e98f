use std::sync::Arc;

use atrium_core::models::{Record, SortConfig, SpaceScope, StructuredFilter, UserId};
use atrium_core::sources::decode_snapshot;
use atrium_core::{EngineConfig, InMemoryBackend, MemoryPreferenceStore, Projection, RecordStore};
use serde::Serialize;

use crate::cli::ViewArgs;
use crate::commands::common::{format_record_lines, record_to_list_item, RecordListItem};
use crate::error::CliError;

/// Which slice of the projection to print
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewSection {
    Active,
    Trash,
    Archived,
}

#[derive(Debug, Serialize)]
pub struct ViewReport {
    pub section: ViewSection,
    pub loading: bool,
    pub total_count: usize,
    pub has_more: bool,
    pub shown: usize,
    pub records: Vec<RecordListItem>,
}

/// Seed an in-memory store from the fixture and apply the requested view state.
pub async fn build_projection(
    args: &ViewArgs,
    config: EngineConfig,
) -> Result<Arc<Projection>, CliError> {
    let payload = std::fs::read_to_string(&args.fixture)?;
    let records = decode_snapshot(&payload)?;
    tracing::debug!("Loaded {} records from {}", records.len(), args.fixture.display());

    let backend = Arc::new(InMemoryBackend::new());
    backend.seed(records);
    let store = RecordStore::new(backend, Arc::new(MemoryPreferenceStore::new()), config);

    store.set_scope(SpaceScope::from_space_id(args.space.as_deref()));
    store.start(UserId::from(args.user.as_str())).await;

    let filter = StructuredFilter {
        colors: args.colors.iter().cloned().collect(),
        kind: args.kind.map(Into::into),
        ..StructuredFilter::default()
    };
    store.set_filter(filter);
    store.set_sort(SortConfig::new(args.sort.into(), args.sort_direction()));
    store.set_active_label(args.label.clone());
    if let Some(search) = &args.search {
        store.set_search(search.as_str());
    }

    Ok(store.view())
}

fn select_records<'a>(args: &ViewArgs, projection: &'a Projection) -> (ViewSection, Vec<&'a Record>) {
    if args.trash {
        return (ViewSection::Trash, projection.trashed.iter().collect());
    }
    if args.archived {
        return (ViewSection::Archived, projection.archived.iter().collect());
    }
    let unpinned = if args.all {
        &projection.unpinned
    } else {
        &projection.displayed_unpinned
    };
    (
        ViewSection::Active,
        projection.pinned.iter().chain(unpinned).collect(),
    )
}

pub fn build_report(args: &ViewArgs, projection: &Projection, now_ms: i64) -> ViewReport {
    let (section, records) = select_records(args, projection);
    ViewReport {
        section,
        loading: projection.loading,
        total_count: projection.total_count,
        has_more: projection.has_more && !args.all && section == ViewSection::Active,
        shown: records.len(),
        records: records
            .into_iter()
            .map(|record| record_to_list_item(record, now_ms))
            .collect(),
    }
}

pub async fn run_view(args: &ViewArgs, config: EngineConfig) -> Result<(), CliError> {
    let projection = build_projection(args, config).await?;
    let now_ms = atrium_core::now_ms();

    if args.json {
        let report = build_report(args, &projection, now_ms);
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let (section, records) = select_records(args, &projection);
    if records.is_empty() {
        println!("No records found.");
        return Ok(());
    }
    let shown = records.len();
    for line in format_record_lines(records, now_ms) {
        println!("{line}");
    }
    if section == ViewSection::Active && projection.has_more && !args.all {
        println!(
            "Showing {shown} of {} records (pass --all to see everything)",
            projection.total_count
        );
    }

    Ok(())
}
