//! Data models for Atrium

mod attachment;
mod checklist;
mod filter;
mod record;
mod space;

pub use attachment::{
    Attachment, AttachmentId, AttachmentLocation, AttachmentRef, LocalFile, PreviewHandle,
};
pub use checklist::{ChecklistItem, ChecklistItemId, MAX_INDENT};
pub use filter::{DateField, DateRange, SortConfig, SortDirection, SortField, StructuredFilter};
pub use record::{
    priority_rank, NewRecord, Priority, Record, RecordId, RecordKind, RecordPatch, UserId,
    DEFAULT_COLOR,
};
pub use space::{SpaceId, SpaceScope, PERSONAL_SPACE};
