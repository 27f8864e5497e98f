//! atrium-core - Core library for Atrium
//!
//! Record models, the checklist hierarchy engine, and the reactive store that
//! aggregates owned, shared and space subscriptions with optimistic writes
//! into one filtered, sorted and paginated projection.

pub mod backend;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod models;
pub mod overlay;
pub mod prefs;
pub mod projection;
pub mod sources;
pub mod store;
mod util;

pub use backend::{InMemoryBackend, RecordBackend, Subscription};
pub use config::{parse_engine_config, EngineConfig};
pub use error::{Error, Result};
pub use models::{ChecklistItem, NewRecord, Record, RecordId, RecordPatch, SpaceScope, UserId};
pub use prefs::{MemoryPreferenceStore, PreferenceStore, Preferences, SqlitePreferenceStore};
pub use projection::Projection;
pub use store::RecordStore;
pub use util::now_ms;
