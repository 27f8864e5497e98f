//! Engine tuning configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::compact_text;

const DEFAULT_PAGE_SIZE: usize = 20;
const DEFAULT_LOAD_MORE_DELAY_MS: u64 = 150;
const DEFAULT_PREFERENCE_SAVE_DEBOUNCE_MS: u64 = 500;
const DEFAULT_MIN_SEARCH_CHARS: usize = 2;

/// Knobs for pagination, search and preference persistence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Unpinned records shown per batch
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Artificial delay before `load_more` grows the window
    #[serde(default = "default_load_more_delay_ms")]
    pub load_more_delay_ms: u64,
    #[serde(default = "default_preference_save_debounce_ms")]
    pub preference_save_debounce_ms: u64,
    /// Shortest trimmed query that filters by text
    #[serde(default = "default_min_search_chars")]
    pub min_search_chars: usize,
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

const fn default_load_more_delay_ms() -> u64 {
    DEFAULT_LOAD_MORE_DELAY_MS
}

const fn default_preference_save_debounce_ms() -> u64 {
    DEFAULT_PREFERENCE_SAVE_DEBOUNCE_MS
}

const fn default_min_search_chars() -> usize {
    DEFAULT_MIN_SEARCH_CHARS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_delay_ms: DEFAULT_LOAD_MORE_DELAY_MS,
            preference_save_debounce_ms: DEFAULT_PREFERENCE_SAVE_DEBOUNCE_MS,
            min_search_chars: DEFAULT_MIN_SEARCH_CHARS,
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub const fn load_more_delay(&self) -> Duration {
        Duration::from_millis(self.load_more_delay_ms)
    }

    #[must_use]
    pub const fn preference_save_debounce(&self) -> Duration {
        Duration::from_millis(self.preference_save_debounce_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be greater than zero".to_string()));
        }
        if self.min_search_chars == 0 {
            return Err(Error::Config(
                "min_search_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate an engine config from a JSON payload.
pub fn parse_engine_config(payload: &str) -> Result<EngineConfig> {
    let config: EngineConfig = serde_json::from_str(payload).map_err(|error| {
        Error::Config(format!(
            "invalid engine config JSON ({error}): {}",
            compact_text(payload)
        ))
    })?;
    config.validate()?;
    Ok(config)
}

/// Read an engine config file; a missing path yields the defaults.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let payload = std::fs::read_to_string(path)?;
    parse_engine_config(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config = parse_engine_config("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.page_size, 20);
        assert_eq!(config.preference_save_debounce(), Duration::from_millis(500));
        assert_eq!(config.load_more_delay(), Duration::from_millis(150));
    }

    #[test]
    fn partial_config_overrides_given_fields() {
        let config = parse_engine_config(r#"{"page_size": 5, "min_search_chars": 3}"#).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.min_search_chars, 3);
        assert_eq!(config.load_more_delay_ms, 150);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let error = parse_engine_config(r#"{"page_sise": 5}"#).unwrap_err();
        assert!(matches!(error, Error::Config(message) if message.contains("page_sise")));
    }

    #[test]
    fn zero_values_fail_validation() {
        assert!(matches!(
            parse_engine_config(r#"{"page_size": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_engine_config(r#"{"min_search_chars": 0}"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn load_engine_config_reads_file_or_defaults() {
        assert_eq!(load_engine_config(None).unwrap(), EngineConfig::default());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"load_more_delay_ms": 0}}"#).unwrap();
        let config = load_engine_config(Some(file.path())).unwrap();
        assert_eq!(config.load_more_delay_ms, 0);

        let missing = load_engine_config(Some(Path::new("/definitely/not/here.json")));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
