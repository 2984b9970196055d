//! Manager configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! use_builtin_table = true
//! tables = ["maps/wheels.toml"]
//! fallback = "generic"
//! max_reports_per_tick = 32
//! queue_capacity = 1024
//!
//! [[extra.entry]]
//! usage_page = 0x01
//! usage = 0x04
//! ```
//!
//! Table precedence when matching (first hit wins): `extra`, then `tables` in
//! reverse order, then the built-in table.

use crate::error::Result;
use crate::usage_map::UsageMapTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do with a device no table entry recognizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Log and skip it.
    #[default]
    Ignore,
    /// Bind it to a generic descriptor (buttons, desktop axes, hat).
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Start from the built-in table.
    pub use_builtin_table: bool,
    /// Extra TOML usage map tables, merged in order.
    pub tables: Vec<PathBuf>,
    /// Inline table, merged last.
    pub extra: UsageMapTable,
    pub fallback: FallbackPolicy,
    /// Upper bound on reports drained from one hidapi device per poll.
    pub max_reports_per_tick: usize,
    /// Events kept in the manager queue before the oldest are dropped.
    pub queue_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            use_builtin_table: true,
            tables: Vec::new(),
            extra: UsageMapTable::default(),
            fallback: FallbackPolicy::Ignore,
            max_reports_per_tick: 32,
            queue_capacity: 1024,
        }
    }
}

impl ManagerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ManagerConfig = toml::from_str(text)?;
        config.extra.validate()?;
        Ok(config)
    }

    /// Load from a file. Relative table paths are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        if let Some(dir) = path.parent() {
            for table in &mut config.tables {
                if table.is_relative() {
                    let joined = dir.join(&*table);
                    *table = joined;
                }
            }
        }
        Ok(config)
    }

    /// Assemble the effective usage map table.
    pub fn build_table(&self) -> Result<UsageMapTable> {
        let mut table = if self.use_builtin_table {
            UsageMapTable::builtin().clone()
        } else {
            UsageMapTable::default()
        };
        for path in &self.tables {
            let loaded = UsageMapTable::load(path)?;
            tracing::debug!(path = %path.display(), entries = loaded.len(), "usage map loaded");
            table.merge(loaded);
        }
        table.merge(self.extra.clone());
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_config_is_default() {
        let config = ManagerConfig::from_toml_str("").expect("parse");
        assert_eq!(config, ManagerConfig::default());
    }

    #[test]
    fn inline_table_overrides_builtin() {
        let config = ManagerConfig::from_toml_str(
            r#"
            fallback = "generic"

            [[extra.entry]]
            usage_page = 1
            usage = 5

            [[extra.entry.device]]
            vendor_id = 0x046d
            product_id = 0xc218
            name = "Relabelled Pad"
            "#,
        )
        .expect("parse");
        assert_eq!(config.fallback, FallbackPolicy::Generic);

        let table = config.build_table().expect("table");
        let desc = table
            .find_descriptor(1, 5, 0x046d, 0xc218)
            .expect("descriptor");
        assert_eq!(desc.name.as_deref(), Some("Relabelled Pad"));
        assert!(!desc.force_feedback);
    }

    #[test]
    fn without_builtin_only_extra_remains() {
        let config = ManagerConfig {
            use_builtin_table: false,
            ..Default::default()
        };
        assert!(config.build_table().expect("table").is_empty());
    }

    #[test]
    fn missing_table_file_is_io_error() {
        let config = ManagerConfig {
            tables: vec![PathBuf::from("/nonexistent/feelhid-table.toml")],
            ..Default::default()
        };
        assert!(matches!(config.build_table(), Err(Error::Io(_))));
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(
            ManagerConfig::from_toml_str("fallback = 3"),
            Err(Error::Config(_))
        ));
    }
}
