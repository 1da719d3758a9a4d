//! Shared configuration loader for the dothtml editor tooling.
//!
//! `defaults/dothtml.default.toml` is embedded into every binary so that docs
//! and runtime behavior stay in sync. Applications layer user-specific files
//! on top of those defaults via [`Loader`] before deserializing into
//! [`DotHtmlConfig`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/dothtml.default.toml");

/// Top-level configuration consumed by dothtml applications.
#[derive(Debug, Clone, Deserialize)]
pub struct DotHtmlConfig {
    pub completion: CompletionConfig,
    pub metadata: MetadataConfig,
}

/// Knobs for the completion engine.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Insert required properties with binding placeholders when completing
    /// a control tag.
    pub auto_required_properties: bool,
    /// Bytes of lookahead used to decide whether a binding already has its
    /// closing delimiter.
    pub close_binding_lookahead: usize,
}

/// Where control metadata snapshots come from.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataConfig {
    /// Snapshot files loaded at startup, in priority order.
    pub snapshot_paths: Vec<String>,
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<DotHtmlConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<DotHtmlConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn loads_default_config() {
        let config = load_defaults().expect("defaults to deserialize");
        assert!(config.completion.auto_required_properties);
        assert_eq!(config.completion.close_binding_lookahead, 2);
        assert!(config.metadata.snapshot_paths.is_empty());
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("completion.auto_required_properties", false)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert!(!config.completion.auto_required_properties);
    }

    #[test]
    fn user_files_layer_over_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[metadata]\nsnapshot_paths = [\"project-metadata.json\"]"
        )
        .expect("write config");

        let config = Loader::new()
            .with_file(file.path())
            .build()
            .expect("config to build");
        assert_eq!(config.metadata.snapshot_paths, vec!["project-metadata.json"]);
        // untouched sections keep their defaults
        assert_eq!(config.completion.close_binding_lookahead, 2);
    }

    #[test]
    fn missing_optional_files_are_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/dothtml.toml")
            .build()
            .expect("config to build");
        assert!(config.completion.auto_required_properties);
    }
}
