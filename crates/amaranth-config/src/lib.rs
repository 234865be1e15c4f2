use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Which overlay extraction path the editor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreviewStrategy {
    /// Synchronous per-line scanning (default).
    #[default]
    LineScan,
    /// Debounced tree-sitter mark extraction.
    Tree,
}

/// Editor tunables for the live-preview engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub preview_strategy: PreviewStrategy,
    /// Quiet window before a debounced reparse fires, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            preview_strategy: PreviewStrategy::default(),
            debounce_ms: 100,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub notes_path: PathBuf,
    #[serde(default)]
    pub editor: EditorConfig,
}

impl Config {
    /// Load from an explicit path. A missing file is not an error: the
    /// caller falls back to defaults on `Ok(None)`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // Tilde and shell variables in the configured notes path expand at
        // load time; an unexpandable path is left as written.
        if let Some(expanded) = expand(&config.notes_path) {
            config.notes_path = expanded;
        }

        Ok(Some(config))
    }

    /// Load from the default location (`~/.config/amaranth/config.toml`).
    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn config_path() -> PathBuf {
        let dir = shellexpand::tilde("~/.config/amaranth");
        PathBuf::from(dir.as_ref()).join("config.toml")
    }
}

fn expand(path: &Path) -> Option<PathBuf> {
    let raw = path.to_string_lossy();
    shellexpand::full(&raw)
        .ok()
        .map(|expanded| PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_location_is_under_dot_config() {
        let path = Config::config_path();
        let raw = path.to_string_lossy();
        assert!(!raw.starts_with('~'));
        assert!(raw.ends_with(".config/amaranth/config.toml"));
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from_path(dir.path().join("absent.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn file_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(
            &file,
            "notes_path = \"/tmp/notes\"\n\n[editor]\npreview_strategy = \"tree\"\ndebounce_ms = 250\n",
        )
        .unwrap();

        let config = Config::load_from_path(&file).unwrap().unwrap();
        assert_eq!(config.notes_path, PathBuf::from("/tmp/notes"));
        assert_eq!(config.editor.preview_strategy, PreviewStrategy::Tree);
        assert_eq!(config.editor.debounce_ms, 250);
    }

    #[test]
    fn editor_section_defaults_when_absent() {
        let config: Config = toml::from_str(r#"notes_path = "/tmp/n""#).unwrap();
        assert_eq!(config.editor, EditorConfig::default());
        assert_eq!(config.editor.debounce_ms, 100);
    }

    #[test]
    fn preview_strategy_parses_kebab_value() {
        let config: Config = toml::from_str(
            r#"
notes_path = "/tmp/n"

[editor]
preview_strategy = "line-scan"
"#,
        )
        .unwrap();
        assert_eq!(config.editor.preview_strategy, PreviewStrategy::LineScan);
    }

    #[test]
    fn tilde_notes_path_expands_on_load() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "notes_path = \"~/test/notes\"\n").unwrap();

        let config = Config::load_from_path(&file).unwrap().unwrap();
        let raw = config.notes_path.to_string_lossy();
        assert!(!raw.starts_with('~'));
        assert!(raw.ends_with("test/notes"));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("config.toml");
        std::fs::write(&file, "notes_path = [not toml").unwrap();

        let err = Config::load_from_path(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
