//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/mindtree/mindtree.toml`
//! 3. Local config: `<document_dir>/.mindtree.toml`
//! 4. Environment variables: `MINDTREE_*` prefix, `__` between sections

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{Point, ViewOptions};

/// Initial view state for freshly loaded documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Nodes at this depth or deeper start collapsed; absent expands all
    pub expand_depth: Option<usize>,
    pub root_x: f64,
    pub root_y: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            expand_depth: Some(1),
            root_x: 240.0,
            root_y: 0.0,
        }
    }
}

/// How documents are written back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Give unsaved nodes a persisted id on save
    pub assign_ids: bool,
    /// Indent the written JSON
    pub pretty: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            assign_ids: true,
            pretty: true,
        }
    }
}

/// Raw view config for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawViewConfig {
    pub expand_depth: Option<usize>,
    pub expand_all: Option<bool>,
    pub root_x: Option<f64>,
    pub root_y: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawStoreConfig {
    pub assign_ids: Option<bool>,
    pub pretty: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub default_document: Option<PathBuf>,
    pub editor: Option<String>,
    pub view: RawViewConfig,
    pub store: RawStoreConfig,
}

/// Unified configuration for mindtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Directory relative document paths are resolved against
    pub data_dir: PathBuf,
    /// Document used when a command is given no file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_document: Option<PathBuf>,
    /// Editor command (default: $EDITOR or "vi")
    pub editor: String,
    pub view: ViewConfig,
    pub store: StoreConfig,
}

impl Default for Settings {
    fn default() -> Self {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".into());

        Self {
            data_dir: default_data_dir(),
            default_document: None,
            editor,
            view: ViewConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Get the default data directory (~/.mindtree).
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".mindtree"))
        .unwrap_or_else(|| PathBuf::from("~/.mindtree"))
}

/// Get the XDG config directory for mindtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mindtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("mindtree.toml"))
}

/// Get the path to the local config file next to a document.
pub fn local_config_path(document_dir: &Path) -> PathBuf {
    document_dir.join(".mindtree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// View options for building a presentation hierarchy.
    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            expand_depth: self.view.expand_depth,
            root_anchor: Point::new(self.view.root_x, self.view.root_y),
        }
    }

    /// Resolve a document path: explicit argument first, then
    /// `default_document`. Relative paths land under `data_dir`.
    pub fn resolve_document(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| self.default_document.clone())?;
        if path.is_absolute() || explicit.is_some() {
            Some(path)
        } else {
            Some(self.data_dir.join(path))
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.data_dir = PathBuf::from(expand_env_vars(&self.data_dir.to_string_lossy()));
        if let Some(doc) = &self.default_document {
            self.default_document = Some(PathBuf::from(expand_env_vars(&doc.to_string_lossy())));
        }
        self.editor = expand_env_vars(&self.editor);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let expand_depth = match overlay.view.expand_all {
            Some(true) => None,
            _ => overlay.view.expand_depth.or(self.view.expand_depth),
        };
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            default_document: overlay
                .default_document
                .clone()
                .or_else(|| self.default_document.clone()),
            editor: overlay
                .editor
                .clone()
                .unwrap_or_else(|| self.editor.clone()),
            view: ViewConfig {
                expand_depth,
                root_x: overlay.view.root_x.unwrap_or(self.view.root_x),
                root_y: overlay.view.root_y.unwrap_or(self.view.root_y),
            },
            store: StoreConfig {
                assign_ids: overlay.store.assign_ids.unwrap_or(self.store.assign_ids),
                pretty: overlay.store.pretty.unwrap_or(self.store.pretty),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// `document_dir` is the directory of the document being worked on;
    /// its `.mindtree.toml`, if any, is the local layer.
    pub fn load(document_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = document_dir {
            current = current.with_local_layer(dir)?;
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Merge `<dir>/.mindtree.toml` onto self if the file exists.
    pub fn with_local_layer(self, dir: &Path) -> Result<Self, ApplicationError> {
        let local_path = local_config_path(dir);
        if !local_path.exists() {
            return Ok(self);
        }
        let raw = load_raw_settings(&local_path)?;
        Ok(self.merge_with(&raw))
    }

    /// Apply MINDTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("MINDTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("default_document") {
            settings.default_document = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("editor") {
            settings.editor = val;
        }
        if let Ok(val) = config.get::<usize>("view.expand_depth") {
            settings.view.expand_depth = Some(val);
        }
        if let Ok(true) = config.get_bool("view.expand_all") {
            settings.view.expand_depth = None;
        }
        if let Ok(val) = config.get_float("view.root_x") {
            settings.view.root_x = val;
        }
        if let Ok(val) = config.get_float("view.root_y") {
            settings.view.root_y = val;
        }
        if let Ok(val) = config.get_bool("store.assign_ids") {
            settings.store.assign_ids = val;
        }
        if let Ok(val) = config.get_bool("store.pretty") {
            settings.store.pretty = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# mindtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/mindtree/mindtree.toml
#   Local:  <document_dir>/.mindtree.toml
#   Env:    MINDTREE_* environment variables, e.g. MINDTREE_VIEW__EXPAND_DEPTH=2

# Relative document paths are resolved against this directory
# data_dir = "~/.mindtree"

# Document used when no file argument is given
# default_document = "notes.json"

# Editor for node bodies (edit --interactive)
# editor = "vi"

[view]
# Nodes at this depth or deeper start collapsed (1 = only the root's children shown)
# expand_depth = 1
# expand_all = false

# Anchor the root is laid out from
# root_x = 240.0
# root_y = 0.0

[store]
# Give unsaved nodes a UUID on save
# assign_ids = true

# Indent written JSON
# pretty = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
