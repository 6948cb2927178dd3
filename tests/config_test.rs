//! Integration tests for Settings config loading.
//!
//! Layers: defaults -> global -> local `.mindtree.toml` -> `MINDTREE_*` env.
//! These tests run without a global config (temp directories only),
//! so they effectively test the local layer on top of defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use mindtree::config::{local_config_path, Settings};
use mindtree::domain::Point;

#[test]
fn given_local_config_with_view_section_when_load_then_overrides_view() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let local = r#"
[view]
expand_depth = 3
root_x = 10.5
"#;
    fs::write(dir.path().join(".mindtree.toml"), local).unwrap();

    // Act
    let settings = Settings::load(Some(dir.path())).expect("load settings");

    // Assert
    assert_eq!(settings.view.expand_depth, Some(3));
    assert_eq!(settings.view.root_x, 10.5);
    assert_eq!(settings.view.root_y, 0.0, "unspecified field keeps default");
    assert_eq!(settings.view_options().root_anchor, Point::new(10.5, 0.0));
}

#[test]
fn given_local_config_with_store_section_when_layered_then_overrides_only_given_keys() {
    // Arrange
    let dir = TempDir::new().unwrap();
    fs::write(
        local_config_path(dir.path()),
        "[store]\nassign_ids = false\n",
    )
    .unwrap();

    // Act
    let settings = Settings::default()
        .with_local_layer(dir.path())
        .expect("local layer");

    // Assert
    assert!(!settings.store.assign_ids);
    assert!(settings.store.pretty);
}

#[test]
fn given_local_config_with_scalars_when_layered_then_overrides_scalars() {
    let dir = TempDir::new().unwrap();
    let local = r#"
data_dir = "/srv/maps"
default_document = "team.json"
editor = "nano"
"#;
    fs::write(local_config_path(dir.path()), local).unwrap();

    let settings = Settings::default().with_local_layer(dir.path()).unwrap();

    assert_eq!(settings.data_dir, PathBuf::from("/srv/maps"));
    assert_eq!(settings.editor, "nano");
    assert_eq!(
        settings.resolve_document(None),
        Some(PathBuf::from("/srv/maps/team.json"))
    );
}

#[test]
fn given_expand_all_in_local_config_when_layered_then_no_depth_limit() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[view]\nexpand_all = true\n").unwrap();

    let settings = Settings::default().with_local_layer(dir.path()).unwrap();

    assert_eq!(settings.view_options().expand_depth, None);
}

#[test]
fn given_no_local_config_when_layered_then_settings_unchanged() {
    let dir = TempDir::new().unwrap();
    let defaults = Settings::default();

    let settings = defaults.clone().with_local_layer(dir.path()).unwrap();

    assert_eq!(settings, defaults);
}

#[test]
fn given_invalid_local_config_when_load_then_config_error() {
    let dir = TempDir::new().unwrap();
    fs::write(local_config_path(dir.path()), "[view\nexpand_depth = ").unwrap();

    let result = Settings::load(Some(dir.path()));

    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains(".mindtree.toml"));
}

#[test]
fn given_settings_when_rendered_as_toml_then_parses_back() {
    let settings = Settings::default();

    let rendered = settings.to_toml().unwrap();
    let parsed: Settings = toml::from_str(&rendered).unwrap();

    assert_eq!(parsed, settings);
}
