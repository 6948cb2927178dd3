//! DocumentService against the real filesystem

use std::cell::Cell;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use tempfile::TempDir;

use mindtree::application::services::{DocumentService, DocumentStats};
use mindtree::application::{ApplicationError, TreeManager};
use mindtree::config::{Settings, ViewConfig};
use mindtree::domain::{DocumentTree, ViewOptions};
use mindtree::infrastructure::traits::RealFileSystem;

fn service_with(settings: Settings) -> DocumentService {
    DocumentService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

fn service() -> DocumentService {
    service_with(Settings::default())
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

#[test]
fn given_new_path_when_creating_then_writes_single_root_document() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("nested/dir/map.json");

    // Act
    let document = service().create(&path, None, false).unwrap();

    // Assert
    assert!(path.exists());
    assert_eq!(document.node_count(), 1);
    let reloaded = service().load(&path).unwrap();
    assert_eq!(reloaded, document);
    assert_eq!(reloaded.to_record().name, "root");
    assert!(reloaded.to_record().id.is_some());
}

#[test]
fn given_existing_file_when_creating_without_force_then_refuses() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    write(&path, r#"{"name":"keep me"}"#);

    // Act
    let result = service().create(&path, Some("Fresh"), false);

    // Assert
    assert!(matches!(result, Err(ApplicationError::DocumentExists(_))));
    assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"name":"keep me"}"#);
}

#[test]
fn given_existing_file_when_creating_with_force_then_overwrites() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    write(&path, r#"{"name":"old"}"#);

    service().create(&path, Some("Fresh"), true).unwrap();

    assert_eq!(service().load(&path).unwrap().to_record().name, "Fresh");
}

#[test]
fn given_unsaved_nodes_when_saving_then_each_gets_a_unique_uuid() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    let mut document = DocumentTree::from_json(
        r#"{"name":"Root","id":"keep","children":[{"name":"A"},{"name":"B"}]}"#,
    )
    .unwrap();

    // Act
    let assigned = service().save(&path, &mut document).unwrap();

    // Assert
    assert_eq!(assigned, 2);
    let reloaded = service().load(&path).unwrap();
    let ids: Vec<String> = reloaded.iter().filter_map(|(_, n)| n.id.clone()).collect();
    assert_eq!(ids.len(), 3);
    assert_eq!(ids[0], "keep");
    assert_ne!(ids[1], ids[2]);
    assert!(ids[1..].iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    assert_eq!(DocumentStats::of(&reloaded).unsaved, 0);
}

#[test]
fn given_compact_store_setting_when_saving_then_json_is_single_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    let mut settings = Settings::default();
    settings.store.pretty = false;
    let mut document = DocumentTree::from_json(r#"{"name":"Root","children":[{"name":"A"}]}"#)
        .unwrap();

    service_with(settings).save(&path, &mut document).unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written.lines().count(), 1);
    assert!(!temp.path().join("map.json.tmp").exists());
}

#[test]
fn given_malformed_file_when_loading_then_invalid_document_with_path() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    write(&path, r#"{"name":"Root","children":"nope"}"#);

    // Act
    let result = service().load(&path);

    // Assert
    match result {
        Err(ApplicationError::InvalidDocument { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected InvalidDocument, got {other:?}"),
    }
}

#[test]
fn given_document_when_opening_session_then_configured_view_options_apply() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    write(
        &path,
        r#"{"name":"Root","children":[{"name":"A","children":[{"name":"A1"}]}]}"#,
    );
    let settings = Settings::default();

    // Act
    let session = service_with(settings.clone()).open(&path).unwrap();

    // Assert
    assert_eq!(session.options(), &settings.view_options());
    let a = session.find_by_name(session.root(), "A").unwrap();
    assert!(session.hierarchy().is_collapsed(a));
}

#[test]
fn given_edited_session_when_saved_then_session_keeps_working_with_ids() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    let service = service();
    service.create(&path, Some("Root"), false).unwrap();
    let mut session = service.open(&path).unwrap();
    let idea = session.add_child(session.root(), "Idea", "").unwrap();

    // Act
    let assigned = service.save_session(&path, &mut session).unwrap();

    // Assert
    assert_eq!(assigned, 1);
    let id = session.document_node(idea).unwrap().id.clone().unwrap();
    assert_eq!(session.find_by_id(session.root(), &id), Some(idea));
    assert_eq!(service.load(&path).unwrap(), *session.document());
    assert_eq!(session.options(), &Settings::default().view_options());
    assert_ne!(session.options(), &ViewOptions::default());
}

#[test]
fn given_collapsed_node_and_callback_when_session_saved_then_view_state_survives() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("map.json");
    write(
        &path,
        r#"{"name":"Root","children":[{"name":"A","children":[{"name":"A1"}]},{"name":"B"}]}"#,
    );
    let service = service_with(Settings {
        view: ViewConfig {
            expand_depth: None,
            ..ViewConfig::default()
        },
        ..Settings::default()
    });
    let mut session = service.open(&path).unwrap();
    let a = session.find_by_name(session.root(), "A").unwrap();
    session.collapse(a);
    let tracking = session.tracking_id(a).unwrap();
    let notified = Rc::new(Cell::new(0));
    let counter = Rc::clone(&notified);
    session.set_update_callback(move |_| counter.set(counter.get() + 1));

    // Act
    service.save_session(&path, &mut session).unwrap();

    // Assert
    assert!(session.hierarchy().is_collapsed(a), "handle and collapse state kept");
    assert_eq!(session.tracking_id(a), Some(tracking));
    assert!(session.toggle(a));
    assert_eq!(notified.get(), 1, "callback still installed");
}

#[test]
fn given_unwritable_path_when_saving_session_then_error_and_session_stays_usable() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    write(&blocker, "plain file");
    let bad_path = blocker.join("map.json");
    let mut session = TreeManager::new(DocumentTree::new("Root", ""), ViewOptions::default());
    session.add_child(session.root(), "Idea", "");

    // Act
    let result = service().save_session(&bad_path, &mut session);

    // Assert
    assert!(matches!(result, Err(ApplicationError::OperationFailed { .. })));
    assert!(session.add_child(session.root(), "Another", "").is_some());
    let good_path = temp.path().join("map.json");
    service().save_session(&good_path, &mut session).unwrap();
    assert_eq!(service().load(&good_path).unwrap().node_count(), 3);
}

#[test]
fn given_default_document_setting_when_resolving_without_path_then_uses_data_dir() {
    let settings = Settings {
        data_dir: "/maps".into(),
        default_document: Some("main.json".into()),
        ..Settings::default()
    };

    let path = service_with(settings).resolve_path(None).unwrap();

    assert_eq!(path, Path::new("/maps/main.json"));
}

#[test]
fn given_no_default_document_when_resolving_without_path_then_config_error() {
    let settings = Settings {
        default_document: None,
        ..Settings::default()
    };

    let result = service_with(settings).resolve_path(None);

    assert!(matches!(result, Err(ApplicationError::Config { .. })));
}
