//! Command dispatch
//!
//! Every command loads the document into an editing session, runs one
//! operation through the tree manager and, if the document changed,
//! saves it back.

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::services::DocumentStats;
use crate::application::{ApplicationError, TreeManager};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DocumentTree, NodeKey, PresentationKey};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::tree_traits::{HierarchyView, TreeNodeConvert};

/// Run the parsed command line against the wired services.
pub fn execute(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see `mindtree --help`".into(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "mindtree", &mut io::stdout());
            Ok(())
        }
        Commands::Config { command } => config_command(command, cli, container),
        command => {
            let path = container.documents().resolve_path(cli.file.as_deref())?;
            document_command(command, &path, container)
        }
    }
}

#[instrument(level = "debug", skip(container))]
fn document_command(
    command: &Commands,
    path: &Path,
    container: &ServiceContainer,
) -> CliResult<()> {
    let documents = container.documents();

    match command {
        Commands::Init { root, force } => {
            let document = documents.create(path, root.as_deref(), *force)?;
            output::action("Created", &path.display());
            output::detail(&format!("root: {}", document.to_record().name));
            Ok(())
        }
        Commands::Show { all, json } => {
            let mut session = documents.open(path)?;
            if *json {
                output::info(&session.document().to_json_pretty()?);
                return Ok(());
            }
            if *all {
                let root = session.root();
                for key in session.all_nodes(root) {
                    session.expand(key);
                }
            }
            let view = HierarchyView::new(session.hierarchy(), session.document());
            output::info(&view.to_tree_string());
            Ok(())
        }
        Commands::Add { parent, name, body } => {
            let mut session = documents.open(path)?;
            let parent_key = select(&session, parent)?;
            let added = session
                .add_child(parent_key, name.as_str(), body.as_deref().unwrap_or_default())
                .ok_or_else(|| rejected(format!("cannot add '{name}' under '{parent}'")))?;
            debug!(%added, "node added");
            save(container, path, &mut session)?;
            output::action("Added", &format!("{name} under {parent}"));
            Ok(())
        }
        Commands::Delete { node } => {
            let mut session = documents.open(path)?;
            let key = select(&session, node)?;
            if !session.delete_node(key) {
                return Err(rejected(format!("cannot delete '{node}' (the root stays)")));
            }
            save(container, path, &mut session)?;
            output::action("Deleted", node);
            Ok(())
        }
        Commands::Move { node, new_parent } => {
            let mut session = documents.open(path)?;
            let key = select(&session, node)?;
            let target = select(&session, new_parent)?;
            if !session.move_node(key, target) {
                return Err(rejected(format!(
                    "cannot move '{node}' under '{new_parent}'"
                )));
            }
            save(container, path, &mut session)?;
            output::action("Moved", &format!("{node} under {new_parent}"));
            Ok(())
        }
        Commands::Edit {
            node,
            name,
            body,
            interactive,
        } => {
            let mut session = documents.open(path)?;
            let key = select(&session, node)?;
            let body = if *interactive {
                let current = session.body(key).unwrap_or_default().to_string();
                Some(container.body_editor().edit(&current)?)
            } else {
                body.clone()
            };
            if name.is_none() && body.is_none() {
                return Err(CliError::InvalidArgs(
                    "nothing to change, give --name, --body or --interactive".into(),
                ));
            }
            apply_edit(&mut session, key, name.as_deref(), body)?;
            save(container, path, &mut session)?;
            output::action("Edited", node);
            Ok(())
        }
        Commands::Find { name } => {
            let document = documents.load(path)?;
            let matches = document.find_all_by_name(name);
            if matches.is_empty() {
                output::warning(&format!("no node named '{name}'"));
                return Ok(());
            }
            for key in matches {
                print_match(&document, key);
            }
            Ok(())
        }
        Commands::Stats => {
            let stats = DocumentStats::of(&documents.load(path)?);
            output::header(&path.display());
            output::detail(&format!("nodes:     {}", stats.nodes));
            output::detail(&format!("max depth: {}", stats.max_depth));
            output::detail(&format!("leaves:    {}", stats.leaves));
            output::detail(&format!("unsaved:   {}", stats.unsaved));
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn config_command(
    command: &ConfigCommands,
    cli: &Cli,
    container: &ServiceContainer,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => print_config_path("global", &path),
                None => output::detail("global: <no config directory>"),
            }
            print_config_path("local", &local_config_path(&document_dir(cli)));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if *global {
                global_config_path().ok_or_else(|| ApplicationError::Config {
                    message: "cannot determine the global config directory".into(),
                })?
            } else {
                local_config_path(&document_dir(cli))
            };
            if container.fs.exists(&path) {
                return Err(ApplicationError::Config {
                    message: format!("config file already exists: {}", path.display()),
                }
                .into());
            }
            container
                .fs
                .ensure_parent(&path)
                .and_then(|_| container.fs.write(&path, &Settings::template()))
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}

/// Directory holding the document given on the command line (or cwd).
fn document_dir(cli: &Cli) -> PathBuf {
    cli.file
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_config_path(label: &str, path: &Path) {
    let marker = if path.exists() { "" } else { " (not found)" };
    output::detail(&format!("{label}: {}{marker}", path.display()));
}

/// Resolve a node selector: persisted id first, then name.
fn select(session: &TreeManager, selector: &str) -> CliResult<PresentationKey> {
    let root = session.root();
    session
        .find_by_id(root, selector)
        .or_else(|| session.find_by_name(root, selector))
        .ok_or_else(|| ApplicationError::NodeNotFound(selector.to_string()).into())
}

fn rejected(message: String) -> CliError {
    ApplicationError::Rejected(message).into()
}

/// Apply name and body changes in place; the key survives both.
fn apply_edit(
    session: &mut TreeManager,
    key: PresentationKey,
    name: Option<&str>,
    body: Option<String>,
) -> CliResult<()> {
    if let Some(body) = body {
        if !session.set_body(key, body) {
            return Err(rejected(format!("cannot set the body of node {key}")));
        }
    }
    if let Some(name) = name {
        if !session.rename(key, name) {
            return Err(rejected(format!("cannot rename node {key} to '{name}'")));
        }
    }
    Ok(())
}

fn save(container: &ServiceContainer, path: &Path, session: &mut TreeManager) -> CliResult<()> {
    let assigned = container.documents().save_session(path, session)?;
    if assigned > 0 {
        debug!(assigned, "assigned ids to new nodes");
    }
    Ok(())
}

fn print_match(document: &DocumentTree, key: NodeKey) {
    let Some(node) = document.get(key) else {
        return;
    };
    let trail = document
        .path_to(key)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|k| document.get(k).map(|n| n.name.as_str()))
        .join(" / ");
    output::success(&trail);
    if let Some(id) = &node.id {
        output::detail(&format!("id:   {id}"));
    }
    if !node.body.is_empty() {
        output::detail(&format!("body: {}", node.body));
    }
}
