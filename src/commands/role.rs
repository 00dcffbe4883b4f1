//! Role management commands

use chrono::{DateTime, Local};
use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::cli::{OutputFormat, RoleAction};
use crate::config::Config;
use crate::interact::{self, Confirm, Fixed, StdinConfirm};
use crate::role::store::{Outcome, RoleEntry, RoleStore};

pub fn run(action: RoleAction, config: &Config) -> Result<()> {
    let store = RoleStore::new(config.roles_dir());
    match action {
        RoleAction::List { format } => list(&store, OutputFormat::resolve(format)),
        RoleAction::Show { name } => show(&store, &name),
        RoleAction::Create {
            name,
            description,
            expecting,
            force,
        } => create(&store, &name, description, expecting, force),
        RoleAction::Delete { name, force } => delete(&store, &name, force),
    }
}

/// Serializable role listing for JSON/YAML output
#[derive(Serialize)]
struct RoleInfo {
    name: String,
    path: String,
    modified: String,
}

impl From<&RoleEntry> for RoleInfo {
    fn from(entry: &RoleEntry) -> Self {
        Self {
            name: entry.name.clone(),
            path: entry.path.display().to_string(),
            modified: DateTime::<Local>::from(entry.modified).to_rfc3339(),
        }
    }
}

fn list(store: &RoleStore, format: OutputFormat) -> Result<()> {
    let entries = store.list()?;

    match format {
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No roles found in {}", store.dir().display());
                return Ok(());
            }
            for entry in &entries {
                let modified = DateTime::<Local>::from(entry.modified).format("%Y-%m-%d %H:%M");
                println!(
                    "{:<16} {} {}",
                    entry.name.cyan(),
                    modified.to_string().dimmed(),
                    entry.path.display()
                );
            }
        }
        OutputFormat::Json => {
            let infos: Vec<RoleInfo> = entries.iter().map(RoleInfo::from).collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        OutputFormat::Yaml => {
            let infos: Vec<RoleInfo> = entries.iter().map(RoleInfo::from).collect();
            println!("{}", serde_yaml::to_string(&infos)?);
        }
    }

    Ok(())
}

fn show(store: &RoleStore, name: &str) -> Result<()> {
    let role = store.get(name)?;
    println!("{}", role.role);
    Ok(())
}

fn create(
    store: &RoleStore,
    name: &str,
    description: Option<String>,
    expecting: Option<String>,
    force: bool,
) -> Result<()> {
    let description = match description {
        Some(text) => text,
        None => interact::ask("Enter role description: ")?,
    };
    let expecting = match expecting {
        Some(label) => label,
        None => interact::ask("Enter expecting result, e.g. answer, code, shell command, command description: ")?,
    };
    if expecting.is_empty() {
        eyre::bail!("An expecting label is required");
    }

    let mut confirm = confirmer(force);
    match store.create(name, &description, &expecting, confirm.as_mut())? {
        Outcome::Done => println!("{} Saved role {}", "✓".green(), name.cyan()),
        Outcome::Declined => println!("Cancelled."),
    }
    Ok(())
}

fn delete(store: &RoleStore, name: &str, force: bool) -> Result<()> {
    let mut confirm = confirmer(force);
    match store.delete(name, confirm.as_mut())? {
        Outcome::Done => println!("{} Deleted role {}", "✓".green(), name.cyan()),
        Outcome::Declined => println!("Cancelled."),
    }
    Ok(())
}

pub(crate) fn confirmer(force: bool) -> Box<dyn Confirm> {
    if force { Box::new(Fixed(true)) } else { Box::new(StdinConfirm) }
}
