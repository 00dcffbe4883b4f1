//! Chat transcript commands

use chrono::{DateTime, Local};
use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::chat::{ChatEntry, ChatStore};
use crate::cli::{ChatAction, OutputFormat};
use crate::client::MessageRole;
use crate::commands::role::confirmer;
use crate::config::Config;
use crate::role::store::Outcome;

pub fn run(action: ChatAction, config: &Config) -> Result<()> {
    let store = ChatStore::new(config.chats_dir());
    match action {
        ChatAction::List { format } => list(&store, OutputFormat::resolve(format)),
        ChatAction::Show { id } => show(&store, &id),
        ChatAction::Delete { id, force } => delete(&store, &id, force),
    }
}

#[derive(Serialize)]
struct ChatInfo {
    id: String,
    path: String,
    modified: String,
}

impl From<&ChatEntry> for ChatInfo {
    fn from(entry: &ChatEntry) -> Self {
        Self {
            id: entry.id.clone(),
            path: entry.path.display().to_string(),
            modified: DateTime::<Local>::from(entry.modified).to_rfc3339(),
        }
    }
}

fn list(store: &ChatStore, format: OutputFormat) -> Result<()> {
    let entries = store.list()?;

    match format {
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("No chats found.");
                println!();
                println!("To start one:");
                println!("  shai ask --chat <id> <prompt>");
                return Ok(());
            }
            for entry in &entries {
                let modified = DateTime::<Local>::from(entry.modified).format("%Y-%m-%d %H:%M");
                println!("{} ({})", entry.id.cyan(), modified);
            }
        }
        OutputFormat::Json => {
            let infos: Vec<ChatInfo> = entries.iter().map(ChatInfo::from).collect();
            println!("{}", serde_json::to_string_pretty(&infos)?);
        }
        OutputFormat::Yaml => {
            let infos: Vec<ChatInfo> = entries.iter().map(ChatInfo::from).collect();
            println!("{}", serde_yaml::to_string(&infos)?);
        }
    }

    Ok(())
}

fn show(store: &ChatStore, id: &str) -> Result<()> {
    let session = store.load(id)?;
    if let Some(role) = session.role_name() {
        println!("{} {}", "Role:".bold(), role);
        println!();
    }

    for message in &session.messages {
        let label = match message.role {
            MessageRole::System => "system".dimmed(),
            MessageRole::User => "user".blue(),
            MessageRole::Assistant => "assistant".green(),
        };
        println!("{}: {}", label, message.content);
    }
    Ok(())
}

fn delete(store: &ChatStore, id: &str, force: bool) -> Result<()> {
    let mut confirm = confirmer(force);
    match store.delete(id, confirm.as_mut())? {
        Outcome::Done => println!("{} Deleted chat {}", "✓".green(), id.cyan()),
        Outcome::Declined => println!("Cancelled."),
    }
    Ok(())
}
