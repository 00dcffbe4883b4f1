//! Persisted multi-turn conversations
//!
//! A chat is an ordered message list stored as `<dir>/<id>.json`. Its opening
//! user turn carries the role marker written by the prompt template, which is
//! how a later invocation learns which role started it.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::client::{Message, MessageRole};
use crate::error::{StoreError, validate_name};
use crate::interact::Confirm;
use crate::role::Role;
use crate::role::prompt::extract_role_name;
use crate::role::store::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub messages: Vec<Message>,
}

impl ChatSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    /// Content of the first user turn
    pub fn initial_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }

    /// Name of the role that started this chat, if the opening turn records one
    pub fn role_name(&self) -> Option<String> {
        self.initial_prompt().and_then(extract_role_name)
    }

    /// Whether the next turn under `role` has to start the transcript over
    ///
    /// A transcript without a role marker was started by an empty-body role,
    /// which never writes one, so it only matches another empty-body role.
    pub fn needs_reseed(&self, role: &Role) -> bool {
        match self.initial_prompt() {
            None => true,
            Some(initial) => match extract_role_name(initial) {
                Some(_) => !role.same_role(initial),
                None => !role.role.is_empty(),
            },
        }
    }

    /// Append the user turn for `request`; returns true if the chat was reseeded
    pub fn prepare(&mut self, role: &Role, request: &str) -> bool {
        let reseed = self.needs_reseed(role);
        if reseed {
            if !self.messages.is_empty() {
                log::info!("Chat '{}' restarted with role '{}'", self.id, role.name);
            }
            self.messages.clear();
            if !role.role.is_empty() {
                self.messages.push(role.system_message());
            }
        }
        self.messages.push(Message::user(role.make_prompt(request, reseed)));
        reseed
    }

    pub fn push_reply(&mut self, text: impl Into<String>) {
        self.messages.push(Message::assistant(text));
    }

    /// Drop the oldest turns beyond `cache_length`, keeping the opening system and user turns
    pub fn truncate(&mut self, cache_length: usize) {
        let pinned = self
            .messages
            .iter()
            .position(|m| m.role == MessageRole::User)
            .map(|i| i + 1)
            .unwrap_or(0);
        let rest = self.messages.len() - pinned;
        if rest > cache_length {
            self.messages.drain(pinned..pinned + (rest - cache_length));
        }
    }
}

/// A persisted chat as seen by [`ChatStore::list`]
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub id: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn load(&self, id: &str) -> Result<ChatSession> {
        validate_name(id)?;
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StoreError::ChatNotFound(id.to_string()).into());
        }
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read chat file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse chat file: {}", path.display()))
    }

    /// Load a chat, or start an empty one if it does not exist yet
    pub fn load_or_new(&self, id: &str) -> Result<ChatSession> {
        match self.load(id) {
            Ok(session) => Ok(session),
            Err(e) if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::ChatNotFound(_))) => {
                log::debug!("Starting new chat '{}'", id);
                Ok(ChatSession::new(id))
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, session: &ChatSession) -> Result<()> {
        validate_name(&session.id)?;
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create chat directory: {}", self.dir.display()))?;
        let path = self.path_for(&session.id);
        let json = serde_json::to_string_pretty(session).context("Failed to serialize chat")?;
        fs::write(&path, json).with_context(|| format!("Failed to write chat file: {}", path.display()))?;
        log::debug!("Saved chat '{}' ({} messages)", session.id, session.messages.len());
        Ok(())
    }

    /// All chats, oldest modification first
    pub fn list(&self) -> Result<Vec<ChatEntry>> {
        let mut entries = Vec::new();
        if !self.dir.exists() {
            return Ok(entries);
        }

        let dir_entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read chat directory: {}", self.dir.display()))?;
        for entry in dir_entries.flatten() {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let Some(id) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let modified = entry.metadata().and_then(|m| m.modified())?;
            entries.push(ChatEntry { id, path, modified });
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    pub fn delete(&self, id: &str, confirm: &mut dyn Confirm) -> Result<Outcome> {
        validate_name(id)?;
        let path = self.path_for(id);
        if !path.is_file() {
            return Err(StoreError::ChatNotFound(id.to_string()).into());
        }
        if !confirm.confirm(&format!("Delete chat \"{}\"?", id))? {
            return Ok(Outcome::Declined);
        }
        fs::remove_file(&path).with_context(|| format!("Failed to remove chat file: {}", path.display()))?;
        log::info!("Deleted chat '{}'", id);
        Ok(Outcome::Done)
    }
}
