//! One-file-per-role persistence
//!
//! Each role lives in `<dir>/<name>.json`. Overwrites and deletes go through a
//! [`Confirm`] so the caller decides how the user is asked.

use eyre::{Context, Result};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use super::Role;
use super::defaults::BUILTIN_ROLES;
use crate::error::{StoreError, validate_name};
use crate::interact::Confirm;
use crate::system;

const EXTENSION: &str = "json";

/// Result of a mutating operation that may need the user's consent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Declined,
}

/// A persisted role as seen by [`RoleStore::list`]
#[derive(Debug, Clone)]
pub struct RoleEntry {
    pub name: String,
    pub path: PathBuf,
    pub modified: SystemTime,
}

#[derive(Debug, Clone)]
pub struct RoleStore {
    dir: PathBuf,
}

impl RoleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the storage directory and seed the built-in roles
    ///
    /// Called once by the application entry point.
    pub fn initialize(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir)
            .with_context(|| format!("Failed to create role directory: {}", store.dir.display()))?;
        store.seed_defaults()?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Load a role; [`StoreError::RoleNotFound`] if it has no file
    pub fn get(&self, name: &str) -> Result<Role> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(StoreError::RoleNotFound(name.to_string()).into());
        }

        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read role file: {}", path.display()))?;
        let role: Role =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse role file: {}", path.display()))?;

        log::debug!("Loaded role '{}' from {}", name, path.display());
        Ok(role)
    }

    /// Build a role from user input and persist it
    pub fn create(&self, name: &str, role_text: &str, expecting: &str, confirm: &mut dyn Confirm) -> Result<Outcome> {
        let role = Role::new(name, role_text, expecting, None);
        self.save(&role, confirm)
    }

    /// Write `role` to its file, asking before replacing an existing one
    pub fn save(&self, role: &Role, confirm: &mut dyn Confirm) -> Result<Outcome> {
        validate_name(&role.name)?;
        let path = self.path_for(&role.name);

        if path.exists() && !confirm.confirm(&format!("Role \"{}\" already exists, overwrite it?", role.name))? {
            log::info!("Overwrite of role '{}' declined", role.name);
            return Ok(Outcome::Declined);
        }

        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create role directory: {}", self.dir.display()))?;
        let json = serde_json::to_string_pretty(role).context("Failed to serialize role")?;
        fs::write(&path, json).with_context(|| format!("Failed to write role file: {}", path.display()))?;

        log::info!("Saved role '{}' to {}", role.name, path.display());
        Ok(Outcome::Done)
    }

    /// Remove a role's file after confirmation
    pub fn delete(&self, name: &str, confirm: &mut dyn Confirm) -> Result<Outcome> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(StoreError::RoleNotFound(name.to_string()).into());
        }

        if !confirm.confirm(&format!("Role \"{}\" exists, delete it?", name))? {
            log::info!("Deletion of role '{}' declined", name);
            return Ok(Outcome::Declined);
        }

        fs::remove_file(&path).with_context(|| format!("Failed to remove role file: {}", path.display()))?;
        log::info!("Deleted role '{}'", name);
        Ok(Outcome::Done)
    }

    /// All persisted roles, oldest modification first
    ///
    /// Reads the directory on every call; a missing directory lists nothing.
    pub fn list(&self) -> Result<Vec<RoleEntry>> {
        let mut entries = Vec::new();
        if !self.dir.exists() {
            return Ok(entries);
        }

        let dir_entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read role directory: {}", self.dir.display()))?;

        for entry in dir_entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .with_context(|| format!("Failed to stat role file: {}", path.display()))?;
            entries.push(RoleEntry { name, path, modified });
        }

        entries.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Seed built-ins using the detected OS and shell
    pub fn seed_defaults(&self) -> Result<Vec<String>> {
        self.seed_defaults_with(&system::os_name(), &system::shell_name())
    }

    /// Write every built-in role that does not exist yet; returns the names written
    pub fn seed_defaults_with(&self, os: &str, shell: &str) -> Result<Vec<String>> {
        let bindings = IndexMap::from([
            ("shell".to_string(), shell.to_string()),
            ("os".to_string(), os.to_string()),
        ]);

        let mut seeded = Vec::new();
        for builtin in BUILTIN_ROLES {
            if self.exists(builtin.name) {
                continue;
            }
            let variables = builtin.uses_system.then(|| bindings.clone());
            let role = Role::new(builtin.name, builtin.template, builtin.expecting, variables);
            // Nothing to overwrite, so the answer is never consulted.
            self.save(&role, &mut crate::interact::Fixed(false))?;
            seeded.push(builtin.name.to_string());
        }

        if !seeded.is_empty() {
            log::info!("Seeded default roles: {}", seeded.join(", "));
        }
        Ok(seeded)
    }
}
