//! Roles: named system prompts paired with an expected-output label
//!
//! A role's text is resolved once, when it is constructed. Placeholders such as
//! `{shell}` and `{os}` are replaced from the bindings passed to [`Role::new`];
//! a role read back from disk is taken verbatim and never resolved again.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::client::Message;

pub mod defaults;
pub mod prompt;
pub mod store;

/// A named system prompt and the label of what it is expected to produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique name, also the file stem in role storage
    pub name: String,

    /// System message text, fully resolved
    pub role: String,

    /// Output label appended as the final cue of every prompt (e.g. "Command")
    pub expecting: String,

    /// Bindings the text was resolved with, kept for reference only
    #[serde(default)]
    pub variables: Option<IndexMap<String, String>>,
}

impl Role {
    /// Build a role, resolving `{key}` placeholders in `template` from `variables`
    pub fn new(
        name: impl Into<String>,
        template: &str,
        expecting: impl Into<String>,
        variables: Option<IndexMap<String, String>>,
    ) -> Self {
        let role = match &variables {
            Some(bindings) if !bindings.is_empty() => resolve(template, bindings).into_owned(),
            _ => template.to_string(),
        };

        Self {
            name: name.into(),
            role,
            expecting: expecting.into(),
            variables,
        }
    }

    /// The role text as the system turn of a conversation
    pub fn system_message(&self) -> Message {
        Message::system(&self.role)
    }

    /// Render the user-turn content for `request`
    pub fn make_prompt(&self, request: &str, initial: bool) -> String {
        prompt::make_prompt(self, request, initial)
    }

    /// Whether `transcript` was started by this role
    pub fn same_role(&self, transcript: &str) -> bool {
        prompt::same_role(transcript, &self.name)
    }
}

/// Replace `{key}` with `bindings[key]`; braces naming unknown keys are left untouched
pub fn resolve<'a>(template: &'a str, bindings: &IndexMap<String, String>) -> Cow<'a, str> {
    lazy_regex::regex!(r"\{(\w+)\}").replace_all(template, |caps: &regex::Captures| {
        match bindings.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        }
    })
}

/// Built-in roles the CLI falls back to by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultRole {
    Default,
    Shell,
    DescribeShell,
    Code,
    /// No system text; continues chats that carry no role marker
    Empty,
}

impl DefaultRole {
    pub fn name(&self) -> &'static str {
        match self {
            DefaultRole::Default => "default",
            DefaultRole::Shell => "shell",
            DefaultRole::DescribeShell => "describe_shell",
            DefaultRole::Code => "code",
            DefaultRole::Empty => "empty",
        }
    }

    /// Pick a role from the mode flags; shell wins over describe, describe over code
    pub fn select(shell: bool, describe_shell: bool, code: bool) -> Self {
        if shell {
            DefaultRole::Shell
        } else if describe_shell {
            DefaultRole::DescribeShell
        } else if code {
            DefaultRole::Code
        } else {
            DefaultRole::Default
        }
    }
}
