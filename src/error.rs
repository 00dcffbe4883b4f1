//! Typed failures for role and chat storage
//!
//! These are wrapped into `eyre::Report` at the call site; callers that need to
//! react to a specific case use `downcast_ref::<StoreError>()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Role \"{0}\" not found.")]
    RoleNotFound(String),

    #[error("Chat \"{0}\" not found.")]
    ChatNotFound(String),

    #[error("invalid name {0:?}: names must be non-empty, without surrounding whitespace, path separators or control characters")]
    InvalidName(String),
}

/// Reject names that cannot map onto a single file or a single prompt line.
pub fn validate_name(name: &str) -> Result<(), StoreError> {
    // Names are written into and read back from the prompt's `Role name:` line,
    // which is trimmed and must stay on a single line.
    if name.is_empty()
        || name != name.trim()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control)
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}
