//! Prompt assembly
//!
//! The first turn of a conversation embeds the whole role into a fixed layout:
//!
//! ```text
//! ###
//! Role name: <name>
//! <role body>
//!
//! Request: <request>
//! ###
//! <expecting>:
//! ```
//!
//! [`extract_role_name`] reads the first two lines of that layout back, so the
//! marker and the `Role name:` line must stay on lines one and two.

use super::Role;

const MARKER: &str = "###";
const ROLE_NAME_PREFIX: &str = "Role name: ";

/// Render the user-turn content for `request`
///
/// The full template is used only for an initial turn of a role with a
/// non-empty body; otherwise the request is followed by the expecting cue.
pub fn make_prompt(role: &Role, request: &str, initial: bool) -> String {
    if initial && !role.role.is_empty() {
        format!(
            "{MARKER}\n{ROLE_NAME_PREFIX}{name}\n{body}\n\nRequest: {request}\n{MARKER}\n{expecting}:",
            name = role.name,
            body = role.role,
            expecting = role.expecting,
        )
    } else {
        format!("{}\n{}:", request, role.expecting)
    }
}

/// Recover the role name from the first two lines of a transcript
///
/// Returns `None` for an empty transcript, one whose first line has no marker
/// (continuation turns, empty-body roles), or one whose second line is not a
/// `Role name:` line.
pub fn extract_role_name(transcript: &str) -> Option<String> {
    let mut lines = transcript.lines();
    let first = lines.next()?;
    if !first.contains(MARKER) {
        return None;
    }

    let (_, name) = lines.next()?.split_once(ROLE_NAME_PREFIX)?;
    let name = name.trim();
    if name.is_empty() { None } else { Some(name.to_string()) }
}

/// True iff the transcript's embedded role name equals `name`
pub fn same_role(transcript: &str, name: &str) -> bool {
    extract_role_name(transcript).is_some_and(|found| found == name)
}
