//! Send a prompt to the completion service and print the answer

use eyre::{Context, Result};
use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::Command;

use crate::chat::{ChatSession, ChatStore};
use crate::cli::AskArgs;
use crate::client::openai::OpenAiClient;
use crate::config::Config;
use crate::error::StoreError;
use crate::handler::Handler;
use crate::interact;
use crate::printer::{StreamPrinter, parse_color};
use crate::role::store::RoleStore;
use crate::role::{DefaultRole, Role};
use crate::system;

pub fn run(args: AskArgs, config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let piped = if stdin.is_terminal() {
        None
    } else {
        let mut input = String::new();
        stdin.lock().read_to_string(&mut input).context("Failed to read from stdin")?;
        Some(input)
    };

    let request = combine_request(&args.prompt.join(" "), piped.as_deref());
    if request.trim().is_empty() {
        eyre::bail!("No prompt given. Pass a prompt or pipe text to stdin.");
    }

    let roles = RoleStore::new(config.roles_dir());
    let chats = ChatStore::new(config.chats_dir());
    let mut session = args.chat.as_deref().map(|id| chats.load_or_new(id)).transpose()?;
    let role = select_role(&args, &roles, session.as_ref())?;
    log::info!("Asking with role '{}'", role.name);

    let color = parse_color(&config.display.color)?;
    let generation = config.generation(args.model.as_deref(), args.temperature, args.top_p);
    let client = OpenAiClient::new(&config.api.host, config.api_key(), config.timeout());
    let mut handler = Handler::new(&client, generation, StreamPrinter::stdout(color, config.display.streaming));

    let reply = match session.as_mut() {
        Some(session) => handler.handle_chat(&chats, session, &role, &request, config.chat.cache_length)?,
        None => handler.handle(&role, &request)?,
    };

    let interactive = !args.no_interaction && piped.is_none() && io::stdout().is_terminal();
    if role.name == DefaultRole::Shell.name() && interactive {
        offer_execution(reply.trim(), &roles, &mut handler, &mut interact::ask, &mut execute)?;
    }

    Ok(())
}

/// Piped input goes first, separated from the typed prompt by a blank line
fn combine_request(prompt: &str, piped: Option<&str>) -> String {
    let prompt = prompt.trim();
    match piped.map(str::trim).filter(|p| !p.is_empty()) {
        Some(piped) if prompt.is_empty() => piped.to_string(),
        Some(piped) => format!("{}\n\n{}", piped, prompt),
        None => prompt.to_string(),
    }
}

/// Explicit `--role`, then mode flags, then the role that started the chat, then `default`
fn select_role(args: &AskArgs, roles: &RoleStore, session: Option<&ChatSession>) -> Result<Role> {
    if let Some(name) = &args.role {
        return roles.get(name);
    }

    let selected = DefaultRole::select(args.shell, args.describe_shell, args.code);
    if selected != DefaultRole::Default {
        return roles.get(selected.name());
    }

    if let Some(session) = session {
        match session.role_name() {
            Some(name) => match roles.get(&name) {
                Ok(role) => return Ok(role),
                Err(e) if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::RoleNotFound(_))) => {
                    log::warn!("Chat role '{}' no longer exists, using default", name);
                }
                Err(e) => return Err(e),
            },
            // Only empty-body roles start a chat without a role marker
            None if !session.messages.is_empty() => {
                return roles
                    .get(DefaultRole::Empty.name())
                    .with_context(|| format!("Could not determine chat role of \"{}\"", session.id));
            }
            None => {}
        }
    }

    roles.get(DefaultRole::Default.name())
}

/// Ask what to do with a generated command until it is executed or abandoned
fn offer_execution<W: Write>(
    command: &str,
    roles: &RoleStore,
    handler: &mut Handler<W>,
    ask: &mut dyn FnMut(&str) -> Result<String>,
    execute: &mut dyn FnMut(&str) -> Result<()>,
) -> Result<()> {
    if command.is_empty() {
        return Ok(());
    }

    loop {
        let choice = ask("[E]xecute, [D]escribe, [A]bort: ")?;
        match choice.to_lowercase().as_str() {
            "e" | "execute" => return execute(command),
            "d" | "describe" => {
                let describe = roles.get(DefaultRole::DescribeShell.name())?;
                handler.handle(&describe, command)?;
            }
            _ => return Ok(()),
        }
    }
}

fn execute(command: &str) -> Result<()> {
    let shell = system::shell_name();
    let program = which::which(&shell).unwrap_or_else(|_| PathBuf::from(if cfg!(windows) { "cmd.exe" } else { "sh" }));
    let flag = shell_flag(&shell);

    log::info!("Executing via {} {}: {}", program.display(), flag, command);
    let status = Command::new(&program)
        .arg(flag)
        .arg(command)
        .status()
        .with_context(|| format!("Failed to run {}", program.display()))?;

    if !status.success() {
        log::warn!("Command exited with {}", status);
    }
    Ok(())
}

fn shell_flag(shell: &str) -> &'static str {
    match shell {
        "cmd.exe" => "/c",
        "powershell.exe" | "pwsh" | "pwsh.exe" => "-Command",
        _ => "-c",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Generation, Message, MessageRole};
    use crate::handler::tests::FakeService;
    use crate::interact::Fixed;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, RoleStore) {
        let temp = TempDir::new().unwrap();
        let store = RoleStore::new(temp.path());
        store.seed_defaults_with("Linux/Test", "bash").unwrap();
        (temp, store)
    }

    #[test]
    fn test_combine_request() {
        assert_eq!(combine_request("explain", Some("fn main() {}\n")), "fn main() {}\n\nexplain");
        assert_eq!(combine_request("", Some("just stdin")), "just stdin");
        assert_eq!(combine_request(" hi ", None), "hi");
        assert_eq!(combine_request("hi", Some("   ")), "hi");
    }

    #[test]
    fn test_select_role_precedence() {
        let (_temp, store) = seeded_store();
        store.create("pirate", "Arr.", "Answer", &mut Fixed(false)).unwrap();

        let args = AskArgs {
            role: Some("pirate".to_string()),
            ..Default::default()
        };
        assert_eq!(select_role(&args, &store, None).unwrap().name, "pirate");

        let args = AskArgs {
            code: true,
            ..Default::default()
        };
        assert_eq!(select_role(&args, &store, None).unwrap().name, "code");

        assert_eq!(select_role(&AskArgs::default(), &store, None).unwrap().name, "default");
    }

    #[test]
    fn test_select_role_continues_chat_role() {
        let (_temp, store) = seeded_store();
        let mut chat = ChatSession::new("work");
        chat.prepare(&store.get("shell").unwrap(), "list files");

        let role = select_role(&AskArgs::default(), &store, Some(&chat)).unwrap();
        assert_eq!(role.name, "shell");

        let explicit = AskArgs {
            code: true,
            ..Default::default()
        };
        assert_eq!(select_role(&explicit, &store, Some(&chat)).unwrap().name, "code");
    }

    #[test]
    fn test_select_unknown_role() {
        let (_temp, store) = seeded_store();
        let args = AskArgs {
            role: Some("nobody".to_string()),
            ..Default::default()
        };
        let err = select_role(&args, &store, None).unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::RoleNotFound(_))));
    }

    #[test]
    fn test_select_role_continues_empty_role_chat() {
        let (_temp, store) = seeded_store();
        let mut chat = ChatSession::new("free");
        chat.prepare(&store.get("empty").unwrap(), "my name is Bob");
        chat.push_reply("Hi Bob");

        let role = select_role(&AskArgs::default(), &store, Some(&chat)).unwrap();
        assert_eq!(role.name, "empty");
        assert!(!chat.prepare(&role, "what is my name"));
        assert_eq!(chat.messages.len(), 3);
        assert_eq!(chat.messages[0], Message::user("my name is Bob\nanswer:"));
    }

    #[test]
    fn test_select_role_unmarked_chat_needs_empty_role() {
        let (_temp, store) = seeded_store();
        let mut chat = ChatSession::new("free");
        chat.prepare(&store.get("empty").unwrap(), "my name is Bob");
        store.delete("empty", &mut Fixed(true)).unwrap();

        let err = select_role(&AskArgs::default(), &store, Some(&chat)).unwrap_err();
        assert!(err.to_string().contains("Could not determine chat role of \"free\""));

        // A fresh chat has nothing to recover and uses the default role
        let fresh = ChatSession::new("new");
        assert_eq!(select_role(&AskArgs::default(), &store, Some(&fresh)).unwrap().name, "default");
    }

    fn generation() -> Generation {
        Generation {
            model: "test-model".to_string(),
            temperature: 0.0,
            top_p: 1.0,
            stream: true,
        }
    }

    /// Run the execution menu with scripted answers; returns the executed commands
    fn run_menu(service: &FakeService, store: &RoleStore, answers: &[&str]) -> Vec<String> {
        let mut answers: VecDeque<String> = answers.iter().map(|a| a.to_string()).collect();
        let mut questions = 0;
        let mut executed = Vec::new();
        let mut handler = Handler::new(service, generation(), StreamPrinter::new(Vec::new(), None, true));

        offer_execution(
            "ls -la",
            store,
            &mut handler,
            &mut |question: &str| -> Result<String> {
                assert!(question.contains("[E]xecute"));
                questions += 1;
                Ok(answers.pop_front().unwrap_or_default())
            },
            &mut |command: &str| -> Result<()> {
                executed.push(command.to_string());
                Ok(())
            },
        )
        .unwrap();

        assert!(answers.is_empty(), "menu stopped before all answers were used ({} asked)", questions);
        executed
    }

    #[test]
    fn test_execution_menu_executes() {
        let (_temp, store) = seeded_store();
        let service = FakeService::new(vec![]);
        assert_eq!(run_menu(&service, &store, &["E"]), vec!["ls -la"]);
        assert!(service.seen.borrow().is_empty());
    }

    #[test]
    fn test_execution_menu_describes_then_loops() {
        let (_temp, store) = seeded_store();
        let service = FakeService::new(vec![vec!["Lists all files."]]);
        let executed = run_menu(&service, &store, &["d", "a"]);
        assert!(executed.is_empty());

        let seen = service.seen.borrow();
        assert_eq!(seen.len(), 1);
        let describe = store.get("describe_shell").unwrap();
        assert_eq!(seen[0][0], Message::system(describe.role.clone()));
        assert_eq!(seen[0][1].role, MessageRole::User);
        assert!(seen[0][1].content.contains("Role name: describe_shell"));
        assert!(seen[0][1].content.contains("Request: ls -la"));
    }

    #[test]
    fn test_execution_menu_aborts_on_empty_answer() {
        let (_temp, store) = seeded_store();
        let service = FakeService::new(vec![]);
        assert!(run_menu(&service, &store, &[""]).is_empty());
        assert!(run_menu(&service, &store, &["a"]).is_empty());
        assert!(service.seen.borrow().is_empty());
    }

    #[test]
    fn test_shell_flag() {
        assert_eq!(shell_flag("bash"), "-c");
        assert_eq!(shell_flag("cmd.exe"), "/c");
        assert_eq!(shell_flag("powershell.exe"), "-Command");
    }
}
