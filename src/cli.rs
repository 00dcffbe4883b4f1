use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "shai",
    about = "Ask a language model from the shell, shaped by reusable roles",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/shai/logs/shai.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to shai.yaml config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a prompt and stream the answer
    Ask(AskArgs),

    /// Manage roles
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Manage chat transcripts
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct AskArgs {
    /// Prompt text; piped stdin is appended
    #[arg(trailing_var_arg = true)]
    pub prompt: Vec<String>,

    /// Role to use (see `shai role list`)
    #[arg(long, short = 'r', conflicts_with_all = ["shell", "describe_shell", "code"])]
    pub role: Option<String>,

    /// Generate a shell command
    #[arg(long, short = 's')]
    pub shell: bool,

    /// Describe a shell command
    #[arg(long, short = 'd')]
    pub describe_shell: bool,

    /// Generate only code
    #[arg(long)]
    pub code: bool,

    /// Continue (or start) the named chat
    #[arg(long)]
    pub chat: Option<String>,

    /// Model to use instead of the configured one
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Do not offer to execute generated shell commands
    #[arg(long)]
    pub no_interaction: bool,
}

#[derive(Subcommand)]
pub enum RoleAction {
    /// List roles, oldest first
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print a role's system text
    Show {
        /// Role name
        name: String,
    },

    /// Create a role (prompts for missing fields)
    Create {
        /// Role name
        name: String,

        /// System text of the role
        #[arg(long)]
        description: Option<String>,

        /// Expected output label, e.g. answer, code, shell command
        #[arg(long)]
        expecting: Option<String>,

        /// Overwrite an existing role without confirmation
        #[arg(long)]
        force: bool,
    },

    /// Delete a role
    Delete {
        /// Role name
        name: String,

        /// Delete without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ChatAction {
    /// List chats, oldest first
    List {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Print a chat transcript
    Show {
        /// Chat id
        id: String,
    },

    /// Delete a chat
    Delete {
        /// Chat id
        id: String,

        /// Delete without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (dot notation)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// New value
        value: String,
    },
}
