//! Operating system and shell detection used to resolve role templates

use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

static OS_NAME: Lazy<String> = Lazy::new(detect_os_name);

/// Human-readable OS name, e.g. `Linux/Ubuntu 24.04 LTS` or `Darwin/MacOS`
pub fn os_name() -> String {
    OS_NAME.clone()
}

fn detect_os_name() -> String {
    match std::env::consts::OS {
        "linux" => match fs::read_to_string("/etc/os-release") {
            Ok(content) => match pretty_name(&content) {
                Some(name) => format!("Linux/{}", name),
                None => "Linux".to_string(),
            },
            Err(e) => {
                log::debug!("Could not read /etc/os-release: {}", e);
                "Linux".to_string()
            }
        },
        "macos" => "Darwin/MacOS".to_string(),
        "windows" => "Windows".to_string(),
        other => other.to_string(),
    }
}

/// `PRETTY_NAME` from an os-release file, unquoted
fn pretty_name(os_release: &str) -> Option<String> {
    os_release
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .find(|(key, _)| *key == "PRETTY_NAME")
        .map(|(_, value)| value.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|value| !value.is_empty())
}

/// Name of the user's shell, e.g. `zsh`, `powershell.exe`
pub fn shell_name() -> String {
    if cfg!(windows) {
        let module_paths = std::env::var("PSModulePath").unwrap_or_default();
        return windows_shell(&module_paths).to_string();
    }
    unix_shell(std::env::var("SHELL").ok().as_deref())
}

fn windows_shell(ps_module_path: &str) -> &'static str {
    if ps_module_path.split(';').count() >= 3 {
        "powershell.exe"
    } else {
        "cmd.exe"
    }
}

fn unix_shell(shell_var: Option<&str>) -> String {
    let shell = shell_var.filter(|s| !s.is_empty()).unwrap_or("/bin/sh");
    Path::new(shell)
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "sh".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_name() {
        let content = "NAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"\n";
        assert_eq!(pretty_name(content), Some("Ubuntu 24.04 LTS".to_string()));
        assert_eq!(pretty_name("NAME=Arch\n"), None);
        assert_eq!(pretty_name("PRETTY_NAME=\"\"\n"), None);
    }

    #[test]
    fn test_unix_shell() {
        assert_eq!(unix_shell(Some("/usr/bin/zsh")), "zsh");
        assert_eq!(unix_shell(Some("fish")), "fish");
        assert_eq!(unix_shell(None), "sh");
        assert_eq!(unix_shell(Some("")), "sh");
    }

    #[test]
    fn test_windows_shell() {
        assert_eq!(windows_shell("a;b;c"), "powershell.exe");
        assert_eq!(windows_shell("a"), "cmd.exe");
    }

    #[test]
    fn test_os_name_not_empty() {
        assert!(!os_name().is_empty());
    }
}
