use colored::*;
use eyre::{Context, Result};
use std::fs;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::Config;
use crate::printer::parse_color;

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Set { key, value } => set(&key, &value, config),
    }
}

/// Config as displayed: the API key is never printed
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.api.key.is_some() {
        shown.api.key = Some("********".to_string());
    }
    shown
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    let config = redacted(config);
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&config)?);
        }
        OutputFormat::Text => {
            println!("{}", "shai Configuration".bold());
            println!();

            println!("{}:", "paths".cyan());
            println!("  roles: {}", config.paths.roles.display());
            println!("  chats: {}", config.paths.chats.display());
            println!();

            println!("{}:", "api".cyan());
            println!("  host: {}", config.api.host);
            println!("  model: {}", config.api.model);
            println!("  temperature: {}", config.api.temperature);
            println!("  top_p: {}", config.api.top_p);
            println!("  timeout: {}s", config.api.timeout);
            println!("  key: {}", config.api.key.as_deref().unwrap_or("(from OPENAI_API_KEY)"));
            println!();

            println!("{}:", "display".cyan());
            println!("  color: {}", config.display.color);
            println!("  streaming: {}", config.display.streaming);
            println!();

            println!("{}: {}", "chat.cache_length".cyan(), config.chat.cache_length);
            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
        }
    }

    Ok(())
}

fn lookup(key: &str, config: &Config) -> Option<String> {
    match key {
        "paths.roles" => Some(config.paths.roles.display().to_string()),
        "paths.chats" => Some(config.paths.chats.display().to_string()),
        "api.host" => Some(config.api.host.clone()),
        "api.model" => Some(config.api.model.clone()),
        "api.temperature" => Some(config.api.temperature.to_string()),
        "api.top_p" => Some(config.api.top_p.to_string()),
        "api.timeout" => Some(config.api.timeout.to_string()),
        "display.color" => Some(config.display.color.clone()),
        "display.streaming" => Some(config.display.streaming.to_string()),
        "chat.cache_length" => Some(config.chat.cache_length.to_string()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        _ => None,
    }
}

fn get(key: &str, config: &Config) -> Result<()> {
    match lookup(key, config) {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply(key: &str, value: &str, config: &mut Config) -> Result<()> {
    match key {
        "paths.roles" => config.paths.roles = value.into(),
        "paths.chats" => config.paths.chats = value.into(),
        "api.host" => config.api.host = value.to_string(),
        "api.key" => config.api.key = Some(value.to_string()),
        "api.model" => config.api.model = value.to_string(),
        "api.temperature" => config.api.temperature = value.parse().context("Invalid number")?,
        "api.top_p" => config.api.top_p = value.parse().context("Invalid number")?,
        "api.timeout" => config.api.timeout = value.parse().context("Invalid number of seconds")?,
        "display.color" => {
            parse_color(value)?;
            config.display.color = value.to_string();
        }
        "display.streaming" => {
            config.display.streaming = value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
        }
        "chat.cache_length" => config.chat.cache_length = value.parse().context("Invalid message count")?,
        "log_level" | "log-level" => config.log_level = value.parse()?,
        _ => {
            eyre::bail!("Unknown config key: {}", key);
        }
    }
    Ok(())
}

fn set(key: &str, value: &str, config: &Config) -> Result<()> {
    let shown = if key == "api.key" { "********" } else { value };
    println!("{} Setting {} = {}", "→".blue(), key.cyan(), shown.green());

    let mut new_config = config.clone();
    apply(key, value, &mut new_config)?;

    let config_path = Config::config_file();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml_str = serde_yaml::to_string(&new_config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml_str).context("Failed to write config file")?;

    println!("  {} Saved to {}", "✓".green(), config_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_lookup() {
        let mut config = Config::default();
        apply("display.streaming", "false", &mut config).unwrap();
        apply("api.model", "llama3", &mut config).unwrap();
        apply("chat.cache_length", "20", &mut config).unwrap();

        assert_eq!(lookup("display.streaming", &config).as_deref(), Some("false"));
        assert_eq!(lookup("api.model", &config).as_deref(), Some("llama3"));
        assert_eq!(lookup("chat.cache_length", &config).as_deref(), Some("20"));
        assert!(lookup("api.nope", &config).is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::default();
        assert!(apply("display.streaming", "maybe", &mut config).is_err());
        assert!(apply("display.color", "octarine", &mut config).is_err());
        assert!(apply("unknown.key", "1", &mut config).is_err());
        assert_eq!(config.display.color, "magenta");
    }

    #[test]
    fn test_redacted_hides_key() {
        let mut config = Config::default();
        config.api.key = Some("sk-secret".to_string());
        assert_eq!(redacted(&config).api.key.as_deref(), Some("********"));
    }
}
