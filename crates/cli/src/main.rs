use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use cirrus_chat::{ChatEvent, ChatSession};
use cirrus_core::{Config, Error, FALLBACK_REPLY, ModelId, init_logging, resolve_api_key};
use cirrus_providers::{CancelToken, GeminiProvider};
use cirrus_ui::App;

/// Cirrus - a streaming Gemini chat client for the terminal
#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(about = "Chat with Gemini models from your terminal", long_about = None)]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to config.toml (default: ./config.toml if present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// API key (overrides GEMINI_API_KEY and the config file)
    #[arg(short, long, value_name = "KEY")]
    key: Option<String>,

    /// Model to chat with (overrides the config file)
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the interactive chat TUI (the default)
    Start,
    /// Send one prompt and stream the reply to stdout
    Ask {
        /// The prompt to send
        #[arg(required = true, value_name = "PROMPT")]
        prompt: Vec<String>,
    },
    /// List the selectable models
    Models,
    /// Write an example config.toml
    Init,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref(), cli.verbose)?;
    if let Some(model) = &cli.model {
        config.model = ModelId::from_str(model)?;
    }

    init_logging(Some(config.logging.clone().into())).context("Failed to initialize logging")?;

    if cli.verbose {
        println!("{} Model: {}", "Info:".blue().bold(), config.model.cyan());
        println!("{} Base URL: {}", "Info:".blue().bold(), config.base_url.cyan());
    }

    match cli.command.unwrap_or(Commands::Start) {
        Commands::Start => cmd_start(config, cli.key).await?,
        Commands::Ask { prompt } => cmd_ask(config, cli.key, prompt.join(" ")).await?,
        Commands::Models => cmd_models(&config),
        Commands::Init => cmd_init(cli.config.as_deref())?,
    }

    Ok(())
}

/// Load config from the given path, or from ./config.toml when present.
///
/// An explicit path must exist; the implicit default falls back to built-in
/// defaults so the client runs with just a key from the flag or environment.
fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    match path {
        Some(p) => Config::from_file(p).with_context(|| format!("Failed to load config from {}", p.display())),
        None => {
            let default = Path::new("config.toml");
            if default.exists() {
                if verbose {
                    println!("{} Loading config from {}", "Info:".blue().bold(), default.display());
                }
                Config::from_file(default).context("Failed to load config.toml")
            } else {
                Ok(Config::default())
            }
        }
    }
}

/// Start the interactive TUI session
async fn cmd_start(config: Config, key_flag: Option<String>) -> Result<()> {
    let api_key = resolve_api_key(key_flag.as_deref(), &config);
    let mut app = App::new(config, api_key);
    app.run().await.context("TUI error")?;
    Ok(())
}

/// Send one prompt and stream the reply to stdout
async fn cmd_ask(config: Config, key_flag: Option<String>, prompt: String) -> Result<()> {
    let api_key = resolve_api_key(key_flag.as_deref(), &config).ok_or_else(|| {
        Error::Init("no API key: pass --key, set GEMINI_API_KEY, or put api_key in config.toml".to_string())
    })?;

    let provider = GeminiProvider::new(api_key, config.model, Some(config.base_url.clone()))?;
    let session = ChatSession::new(Arc::new(provider)).with_temperature(config.temperature);

    let mut rx = session.submit(&prompt, CancelToken::new())?;
    let mut stdout = std::io::stdout();

    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Fragment(text) => {
                write!(stdout, "{}", text)?;
                stdout.flush()?;
            }
            ChatEvent::Done { .. } => {
                writeln!(stdout)?;
            }
            ChatEvent::Failed { detail } => {
                writeln!(stdout, "{}", FALLBACK_REPLY)?;
                return Err(Error::Stream(detail).into());
            }
            ChatEvent::Cancelled => {}
        }
    }

    Ok(())
}

/// List the selectable models
fn cmd_models(config: &Config) {
    println!("{}", "Models".green().bold().underline());
    for model in ModelId::VALUES {
        let mut markers = String::new();
        if *model == ModelId::default() {
            markers.push_str(" (default)");
        }
        if *model == config.model {
            markers.push_str(" (selected)");
        }
        println!("  {}{}", model.cyan(), markers);
    }
}

/// Write an example config.toml
fn cmd_init(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new("config.toml"));
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    std::fs::write(path, Config::example()).context("Failed to write config")?;
    println!(
        "{} Created {}. Edit it with your settings.",
        "Success:".green().bold(),
        path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["cirrus"]).unwrap();
        assert!(cli.config.is_none());
        assert!(cli.key.is_none());
        assert!(cli.model.is_none());
        assert!(!cli.verbose);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_with_flags() {
        let cli = Cli::try_parse_from([
            "cirrus",
            "--config",
            "/path/to/config.toml",
            "--key",
            "abc",
            "--model",
            "gemini-3-pro-preview",
            "--verbose",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.toml")));
        assert_eq!(cli.key.as_deref(), Some("abc"));
        assert_eq!(cli.model.as_deref(), Some("gemini-3-pro-preview"));
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_ask_command() {
        let cli = Cli::try_parse_from(["cirrus", "ask", "how", "are", "you"]).unwrap();
        if let Some(Commands::Ask { prompt }) = cli.command {
            assert_eq!(prompt.join(" "), "how are you");
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_ask_requires_prompt() {
        assert!(Cli::try_parse_from(["cirrus", "ask"]).is_err());
    }

    #[test]
    fn test_cli_subcommands() {
        assert!(matches!(
            Cli::try_parse_from(["cirrus", "start"]).unwrap().command,
            Some(Commands::Start)
        ));
        assert!(matches!(
            Cli::try_parse_from(["cirrus", "models"]).unwrap().command,
            Some(Commands::Models)
        ));
        assert!(matches!(
            Cli::try_parse_from(["cirrus", "init"]).unwrap().command,
            Some(Commands::Init)
        ));
    }

    #[test]
    fn test_load_config_explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        assert!(load_config(Some(&missing), false).is_err());
    }

    #[test]
    fn test_load_config_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example()).unwrap();

        let config = load_config(Some(&path), false).unwrap();
        assert_eq!(config.model, ModelId::FlashPreview);
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "invalid toml").unwrap();

        assert!(load_config(Some(&path), false).is_err());
    }

    #[test]
    fn test_cmd_init_creates_config() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");

        cmd_init(Some(&path)).unwrap();
        assert!(path.exists());

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.model, ModelId::FlashPreview);

        // A second init refuses to overwrite.
        assert!(cmd_init(Some(&path)).is_err());
    }

    #[test]
    fn test_cmd_models_output() {
        cmd_models(&Config::default());
    }

    #[tokio::test]
    async fn test_cmd_ask_without_key_fails() {
        // Only meaningful when the environment doesn't provide a key.
        if std::env::var("GEMINI_API_KEY").is_err() {
            let result = cmd_ask(Config::default(), None, "hello".to_string()).await;
            assert!(result.is_err());
            assert!(result.unwrap_err().to_string().contains("no API key"));
        }
    }
}
