use std::{io::IsTerminal as _, path::PathBuf, sync::Arc};

use clap::Parser;
use sso_selector::{
    client::{Navigator, PrintNavigator, SsoClient},
    config::{CONFIG_FILE_NAME, SelectorConfig},
    observability::init_tracing,
    prompt::TerminalPresenter,
    selection::{SelectionSession, SessionEnd, SessionOptions},
};

const EXIT_CONFIG: i32 = 1;
const EXIT_INTERRUPTED: i32 = 2;

/// CLI arguments for the SSO selector
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Pick the SSO identity provider for a login and open its login page",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./sso-selector.toml, then
    /// ~/.config/sso-selector/sso-selector.toml if either exists)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Base API URL of the SSO server, overrides `client.base_url`
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Submit this email instead of prompting for it
    #[arg(short, long)]
    email: Option<String>,

    /// Print the login URL instead of opening the browser
    #[arg(long)]
    no_browser: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Run one selection and redirect to the provider login (default)
    Run,
    /// Validate the configuration and print the effective endpoints
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref(), args.base_url.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    match args.command {
        Some(Command::CheckConfig) => run_check_config(&config),
        Some(Command::Run) | None => run_selection(config, args.email, args.no_browser).await,
    }
}

/// Get the default config directory path.
fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sso-selector"))
}

/// Resolve the config path. `None` means no file was found and the built-in
/// defaults apply.
fn resolve_config_path(explicit_path: Option<&str>) -> Result<Option<PathBuf>, String> {
    if let Some(path) = explicit_path {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
        return Ok(Some(path));
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Ok(Some(cwd_config));
    }

    if let Some(default_path) = default_config_dir().map(|p| p.join(CONFIG_FILE_NAME))
        && default_path.exists()
    {
        return Ok(Some(default_path));
    }

    Ok(None)
}

fn load_config(
    explicit_path: Option<&str>,
    base_url: Option<String>,
) -> Result<SelectorConfig, String> {
    let mut config = match resolve_config_path(explicit_path)? {
        Some(path) => SelectorConfig::from_file(&path).map_err(|e| e.to_string())?,
        None => SelectorConfig::default(),
    };

    if base_url.is_some() {
        config.client.base_url = base_url;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run_check_config(config: &SelectorConfig) {
    let base_url = match config.client.base_url() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };
    let client = match SsoClient::new(base_url, &config.client) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    println!("Configuration OK");
    println!("  base URL:         {}", client.base_url());
    println!("  configuration:    {}", client.configuration_url());
    println!("  resolution:       {}", client.resolution_url());
    println!(
        "  timeouts:         configuration {:?}, resolution {:?}",
        config.selection.configuration_timeout(),
        config.selection.resolution_timeout()
    );
    println!(
        "  error surface:    {}",
        if config.selection.surface_resolution_errors {
            "on"
        } else {
            "off"
        }
    );
}

async fn run_selection(config: SelectorConfig, email: Option<String>, no_browser: bool) {
    let _tracing_guard = match init_tracing(&config.observability) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let base_url = match config.client.base_url() {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let client = match SsoClient::new(base_url.clone(), &config.client) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create SSO client");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let navigator = navigator(no_browser);
    let session = SelectionSession::new(
        SessionOptions::from_config(&config.selection, base_url),
        client.clone(),
        client,
        navigator,
    );

    let handle = session.handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupted, shutting down");
                handle.shutdown();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to install Ctrl+C handler"),
        }
    });

    let mut presenter = if std::io::stdin().is_terminal() {
        TerminalPresenter::new(email)
    } else {
        TerminalPresenter::non_interactive(email)
    };

    match session.run(&mut presenter).await {
        Ok(SessionEnd::Redirected { url, .. }) => {
            tracing::debug!(url = %url, "Selection finished");
        }
        Ok(SessionEnd::Cancelled) => std::process::exit(EXIT_INTERRUPTED),
        Err(e) => {
            tracing::error!(error = %e, "Selection failed");
            eprintln!("Error: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    }
}

fn navigator(no_browser: bool) -> Arc<dyn Navigator> {
    #[cfg(feature = "browser")]
    {
        if !no_browser {
            return Arc::new(sso_selector::client::BrowserNavigator);
        }
    }
    #[cfg(not(feature = "browser"))]
    let _ = no_browser;

    Arc::new(PrintNavigator)
}
