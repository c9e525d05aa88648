//! tabdoc - CLI entry point
//!
//! Runs an interactive document tab against a lock and content service,
//! queries lock state, and manages the configuration file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tabdoc::bus::{CrossTabBus, Mailbox};
use tabdoc::config::{default, Config, ConfigLoader, ConfigSource};
use tabdoc::coordinator::{SaveOutcome, SessionCoordinator};
use tabdoc::lifecycle::{LifecycleGuard, LifecycleSignal};
use tabdoc::prompt::ConsolePrompter;
use tabdoc::tab::{Tab, TabStep};
use tabdoc::token_cache::TokenCache;
use tokio::io::{AsyncBufReadExt, BufReader};

/// How long teardown waits for unlock beacons before exiting.
const BEACON_GRACE: Duration = Duration::from_secs(2);

/// Lock-coordinated editing of shared remote documents
#[derive(Parser)]
#[command(name = "tabdoc")]
#[command(version, about = "Lock-coordinated editing of shared remote documents")]
struct Cli {
    /// Configuration file (defaults to the XDG location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands for the tabdoc CLI
#[derive(Subcommand)]
enum Commands {
    /// Run an interactive tab reading commands from stdin
    Tab {
        /// Tab id (default: the first free `tab-N`); reusing the id of a
        /// finished tab recovers its cached locks, a live one is refused
        #[arg(long)]
        tab_id: Option<String>,
        /// User id to lock documents as
        #[arg(long)]
        user: Option<String>,
        /// Service base URL
        #[arg(long)]
        server: Option<String>,
    },

    /// Print the lock state of a document as JSON
    Lockinfo {
        /// Document path
        path: String,
        /// Service base URL
        #[arg(long)]
        server: Option<String>,
    },

    /// Manage configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Actions for the `config` subcommand.
#[derive(Subcommand)]
enum ConfigAction {
    /// Create default configuration file
    Init {
        /// Overwrite existing configuration (creates backup)
        #[arg(long)]
        force: bool,
    },
    /// Show configuration file path
    Path,
    /// Validate configuration file
    Validate,
}

/// One line of input to an interactive tab.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Empty,
    Help,
    Open(String),
    Edit { path: String, text: String },
    Append { path: String, text: String },
    Save(Option<String>),
    Close(String),
    Refresh { path: String, force: bool },
    Activate(String),
    List,
    Show(Option<String>),
    LockInfo(String),
    Focus,
    Quit,
}

const HELP: &str = "\
commands:
  open <path>            open a document (editable if the lock is free)
  edit <path> <text>     replace the buffer; \\n becomes a newline
  append <path> <text>   append to the buffer
  save [path]            save the given or active document
  close <path>           close, saving and unlocking as needed
  refresh <path>         reload from the server
  refresh! <path>        reload, discarding unsaved edits
  activate <path>        make a document the active one
  list                   list open documents
  show [path]            print a buffer
  lockinfo <path>        query the lock service
  focus                  pick up saves made while unfocused
  quit                   leave (asks again if edits are unsaved)";

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config { action } => run_config_command(cli.config.as_deref(), action),
        Commands::Tab {
            tab_id,
            user,
            server,
        } => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            tabdoc::logging::init(config.log.level);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error: failed to start runtime: {e}");
                    return ExitCode::FAILURE;
                }
            };
            rt.block_on(run_tab(config, tab_id, user, server))
        }
        Commands::Lockinfo { path, server } => {
            let Some(config) = load_config(cli.config.as_deref()) else {
                return ExitCode::FAILURE;
            };
            tabdoc::logging::init(config.log.level);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("Error: failed to start runtime: {e}");
                    return ExitCode::FAILURE;
                }
            };
            rt.block_on(run_lockinfo_command(&config, server, &path))
        }
    }
}

/// Loads and validates the configuration, printing any error.
fn load_config(path: Option<&Path>) -> Option<Config> {
    let loaded = ConfigLoader::load(path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });
    match loaded {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("Config error: {e}");
            None
        }
    }
}

fn run_config_command(path: Option<&Path>, action: ConfigAction) -> ExitCode {
    let source = ConfigSource::resolve(path);
    let result = match action {
        ConfigAction::Init { force } => match &source {
            ConfigSource::Explicit(path) => {
                default::create_default_config_at(path, force).map(|()| path.clone())
            }
            ConfigSource::Default(_) => default::create_default_config(force),
        }
        .map(|path| println!("Created configuration at {}", path.display())),
        ConfigAction::Path => {
            println!("{}", source.path().display());
            Ok(())
        }
        ConfigAction::Validate => ConfigLoader::load_source(&source).and_then(|config| {
            config.validate()?;
            println!("Configuration is valid");
            println!("{config:#?}");
            Ok(())
        }),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Config error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_client(config: &Config, server: Option<String>) -> Result<remote_docs::Client, remote_docs::RemoteError> {
    let base = server.unwrap_or_else(|| config.server.base_url.clone());
    // Validated at load.
    let lock_timeout = config
        .server
        .lock_timeout()
        .unwrap_or(remote_docs::DEFAULT_LOCK_TIMEOUT);
    Ok(remote_docs::Client::new(&base)?
        .with_token_header(config.server.lock_token_header.clone())
        .with_lock_timeout(lock_timeout))
}

async fn run_lockinfo_command(config: &Config, server: Option<String>, path: &str) -> ExitCode {
    let client = match build_client(config, server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    match client.query(path).await {
        Ok(info) => match serde_json::to_string_pretty(&info) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: failed to serialize lock info: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Prefix of the tab ids handed out when `--tab-id` is not given.
const DEFAULT_TAB_PREFIX: &str = "tab";

async fn run_tab(
    config: Config,
    tab_id: Option<String>,
    user: Option<String>,
    server: Option<String>,
) -> ExitCode {
    let client = match build_client(&config, server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let owner = user.unwrap_or_else(|| config.user.resolve());
    let storage_dir = config.storage.resolve_dir();

    let claimed = match tab_id {
        Some(tab_id) => TokenCache::open(&storage_dir, &tab_id).map(|tokens| (tab_id, tokens)),
        None => TokenCache::open_free(&storage_dir, DEFAULT_TAB_PREFIX),
    };
    let (tab_id, tokens) = match claimed {
        Ok(claimed) => claimed,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let poll_interval = match config.storage.poll_interval() {
        Ok(interval) => interval,
        Err(e) => {
            eprintln!("Config error: {e}");
            return ExitCode::FAILURE;
        }
    };
    // One tab per process: other tabs are only reachable through storage.
    let bus = CrossTabBus::new(tab_id.clone(), None, Some(Mailbox::in_storage(&storage_dir)))
        .with_poll_interval(poll_interval);

    let coordinator = SessionCoordinator::new(
        owner.clone(),
        Arc::new(client.clone()),
        bus,
        Arc::new(tokens),
        Arc::new(ConsolePrompter::new(&config.prompts)),
    );
    let mut tab = Tab::start(coordinator);

    #[cfg(unix)]
    let guard = LifecycleGuard::spawn(tab.events())
        .map_err(|e| tracing::warn!(error = %e, "signal handlers unavailable"))
        .ok();
    #[cfg(not(unix))]
    let guard: Option<LifecycleGuard> = None;

    eprintln!("tab {tab_id} as {owner} on {}; type `help` for commands", client.base_url());
    tracing::info!(tab = %tab_id, storage = %storage_dir.display(), "tab ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match parse_line(&line) {
                    Ok(Line::Quit) => {
                        let step = tab.handle(LifecycleSignal::BeforeUnload.into()).await;
                        if report_step(step) {
                            break;
                        }
                    }
                    Ok(Line::Focus) => {
                        let step = tab.handle(LifecycleSignal::FocusGained.into()).await;
                        if report_step(step) {
                            break;
                        }
                    }
                    Ok(command) => run_command(&tab, command).await,
                    Err(message) => eprintln!("{message}"),
                },
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Error: failed to read input: {e}");
                    break;
                }
            },
            Some(event) = tab.next_event() => {
                if report_step(tab.handle(event).await) {
                    break;
                }
            }
        }
    }

    if let Some(guard) = guard {
        guard.stop();
    }
    tab.shutdown().await;
    let flushed = client.flush_beacons(BEACON_GRACE).await;
    if flushed > 0 {
        tracing::debug!(flushed, "waited for unlock beacons");
    }
    ExitCode::SUCCESS
}

/// Prints what a step means for the user; returns `true` when the tab ended.
fn report_step(step: TabStep) -> bool {
    match step {
        TabStep::Continue => false,
        TabStep::UnloadBlocked => {
            eprintln!("There are unsaved changes. Quit again (or Ctrl-C) to leave anyway.");
            false
        }
        TabStep::Exit => true,
    }
}

async fn run_command(tab: &Tab, command: Line) {
    let coordinator = tab.coordinator();
    let store = coordinator.store();
    match command {
        Line::Empty | Line::Quit | Line::Focus => {}
        Line::Help => println!("{HELP}"),
        Line::Open(path) => {
            // Failures were already reported by the prompter.
            if let Ok(state) = coordinator.open_file_path(&path).await {
                println!("{path}: {state}");
            }
        }
        Line::Edit { path, text } => report_edit(&path, coordinator.edit(&path, text).await),
        Line::Append { path, text } => {
            let Some(session) = store.get(&path).await else {
                eprintln!("{path} is not open");
                return;
            };
            let content = session.content + &text;
            report_edit(&path, coordinator.edit(&path, content).await);
        }
        Line::Save(path) => {
            let result = match &path {
                Some(path) => coordinator.save(path).await,
                None => coordinator.save_active().await,
            };
            match result {
                Ok(SaveOutcome::Saved) => println!("saved"),
                Ok(SaveOutcome::NotDirty) => println!("nothing to save"),
                Ok(SaveOutcome::NoActiveSession) => println!("no document is open"),
                Err(_) => {}
            }
        }
        Line::Close(path) => match coordinator.close(&path).await {
            Ok(report) => println!("closed {} (save: {:?}, unlock: {:?})", report.path, report.save, report.unlock),
            Err(e) => eprintln!("error: {e}"),
        },
        Line::Refresh { path, force } => {
            let result = if force {
                coordinator.discard_and_reload(&path).await
            } else {
                coordinator.refresh(&path).await
            };
            match result {
                Ok(true) => println!("{path} reloaded"),
                Ok(false) => println!("{path} not reloaded"),
                Err(e) => eprintln!("error: {e}"),
            }
        }
        Line::Activate(path) => match coordinator.activate(&path).await {
            Ok(()) => println!("{path} is active"),
            Err(e) => eprintln!("error: {e}"),
        },
        Line::List => {
            let active = store.active_path().await;
            let mut sessions = store.list_all().await;
            sessions.sort_by(|a, b| a.opened_at.cmp(&b.opened_at));
            if sessions.is_empty() {
                println!("no documents open");
            }
            for session in sessions {
                let marker = if active.as_deref() == Some(session.path.as_str()) { "*" } else { " " };
                let stale = if session.flags.stale { " (stale)" } else { "" };
                println!(
                    "{marker} {} [{}] {}{stale}",
                    session.path,
                    session.language,
                    session.state()
                );
            }
        }
        Line::Show(path) => {
            let session = match path {
                Some(path) => store.get(&path).await,
                None => store.active().await,
            };
            match session {
                Some(session) => println!("{}", session.content),
                None => eprintln!("no such document open"),
            }
        }
        Line::LockInfo(path) => match coordinator.lock_info(&path).await {
            Ok(info) => match (info.locked, info.owner) {
                (false, _) => println!("{path}: unlocked"),
                (true, Some(owner)) => println!("{path}: locked by {owner}"),
                (true, None) => println!("{path}: locked"),
            },
            Err(e) => eprintln!("error: {e}"),
        },
    }
}

fn report_edit(path: &str, result: Result<bool, tabdoc::error::SessionError>) {
    match result {
        Ok(true) => {}
        Ok(false) => eprintln!("{path} is read-only"),
        Err(e) => eprintln!("error: {e}"),
    }
}

/// Splits off the first whitespace-delimited word.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn parse_line(line: &str) -> Result<Line, String> {
    let (command, rest) = split_word(line.trim());
    let (arg, tail) = split_word(rest);
    let path = || {
        if arg.is_empty() {
            Err(format!("usage: {command} <path>"))
        } else {
            Ok(arg.to_string())
        }
    };
    let text = || tail.replace("\\n", "\n");

    Ok(match command {
        "" => Line::Empty,
        "help" | "?" => Line::Help,
        "open" => Line::Open(path()?),
        "edit" => Line::Edit {
            path: path()?,
            text: text(),
        },
        "append" => Line::Append {
            path: path()?,
            text: text(),
        },
        "save" => Line::Save((!arg.is_empty()).then(|| arg.to_string())),
        "close" => Line::Close(path()?),
        "refresh" => Line::Refresh {
            path: path()?,
            force: false,
        },
        "refresh!" => Line::Refresh {
            path: path()?,
            force: true,
        },
        "activate" => Line::Activate(path()?),
        "list" | "ls" => Line::List,
        "show" => Line::Show((!arg.is_empty()).then(|| arg.to_string())),
        "lockinfo" => Line::LockInfo(path()?),
        "focus" => Line::Focus,
        "quit" | "exit" => Line::Quit,
        other => return Err(format!("unknown command `{other}`; try `help`")),
    })
}
