//! CLI entry point (§6): the root verb hosts a session implicitly;
//! `attach <session>` joins one already advertised under that name.

mod input;
mod render;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tandem_core::{Event, Key};
use tandem_engine::{Config, EngineError, Session};
use tandem_share::ShareClient;
use tandem_transport::{load_or_generate_identity, IdentityError, P2pTransport, Transport, TransportError};
use tokio::sync::mpsc;

use input::InputReader;
use render::TerminalRenderer;

#[derive(Parser)]
#[command(name = "tandem", about = "Collaborative terminal multiplexer")]
struct Cli {
    /// Rendezvous name this host advertises itself under.
    #[arg(long, default_value = "tandem")]
    name: String,

    /// TOML file of session tunables (§10.3); missing/invalid falls back to defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Join a session advertised under `session`.
    Attach { session: String },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Session(#[from] EngineError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// `--config` takes precedence; absent, falls back to the platform config
/// dir the same way `tandem_transport::load_or_generate_identity` locates
/// the persisted identity file.
fn default_config_path() -> Option<PathBuf> {
    let mut dir = dirs::config_dir()?;
    dir.push("tandem");
    dir.push("config.toml");
    Some(dir)
}

fn load_config(path: Option<&std::path::Path>) -> Config {
    let owned;
    let path = match path {
        Some(p) => p,
        None => match default_config_path() {
            Some(p) => {
                owned = p;
                &owned
            }
            None => return Config::default(),
        },
    };
    if !path.exists() {
        return Config::default();
    }
    match std::fs::read_to_string(path) {
        Ok(text) => match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "invalid config file, using defaults");
                Config::default()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "could not read config file, using defaults");
            Config::default()
        }
    }
}

/// Ctrl-Q is the one binding that bypasses pane routing entirely: a clean
/// quit, exit code 0, regardless of which pane is focused (§6).
fn is_quit(event: &Event) -> bool {
    matches!(event, Event::Key { key: Key::Char('q'), mods, .. } if mods.ctrl)
}

struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(io::stdout(), crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(io::stdout(), crossterm::cursor::Show, crossterm::terminal::LeaveAlternateScreen);
        let _ = crossterm::terminal::disable_raw_mode();
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().expect("build tokio runtime");

    match runtime.block_on(run(cli)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = ?e, "fatal");
            eprintln!("tandem: {e:#}");
            std::process::exit(1);
        }
    }
}

/// The per-crate errors aggregate into `CliError` via `thiserror`'s `#[from]`
/// (§10.2); `anyhow::Context` only wraps them here, at the outermost
/// boundary, to attach what the CLI itself was doing when they surfaced.
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref());
    let identity = load_or_generate_identity().map_err(CliError::from).context("loading host identity")?;
    let transport: Arc<dyn Transport> =
        Arc::new(P2pTransport::new(identity).map_err(CliError::from).context("starting p2p transport")?);
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));

    match cli.command {
        None => host(transport, &cli.name, cols, rows, &config).await.context("hosting session"),
        Some(Command::Attach { session }) => attach(transport, &session).await.context(format!("attaching to {session}")),
    }
}

/// Hosts a session: owns the pane tree and every pty, advertises under
/// `name` so joiners can find it, and renders its own local view straight
/// off the session rather than through the wire protocol it serves to
/// everyone else.
async fn host(transport: Arc<dyn Transport>, name: &str, cols: u16, rows: u16, config: &Config) -> Result<(), CliError> {
    let session = Session::with_config(cols, rows, config)?;
    let _ = transport.discover(name);
    let accept = session.run_share_server(transport);

    let _raw = RawModeGuard::enable()?;
    let renderer = TerminalRenderer::new();
    renderer.draw_frame(&session.render())?;

    let mut ticks = session.subscribe_dirty();
    let mut input = InputReader::new();

    loop {
        tokio::select! {
            changed = ticks.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            event = input.next() => {
                match event {
                    Some(Ok(event)) => {
                        if is_quit(&event) {
                            break;
                        }
                        session.handle_local_event(event);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "input read error");
                        break;
                    }
                    None => break,
                }
            }
        }

        if session.is_empty() {
            break;
        }
        renderer.draw_frame(&session.render())?;
    }

    session.shutdown();
    accept.abort();
    Ok(())
}

/// Joins an advertised session: feeds local input into a `ShareClient` and
/// lets it drive the terminal renderer off the frames it receives (§4.8).
async fn attach(transport: Arc<dyn Transport>, session: &str) -> Result<(), CliError> {
    let _raw = RawModeGuard::enable()?;
    let renderer = Arc::new(TerminalRenderer::new());
    let client = Arc::new(ShareClient::new(transport, session.to_string(), renderer));

    let (tx, rx) = mpsc::unbounded_channel();
    let client_task = {
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.run(rx).await {
                tracing::warn!(error = %e, "share client ended");
            }
        })
    };

    let mut input = InputReader::new();
    loop {
        match input.next().await {
            Some(Ok(event)) => {
                let quit = is_quit(&event);
                let _ = tx.send(event);
                if quit {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e, "input read error");
                break;
            }
            None => break,
        }
    }

    client_task.abort();
    Ok(())
}
