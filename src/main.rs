use clap::Parser;
use derive_more::{Display, Error};
use exn::{Exn, ResultExt};
use livepkg_bundle::{Broadcaster, Bundle, Frame, Live, Loader};
use livepkg_config::Config;
use livepkg_storage::BackendHandle;
use livepkg_storage::backend::{DeadlineBackend, LocalBackend};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Display, Error)]
enum ErrorKind {
    #[display("unable to load configuration")]
    Config,
    #[display("unable to open storage root")]
    Storage,
    #[display("unable to write output")]
    Output,
}

/// Watch script and style sources and print what changes, in dependency
/// order.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "LIVEPKG_CONFIG")]
    config: Option<PathBuf>,
    /// Directory that source paths are resolved against.
    #[arg(short, long)]
    root: Option<PathBuf>,
    /// Milliseconds between reloads.
    #[arg(short, long)]
    interval: Option<u64>,
    /// Reload once, print the snapshot and exit.
    #[arg(long)]
    once: bool,
    /// Entry points, replacing the configured ones.
    entries: Vec<String>,
}

impl Args {
    fn config(&self) -> Result<Config, Exn<ErrorKind>> {
        let file = self.config.clone().or_else(Config::default_path);
        let mut config: Config =
            Config::figment(file.as_deref()).or_raise(|| ErrorKind::Config)?.extract().or_raise(|| ErrorKind::Config)?;
        if let Some(root) = &self.root {
            config.root = root.clone();
        }
        if let Some(interval) = self.interval {
            config.interval_ms = interval;
        }
        if !self.entries.is_empty() {
            config.entries = self.entries.clone();
        }
        config.validate().or_raise(|| ErrorKind::Config)?;
        Ok(config)
    }
}

fn live(config: &Config) -> Result<Arc<Live>, Exn<ErrorKind>> {
    let local = LocalBackend::new("local", &config.root).or_raise(|| ErrorKind::Storage)?;
    let backend: BackendHandle = match config.read_timeout() {
        Some(timeout) => Arc::new(DeadlineBackend::new(Arc::new(local), timeout)),
        None => Arc::new(local),
    };
    let loader = Loader::new(backend, config.extractor().or_raise(|| ErrorKind::Config)?).with_unknown(config.unknown);
    let bundle = Bundle::new(loader, &config.entries);
    Ok(Arc::new(Live::new(bundle, Broadcaster::new(config.queue))))
}

fn print(value: &impl serde::Serialize) -> Result<(), Exn<ErrorKind>> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, value).or_raise(|| ErrorKind::Output)?;
    writeln!(stdout).or_raise(|| ErrorKind::Output)?;
    Ok(())
}

async fn run(args: Args) -> Result<ExitCode, Exn<ErrorKind>> {
    let config = args.config()?;
    let live = live(&config)?;

    if args.once {
        let (reloaded, _) = live.reload().await;
        print(&live.info(None))?;
        return Ok(match reloaded.errors.has_entry_point_failure() {
            true => ExitCode::FAILURE,
            false => ExitCode::SUCCESS,
        });
    }

    let mut subscription = live.subscribe();
    let monitor = live.spawn_monitor(config.interval());
    tracing::info!(root = %config.root.display(), interval = ?config.interval(), "Watching for changes");
    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(Frame::Handshake) => tracing::debug!(subscriber = subscription.id(), "Subscribed"),
                Some(Frame::Change(change)) => print(change.as_ref())?,
                Some(Frame::Resync) => print(&live.info(None))?,
                None => {
                    tracing::warn!("Fell behind the change stream, resubscribing");
                    subscription = live.subscribe();
                    print(&live.info(None))?;
                },
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    monitor.abort();
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:?}");
            ExitCode::FAILURE
        },
    }
}
