//! src/main.rs
//! Headless driver: line commands on stdin, one printed line per snapshot.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    signal,
    sync::{mpsc, watch},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use dex_core::{
    Logger,
    cache::CachedLookup,
    config::Config,
    controller::{Action, EventLoop, ScrollMetrics, ScrollTrigger, SearchOrchestrator},
    lookup::{HttpLookup, LookupService},
    model::{Catalog, SearchSnapshot, Tag},
    storage::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore},
    util::debounce::DebounceConfig,
};

const HELP: &str = "commands: type <text> | tag <name> | clear | scroll <viewport> <scroll_y> <doc> | more | retry | top | quit";

/// Command-line arguments accepted by the `dex` binary.
#[derive(Parser, Debug)]
#[command(
    name = "dex",
    version,
    about = "Incremental catalog search driven from stdin"
)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file (default: platform config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Catalog JSON to search (default: bundled catalog)"
    )]
    catalog: Option<PathBuf>,

    #[arg(
        long,
        value_name = "URL",
        help = "Override the lookup service base URL"
    )]
    base_url: Option<String>,

    #[arg(
        short,
        long,
        help = "Keep preferences in memory only (default: disabled)"
    )]
    ephemeral: bool,

    #[arg(
        long,
        value_name = "LEVEL",
        help = "Override the log level or filter directive"
    )]
    log_level: Option<String>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).await?;
    let _log_guard =
        Logger::init_tracing(&config.logging).context("Failed to initialize logging")?;
    info!("Starting dex");

    let catalog = match &args.catalog {
        Some(path) => Catalog::load(path)
            .await
            .with_context(|| format!("Failed to load catalog from {}", path.display()))?,
        None => Catalog::bundled().context("Failed to load bundled catalog")?,
    };
    let catalog = Catalog::install(catalog)?;

    let lookup = build_lookup(&config)?;
    let prefs = build_preferences(&config, args.ephemeral).await?;

    let (orchestrator, task_rx) = SearchOrchestrator::new(
        catalog,
        lookup,
        prefs,
        config.search.page_size,
        ScrollTrigger::new(config.search.scroll_threshold_px),
    );
    let (action_tx, action_rx) = mpsc::unbounded_channel::<Action>();
    let (event_loop, snapshots) = EventLoop::new(
        orchestrator,
        task_rx,
        action_rx,
        DebounceConfig::with_delay(config.search.debounce),
    );

    let cancel = event_loop.cancellation_token();
    setup_shutdown_handler(cancel.clone());

    let printer = tokio::spawn(print_snapshots(snapshots));
    let event_loop = tokio::spawn(event_loop.run());

    eprintln!("{HELP}");
    read_commands(action_tx, cancel).await?;

    let stats = event_loop.await.context("Event loop task failed")?;
    printer.await.context("Printer task failed")?;

    info!(
        actions = stats.actions,
        tasks = stats.tasks,
        discarded = stats.discarded,
        "dex exited cleanly"
    );
    Ok(())
}

async fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().await.unwrap_or_else(|e| {
            eprintln!("Failed to load config, using defaults: {e}");
            Config::default()
        }),
    };

    if let Some(base_url) = &args.base_url {
        config.api.base_url.clone_from(base_url);
    }
    if let Some(level) = &args.log_level {
        config.logging.log_level.clone_from(level);
    }
    config.validate()?;
    Ok(config)
}

fn build_lookup(config: &Config) -> Result<Arc<dyn LookupService>> {
    let http = HttpLookup::new(&config.api).context("Failed to build lookup client")?;
    info!(base_url = %config.api.base_url, cache = config.cache.enabled, "Lookup service ready");

    if config.cache.enabled {
        Ok(Arc::new(CachedLookup::new(http, &config.cache)))
    } else {
        Ok(Arc::new(http))
    }
}

async fn build_preferences(config: &Config, ephemeral: bool) -> Result<Arc<dyn PreferenceStore>> {
    if ephemeral {
        return Ok(Arc::new(MemoryPreferenceStore::new()));
    }

    let path = config.preferences_path()?;
    let store = FilePreferenceStore::open(&path)
        .await
        .with_context(|| format!("Failed to open preferences at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// Feeds stdin lines to the event loop until `quit`, EOF, or shutdown.
async fn read_commands(action_tx: mpsc::UnboundedSender<Action>, cancel: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };

        let Some(line) = line else {
            info!("stdin closed");
            break;
        };

        match parse_command(&line) {
            Ok(Some(action)) => {
                let quit = action == Action::Quit;
                if action_tx.send(action).is_err() || quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => eprintln!("{e}\n{HELP}"),
        }
    }

    // Dropping the sender ends the loop if `quit` was never sent.
    Ok(())
}

fn parse_command(line: &str) -> Result<Option<Action>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (command, rest) = line
        .trim_start()
        .split_once(' ')
        .unwrap_or((line.trim(), ""));

    let action = match command {
        "" => return Ok(None),
        "type" => Action::TextInput(rest.to_owned()),
        "tag" => {
            let tag = rest.trim();
            if tag.is_empty() {
                bail!("tag needs a name");
            }
            Action::ToggleTag(Tag::new(tag))
        }
        "clear" => Action::ClearTags,
        "scroll" => {
            let parts = rest
                .split_whitespace()
                .map(str::parse::<u32>)
                .collect::<Result<Vec<_>, _>>()
                .context("scroll takes three pixel values")?;
            let &[viewport, scroll_y, document] = parts.as_slice() else {
                bail!("scroll takes three pixel values");
            };
            Action::Scroll(ScrollMetrics::new(viewport, scroll_y, document))
        }
        "more" => Action::LoadMore,
        "retry" => Action::Retry,
        "top" => Action::ScrollToTop,
        "quit" | "exit" => Action::Quit,
        other => bail!("unknown command '{other}'"),
    };
    Ok(Some(action))
}

async fn print_snapshots(mut snapshots: watch::Receiver<SearchSnapshot>) {
    let mut last_printed: Option<String> = None;
    loop {
        let line = render(&snapshots.borrow_and_update());
        if last_printed.as_ref() != Some(&line) {
            println!("{line}");
            last_printed = Some(line);
        }

        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

fn render(snapshot: &SearchSnapshot) -> String {
    let tags: Vec<&str> = snapshot.filter.tags.iter().map(Tag::as_str).collect();
    let mut out = format!(
        "[{}] {:?} text={:?} tags=[{}] results={}{}",
        snapshot.epoch,
        snapshot.phase,
        snapshot.filter.text,
        tags.join(","),
        snapshot.results.len(),
        if snapshot.has_more { " (more)" } else { "" },
    );

    if let Some(error) = &snapshot.error {
        out.push_str(&format!("\n  {}: {}", error.title(), error.message()));
        return out;
    }

    if !snapshot.is_loading {
        for record in snapshot.results.iter() {
            out.push_str(&format!("\n  #{:<4} {}", record.id, record.name));
        }
    }
    out
}

fn setup_shutdown_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C");
        cancel.cancel();
    });
}
