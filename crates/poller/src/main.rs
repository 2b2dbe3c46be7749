#![forbid(unsafe_code)]

use dash_core::Dashboard;
use dash_poller::config::process_env;
use dash_poller::dto::dashboard_dto;
use dash_poller::{
    ConfigError, HttpFetcher, ParsedArgs, PollerHandle, SystemClock, UpdateCause, parse_args,
    usage,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::mpsc;
use tracing::{error, info, warn};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn print_line(line: &str) {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// stdin control: `show`, `hide`, `reload`, `quit`. Returns on `quit` or EOF.
fn read_commands(handle: &PollerHandle, parsed: &ParsedArgs) -> bool {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            return false;
        };
        let result = match line.trim() {
            "" => continue,
            "show" => handle.set_visible(true),
            "hide" => handle.set_visible(false),
            "reload" => match parsed
                .config
                .reload_preferences(&parsed.refresh_overrides)
            {
                Ok(prefs) => handle.update_preferences(prefs.dashboard_config()),
                Err(err) => {
                    warn!(%err, "reload failed");
                    continue;
                }
            },
            "quit" => return true,
            other => {
                warn!(command = other, "unknown command (expected show|hide|reload|quit)");
                continue;
            }
        };
        if let Err(err) = result {
            error!(%err, "poller not running");
            return true;
        }
    }
    false
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let parsed = match parse_args(&args, &process_env) {
        Ok(parsed) => parsed,
        Err(ConfigError::HelpRequested) => {
            print!("{}", usage());
            return Ok(());
        }
        Err(err) => {
            eprintln!("{err}\n\n{}", usage());
            std::process::exit(2);
        }
    };
    init_tracing();

    let cfg = &parsed.config;
    let dashboard = Dashboard::new(&cfg.preferences.dashboard_config(), cfg.did.is_some())
        .map_err(ConfigError::from)?;
    let fetcher = Arc::new(HttpFetcher::new(&cfg.base_url, cfg.sid, cfg.did, cfg.timeout));
    info!(base_url = %cfg.base_url, sid = cfg.sid, did = ?cfg.did, "starting dashboard poller");

    let once = cfg.once;
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let sink = move |update: dash_poller::PollerUpdate| {
        let dto = dashboard_dto(
            &update.view,
            update.cause.as_str(),
            dash_poller::time::now_rfc3339(),
        );
        match serde_json::to_string(&dto) {
            Ok(line) => print_line(&line),
            Err(err) => error!(%err, "failed to encode dashboard view"),
        }
        if once && matches!(update.cause, UpdateCause::Fetched | UpdateCause::FetchFailed) {
            let _ = done_tx.send(());
        }
    };

    let handle = dash_poller::spawn(dashboard, fetcher, SystemClock, sink)?;
    if !cfg.start_hidden {
        handle.set_visible(true)?;
    }

    if once {
        let _ = done_rx.recv();
    } else if !read_commands(&handle, &parsed) {
        // stdin closed: keep polling until the loop ends.
        let _ = done_rx.recv();
    }
    handle.stop();
    Ok(())
}
