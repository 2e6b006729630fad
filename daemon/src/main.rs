use std::sync::Arc;
use tokio::sync::mpsc;

use warden_daemon::game::FsProbe;
use warden_daemon::status::{self, SessionStatus};
use warden_daemon::{config, event, logging, paths, SessionState};

const USAGE: &str = "\
warden-daemon v{version}

Usage: warden-daemon [--game <folder>]

  --game <folder>   Select this game on startup instead of the configured one
  -h, --help        Print this help";

#[tokio::main]
async fn main() {
    // ── Arguments ─────────────────────────────────────────────────────────────
    let mut cmd_line_game: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--game" => match args.next() {
                Some(folder) => cmd_line_game = Some(folder),
                None => {
                    eprintln!("--game requires a folder name");
                    std::process::exit(2);
                }
            },
            "--help" | "-h" => {
                println!("{}", USAGE.replace("{version}", env!("CARGO_PKG_VERSION")));
                return;
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
    }

    // ── App data directory ────────────────────────────────────────────────────
    let data_dir = match paths::app_data_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
    };
    let settings_path = paths::settings_file_path(&data_dir);
    let status_path = paths::status_file_path(&data_dir);

    // ── Settings & logging ────────────────────────────────────────────────────
    let mut state = SessionState::new(data_dir.clone(), Box::new(FsProbe));
    let settings = state.read_settings_file(&settings_path);

    let log_file = match logging::open_log_file(&paths::log_file_path(&data_dir)) {
        Ok(file) => Some(file),
        Err(e) => {
            state.record_init_error(format!("Error: {e:#}"));
            None
        }
    };
    match logging::init(log_file, settings.enable_debug_logging) {
        Ok(control) => {
            state.set_log_control(control);
            state.log_init_errors();
        }
        Err(e) => eprintln!("[logging] {e:#}"),
    }
    tracing::info!("warden-daemon version: {}", env!("CARGO_PKG_VERSION"));

    // ── Game detection ────────────────────────────────────────────────────────
    state.init(settings, cmd_line_game.as_deref());
    let state = Arc::new(state);
    status::write_status(&status_path, &SessionStatus::capture(&state, None));

    let (event_tx, mut event_rx) = mpsc::channel::<event::SessionEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(settings_path.clone(), event_tx.clone()));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::SessionEvent::Shutdown).await;
            }
        });
    }

    match state.current_game() {
        Ok(game) => tracing::info!("warden-daemon started, current game: {}", game.name()),
        Err(e) => tracing::warn!("warden-daemon started without a game: {e}"),
    }

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::SessionEvent::ConfigReloaded(settings) => {
                tracing::info!("Settings reloaded");
                // Reconciliation can probe the filesystem; keep it off the async workers.
                let reload_state = Arc::clone(&state);
                let result =
                    tokio::task::spawn_blocking(move || reload_state.load(settings)).await;
                let error = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => {
                        tracing::error!("[session] Reload failed: {e}");
                        Some(e.to_string())
                    }
                    Err(e) => {
                        tracing::error!("[session] Reload task failed: {e}");
                        Some(format!("Reload task failed: {e}"))
                    }
                };
                status::write_status(&status_path, &SessionStatus::capture(&state, error));
            }

            event::SessionEvent::Shutdown => {
                tracing::info!("Shutting down");
                if let Err(e) = state.save(&settings_path) {
                    tracing::error!("[session] Failed to save settings: {e:#}");
                }
                status::write_status(&status_path, &SessionStatus::capture(&state, None));
                break;
            }
        }
    }
}
