use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

const DEBUG_FILTER: &str = "trace";
const DEFAULT_FILTER: &str = "warn";

/// Switches log verbosity after the subscriber is installed.
#[derive(Clone)]
pub struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set, so the settings flag is ignored.
    env_override: bool,
}

impl LogControl {
    /// Logs everything when `enabled`, warnings and errors otherwise.
    pub fn set_debug(&self, enabled: bool) {
        if self.env_override {
            return;
        }
        if let Err(e) = self.handle.reload(filter_for(enabled)) {
            eprintln!("[logging] Failed to change log level: {e}");
        }
    }
}

fn filter_for(debug: bool) -> EnvFilter {
    EnvFilter::new(if debug { DEBUG_FILTER } else { DEFAULT_FILTER })
}

/// Truncates and opens the log file at `path`.
pub fn open_log_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Could not open log file {}", path.display()))
}

/// Installs the global subscriber: stderr plus, if given, `log_file`.
pub fn init(log_file: Option<File>, debug: bool) -> Result<LogControl> {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let env_override = env_filter.is_some();
    let (filter, handle) = reload::Layer::new(env_filter.unwrap_or_else(|| filter_for(debug)));

    let file_layer = log_file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogControl {
        handle,
        env_override,
    })
}
