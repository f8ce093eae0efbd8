// src/telemetry.rs
//! Tracing subscriber setup.
//!
//! The terminal belongs to the UI, so log lines always go to a file.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

const DEFAULT_LOG_FILE: &str = "levelscope.log";

/// Where logs go: `requested` if given, else `levelscope.log` in the
/// system temp directory.
pub fn log_path(requested: Option<&Path>) -> PathBuf {
    requested
        .map(Path::to_path_buf)
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE))
}

/// Install the global subscriber once, writing to `log_file`. If the file
/// cannot be created, logs are discarded. `RUST_LOG` overrides the default
/// `levelscope=info`.
pub fn init(log_file: &Path) {
    TELEMETRY_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("levelscope=info"))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::INFO.into()));

        let builder = fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_ansi(false)
            .compact();

        let result = match File::create(log_file) {
            Ok(file) => builder.with_writer(Mutex::new(file)).try_init(),
            Err(err) => {
                eprintln!(
                    "[telemetry] cannot open {}, logging disabled: {err}",
                    log_file.display()
                );
                builder.with_writer(std::io::sink).try_init()
            }
        };
        if let Err(err) = result {
            eprintln!("[telemetry] failed to initialise tracing subscriber: {err}");
        }
    });
}
