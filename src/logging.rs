use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use lazy_static::lazy_static;
use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    static ref LOG_FILE: Mutex<Option<File>> = Mutex::new(None);
}

/// Open (or create) the log file and write the session marker
pub fn init_logger() -> anyhow::Result<File> {
    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;
    let tracing_handle = file.try_clone()?;

    if let Ok(mut log_file) = LOG_FILE.lock() {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = file;
        let _ = writeln!(file, "\n=== MemoDrops admin session started at {} ===\n", timestamp);
        *log_file = Some(file);
    }

    Ok(tracing_handle)
}

fn get_log_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("memodrops").join("memodrops.log")
    } else {
        PathBuf::from("memodrops.log")
    }
}

/// Log a message to file. No-op until `init_logger` has run.
pub fn log(level: &str, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    let formatted = format!("[{}] {}: {}", timestamp, level, message);

    if let Ok(mut log_file) = LOG_FILE.lock() {
        if let Some(ref mut f) = *log_file {
            let _ = writeln!(f, "{}", formatted);
            let _ = f.flush();
        }
    }
}

/// Macros for easier logging
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log("INFO", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log("DEBUG", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log("WARN", &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log("ERROR", &format!($($arg)*));
    };
}

/// Get the current log file path for display
pub fn get_log_path_display() -> String {
    get_log_path().display().to_string()
}

/// Install the global tracing subscriber.
///
/// With `to_file` (terminal UI mode) events go to the log file so they
/// don't tear the screen; otherwise they go to stderr.
pub fn init_tracing(verbose: bool, to_file: bool) {
    let filter = if verbose {
        "memodrops=debug,info"
    } else {
        "memodrops=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if to_file {
        match init_logger() {
            Ok(file) => {
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(false)
                            .with_ansi(false)
                            .with_writer(Mutex::new(file)),
                    )
                    .try_init();
                return;
            }
            Err(e) => {
                eprintln!("warning: cannot open log file {}: {}", get_log_path_display(), e);
            }
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
