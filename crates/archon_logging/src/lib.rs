//! Tracing/log setup for Archon Core.
//!
//! Two layers are always installed: a rolling file writer under
//! [`logs_dir`] and a stderr writer. Both are driven by `EnvFilter`, with
//! the stderr layer defaulting to a quieter filter when running inside a
//! TUI/console-sensitive front end.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing_subscriber::{fmt::MakeWriter, prelude::*, EnvFilter};

const MAX_LOG_FILE_SIZE: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: u32 = 5;
const DEFAULT_FILTER: &str = "archon=info,tower_http=info,sqlx=warn";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to create logs directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to open log file {path}: {source}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Configuration for [`init_logging`].
pub struct LogConfig<'a> {
    /// Used both as the log file stem and the default `EnvFilter` target.
    pub app_name: &'a str,
    pub verbose: bool,
    /// When true, the stderr layer is filtered to `warn` and above so it
    /// doesn't clobber an interactive console/TUI.
    pub quiet_console: bool,
}

impl<'a> LogConfig<'a> {
    pub fn new(app_name: &'a str) -> Self {
        Self {
            app_name,
            verbose: false,
            quiet_console: false,
        }
    }
}

/// Root directory for persisted Archon state: `$ARCHON_HOME`, else
/// `~/.archon`.
pub fn archon_home() -> PathBuf {
    if let Ok(custom) = std::env::var("ARCHON_HOME") {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".archon")
}

pub fn logs_dir() -> PathBuf {
    archon_home().join("logs")
}

pub fn ensure_logs_dir() -> Result<PathBuf, LoggingError> {
    let dir = logs_dir();
    fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Installs the global tracing subscriber. Safe to call once per process;
/// a second call will return a [`LoggingError::SetGlobalDefault`].
pub fn init_logging(config: LogConfig<'_>) -> Result<(), LoggingError> {
    let dir = ensure_logs_dir()?;
    let file_name = sanitize_name(config.app_name);
    let file_path = dir.join(format!("{file_name}.log"));

    let writer = SharedRollingWriter::new(file_path)?;

    let file_filter = build_filter(config.app_name, config.verbose);
    let console_filter = if config.quiet_console {
        EnvFilter::new("warn")
    } else {
        build_filter(config.app_name, config.verbose)
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_filter(file_filter);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;
    Ok(())
}

/// Installs a console-only subscriber for `#[tokio::test]`/unit tests, so
/// test runs don't litter `~/.archon/logs`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

fn build_filter(app_name: &str, verbose: bool) -> EnvFilter {
    if let Ok(from_env) = std::env::var("RUST_LOG") {
        return EnvFilter::new(from_env);
    }
    if verbose {
        EnvFilter::new(format!("{app_name}=debug,tower_http=debug,sqlx=info"))
    } else {
        EnvFilter::new(DEFAULT_FILTER)
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Rotating file writer: rotates at [`MAX_LOG_FILE_SIZE`] bytes, keeping up
/// to [`MAX_LOG_FILES`] numbered backups (`name.log.1` .. `name.log.N`).
struct RollingFileAppender {
    path: PathBuf,
    file: File,
    written: u64,
}

impl RollingFileAppender {
    fn new(path: PathBuf) -> Result<Self, LoggingError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::OpenFile {
                path: path.clone(),
                source,
            })?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            path,
            file,
            written,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        for i in (1..MAX_LOG_FILES).rev() {
            let src = self.numbered_path(i);
            let dst = self.numbered_path(i + 1);
            if src.exists() {
                let _ = fs::rename(src, dst);
            }
        }
        let first_backup = self.numbered_path(1);
        fs::rename(&self.path, &first_backup)?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }

    fn numbered_path(&self, n: u32) -> PathBuf {
        let mut os = self.path.clone().into_os_string();
        os.push(format!(".{n}"));
        PathBuf::from(os)
    }
}

impl Write for RollingFileAppender {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written >= MAX_LOG_FILE_SIZE {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

#[derive(Clone)]
struct SharedRollingWriter {
    inner: Arc<Mutex<RollingFileAppender>>,
}

impl SharedRollingWriter {
    fn new(path: PathBuf) -> Result<Self, LoggingError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFileAppender::new(path)?)),
        })
    }
}

impl Write for SharedRollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap().flush()
    }
}

impl<'a> MakeWriter<'a> for SharedRollingWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_strips_unsafe_characters() {
        assert_eq!(sanitize_name("archon api/v1"), "archon_api_v1");
    }

    #[test]
    fn archon_home_respects_env_override() {
        std::env::set_var("ARCHON_HOME", "/tmp/archon-test-home");
        assert_eq!(archon_home(), PathBuf::from("/tmp/archon-test-home"));
        std::env::remove_var("ARCHON_HOME");
    }

    #[test]
    fn rolling_appender_rotates_past_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.log");
        let mut appender = RollingFileAppender::new(path.clone()).unwrap();
        appender.written = MAX_LOG_FILE_SIZE;
        appender.write_all(b"hello").unwrap();
        assert!(path.with_extension("log.1").exists() || appender.numbered_path(1).exists());
    }
}
