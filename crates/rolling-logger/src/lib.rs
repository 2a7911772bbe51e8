//! Rolling File Logger
//!
//! Writes formatted `tracing` output (and `log` records, bridged by the
//! subscriber) to `<dir>/<app>.log`, rotating into `<app>.log.1..N` once the
//! file grows past a size limit. The most recent lines are also kept in
//! memory so they can be shown or attached to a bug report.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

/// Size at which the active file is rotated
pub const DEFAULT_MAX_BYTES: u64 = 1024 * 1024;
/// Rotated files kept besides the active one
pub const DEFAULT_KEEP_FILES: usize = 3;
/// Lines kept in memory
pub const DEFAULT_BUFFER_LINES: usize = 500;

static WRITER: OnceLock<RollingWriter> = OnceLock::new();

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    file: File,
    written: u64,
    max_bytes: u64,
    keep_files: usize,
    recent: VecDeque<String>,
    capacity: usize,
    /// Bytes after the last newline
    partial: Vec<u8>,
}

impl RollingFile {
    fn active_path(&self) -> PathBuf {
        log_path(&self.dir, &self.app_name)
    }

    fn rotated_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}.log.{}", self.app_name, index))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.rotated_path(self.keep_files);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.keep_files).rev() {
            let from = self.rotated_path(index);
            if from.exists() {
                fs::rename(&from, self.rotated_path(index + 1))?;
            }
        }
        if self.keep_files > 0 {
            fs::rename(self.active_path(), self.rotated_path(1))?;
        }
        self.file = File::create(self.active_path())?;
        self.written = 0;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.partial.extend_from_slice(buf);
        while let Some(end) = self.partial.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]).into_owned();
            if self.recent.len() == self.capacity {
                self.recent.pop_front();
            }
            self.recent.push_back(text);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }
}

fn log_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{}.log", app_name))
}

/// Shared handle to the rolling file; usable as a `tracing` writer
#[derive(Clone)]
pub struct RollingWriter {
    inner: Arc<Mutex<RollingFile>>,
}

impl RollingWriter {
    pub fn new(dir: impl Into<PathBuf>, app_name: &str) -> io::Result<Self> {
        Self::with_limits(dir, app_name, DEFAULT_MAX_BYTES, DEFAULT_KEEP_FILES, DEFAULT_BUFFER_LINES)
    }

    pub fn with_limits(
        dir: impl Into<PathBuf>,
        app_name: &str,
        max_bytes: u64,
        keep_files: usize,
        buffer_lines: usize,
    ) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let path = log_path(&dir, app_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        let inner = RollingFile {
            dir,
            app_name: app_name.to_string(),
            file,
            written,
            max_bytes,
            keep_files,
            recent: VecDeque::with_capacity(buffer_lines),
            capacity: buffer_lines.max(1),
            partial: Vec::new(),
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
        })
    }

    /// Most recent complete lines, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.recent.iter().cloned().collect()
    }

    pub fn path(&self) -> PathBuf {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .active_path()
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .file
            .flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps with milliseconds
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber writing to `<dir>/<app_name>.log`
///
/// Also routes `log` records through `tracing`. Fails if a global
/// subscriber is already installed.
pub fn init_logger(dir: impl Into<PathBuf>, app_name: &str) -> Result<(), String> {
    let writer = RollingWriter::new(dir, app_name).map_err(|e| e.to_string())?;
    tracing_subscriber::fmt()
        .with_writer(writer.clone())
        .with_ansi(false)
        .with_timer(LocalTimer)
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .map_err(|e| e.to_string())?;
    let _ = WRITER.set(writer);
    log::info!("Logger initialized for {}", app_name);
    Ok(())
}

/// Log through the installed logger; fails before `init_logger`
pub fn info(message: &str) -> Result<(), String> {
    if WRITER.get().is_none() {
        return Err("logger not initialized".to_string());
    }
    tracing::info!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), String> {
    if WRITER.get().is_none() {
        return Err("logger not initialized".to_string());
    }
    tracing::error!("{}", message);
    Ok(())
}

/// Recent lines of the installed logger; empty before `init_logger`
pub fn recent_lines() -> Vec<String> {
    WRITER
        .get()
        .map(RollingWriter::recent_lines)
        .unwrap_or_default()
}
