//! Command history for the REPL.
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tlang_error::{Result, ResultExt};
use tracing::debug;

pub const DEFAULT_HISTORY_PATH: &str = "logs/history.log";

/// Size at which the history file is rotated.
const MAX_BYTES: u64 = 1024 * 1024;
/// Number of rotated files kept next to the active one.
const BACKUP_COUNT: usize = 2;
const SESSION_MARKER: &str = "000";

/// Receives every statement run in the REPL.
pub trait HistorySink {
    fn record(&mut self, command: &str) -> Result<()>;

    /// The last `n` entries, oldest first. All entries if `n` is `None`.
    fn recent(&self, n: Option<usize>) -> Result<Vec<String>>;
}

fn format_entry(count: usize, command: &str) -> String {
    format!("{count:03} {command}")
}

fn last_n(mut entries: Vec<String>, n: Option<usize>) -> Vec<String> {
    if let Some(n) = n {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries
}

/// History that isn't kept anywhere.
#[derive(Debug, Default)]
pub struct NoHistory;

impl HistorySink for NoHistory {
    fn record(&mut self, _command: &str) -> Result<()> {
        Ok(())
    }

    fn recent(&self, _n: Option<usize>) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    count: usize,
    entries: Vec<String>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistorySink for MemoryHistory {
    fn record(&mut self, command: &str) -> Result<()> {
        self.count += 1;
        self.entries.push(format_entry(self.count, command));
        Ok(())
    }

    fn recent(&self, n: Option<usize>) -> Result<Vec<String>> {
        Ok(last_n(self.entries.clone(), n))
    }
}

/// Appends history to a file, rotating it once it grows past 1 MiB.
///
/// Every session starts with a `000` marker line.
#[derive(Debug)]
pub struct FileHistory {
    path: PathBuf,
    count: usize,
}

impl FileHistory {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .context_fn(|| format!("Failed to create '{}'", parent.display()))?;
            }
        }

        let mut history = FileHistory { path, count: 0 };
        history.append(SESSION_MARKER)?;
        debug!(path = %history.path.display(), "opened history file");

        Ok(history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn backup_path(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    fn rotate_if_needed(&self, incoming: usize) -> Result<()> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if len == 0 || len + incoming as u64 <= MAX_BYTES {
            return Ok(());
        }

        for n in (1..BACKUP_COUNT).rev() {
            let from = self.backup_path(n);
            if from.exists() {
                fs::rename(&from, self.backup_path(n + 1))
                    .context("Failed to rotate history file")?;
            }
        }
        fs::rename(&self.path, self.backup_path(1)).context("Failed to rotate history file")?;
        debug!(path = %self.path.display(), "rotated history file");

        Ok(())
    }

    fn append(&mut self, line: &str) -> Result<()> {
        self.rotate_if_needed(line.len() + 1)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context_fn(|| format!("Failed to open '{}'", self.path.display()))?;
        writeln!(file, "{line}").context("Failed to write history")?;
        Ok(())
    }
}

impl HistorySink for FileHistory {
    fn record(&mut self, command: &str) -> Result<()> {
        self.count += 1;
        let entry = format_entry(self.count, command);
        self.append(&entry)
    }

    fn recent(&self, n: Option<usize>) -> Result<Vec<String>> {
        let file = File::open(&self.path)
            .context_fn(|| format!("Failed to open '{}'", self.path.display()))?;
        let entries = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read history")?;
        Ok(last_n(entries, n))
    }
}
