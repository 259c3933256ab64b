//! Tracing setup.
//!
//! By default logs go to `chatedit.log` in the platform data directory. The
//! previous three logs are kept by rotation on each start, and every line is
//! flushed as it is written. `RUST_LOG` overrides the default filter.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "chatedit=info,warn";
const LOG_FILE_NAME: &str = "chatedit.log";
const KEEP_ROTATED: u32 = 3;

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// `chatedit.log` under [`crate::data_dir`].
    DataDir,
    /// A specific directory (used by tests and packaging).
    Dir(PathBuf),
    Stderr,
}

/// Install the global tracing subscriber. Returns the log file path when
/// logging to a file.
pub fn init(target: LogTarget) -> std::io::Result<Option<PathBuf>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let log_dir = match target {
        LogTarget::Stderr => {
            let _ = fmt::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .try_init();
            return Ok(None);
        }
        LogTarget::DataDir => crate::data_dir(),
        LogTarget::Dir(dir) => dir,
    };

    std::fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join(LOG_FILE_NAME);
    rotate_log_file(&log_path, KEEP_ROTATED);

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let _ = fmt::fmt()
        .with_env_filter(filter)
        .with_writer(FlushingWriter::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = %log_path.display(),
        pid = std::process::id(),
        "=== chatedit starting ==="
    );
    Ok(Some(log_path))
}

/// `<base>.<generation>`, e.g. `chatedit.log.2`.
fn rotated_path(base_path: &Path, generation: u32) -> PathBuf {
    let mut name = base_path.as_os_str().to_owned();
    name.push(format!(".{generation}"));
    PathBuf::from(name)
}

/// Shift `chatedit.log` to `.1`, `.1` to `.2`, and so on up to `.{keep}`.
/// Whatever sat at `.{keep}` is deleted; missing generations are skipped.
/// With `keep == 0` the current log is simply removed.
pub fn rotate_log_file(base_path: &Path, keep: u32) {
    if keep == 0 {
        let _ = std::fs::remove_file(base_path);
        return;
    }
    let _ = std::fs::remove_file(rotated_path(base_path, keep));
    for generation in (1..keep).rev() {
        let _ = std::fs::rename(
            rotated_path(base_path, generation),
            rotated_path(base_path, generation + 1),
        );
    }
    let _ = std::fs::rename(base_path, rotated_path(base_path, 1));
}

/// Log sink that flushes after every write so a crash loses nothing.
///
/// A poisoned lock is recovered rather than reported: a panic elsewhere must
/// not silence logging.
struct FlushingWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for FlushingWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: Write> FlushingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write> Write for FlushingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut sink = self.lock();
        sink.write_all(buf)?;
        sink.flush()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.lock().flush()
    }
}

impl<'a, W: Write + 'a> fmt::MakeWriter<'a> for FlushingWriter<W> {
    type Writer = FlushingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
