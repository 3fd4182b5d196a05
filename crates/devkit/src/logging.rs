use devkit_platform::AppPaths;
#[cfg(debug_assertions)]
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use simplelog::{CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, WriteLogger};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Append-only log file that reopens itself when the file is removed
/// underneath a running bridge.
struct LogFile {
    path: PathBuf,
    handle: Mutex<Option<File>>,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl LogFile {
    fn open(path: PathBuf) -> io::Result<Self> {
        let handle = open_append(&path)?;
        Ok(Self {
            path,
            handle: Mutex::new(Some(handle)),
        })
    }

    fn handle(&self) -> MutexGuard<'_, Option<File>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current(&self) -> io::Result<MutexGuard<'_, Option<File>>> {
        let mut handle = self.handle();
        if handle.is_none() || !self.path.exists() {
            if let Some(dir) = self.path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            *handle = Some(open_append(&self.path)?);
        }
        Ok(handle)
    }
}

impl Write for LogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.current()?.as_mut() {
            Some(file) => file.write(buf),
            None => Err(io::Error::other("log file not available")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle().as_mut().map_or(Ok(()), File::flush)
    }
}

/// Keep only the newer half of a log larger than `limit` bytes, starting
/// at a line boundary. Returns whether anything was dropped.
fn shrink_to_recent_half(path: &Path, limit: u64) -> io::Result<bool> {
    if std::fs::metadata(path)?.len() <= limit {
        return Ok(false);
    }

    let contents = std::fs::read(path)?;
    let middle = contents.len() / 2;
    let cut = contents[middle..]
        .iter()
        .position(|&byte| byte == b'\n')
        .map_or(middle, |offset| middle + offset + 1);
    std::fs::write(path, &contents[cut..])?;
    Ok(true)
}

/// Log to `<data_dir>/debug.log`, plus stderr in debug builds. stdout
/// carries the bridge protocol and never receives log lines.
pub fn init_logging(debug_enabled: bool, max_log_size: u64) {
    let Ok(paths) = AppPaths::new() else {
        return;
    };
    let _ = paths.ensure_dirs();
    let log_path = paths.log_file();
    let trimmed = shrink_to_recent_half(&log_path, max_log_size).unwrap_or(false);

    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("devkit")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    #[cfg(debug_assertions)]
    loggers.push(TermLogger::new(
        LevelFilter::Debug,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    ));

    if let Ok(file) = LogFile::open(log_path.clone()) {
        loggers.push(WriteLogger::new(LevelFilter::Trace, config, file));
    }

    if loggers.is_empty() || CombinedLogger::init(loggers).is_err() {
        return;
    }

    set_logging_enabled(debug_enabled);

    if trimmed {
        log::warn!("Log file exceeded {max_log_size} bytes, older entries dropped");
    }
    log::info!("Logging to {}", log_path.display());
}

/// Full detail when debug logging is on; warnings only otherwise.
pub fn set_logging_enabled(enabled: bool) {
    let level = if enabled {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{LogFile, set_logging_enabled, shrink_to_recent_half};

    #[test]
    fn log_file_comes_back_after_its_directory_is_removed() {
        let root = tempfile::tempdir().expect("tempdir");
        let log_dir = root.path().join("devkit");
        std::fs::create_dir_all(&log_dir).expect("create log dir");
        let log_path = log_dir.join("debug.log");
        let mut log = LogFile::open(log_path.clone()).expect("open log");

        log.write_all(b"before\n").expect("first write");
        std::fs::remove_dir_all(&log_dir).expect("remove log dir");
        log.write_all(b"after\n").expect("write after removal");
        log.flush().expect("flush");

        assert_eq!(std::fs::read_to_string(&log_path).expect("read log"), "after\n");
    }

    #[test]
    fn oversized_log_keeps_whole_recent_lines() {
        let root = tempfile::tempdir().expect("tempdir");
        let log_path = root.path().join("debug.log");
        let lines: String = (1..=6).map(|n| format!("attempt-{n}\n")).collect();
        std::fs::write(&log_path, &lines).expect("seed log");

        let trimmed = shrink_to_recent_half(&log_path, 16).expect("shrink");

        assert!(trimmed);
        assert_eq!(
            std::fs::read_to_string(&log_path).expect("read log"),
            "attempt-5\nattempt-6\n"
        );
    }

    #[test]
    fn log_under_the_limit_is_untouched() {
        let root = tempfile::tempdir().expect("tempdir");
        let log_path = root.path().join("debug.log");
        std::fs::write(&log_path, "one\n").expect("seed log");

        assert!(!shrink_to_recent_half(&log_path, 1024).expect("shrink"));
        assert_eq!(std::fs::read_to_string(&log_path).expect("read log"), "one\n");
    }

    #[test]
    fn missing_log_is_an_error_not_a_panic() {
        let root = tempfile::tempdir().expect("tempdir");

        assert!(shrink_to_recent_half(&root.path().join("absent.log"), 10).is_err());
    }

    #[test]
    fn disabling_debug_keeps_warnings() {
        set_logging_enabled(true);
        assert_eq!(log::max_level(), log::LevelFilter::Debug);

        set_logging_enabled(false);
        assert_eq!(log::max_level(), log::LevelFilter::Warn);
    }
}
