use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable holding the log level
pub const LOG_LEVEL_ENV: &str = "PROJEDIT_LOG";

struct FileLogger {
    file: Mutex<std::fs::File>,
    level: LevelFilter,
}

impl FileLogger {
    fn new(file_path: PathBuf, level: LevelFilter) -> io::Result<Self> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Append: the isolated probe runs as a second process writing the same file
        let file = OpenOptions::new().create(true).append(true).open(file_path)?;

        Ok(FileLogger {
            file: Mutex::new(file),
            level,
        })
    }
}

impl Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            if let Ok(mut file) = self.file.lock() {
                let _ = writeln!(
                    file,
                    "[{}] [{}] [pid {}] {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    std::process::id(),
                    record.args()
                );
                let _ = file.flush();
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Get the platform-specific log file path
fn get_log_file_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let data_dir = dirs::data_local_dir().ok_or("Could not determine local data directory")?;
    Ok(data_dir.join("projedit").join("projedit.log"))
}

/// `error|warn|info|debug|trace|off`, case-insensitive; anything else is `info`
fn parse_level(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Initialize the logger to append to a single file in local app data
pub fn init_logger() -> Result<(), Box<dyn std::error::Error>> {
    let level = parse_level(env::var(LOG_LEVEL_ENV).ok().as_deref());
    let logger = FileLogger::new(get_log_file_path()?, level)?;

    log::set_boxed_logger(Box::new(logger)).map(|()| log::set_max_level(level))?;

    Ok(())
}
