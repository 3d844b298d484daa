use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

const LOG_DIR: &str = "logs";

/// Appends a timestamped message to a log file under `logs/`.
/// Used by the debug sink of the sample processor; the detector core never
/// writes here.
pub fn log_to_file(filename: &str, message: &str) -> io::Result<()> {
    fs::create_dir_all(LOG_DIR)?;

    let path = format!("{}/{}", LOG_DIR, filename);
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    writeln!(file, "[{}] {}", timestamp, message)?;
    file.flush()?;

    Ok(())
}
