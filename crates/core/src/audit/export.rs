use chrono::Local;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{AuditError, AuditRecord};

/// Writes the run log to `<dir>/mediasort-log-YYYYMMDD-HHMMSS.txt`, one
/// line per record, and returns the path written.
///
/// An existing file is never overwritten; a numeric suffix is added instead.
pub fn export_run_log(records: &[AuditRecord], dir: &Path) -> Result<PathBuf, AuditError> {
    std::fs::create_dir_all(dir)?;

    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let mut contents = String::new();
    for record in records {
        contents.push_str(&record.line());
        contents.push('\n');
    }

    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("mediasort-log-{stamp}.txt")
        } else {
            format!("mediasort-log-{stamp}_{attempt}.txt")
        };
        let path = dir.join(name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(AuditError::Io(e)),
        }
    }
}
