//! Keep a timestamped copy of every processed batch file.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};

/// Copy `source` into `backup_dir` as `<stem>-<YYYYMMDD-HHMMSS>.<ext>`.
pub fn backup_batch_file(
    source: &Path,
    backup_dir: &Path,
    timestamp: DateTime<Local>,
) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(backup_dir).with_context(|| {
        format!("Failed to create backup directory: {}", backup_dir.display())
    })?;

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "batch".to_string());
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "json".to_string());

    let file_name = format!(
        "{}-{}.{}",
        stem,
        timestamp.format("%Y%m%d-%H%M%S"),
        extension
    );
    let destination = backup_dir.join(file_name);

    std::fs::copy(source, &destination).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            destination.display()
        )
    })?;

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_backup_copies_with_timestamp() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("changes.json");
        std::fs::write(&source, "[]").unwrap();
        let backup_dir = temp.path().join("backup").join("nested");
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        let copied = backup_batch_file(&source, &backup_dir, ts).unwrap();

        assert_eq!(copied, backup_dir.join("changes-20240305-140709.json"));
        assert_eq!(std::fs::read_to_string(copied).unwrap(), "[]");
        assert!(source.exists());
    }

    #[test]
    fn test_backup_missing_source_errors() {
        let temp = TempDir::new().unwrap();
        let ts = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let result = backup_batch_file(&temp.path().join("missing.json"), temp.path(), ts);
        assert!(result.is_err());
    }
}
