// Writes generated calendars and config files to disk.
use crate::model::CalendarDocument;
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};

pub struct LocalStorage;

impl LocalStorage {
    fn get_lock_path(file_path: &Path) -> PathBuf {
        let mut lock_path = file_path.to_path_buf();
        if let Some(ext) = lock_path.extension() {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".lock");
            lock_path.set_extension(new_ext);
        } else {
            lock_path.set_extension("lock");
        }
        lock_path
    }

    /// Runs `f` while holding an exclusive lock next to `file_path`.
    pub fn with_lock<F, T>(file_path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock_path = Self::get_lock_path(file_path);
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        file.lock_exclusive()?;
        let result = f();
        file.unlock()?;
        result
    }

    /// Atomic write: Write to .tmp file then rename
    pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, contents: C) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    /// Writes a finished document. Nothing is left behind if this fails.
    pub fn save_calendar(path: &Path, doc: &CalendarDocument) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        Self::atomic_write(path, doc.to_ics())
            .with_context(|| format!("Failed to write calendar '{}'", path.display()))?;
        log::info!("Wrote {} events to {}", doc.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_lock_path_keeps_extension() {
        let p = LocalStorage::get_lock_path(Path::new("/tmp/config.toml"));
        assert_eq!(p, PathBuf::from("/tmp/config.toml.lock"));
        let p = LocalStorage::get_lock_path(Path::new("/tmp/timetable"));
        assert_eq!(p, PathBuf::from("/tmp/timetable.lock"));
    }

    #[test]
    fn test_save_calendar_creates_parent() {
        let dir = std::env::temp_dir().join(format!("timetable_ics_out_{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("week.ics");
        let doc = CalendarDocument::new("Test", Utc::now());

        LocalStorage::save_calendar(&path, &doc).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("BEGIN:VCALENDAR\r\n"));
        assert!(!path.with_extension("tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }
}
