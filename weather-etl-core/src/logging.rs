use crate::config::Config;
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Initialize the global logger.
///
/// Filtering and formatting stay with `env_logger` (filter from `RUST_LOG`,
/// default `info`); output is mirrored to stderr and to the configured log
/// file, which is rotated by size with a bounded number of numbered backups.
pub fn init(config: &Config) -> Result<()> {
    let tee = RotatingTee::open(
        config.log_file.clone(),
        config.log_max_bytes,
        config.log_max_backups,
    )
    .with_context(|| format!("Failed to open log file: {}", config.log_file.display()))?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(tee)))
        .try_init()
        .context("Failed to install logger")?;

    Ok(())
}

/// Writer that mirrors every log line to stderr and a size-rotated file.
///
/// When the live file would exceed `max_bytes`, it is renamed to `<file>.1`
/// (older backups shift up, the oldest beyond `max_backups` is discarded)
/// and a fresh file is started.
struct RotatingTee {
    path: PathBuf,
    max_bytes: u64,
    max_backups: usize,
    file: File,
    written: u64,
}

impl RotatingTee {
    fn open(path: PathBuf, max_bytes: u64, max_backups: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();

        Ok(Self {
            path,
            max_bytes,
            max_backups,
            file,
            written,
        })
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        // Shift existing backups up by one; the oldest falls off the end.
        for i in (1..self.max_backups).rev() {
            let from = backup_path(&self.path, i);
            if from.exists() {
                let _ = fs::rename(&from, backup_path(&self.path, i + 1));
            }
        }

        if self.max_backups > 0 {
            let _ = fs::rename(&self.path, backup_path(&self.path, 1));
        } else {
            let _ = fs::remove_file(&self.path);
        }

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.written = 0;

        Ok(())
    }
}

impl Write for RotatingTee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;

        if self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }

        self.file.write_all(buf)?;
        self.written += buf.len() as u64;

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{index}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weather-etl-log-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp log dir");
        let path = dir.join(name);
        let _ = fs::remove_file(&path);
        let _ = fs::remove_file(backup_path(&path, 1));
        let _ = fs::remove_file(backup_path(&path, 2));
        path
    }

    #[test]
    fn writes_are_appended_to_the_live_file() {
        let path = temp_log_path("plain.log");
        let mut tee = RotatingTee::open(path.clone(), 1024, 2).expect("open");

        tee.write_all(b"hello\n").expect("write");
        tee.flush().expect("flush");

        let contents = fs::read_to_string(&path).expect("read log");
        assert_eq!(contents, "hello\n");
    }

    #[test]
    fn exceeding_the_size_limit_rotates_into_numbered_backups() {
        let path = temp_log_path("rotate.log");
        let mut tee = RotatingTee::open(path.clone(), 16, 2).expect("open");

        tee.write_all(b"first line, over nothing\n").expect("write");
        tee.write_all(b"second line, over the limit\n")
            .expect("write");
        tee.flush().expect("flush");

        let backup = fs::read_to_string(backup_path(&path, 1)).expect("backup must exist");
        assert!(backup.contains("first line"));

        let live = fs::read_to_string(&path).expect("read live log");
        assert!(live.contains("second line"));
        assert!(!live.contains("first line"));
    }

    #[test]
    fn backups_beyond_the_limit_are_discarded() {
        let path = temp_log_path("bounded.log");
        let mut tee = RotatingTee::open(path.clone(), 4, 1).expect("open");

        tee.write_all(b"aaaaaa\n").expect("write");
        tee.write_all(b"bbbbbb\n").expect("write");
        tee.write_all(b"cccccc\n").expect("write");
        tee.flush().expect("flush");

        assert!(backup_path(&path, 1).exists());
        assert!(!backup_path(&path, 2).exists());
    }
}
