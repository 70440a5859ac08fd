//! Lock file management for daemon exclusivity
//!
//! One lock per port: `<state dir>/dirdex-<port>.lock`, holding the owner's
//! PID so `dirdex stop` can find it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Daemon lock file structure
pub struct DaemonLock {
    path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

/// Lock file content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockContent {
    pub pid: u32,
    pub port: u16,
    pub started_at: u64,
}

impl DaemonLock {
    pub fn lock_path(lock_dir: &Path, port: u16) -> PathBuf {
        lock_dir.join(format!("dirdex-{}.lock", port))
    }

    /// Acquire exclusive daemon lock
    ///
    /// Returns error if:
    /// - Lock is already held by a running process
    /// - Permission denied
    pub fn acquire(lock_dir: &Path, port: u16) -> Result<Self> {
        let lock_path = Self::lock_path(lock_dir, port);

        std::fs::create_dir_all(lock_dir).context("Failed to create lock directory")?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .context("Failed to open lock file")?;

        if !try_flock_exclusive(&file)? {
            if Self::is_stale_lock(&mut file)? {
                tracing::warn!("Removing stale daemon lock");
                drop(file);
                std::fs::remove_file(&lock_path)?;
                return Self::acquire(lock_dir, port);
            } else {
                anyhow::bail!("Daemon already running on port {} (lock file held by active process)", port);
            }
        }

        Self::write_lock_content(&mut file, port)?;

        Ok(Self {
            path: lock_path,
            file,
        })
    }

    /// Release the daemon lock
    pub fn release(self) -> Result<()> {
        // Drop also removes the file; do it here to surface errors
        std::fs::remove_file(&self.path).context("Failed to remove lock file")?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Content of the lock for `port`, if a live daemon holds it
    pub fn running(lock_dir: &Path, port: u16) -> Option<LockContent> {
        let mut file = File::open(Self::lock_path(lock_dir, port)).ok()?;
        let content = Self::read_lock_content(&mut file).ok()?;
        is_process_alive(content.pid).then_some(content)
    }

    fn is_stale_lock(file: &mut File) -> Result<bool> {
        match Self::read_lock_content(file) {
            Ok(content) => Ok(!is_process_alive(content.pid)),
            // Unreadable content means nobody finished writing it
            Err(_) => Ok(true),
        }
    }

    /// Write lock content (PID + port + timestamp)
    fn write_lock_content(file: &mut File, port: u16) -> Result<()> {
        let content = LockContent {
            pid: std::process::id(),
            port,
            started_at: current_timestamp_ms(),
        };

        let serialized =
            serde_json::to_string(&content).context("Failed to serialize lock content")?;

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(serialized.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn read_lock_content(file: &mut File) -> Result<LockContent> {
        file.seek(SeekFrom::Start(0))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let content: LockContent =
            serde_json::from_str(&contents).context("Failed to deserialize lock content")?;
        Ok(content)
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Try to acquire exclusive file lock (non-blocking)
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check if process is alive (null signal)
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM: exists but owned by someone else
        Err(_) => true,
    }
}

/// Ask the process to shut down gracefully
pub fn terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
        .with_context(|| format!("Failed to signal process {}", pid))
}

fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
