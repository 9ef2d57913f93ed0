use fs2::FileExt;
use std::env;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

pub const LOCK_FILE_NAME: &str = ".starknet-docker.lock";

/// Project-scoped build lock guard that removes the lock file on drop.
#[derive(Debug)]
pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        // Best-effort unlock; ignore errors
        let _ = self.file.unlock();

        for _ in 0..10 {
            if !self.path.exists() || fs::remove_file(&self.path).is_ok() {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(100));
        }
    }
}

/// Lock file location for a project.
pub fn build_lock_path(project_dir: &Path) -> PathBuf {
    project_dir.join(LOCK_FILE_NAME)
}

/// Honor STARKNET_DOCKER_SKIP_LOCK=1 to skip the build lock (e.g. on filesystems without
/// advisory locking).
pub fn should_acquire_lock() -> bool {
    env::var("STARKNET_DOCKER_SKIP_LOCK").ok().as_deref() != Some("1")
}

/// Acquire a non-blocking exclusive lock at `p`.
pub fn acquire_lock_at(p: &Path) -> io::Result<BuildLock> {
    if let Some(parent) = p.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(true)
        .open(p)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(BuildLock {
            file,
            path: p.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
            tracing::debug!(path = %p.display(), "build lock held by another process");
            Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                format!(
                    "another starknet-docker build is running in this project (lock held at {}). Please try again later.",
                    p.display()
                ),
            ))
        }
        Err(e) => Err(e),
    }
}

/// Acquire the project build lock, or `None` when locking is disabled.
pub fn acquire_build_lock(project_dir: &Path) -> io::Result<Option<BuildLock>> {
    if !should_acquire_lock() {
        return Ok(None);
    }
    acquire_lock_at(&build_lock_path(project_dir)).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_lock_is_refused_until_first_drops() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let p = build_lock_path(dir.path());
        let first = acquire_lock_at(&p).expect("first lock");
        let err = acquire_lock_at(&p).expect_err("held");
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert!(err.to_string().contains("lock held"), "{err}");
        drop(first);
        assert!(!p.exists(), "lock file removed on drop");
        let _again = acquire_lock_at(&p).expect("lock after release");
    }

    #[test]
    fn test_lock_path_is_inside_project() {
        assert_eq!(
            build_lock_path(Path::new("/work/proj")),
            PathBuf::from("/work/proj/.starknet-docker.lock")
        );
    }
}
