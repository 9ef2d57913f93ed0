//! Project directory helpers: locating sources, artifacts and tests, and preparing the build
//! and accounts directories the containerized toolchain writes into.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;

/// File names (not paths) directly inside `dir` matching `keep`, sorted.
///
/// A missing directory yields an empty list.
fn file_names(dir: &Path, keep: impl Fn(&str) -> bool) -> io::Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if keep(name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

pub struct Project<'a> {
    config: &'a Config,
}

impl<'a> Project<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.project_dir
    }

    fn host_path(&self, rel: &str) -> PathBuf {
        self.config.project_dir.join(rel)
    }

    /// `*.cairo` sources in the contracts directory.
    pub fn contract_sources(&self) -> io::Result<Vec<String>> {
        file_names(&self.host_path(&self.config.contracts_dir), |n| {
            n.ends_with(".cairo")
        })
    }

    /// Compiled `*.json` artifacts in the build directory (ABIs live one level down).
    pub fn compiled_artifacts(&self) -> io::Result<Vec<String>> {
        file_names(&self.host_path(&self.config.build_dir), |n| {
            n.ends_with(".json")
        })
    }

    /// `*_test.py` files in the tests directory.
    pub fn test_files(&self) -> io::Result<Vec<String>> {
        file_names(&self.host_path(&self.config.tests_dir), |n| {
            n.ends_with("_test.py")
        })
    }

    /// Remove and recreate the build directory together with its `abis/` subdirectory.
    pub fn recreate_build_dirs(&self) -> io::Result<()> {
        let build = self.host_path(&self.config.build_dir);
        if build.exists() {
            fs::remove_dir_all(&build)?;
        }
        fs::create_dir_all(self.host_path(&self.config.build_abis_dir()))?;
        tracing::debug!(dir = %build.display(), "recreated build directory");
        Ok(())
    }

    /// Create the build and `abis/` directories if missing, keeping existing artifacts.
    pub fn ensure_build_dirs(&self) -> io::Result<()> {
        fs::create_dir_all(self.host_path(&self.config.build_abis_dir()))
    }

    pub fn ensure_accounts_dir(&self) -> io::Result<()> {
        fs::create_dir_all(self.host_path(&self.config.accounts_dir))
    }
}

/// File name without its final extension (`counter.cairo` → `counter`).
pub fn artifact_stem(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(i) if i > 0 => &file_name[..i],
        _ => file_name,
    }
}
