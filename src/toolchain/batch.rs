//! Directory-wide actions: every source, artifact or test file in turn.
//!
//! The image is resolved and the build directory recreated once up front; after that each
//! file's failure is recorded and the batch moves on.

use crate::docker::RunResult;
use crate::errors::{Action, ToolchainError};
use crate::lock::acquire_build_lock;
use crate::project::Project;
use crate::toolchain::ToolchainOperations;

#[derive(Debug)]
pub struct BatchFailure {
    pub item: String,
    pub error: ToolchainError,
}

/// Per-file outcome of a batch, in processing order.
#[derive(Debug)]
pub struct BatchReport {
    action: Action,
    scope: String,
    succeeded: Vec<String>,
    failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn new(action: Action, scope: impl Into<String>) -> Self {
        Self {
            action,
            scope: scope.into(),
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, item: impl Into<String>, result: Result<RunResult, ToolchainError>) {
        let item = item.into();
        let use_err = crate::color_enabled_stderr();
        match result {
            Ok(_) => self.succeeded.push(item),
            Err(error) => {
                crate::log_error_stderr(use_err, &format!("starknet-docker: {error}"));
                self.failed.push(BatchFailure { item, error });
            }
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[BatchFailure] {
        &self.failed
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Overall outcome: an error of the action's kind when any item failed.
    pub fn outcome(&self) -> Result<(), ToolchainError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ToolchainError::batch(
                self.action,
                self.scope.clone(),
                self.failed.len(),
                self.total(),
            ))
        }
    }
}

fn announce(msg: &str) {
    crate::log_info_stderr(crate::color_enabled_stderr(), msg);
}

/// Compile every `.cairo` file in the contracts directory under the project build lock.
pub fn compile_all(
    ops: &ToolchainOperations<'_>,
    disable_hints: bool,
) -> Result<BatchReport, ToolchainError> {
    let config = ops.config();
    let project = Project::new(config);
    let _lock = acquire_build_lock(project.root())?;
    let sources = project.contract_sources()?;
    let mut report = BatchReport::new(Action::Compile, config.contracts_dir.clone());
    if sources.is_empty() {
        crate::warn_print(&format!(
            "no .cairo files found in {}",
            config.contracts_dir
        ));
        return Ok(report);
    }

    ops.ensure_image(&config.cairo_image)?;
    project.recreate_build_dirs()?;
    for file in sources {
        announce(&format!("starknet-docker: compiling {file}"));
        let result = ops.compile(&file, disable_hints);
        report.record(file, result);
    }
    Ok(report)
}

/// Compile a single contract without clearing other build output.
pub fn compile_one(
    ops: &ToolchainOperations<'_>,
    contract: &str,
    disable_hints: bool,
) -> Result<RunResult, ToolchainError> {
    let project = Project::new(ops.config());
    let _lock = acquire_build_lock(project.root())?;
    ops.ensure_image(&ops.config().cairo_image)?;
    project.ensure_build_dirs()?;
    announce(&format!("starknet-docker: compiling {contract}"));
    ops.compile(contract, disable_hints)
}

/// Deploy every compiled artifact in the build directory with the same constructor inputs.
pub fn deploy_all(
    ops: &ToolchainOperations<'_>,
    inputs: &[String],
) -> Result<BatchReport, ToolchainError> {
    let config = ops.config();
    let artifacts = Project::new(config).compiled_artifacts()?;
    let mut report = BatchReport::new(Action::Deploy, config.build_dir.clone());
    if artifacts.is_empty() {
        crate::warn_print(&format!(
            "no compiled contracts found in {}; run compile first",
            config.build_dir
        ));
        return Ok(report);
    }
    ops.ensure_image(&config.cairo_image)?;
    for artifact in artifacts {
        announce(&format!("starknet-docker: deploying {artifact}"));
        let result = ops.deploy(&artifact, inputs);
        report.record(artifact, result);
    }
    Ok(report)
}

/// Run every `*_test.py` file in the tests directory.
pub fn test_all(ops: &ToolchainOperations<'_>) -> Result<BatchReport, ToolchainError> {
    let config = ops.config();
    let files = Project::new(config).test_files()?;
    let mut report = BatchReport::new(Action::Test, config.tests_dir.clone());
    if files.is_empty() {
        crate::warn_print(&format!("no *_test.py files found in {}", config.tests_dir));
        return Ok(report);
    }
    ops.ensure_image(&config.cairo_image)?;
    for file in files {
        announce(&format!("starknet-docker: testing {file}"));
        let result = ops.run_tests(&file);
        report.record(file, result);
    }
    Ok(report)
}
