//! Error mapping guide:
//! - Every failure is a `ToolchainError`; `kind()` classifies it into an `ErrorKind`.
//! - Each `ErrorKind` maps to a distinct process exit code (0 is reserved for success).
//! - Action failures carry the action, the artifact involved and the cause (nonzero exit
//!   status or the run error that prevented the container from finishing).
use std::fmt;
use std::io;
use std::time::Duration;

use crate::util::exec::ExecError;

/// Toolchain action a failure belongs to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Action {
    Compile,
    CreateAccount,
    Deploy,
    Call,
    Invoke,
    TxStatus,
    Test,
    Devnet,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Compile => "compile",
            Action::CreateAccount => "create-account",
            Action::Deploy => "deploy",
            Action::Call => "call",
            Action::Invoke => "invoke",
            Action::TxStatus => "tx-status",
            Action::Test => "test",
            Action::Devnet => "devnet",
        }
    }

    /// Error kind reported when this action fails.
    pub fn failure_kind(&self) -> ErrorKind {
        match self {
            Action::Compile => ErrorKind::CompileFailed,
            Action::CreateAccount => ErrorKind::AccountCreationFailed,
            Action::Deploy => ErrorKind::DeploymentFailed,
            Action::Call | Action::Invoke => ErrorKind::FunctionCallFailed,
            Action::TxStatus => ErrorKind::TransactionStatusFailed,
            Action::Test => ErrorKind::TestRunFailed,
            Action::Devnet => ErrorKind::DevnetStartFailed,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat classification of `ToolchainError` used for exit codes and reporting.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum ErrorKind {
    Io,
    Config,
    RuntimeUnavailable,
    RegistryUnavailable,
    ImageNotFound,
    PullFailed,
    ContainerRunError,
    CompileFailed,
    AccountCreationFailed,
    DeploymentFailed,
    FunctionCallFailed,
    TransactionStatusFailed,
    TestRunFailed,
    DevnetStartFailed,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 14] = [
        ErrorKind::Io,
        ErrorKind::Config,
        ErrorKind::RuntimeUnavailable,
        ErrorKind::RegistryUnavailable,
        ErrorKind::ImageNotFound,
        ErrorKind::PullFailed,
        ErrorKind::ContainerRunError,
        ErrorKind::CompileFailed,
        ErrorKind::AccountCreationFailed,
        ErrorKind::DeploymentFailed,
        ErrorKind::FunctionCallFailed,
        ErrorKind::TransactionStatusFailed,
        ErrorKind::TestRunFailed,
        ErrorKind::DevnetStartFailed,
    ];

    /// Process exit code for this kind. Never 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::Io => 1,
            ErrorKind::Config => 2,
            ErrorKind::RuntimeUnavailable => 3,
            ErrorKind::RegistryUnavailable => 4,
            ErrorKind::ImageNotFound => 5,
            ErrorKind::PullFailed => 6,
            ErrorKind::ContainerRunError => 7,
            ErrorKind::CompileFailed => 10,
            ErrorKind::AccountCreationFailed => 11,
            ErrorKind::DeploymentFailed => 12,
            ErrorKind::FunctionCallFailed => 13,
            ErrorKind::TransactionStatusFailed => 14,
            ErrorKind::TestRunFailed => 15,
            ErrorKind::DevnetStartFailed => 16,
        }
    }
}

/// Why an action failed.
#[derive(Debug, thiserror::Error)]
pub enum ActionCause {
    #[error("the toolchain exited with status {0}")]
    ExitStatus(i32),
    #[error("{failed} of {total} files failed")]
    Batch { failed: usize, total: usize },
    #[error(transparent)]
    Run(Box<ToolchainError>),
}

#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("could not find docker, check that docker is running: {0}")]
    RuntimeUnavailable(String),

    #[error("an error occurred while querying the registry for {image}: {reason}")]
    RegistryUnavailable { image: String, reason: String },

    #[error("the docker image {0} was not found locally or in the registry")]
    ImageNotFound(String),

    #[error("an error occurred while pulling {image}: {reason}")]
    PullFailed { image: String, reason: String },

    #[error("pulling {image} did not complete within {}s", .after.as_secs())]
    PullTimedOut { image: String, after: Duration },

    #[error("an error occurred while running {image}: {reason}")]
    ContainerRun {
        image: String,
        reason: String,
        #[source]
        source: Option<ExecError>,
    },

    #[error("{action} failed for {artifact}: {cause}")]
    Action {
        action: Action,
        artifact: String,
        #[source]
        cause: ActionCause,
    },
}

impl ToolchainError {
    pub fn config(msg: impl Into<String>) -> Self {
        ToolchainError::Config(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolchainError::Io(_) => ErrorKind::Io,
            ToolchainError::Config(_) => ErrorKind::Config,
            ToolchainError::RuntimeUnavailable(_) => ErrorKind::RuntimeUnavailable,
            ToolchainError::RegistryUnavailable { .. } => ErrorKind::RegistryUnavailable,
            ToolchainError::ImageNotFound(_) => ErrorKind::ImageNotFound,
            ToolchainError::PullFailed { .. } | ToolchainError::PullTimedOut { .. } => {
                ErrorKind::PullFailed
            }
            ToolchainError::ContainerRun { .. } => ErrorKind::ContainerRunError,
            ToolchainError::Action { action, .. } => action.failure_kind(),
        }
    }

    /// Process exit code; io NotFound keeps the shell's 127 convention.
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolchainError::Io(e) => exit_code_for_io_error(e),
            other => other.kind().exit_code(),
        }
    }

    /// Wrap a run failure into the action-specific kind so callers branch on one dimension.
    pub fn for_action(self, action: Action, artifact: impl Into<String>) -> Self {
        match self {
            already @ ToolchainError::Action { .. } => already,
            other => ToolchainError::Action {
                action,
                artifact: artifact.into(),
                cause: ActionCause::Run(Box::new(other)),
            },
        }
    }

    pub fn container_run(image: impl Into<String>, source: ExecError) -> Self {
        ToolchainError::ContainerRun {
            image: image.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub fn exit_status(action: Action, artifact: impl Into<String>, code: i32) -> Self {
        ToolchainError::Action {
            action,
            artifact: artifact.into(),
            cause: ActionCause::ExitStatus(code),
        }
    }

    /// Overall failure of a batch in which `failed` of `total` items failed.
    pub fn batch(action: Action, artifact: impl Into<String>, failed: usize, total: usize) -> Self {
        ToolchainError::Action {
            action,
            artifact: artifact.into(),
            cause: ActionCause::Batch { failed, total },
        }
    }
}

/// Map an io::Error to a process exit code, preserving the launcher convention:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exit_codes_are_distinct_and_nonzero() {
        let codes: HashSet<u8> = ErrorKind::ALL.iter().map(|k| k.exit_code()).collect();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
        assert!(!codes.contains(&0));
    }

    #[test]
    fn test_for_action_wraps_run_errors_once() {
        let inner = ToolchainError::ImageNotFound("a/b:1".to_string());
        let wrapped = inner.for_action(Action::Deploy, "counter.json");
        assert_eq!(wrapped.kind(), ErrorKind::DeploymentFailed);
        // Re-wrapping keeps the original action
        let again = wrapped.for_action(Action::Compile, "other");
        assert_eq!(again.kind(), ErrorKind::DeploymentFailed);
        assert!(again.to_string().contains("counter.json"));
    }

    #[test]
    fn test_call_and_invoke_share_function_call_kind() {
        let call = ToolchainError::exit_status(Action::Call, "counter", 1);
        let invoke = ToolchainError::exit_status(Action::Invoke, "counter", 1);
        assert_eq!(call.kind(), ErrorKind::FunctionCallFailed);
        assert_eq!(invoke.kind(), ErrorKind::FunctionCallFailed);
    }

    #[test]
    fn test_exit_status_message_mentions_code() {
        let e = ToolchainError::exit_status(Action::Compile, "counter.cairo", 7);
        assert_eq!(e.exit_code(), 10);
        assert_eq!(
            e.to_string(),
            "compile failed for counter.cairo: the toolchain exited with status 7"
        );
    }

    #[test]
    fn test_io_not_found_maps_to_127() {
        let e = io::Error::new(io::ErrorKind::NotFound, "x");
        assert_eq!(exit_code_for_io_error(&e), 127);
        let e = io::Error::other("x");
        assert_eq!(exit_code_for_io_error(&e), 1);
    }
}
