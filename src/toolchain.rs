/*!
Toolchain operations.

Each action is stateless: build the container spec for the action, make sure its image is
available, run it through the injected `ContainerRuntime` and classify the outcome into the
action's failure kind. Batch helpers live in `batch`.
*/

pub mod batch;
pub mod commands;

use std::cell::RefCell;
use std::collections::BTreeSet;

use crate::config::Config;
use crate::docker::{ContainerRunSpec, ContainerRuntime, RunResult};
use crate::errors::ToolchainError;
use crate::image::ImageReference;
use crate::network::TargetNetwork;
use crate::registry::Registry;
use crate::resolver::{Availability, ImageResolver};

pub use commands::{FunctionCallKind, Operation};

pub struct ToolchainOperations<'a> {
    config: &'a Config,
    target: TargetNetwork,
    runtime: &'a dyn ContainerRuntime,
    resolver: ImageResolver<'a>,
    // Images confirmed available during this invocation; batches resolve once.
    available: RefCell<BTreeSet<String>>,
}

impl<'a> ToolchainOperations<'a> {
    pub fn new(
        config: &'a Config,
        target: TargetNetwork,
        runtime: &'a dyn ContainerRuntime,
        registry: &'a dyn Registry,
    ) -> Self {
        Self {
            config,
            target,
            runtime,
            resolver: ImageResolver::new(runtime, registry),
            available: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    pub fn target(&self) -> &TargetNetwork {
        &self.target
    }

    /// Container spec `op` would run with, without touching docker.
    pub fn spec_for(&self, op: &Operation) -> ContainerRunSpec {
        op.build_spec(self.config, &self.target)
    }

    /// Resolve `image` at most once per `ToolchainOperations`.
    pub fn ensure_image(&self, image: &ImageReference) -> Result<(), ToolchainError> {
        let canonical = image.canonical();
        if self.available.borrow().contains(&canonical) {
            return Ok(());
        }
        if self.resolver.ensure_available(image)? == Availability::Pulled {
            crate::log_info_stderr(
                crate::color_enabled_stderr(),
                &format!("starknet-docker: pulled {canonical}"),
            );
        }
        self.available.borrow_mut().insert(canonical);
        Ok(())
    }

    /// Run `op` to completion. Image resolution errors keep their own kind; failures of the
    /// run itself and nonzero exits become the action's failure kind.
    #[tracing::instrument(level = "info", skip_all, fields(action = %op.action(), artifact = %op.artifact()))]
    pub fn run(&self, op: &Operation) -> Result<RunResult, ToolchainError> {
        let spec = self.spec_for(op);
        self.ensure_image(spec.image())?;
        let action = op.action();
        let artifact = op.artifact();
        let result = self
            .runtime
            .run(&spec)
            .map_err(|e| e.for_action(action, artifact.clone()))?;
        if !result.success() {
            tracing::warn!(exit_code = result.exit_code, "toolchain container failed");
            return Err(ToolchainError::exit_status(action, artifact, result.exit_code));
        }
        Ok(result)
    }

    pub fn compile(&self, contract: &str, disable_hints: bool) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::Compile {
            contract: contract.to_string(),
            disable_hints,
        })
    }

    pub fn create_account(&self, account: Option<&str>) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::CreateAccount {
            account: account.map(str::to_string),
        })
    }

    pub fn deploy(&self, contract: &str, inputs: &[String]) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::Deploy {
            contract: contract.to_string(),
            inputs: inputs.to_vec(),
        })
    }

    pub fn call_or_invoke(
        &self,
        kind: FunctionCallKind,
        contract: &str,
        address: &str,
        function: &str,
        inputs: &[String],
    ) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::FunctionCall {
            kind,
            contract: contract.to_string(),
            address: address.to_string(),
            function: function.to_string(),
            inputs: inputs.to_vec(),
        })
    }

    pub fn tx_status(
        &self,
        hash: &str,
        contract: Option<&str>,
        error_message: bool,
    ) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::TxStatus {
            hash: hash.to_string(),
            contract: contract.map(str::to_string),
            error_message,
        })
    }

    pub fn run_tests(&self, file: &str) -> Result<RunResult, ToolchainError> {
        self.run(&Operation::Test {
            file: file.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::fakes::{FakeRegistry, FakeRuntime};
    use crate::ErrorKind;
    use std::path::Path;

    const CAIRO: &str = "trufflesuite/cairo-starknet-cli:0.7.0";

    fn public() -> TargetNetwork {
        TargetNetwork::Public {
            network_id: "alpha-goerli".to_string(),
        }
    }

    #[test]
    fn test_nonzero_exit_is_action_failure() {
        let cfg = Config::defaults(Path::new("/p")).expect("cfg");
        let rt = FakeRuntime::with_local(&[CAIRO]);
        rt.exit_codes.borrow_mut().push(7);
        let reg = FakeRegistry::new(&[], &rt);
        let ops = ToolchainOperations::new(&cfg, public(), &rt, &reg);
        let err = ops.deploy("counter", &[]).expect_err("exit 7");
        assert_eq!(err.kind(), ErrorKind::DeploymentFailed);
        assert_ne!(err.exit_code(), 0);
        assert!(err.to_string().contains("counter.json"), "{err}");

        // Exit 0 is success
        assert!(ops.deploy("counter", &[]).expect("ok").success());
    }

    #[test]
    fn test_image_resolution_errors_keep_their_kind() {
        let cfg = Config::defaults(Path::new("/p")).expect("cfg");
        let rt = FakeRuntime::default();
        let reg = FakeRegistry::new(&[], &rt);
        let ops = ToolchainOperations::new(&cfg, public(), &rt, &reg);
        let err = ops.compile("counter", false).expect_err("missing image");
        assert_eq!(err.kind(), ErrorKind::ImageNotFound);
        assert!(rt.runs.borrow().is_empty());
    }

    #[test]
    fn test_image_is_resolved_once_per_invocation() {
        let cfg = Config::defaults(Path::new("/p")).expect("cfg");
        let rt = FakeRuntime::default();
        let reg = FakeRegistry::new(&[CAIRO], &rt);
        let ops = ToolchainOperations::new(&cfg, public(), &rt, &reg);
        ops.run_tests("a_test.py").expect("first");
        ops.run_tests("b_test.py").expect("second");
        assert_eq!(reg.pulls.get(), 1);
        assert_eq!(reg.queries.get(), 1);
        assert_eq!(rt.runs.borrow().len(), 2);
    }

    #[test]
    fn test_run_binds_project_dir() {
        let cfg = Config::defaults(Path::new("/work/proj")).expect("cfg");
        let rt = FakeRuntime::with_local(&[CAIRO]);
        let reg = FakeRegistry::new(&[], &rt);
        let ops = ToolchainOperations::new(&cfg, public(), &rt, &reg);
        ops.tx_status("0xabc", Some("counter"), false).expect("ok");
        let runs = rt.runs.borrow();
        let mount = runs[0].bind_mounts().iter().next().expect("mount");
        assert_eq!(mount.host, Path::new("/work/proj"));
        assert_eq!(mount.container, "/app");
    }
}
