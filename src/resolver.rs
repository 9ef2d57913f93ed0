//! Guarantees a toolchain image is present locally before anything runs from it.

use crate::docker::ContainerRuntime;
use crate::errors::ToolchainError;
use crate::image::ImageReference;
use crate::registry::Registry;

/// How an image came to be available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    AlreadyLocal,
    Pulled,
}

pub struct ImageResolver<'a> {
    runtime: &'a dyn ContainerRuntime,
    registry: &'a dyn Registry,
}

impl<'a> ImageResolver<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, registry: &'a dyn Registry) -> Self {
        Self { runtime, registry }
    }

    /// Local image list first; then the registry; then exactly one awaited pull.
    ///
    /// An image missing from the registry fails with `ImageNotFound` without any pull attempt.
    #[tracing::instrument(level = "debug", skip(self), fields(image = %image))]
    pub fn ensure_available(&self, image: &ImageReference) -> Result<Availability, ToolchainError> {
        let canonical = image.canonical();
        if self.runtime.list_local_images()?.contains(&canonical) {
            tracing::debug!("image already present locally");
            return Ok(Availability::AlreadyLocal);
        }
        if !self.registry.tag_exists(image)? {
            return Err(ToolchainError::ImageNotFound(canonical));
        }
        tracing::info!("pulling image");
        self.registry.pull(image)?;
        Ok(Availability::Pulled)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeSet;

    use crate::docker::{ContainerRunSpec, ContainerRuntime, RunResult};
    use crate::errors::ToolchainError;
    use crate::image::ImageReference;
    use crate::registry::Registry;

    /// In-memory runtime: a shared local image store plus a record of every run.
    #[derive(Default)]
    pub struct FakeRuntime {
        pub local: RefCell<BTreeSet<String>>,
        pub runs: RefCell<Vec<ContainerRunSpec>>,
        pub exit_codes: RefCell<Vec<i32>>,
        pub networks: RefCell<BTreeSet<String>>,
        pub stopped: RefCell<Vec<String>>,
    }

    impl FakeRuntime {
        pub fn with_local(images: &[&str]) -> Self {
            let rt = Self::default();
            rt.local
                .borrow_mut()
                .extend(images.iter().map(|s| s.to_string()));
            rt
        }
    }

    impl ContainerRuntime for FakeRuntime {
        fn is_running(&self) -> bool {
            true
        }

        fn list_local_images(&self) -> Result<BTreeSet<String>, ToolchainError> {
            Ok(self.local.borrow().clone())
        }

        fn run(&self, spec: &ContainerRunSpec) -> Result<RunResult, ToolchainError> {
            self.runs.borrow_mut().push(spec.clone());
            let mut codes = self.exit_codes.borrow_mut();
            let exit_code = if codes.is_empty() { 0 } else { codes.remove(0) };
            Ok(RunResult {
                exit_code,
                duration: std::time::Duration::ZERO,
            })
        }

        fn stop(&self, container: &str) -> Result<(), ToolchainError> {
            self.stopped.borrow_mut().push(container.to_string());
            Ok(())
        }

        fn network_exists(&self, name: &str) -> Result<bool, ToolchainError> {
            Ok(self.networks.borrow().contains(name))
        }

        fn create_network(&self, name: &str) -> Result<(), ToolchainError> {
            self.networks.borrow_mut().insert(name.to_string());
            Ok(())
        }
    }

    /// Registry that knows a fixed set of tags; pulls land in the paired runtime's store.
    pub struct FakeRegistry<'a> {
        pub known: BTreeSet<String>,
        pub store: &'a RefCell<BTreeSet<String>>,
        pub queries: Cell<usize>,
        pub pulls: Cell<usize>,
        pub unavailable: bool,
    }

    impl<'a> FakeRegistry<'a> {
        pub fn new(known: &[&str], runtime: &'a FakeRuntime) -> Self {
            Self {
                known: known.iter().map(|s| s.to_string()).collect(),
                store: &runtime.local,
                queries: Cell::new(0),
                pulls: Cell::new(0),
                unavailable: false,
            }
        }
    }

    impl Registry for FakeRegistry<'_> {
        fn tag_exists(&self, image: &ImageReference) -> Result<bool, ToolchainError> {
            self.queries.set(self.queries.get() + 1);
            if self.unavailable {
                return Err(ToolchainError::RegistryUnavailable {
                    image: image.canonical(),
                    reason: "connection refused".to_string(),
                });
            }
            Ok(self.known.contains(&image.canonical()))
        }

        fn pull(&self, image: &ImageReference) -> Result<(), ToolchainError> {
            self.pulls.set(self.pulls.get() + 1);
            self.store.borrow_mut().insert(image.canonical());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::{FakeRegistry, FakeRuntime};
    use super::*;
    use crate::ErrorKind;

    fn cairo() -> ImageReference {
        ImageReference::new("trufflesuite/cairo-starknet-cli", "0.7.0").expect("image")
    }

    #[test]
    fn test_local_image_needs_no_registry() {
        let rt = FakeRuntime::with_local(&["trufflesuite/cairo-starknet-cli:0.7.0"]);
        let reg = FakeRegistry::new(&[], &rt);
        let resolver = ImageResolver::new(&rt, &reg);
        assert_eq!(
            resolver.ensure_available(&cairo()).expect("ok"),
            Availability::AlreadyLocal
        );
        assert_eq!(reg.queries.get(), 0);
        assert_eq!(reg.pulls.get(), 0);
    }

    #[test]
    fn test_missing_locally_present_in_registry_pulls_once() {
        let rt = FakeRuntime::default();
        let reg = FakeRegistry::new(&["trufflesuite/cairo-starknet-cli:0.7.0"], &rt);
        let resolver = ImageResolver::new(&rt, &reg);
        assert_eq!(
            resolver.ensure_available(&cairo()).expect("ok"),
            Availability::Pulled
        );
        assert_eq!(reg.pulls.get(), 1);
        assert!(rt
            .list_local_images()
            .expect("list")
            .contains("trufflesuite/cairo-starknet-cli:0.7.0"));
    }

    #[test]
    fn test_second_call_is_a_no_op() {
        let rt = FakeRuntime::default();
        let reg = FakeRegistry::new(&["trufflesuite/cairo-starknet-cli:0.7.0"], &rt);
        let resolver = ImageResolver::new(&rt, &reg);
        resolver.ensure_available(&cairo()).expect("first");
        let queries_after_first = reg.queries.get();
        assert_eq!(
            resolver.ensure_available(&cairo()).expect("second"),
            Availability::AlreadyLocal
        );
        assert_eq!(reg.queries.get(), queries_after_first);
        assert_eq!(reg.pulls.get(), 1);
    }

    #[test]
    fn test_absent_everywhere_is_image_not_found_without_pull() {
        let rt = FakeRuntime::default();
        let reg = FakeRegistry::new(&[], &rt);
        let err = ImageResolver::new(&rt, &reg)
            .ensure_available(&cairo())
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::ImageNotFound);
        assert_eq!(reg.pulls.get(), 0);
    }

    #[test]
    fn test_registry_transport_error_is_distinct_from_not_found() {
        let rt = FakeRuntime::default();
        let mut reg = FakeRegistry::new(&[], &rt);
        reg.unavailable = true;
        let err = ImageResolver::new(&rt, &reg)
            .ensure_available(&cairo())
            .expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::RegistryUnavailable);
        assert_eq!(reg.pulls.get(), 0);
    }
}
