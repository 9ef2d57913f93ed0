#![doc = include_str!("lib_docs.md")]

pub mod color;
pub mod config;
pub mod devnet;
pub mod docker;
pub mod errors;
pub mod image;
pub mod lock;
pub mod network;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod telemetry;
pub mod toolchain;
pub mod ui {
    pub mod warn;
}
pub mod util;

pub use color::*;
pub use config::{Config, CONFIG_FILE_NAME};
pub use devnet::{Devnet, DevnetOptions};
pub use docker::{
    container_runtime_path, ContainerRunSpec, ContainerRuntime, DockerCli, RunMode, RunResult,
};
pub use errors::{exit_code_for_io_error, Action, ErrorKind, ToolchainError};
pub use image::ImageReference;
pub use network::{resolve_network, NetworkDescriptor, NetworkTable, TargetNetwork, WalletPolicy};
pub use registry::{DockerHubRegistry, Registry};
pub use resolver::{Availability, ImageResolver};
pub use toolchain::batch::BatchReport;
pub use toolchain::{FunctionCallKind, Operation, ToolchainOperations};
pub use ui::warn::warn_print;
pub use util::{shell_escape, shell_join};
