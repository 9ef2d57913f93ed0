use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "starknet-docker",
    version,
    about = "Compile, deploy and interact with StarkNet contracts through Docker containers"
)]
pub(crate) struct Cli {
    /// Config file (defaults to starknet-docker.yaml in the project directory)
    #[arg(long, global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Network selector from the config; unknown selectors fall back to the default
    #[arg(long, global = true)]
    pub(crate) network: Option<String>,

    /// Print docker invocations and debug logs
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,

    /// Print the docker commands that would run, without running them
    #[arg(long = "dry-run", global = true)]
    pub(crate) dry_run: bool,

    /// Colorize stderr: auto|always|never
    #[arg(long, value_enum, global = true)]
    pub(crate) color: Option<starknet_docker::ColorMode>,

    /// Project directory bound into the containers (defaults to the current directory)
    #[arg(long = "project-dir", global = true)]
    pub(crate) project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct FunctionArgs {
    /// Contract name; its ABI is read from the build directory
    #[arg(long)]
    pub(crate) contract: String,
    /// Deployed contract address
    #[arg(long)]
    pub(crate) address: String,
    /// Function to call or invoke
    #[arg(long)]
    pub(crate) function: String,
    /// Function inputs
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub(crate) inputs: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Compile one contract, or every .cairo file in the contracts directory
    Compile {
        /// Contract file name (e.g. counter.cairo)
        #[arg(long)]
        contract: Option<String>,
        /// Pass --disable_hint_validation to the compiler
        #[arg(long = "disable-hints")]
        disable_hints: bool,
    },
    /// Deploy one compiled contract, or every artifact in the build directory
    Deploy {
        /// Compiled artifact name (e.g. counter.json)
        #[arg(long)]
        contract: Option<String>,
        /// Constructor inputs
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        inputs: Vec<String>,
    },
    /// Call a view function
    Call(FunctionArgs),
    /// Invoke an external function
    Invoke(FunctionArgs),
    /// Query the status of a transaction
    TxStatus {
        #[arg(long)]
        hash: String,
        /// Compiled contract used to decode errors
        #[arg(long)]
        contract: Option<String>,
        /// Print the error message of a rejected transaction
        #[arg(long = "error-message")]
        error_message: bool,
    },
    /// Deploy an account contract for the configured wallet
    CreateAccount {
        /// Account name (defaults to the toolchain's own default)
        #[arg(long)]
        account: Option<String>,
    },
    /// Run one test file, or every *_test.py in the tests directory
    Test {
        #[arg(long)]
        file: Option<String>,
    },
    /// Manage the local devnet container
    Devnet {
        #[command(subcommand)]
        command: DevnetCmd,
    },
    /// Print the effective toolchain and devnet images
    Images {
        /// Emit machine-readable JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Run environment diagnostics
    Doctor,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum DevnetCmd {
    /// Start the devnet container (foreground unless --detach)
    Start {
        /// Use the -arm image variant
        #[arg(long)]
        arm64: bool,
        #[arg(long)]
        detach: bool,
    },
    /// Stop the devnet container
    Stop,
}
