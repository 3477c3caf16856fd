// # fipctl - Floating IP lifecycle CLI
//
// Thin integration layer over fip-core. All lifecycle logic (resolution,
// creation, convergence polling, release) lives in the library; this binary
// only:
// 1. Reads configuration from flags or environment variables
// 2. Initializes logging and the runtime
// 3. Registers remote API factories
// 4. Runs one lifecycle command and maps the outcome to an exit code
//
// ## Configuration
//
// ### Remote API
// - `FIP_API_TYPE`: API type (neutron, memory)
// - `FIP_API_ENDPOINT`: Networking endpoint (for neutron)
// - `FIP_API_TOKEN`: Pre-issued auth token (for neutron)
//
// ### Lifecycle
// - `FIP_EXTERNAL_NETWORK_ID`: Network new floating IPs are allocated from
// - `FIP_SUBJECT`: Subject attached to lifecycle events
//
// ### Convergence polling
// - `FIP_BACKOFF_STEPS`: Maximum status fetches (default 10)
// - `FIP_BACKOFF_INITIAL_DELAY_MS`: Delay between fetches (default 30000)
// - `FIP_BACKOFF_FACTOR`: Delay multiplier (default 1.0)
// - `FIP_BACKOFF_JITTER`: Extra random delay fraction (default 0.1)
// - `FIP_BACKOFF_CAP_MS`: Upper bound for one delay (default 3600000)
//
// ### Logging
// - `FIP_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export FIP_API_ENDPOINT=https://network.example.com:9696
// export FIP_API_TOKEN=gAAAAABk...
// export FIP_EXTERNAL_NETWORK_ID=376da547-b977-4cfe-9cba-275c80debf57
//
// fipctl associate --address 203.0.113.7 --port ce705c24-c1ef-408a-bda3-7bbd946164ab
// fipctl release --address 203.0.113.7
// ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fip_core::config::{ApiConfig, BackoffConfig, FloatingIpConfig, ManagerConfig};
use fip_core::{ApiRegistry, FloatingIpManager, TracingEventRecorder};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for the different outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FipctlExitCode {
    /// Command completed
    Success = 0,
    /// Configuration error or invalid input
    ConfigError = 1,
    /// Remote or runtime failure
    RuntimeError = 2,
    /// The remote never converged within the polling budget
    ConvergenceTimeout = 3,
}

impl From<FipctlExitCode> for ExitCode {
    fn from(code: FipctlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Parser)]
#[command(name = "fipctl", version, about = "Manage floating IP lifecycles")]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    #[command(flatten)]
    backoff: BackoffArgs,

    /// Subject attached to lifecycle events
    #[arg(long, env = "FIP_SUBJECT", default_value = "fipctl", global = true)]
    subject: String,

    /// Log level
    #[arg(
        long,
        env = "FIP_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"],
        global = true
    )]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ApiArgs {
    /// Remote API type
    #[arg(long = "api-type", env = "FIP_API_TYPE", default_value = "neutron", global = true)]
    kind: String,

    /// Networking endpoint
    #[arg(long = "api-endpoint", env = "FIP_API_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Auth token
    #[arg(long = "api-token", env = "FIP_API_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

#[derive(Debug, Args)]
struct BackoffArgs {
    /// Maximum status fetches while waiting for convergence
    #[arg(long, env = "FIP_BACKOFF_STEPS", global = true)]
    backoff_steps: Option<u32>,

    /// Delay between status fetches, in milliseconds
    #[arg(long, env = "FIP_BACKOFF_INITIAL_DELAY_MS", global = true)]
    backoff_initial_delay_ms: Option<u64>,

    /// Delay multiplier per fetch
    #[arg(long, env = "FIP_BACKOFF_FACTOR", global = true)]
    backoff_factor: Option<f64>,

    /// Extra random delay as a fraction of the delay
    #[arg(long, env = "FIP_BACKOFF_JITTER", global = true)]
    backoff_jitter: Option<f64>,

    /// Upper bound for a single delay, in milliseconds
    #[arg(long, env = "FIP_BACKOFF_CAP_MS", global = true)]
    backoff_cap_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the floating IP holding an address (null if none)
    Show {
        #[arg(long)]
        address: String,
    },
    /// Resolve an address, creating the floating IP if nothing holds it
    Ensure {
        /// Address to pin; omit to let the remote choose
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, env = "FIP_EXTERNAL_NETWORK_ID")]
        network: String,
    },
    /// Ensure a floating IP and bind it to a port, waiting for ACTIVE
    Associate {
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long)]
        port: String,
        #[arg(long, env = "FIP_EXTERNAL_NETWORK_ID")]
        network: String,
    },
    /// Unbind the floating IP holding an address, waiting for DOWN
    Disassociate {
        #[arg(long)]
        address: String,
    },
    /// Delete the floating IP holding an address
    Release {
        #[arg(long)]
        address: String,
    },
}

impl Cli {
    /// Build the library configuration from flags and environment
    fn to_config(&self) -> Result<FloatingIpConfig> {
        let api = match self.api.kind.as_str() {
            "neutron" => ApiConfig::Neutron {
                endpoint: self
                    .api
                    .endpoint
                    .clone()
                    .context("FIP_API_ENDPOINT is required when FIP_API_TYPE=neutron")?,
                token: self
                    .api
                    .token
                    .clone()
                    .context("FIP_API_TOKEN is required when FIP_API_TYPE=neutron")?,
            },
            "memory" => ApiConfig::Memory,
            other => anyhow::bail!(
                "FIP_API_TYPE '{}' is not supported. Supported types: neutron, memory",
                other
            ),
        };

        let defaults = BackoffConfig::default();
        let backoff = BackoffConfig {
            steps: self.backoff.backoff_steps.unwrap_or(defaults.steps),
            initial_delay_ms: self
                .backoff
                .backoff_initial_delay_ms
                .unwrap_or(defaults.initial_delay_ms),
            factor: self.backoff.backoff_factor.unwrap_or(defaults.factor),
            jitter: self.backoff.backoff_jitter.unwrap_or(defaults.jitter),
            cap_ms: self.backoff.backoff_cap_ms.unwrap_or(defaults.cap_ms),
        };

        let config = FloatingIpConfig {
            api,
            manager: ManagerConfig {
                subject: self.subject.clone(),
                backoff,
                ..ManagerConfig::default()
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.to_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FipctlExitCode::ConfigError.into();
        }
    };

    // Logs go to stderr; stdout carries command output
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FipctlExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FipctlExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(config, cli.command).await {
            Ok(()) => FipctlExitCode::Success,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Classify a failure for the process exit code
fn exit_code_for(err: &anyhow::Error) -> FipctlExitCode {
    match err.downcast_ref::<fip_core::Error>() {
        Some(e) if e.is_convergence_timeout() => FipctlExitCode::ConvergenceTimeout,
        Some(fip_core::Error::Config(_) | fip_core::Error::InvalidInput(_)) => {
            FipctlExitCode::ConfigError
        }
        _ => FipctlExitCode::RuntimeError,
    }
}

/// Build the manager and run one command
async fn run(config: FloatingIpConfig, command: Command) -> Result<()> {
    let registry = ApiRegistry::with_builtin();

    #[cfg(feature = "neutron")]
    fip_provider_neutron::register(&registry);

    let api = registry.create_api(&config.api)?;
    let manager = FloatingIpManager::new(api, Box::new(TracingEventRecorder), config.manager)?;

    info!(api = manager.api_name(), "Remote API ready");

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

    let result = run_command(&manager, command, &cancel).await;

    watcher.abort();
    result
}

async fn run_command(
    manager: &FloatingIpManager,
    command: Command,
    cancel: &CancellationToken,
) -> Result<()> {
    match command {
        Command::Show { address } => {
            let fip = manager.resolve(&address).await?;
            print_json(&fip)
        }
        Command::Ensure { address, network } => {
            let fip = manager.get_or_create(&address, &network).await?;
            print_json(&fip)
        }
        Command::Associate {
            address,
            port,
            network,
        } => {
            let fip = manager.get_or_create(&address, &network).await?;
            let bound = manager.associate_with_cancel(&fip, &port, cancel).await?;
            print_json(&bound)
        }
        Command::Disassociate { address } => {
            let fip = manager
                .resolve(&address)
                .await?
                .with_context(|| format!("no floating IP holds address {}", address))?;
            let unbound = manager.disassociate_with_cancel(&fip, cancel).await?;
            print_json(&unbound)
        }
        Command::Release { address } => {
            manager.release(&address).await?;
            info!(address, "Release complete");
            Ok(())
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Cancel `token` on SIGTERM or SIGINT
///
/// Only the convergence wait observes the token; a remote call already in
/// flight runs to completion.
#[cfg(unix)]
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to set up signal handlers: {}", e);
            return;
        }
    };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received {}, abandoning convergence wait", name);
    token.cancel();
}

/// Cancel `token` on Ctrl-C
#[cfg(not(unix))]
async fn cancel_on_shutdown_signal(token: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl-C, abandoning convergence wait");
            token.cancel();
        }
        Err(e) => error!("Failed to wait for Ctrl-C: {}", e),
    }
}
