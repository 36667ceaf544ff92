#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gatekit-cli", version)]
#[command(about = "Lint gatekit policy files and dry-run access decisions")]
struct Cli {
    /// Log filter, e.g. `debug` or `gatekit_rbac=trace` (overrides `RUST_LOG`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate an RBAC policy file and print effective permissions per role
    LintPolicy {
        /// Policy YAML file
        file: PathBuf,
    },

    /// Decide whether a caller holding the given roles may perform METHOD PATH
    Check {
        /// Policy YAML file
        #[arg(long)]
        policy: PathBuf,

        /// Role held by the caller (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,

        method: String,
        path: String,
    },

    /// Show the route policy that applies to METHOD PATH
    Route {
        /// Route-policy YAML file
        #[arg(long)]
        routes: PathBuf,

        method: String,
        path: String,
    },

    /// Load deployment auth configuration (file and `GATEKIT_AUTH_*` env)
    AuthConfig {
        /// Optional YAML file
        file: Option<PathBuf>,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = level.map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        EnvFilter::new,
    );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> anyhow::Result<bool> {
    let mut out = std::io::stdout().lock();
    match command {
        Command::LintPolicy { file } => commands::lint_policy(&file, &mut out).map(|()| true),
        Command::Check {
            policy,
            roles,
            method,
            path,
        } => commands::check(&policy, &roles, &method, &path, &mut out),
        Command::Route {
            routes,
            method,
            path,
        } => commands::route(&routes, &method, &path, &mut out).map(|()| true),
        Command::AuthConfig { file } => {
            commands::auth_config(file.as_deref(), &mut out).map(|()| true)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli.command) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
