//! olmctl installs, checks and removes OLM managed operators by short alias.
#![deny(missing_docs)]

use std::{fmt::Write as _, path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::Result;
use clap::{ArgAction, ArgGroup, CommandFactory, Parser};
use tracing::{error, info, warn};

use olmctl::{
    install::{install, InstallOutcome, PollConfig, DEFAULT_POLL_ATTEMPTS},
    manifest::{Manifest, ManifestResolver},
    probe::install_state,
    registry::{canonical_id, AliasRegistry, CanonicalOperatorId},
    uninstall::{uninstall, UninstallReport},
    utils::Context,
};
use olmctl_common::telemetry;

const EXIT_USAGE: u8 = 1;
const EXIT_NO_ARGUMENTS: u8 = 2;
const EXIT_STILL_INSTALLING: u8 = 3;
const EXIT_UNINSTALL_INCOMPLETE: u8 = 4;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, disable_help_flag = true)]
#[command(group(
    ArgGroup::new("action").args(["check", "install", "uninstall", "list"]),
))]
struct Cli {
    /// Report whether the operator is installed
    #[arg(
        short = 'c',
        short_alias = 'C',
        long,
        value_name = "ALIAS",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    check: Option<String>,

    /// Install the operator and wait for OLM to report it
    #[arg(
        short = 'i',
        short_alias = 'I',
        long,
        value_name = "ALIAS",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    install: Option<String>,

    /// Remove the operator, keeping its namespace
    #[arg(
        short = 'd',
        short_alias = 'D',
        long,
        value_name = "ALIAS",
        num_args = 0..=1,
        default_missing_value = ""
    )]
    uninstall: Option<String>,

    /// Manifest to install instead of the registered one
    #[arg(
        short = 'f',
        short_alias = 'F',
        long = "file",
        value_name = "MANIFEST",
        requires = "install"
    )]
    manifest: Option<PathBuf>,

    /// List the registered operators and their aliases
    #[arg(short = 'l', long)]
    list: bool,

    /// Print help
    #[arg(short = 'h', short_alias = 'H', long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Directory holding the operator manifests
    #[arg(long, env = "OLMCTL_OPERATORS_DIR", default_value = "operators")]
    operators_dir: PathBuf,

    /// Registry file replacing the built in alias table
    #[arg(long, env = "OLMCTL_REGISTRY")]
    registry: Option<PathBuf>,

    /// Seconds to wait before each install probe
    #[arg(long, env = "OLMCTL_POLL_INTERVAL_SECS", default_value_t = 10)]
    poll_interval_secs: u64,

    /// Number of install probes before giving up
    #[arg(
        long,
        env = "OLMCTL_POLL_ATTEMPTS",
        default_value_t = DEFAULT_POLL_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    poll_attempts: u32,

    /// Exit with an error when the operator does not appear in time
    #[arg(long, env = "OLMCTL_FAIL_ON_TIMEOUT")]
    fail_on_timeout: bool,

    /// Export traces to this OTLP endpoint
    #[arg(long, env = "OLMCTL_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

/// Requested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action<'a> {
    List,
    Operator(Operation, &'a str),
}

/// Operation on a single operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Check,
    Install,
    Uninstall,
}

impl Cli {
    // None when no action was requested or its alias is empty
    fn action(&self) -> Option<Action<'_>> {
        if self.list {
            return Some(Action::List);
        }
        let (operation, alias) = if let Some(alias) = &self.check {
            (Operation::Check, alias)
        } else if let Some(alias) = &self.install {
            (Operation::Install, alias)
        } else if let Some(alias) = &self.uninstall {
            (Operation::Uninstall, alias)
        } else {
            return None;
        };
        if alias.trim().is_empty() {
            return None;
        }
        Some(Action::Operator(operation, alias))
    }

    fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            attempts: self.poll_attempts,
        }
    }

    fn registry(&self) -> Result<AliasRegistry, olmctl::Error> {
        match &self.registry {
            Some(path) => AliasRegistry::from_file(path),
            None => Ok(AliasRegistry::builtin()),
        }
    }
}

fn print_usage() {
    let _ = Cli::command().print_help();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        print_usage();
        return ExitCode::from(EXIT_NO_ARGUMENTS);
    }
    let args = Cli::parse();
    let Some(action) = args.action() else {
        print_usage();
        return ExitCode::from(EXIT_USAGE);
    };

    if let Err(err) = telemetry::init(args.otlp_endpoint.clone()) {
        eprintln!("failed to initialize logging: {err:#}");
        return ExitCode::FAILURE;
    }

    let code = tokio::select! {
        result = run(&args, action) => match result {
            Ok(code) => code,
            Err(err) => {
                error!(%err, "olmctl failed");
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, nothing was rolled back");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    };
    // Flush traces before exit
    telemetry::shutdown();
    code
}

async fn run(args: &Cli, action: Action<'_>) -> Result<ExitCode> {
    let registry = args.registry()?;
    let (operation, alias) = match action {
        Action::List => {
            print!("{}", render_registry(&registry));
            return Ok(ExitCode::SUCCESS);
        }
        Action::Operator(operation, alias) => (operation, alias),
    };

    // Everything that can be checked locally is checked before the cluster is contacted
    let (id, reference) = registry.resolve(alias)?;
    let resolver = ManifestResolver::new(&args.operators_dir);
    let path = match (operation, &args.manifest) {
        (Operation::Install, Some(path)) => resolver.resolve_override(path)?,
        _ => resolver.resolve(&reference)?,
    };
    let manifest = Manifest::load(&path)?;
    info!(?operation, %id, manifest = %path.display(), "resolved operator");

    let cx = Arc::new(Context::connect(args.poll_config()).await?);
    match operation {
        Operation::Check => {
            let state = install_state(cx, &id).await?;
            println!("{id}: {state}");
        }
        Operation::Install => {
            let outcome = install(cx, &id, &manifest).await?;
            println!("{}", render_install(&id, &outcome));
            if outcome.timed_out() && args.fail_on_timeout {
                return Ok(ExitCode::from(EXIT_STILL_INSTALLING));
            }
        }
        Operation::Uninstall => {
            let report = uninstall(cx, &id, &manifest).await?;
            print!("{}", render_uninstall(&id, &report));
            if !report.is_complete() {
                return Ok(ExitCode::from(EXIT_UNINSTALL_INCOMPLETE));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn render_registry(registry: &AliasRegistry) -> String {
    let mut out = String::new();
    for info in registry.entries() {
        let _ = writeln!(
            out,
            "{:<16} {} ({}) aliases: {}",
            info.primary_alias(),
            canonical_id(info),
            info.manifest,
            info.aliases.join(", "),
        );
    }
    out
}

fn render_install(id: &CanonicalOperatorId, outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::AlreadyInstalled => format!("{id}: already installed"),
        InstallOutcome::Installed { attempts } => {
            format!("{id}: installed after {attempts} poll(s)")
        }
        InstallOutcome::StillInstalling { attempts } => format!(
            "{id}: not reported after {attempts} poll(s), it may still be installing"
        ),
    }
}

fn render_uninstall(id: &CanonicalOperatorId, report: &UninstallReport) -> String {
    let mut out = if report.is_complete() {
        format!("{id}: removed from namespace {}\n", report.namespace)
    } else {
        format!(
            "{id}: partially removed from namespace {}, {} deletion(s) failed\n",
            report.namespace,
            report.failures.len()
        )
    };
    for deletion in &report.deletions {
        match report.failures.iter().find(|f| &f.deletion == deletion) {
            Some(failure) => {
                let _ = writeln!(out, "  failed {deletion:?}: {}", failure.reason);
            }
            None => {
                let _ = writeln!(out, "  deleted {deletion:?}");
            }
        }
    }
    let _ = writeln!(out, "namespace {} preserved", report.namespace);
    out
}
