//! trustgov: an autonomy-trust governor for AI agents
//!
//! **trustgov decides how much an agent may do on its own, and keeps that
//! decision earned.**
//!
//! Every human prompt in an agent session is fed through `trustgov hook`.
//! While the agent is paused for review, approval raises its trust score,
//! pushback lowers it, and long stretches without a human touch decay it.
//! The score maps onto four autonomy levels, and each level carries a fixed
//! set of checkpoints where the agent must stop for a human.
//!
//! # Core Principles
//!
//! - **Trust is easy to lose**: demotion is automatic and immediate
//! - **Autonomy is hard to gain**: promotion waits for an explicit human command
//! - **Never penalize missing data**: unknown timestamps do not decay trust
//! - **One writer at a time**: every read-modify-write holds an exclusive lease
//!
//! # Architecture
//!
//! ## State artifact
//!
//! A single markdown file whose YAML front matter holds the trust record.
//! The body below the front matter belongs to other tooling and is never
//! rewritten.
//!
//! ## Subsystems (Plugins)
//!
//! - `signal`: classifies human text into approve/reject/promote/deny/neutral
//! - `decay`: audit-decay penalty from the last human touch
//! - `trust`: the state machine over the trust record
//! - `checkpoints`: level-gated human review points
//!
//! # Examples
//!
//! ```bash
//! # Create the state artifact
//! trustgov init
//!
//! # Agent stopped at a checkpoint
//! trustgov await
//!
//! # Host forwards the human prompt
//! echo '{"prompt":"LGTM"}' | trustgov hook
//!
//! # Confirm a pending promotion
//! echo '{"prompt":"/govern promote"}' | trustgov hook
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: record, storage, configuration, audit, and the governor itself
//! - [`plugins`]: trust policy (signals, decay, engine, checkpoints)

pub mod core;
pub mod plugins;

use crate::core::{
    audit::AuditLog,
    config::{self, GovernorConfig},
    error,
    governor::Governor,
    output,
    record::{Level, TrustRecord},
    store::{FileStateStore, RecordStore},
    time,
};
use crate::plugins::{checkpoints, trust};

use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[clap(
    name = "trustgov",
    version = env!("CARGO_PKG_VERSION"),
    about = "Earned-autonomy governor for AI agents"
)]
struct Cli {
    /// State artifact to govern (overrides `state_file` from the config).
    #[clap(long, global = true)]
    state: Option<PathBuf>,
    /// Config file (defaults to ./trustgov.toml when present).
    #[clap(long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score the human prompt read from stdin ({"prompt": "..."}) and print the trust status.
    Hook,
    /// Show the current trust status without changing it.
    Status {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Pause the agent for human review; the next prompt is scored.
    Await,
    /// Check whether a checkpoint requires human review at the current level.
    Gate {
        /// Checkpoint slug (issue-create, pr-create, merge, release, external-comms, spec-change).
        checkpoint: String,
    },
    /// Create the state artifact with a default record if it does not exist.
    Init,
    /// Print the machine-readable command schema.
    Schema,
    /// Print the version.
    Version,
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "trustgov",
        "version": VERSION,
        "subsystems": [trust::schema(), checkpoints::schema()],
    })
}

fn build_governor(
    config: &GovernorConfig,
) -> Result<Governor<FileStateStore>, error::GovernorError> {
    let store = FileStateStore::new(&config.state_file).with_lock_timeout(config.lock_timeout());
    let mut governor =
        Governor::new(store, config.classifier()?).with_command_prefix(&config.command_prefix);
    if let Some(path) = &config.audit_log {
        governor = governor.with_audit(AuditLog::new(path));
    }
    Ok(governor)
}

fn read_stdin() -> String {
    let mut input = String::new();
    if std::io::stdin().read_to_string(&mut input).is_err() {
        input.clear();
    }
    input
}

pub fn run() -> Result<(), error::GovernorError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("v{}", VERSION);
            return Ok(());
        }
        Command::Schema => {
            let rendered = serde_json::to_string_pretty(&schema())
                .map_err(|e| error::GovernorError::ValidationError(e.to_string()))?;
            println!("{}", rendered);
            return Ok(());
        }
        _ => {}
    }

    let current_dir = std::env::current_dir()?;
    let mut config = config::load_config(cli.config.as_deref(), &current_dir)?;
    if let Some(state) = cli.state {
        config.state_file = if state.is_relative() {
            current_dir.join(state)
        } else {
            state
        };
    }
    let governor = build_governor(&config)?;

    match cli.command {
        Command::Hook => {
            let input = read_stdin();
            if let Some(text) = governor.handle_input(&input)? {
                println!("{}", text);
            }
        }
        Command::Status { format } => {
            let report = governor.status()?;
            match (format.as_str(), report) {
                ("json", report) => {
                    let envelope = match report {
                        Some(report) => time::command_envelope(
                            "status",
                            "ok",
                            serde_json::json!({ "report": report }),
                        ),
                        None => time::command_envelope(
                            "status",
                            "missing",
                            serde_json::json!({ "state_file": config.state_file }),
                        ),
                    };
                    let rendered = serde_json::to_string_pretty(&envelope)
                        .map_err(|e| error::GovernorError::ValidationError(e.to_string()))?;
                    println!("{}", rendered);
                }
                ("text", Some(report)) => {
                    println!("{}", output::render(None, &report, governor.command_prefix()));
                }
                ("text", None) => {
                    println!(
                        "No trust record at {} (run `trustgov init`)",
                        config.state_file.display()
                    );
                }
                (other, _) => {
                    return Err(error::GovernorError::ValidationError(format!(
                        "unknown format '{}' (expected 'text' or 'json')",
                        other
                    )));
                }
            }
        }
        Command::Await => match governor.request_review()? {
            Some(evaluation) => println!("{}", evaluation.render(governor.command_prefix())),
            None => {
                return Err(error::GovernorError::NotFound(format!(
                    "trust record at {}",
                    config.state_file.display()
                )));
            }
        },
        Command::Gate { checkpoint } => {
            let checkpoint = checkpoint.parse::<checkpoints::Checkpoint>()?;
            // Without a record the agent is treated as the least trusted level.
            let level = governor
                .store()
                .snapshot()?
                .map(|record: TrustRecord| record.level)
                .unwrap_or(Level::Junior);
            if checkpoints::requires_review(level, checkpoint) {
                println!("{}: human review required at {}", checkpoint.slug(), level);
            } else {
                println!("{}: autonomous at {}", checkpoint.slug(), level);
            }
        }
        Command::Init => {
            if governor.store().create_if_missing()? {
                println!("Trust record created at {}", config.state_file.display());
            } else {
                println!("Trust record already present at {}", config.state_file.display());
            }
        }
        Command::Version | Command::Schema => {}
    }

    Ok(())
}
