//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use authority_arbiter::arbitrator::feeds::{FeedUpdate, parse_override, validate_elapsed};
use authority_arbiter::arbitrator::loop_main::{
    LoopCommand, UiEvent, install_shutdown_handler, spawn,
};
use authority_arbiter::authority::engine::AuthorityRuleEngine;
use authority_arbiter::authority::risk::{is_autonomous_allowed, risk_level};
use authority_arbiter::authority::types::{ControlMode, ModeRecommendation};
use authority_arbiter::core::config::Config;

/// Authority Arbiter — control-authority arbitration for remotely operated
/// vehicles.
#[derive(Debug, Parser)]
#[command(
    name = "arb",
    author,
    version,
    about = "Authority Arbiter - Control Mode Arbitration",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the arbitration loop, bridging stdin commands to the engine.
    Run(RunArgs),
    /// Evaluate one arbitration cycle from explicit inputs.
    Evaluate(EvaluateArgs),
    /// Classify a phase/criticality pair.
    Risk(RiskArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Do not read transport commands from stdin.
    #[arg(long)]
    no_stdin: bool,
}

#[derive(Debug, Clone, Args)]
struct EvaluateArgs {
    /// Current control mode.
    #[arg(long, value_name = "MODE")]
    current_mode: String,
    /// Recommended control mode.
    #[arg(long, value_name = "MODE")]
    recommended_mode: String,
    /// Estimator confidence in [0, 1].
    #[arg(long, default_value_t = 0.7)]
    confidence: f64,
    /// Human reliability in [0, 1].
    #[arg(long, default_value_t = 0.85)]
    human_reliability: f64,
    /// Autonomous reliability in [0, 1].
    #[arg(long, default_value_t = 0.8)]
    autonomous_reliability: f64,
    /// Docking reliability in [0, 1], when reported.
    #[arg(long)]
    docking_reliability: Option<f64>,
    /// Mission phase name.
    #[arg(long, default_value = "Transit")]
    phase: String,
    /// Task criticality.
    #[arg(long, default_value = "Routine")]
    criticality: String,
    /// Seconds since the last committed mode change.
    #[arg(long, default_value_t = 300.0)]
    elapsed: f64,
    /// Operator override mode, if one arrived this cycle.
    #[arg(long, value_name = "MODE")]
    operator_override: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct RiskArgs {
    /// Mission phase name.
    phase: String,
    /// Task criticality.
    #[arg(default_value = "Routine")]
    criticality: String,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<authority_arbiter::core::errors::ArbError> for CliError {
    fn from(value: authority_arbiter::core::errors::ArbError) -> Self {
        Self::User(value.to_string())
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_loop(cli, args),
        Command::Evaluate(args) => run_evaluate(cli, args),
        Command::Risk(args) => run_risk(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::Runtime(e.to_string()))
}

// ──────────────────── run ────────────────────

/// Wire format accepted on stdin, one JSON object per line.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireCommand {
    Recommendation { mode: String },
    HumanReliability { value: f64 },
    AutonomousReliability { value: f64 },
    DockingReliability { value: f64 },
    Confidence { value: f64 },
    Phase { name: String },
    Criticality { label: String },
    OperatorOverride { mode: String },
    OperatorResponse { accepted: bool },
    Shutdown,
}

impl WireCommand {
    /// Validate and convert to a loop command. Rejections carry the ARB code.
    fn into_loop_command(self) -> Result<LoopCommand, CliError> {
        let cmd = match self {
            Self::Recommendation { mode } => {
                LoopCommand::Feed(FeedUpdate::recommendation(&mode)?)
            }
            Self::HumanReliability { value } => {
                LoopCommand::Feed(FeedUpdate::human_reliability(value)?)
            }
            Self::AutonomousReliability { value } => {
                LoopCommand::Feed(FeedUpdate::autonomous_reliability(value)?)
            }
            Self::DockingReliability { value } => {
                LoopCommand::Feed(FeedUpdate::docking_reliability(value)?)
            }
            Self::Confidence { value } => LoopCommand::Feed(FeedUpdate::confidence(value)?),
            Self::Phase { name } => LoopCommand::Feed(FeedUpdate::phase(&name)),
            Self::Criticality { label } => LoopCommand::Feed(FeedUpdate::criticality(&label)),
            Self::OperatorOverride { mode } => {
                LoopCommand::OperatorOverride(parse_override(&mode)?)
            }
            Self::OperatorResponse { accepted } => LoopCommand::OperatorResponse(accepted),
            Self::Shutdown => LoopCommand::Shutdown,
        };
        Ok(cmd)
    }
}

fn run_loop(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let handle = spawn(&config).map_err(|e| CliError::Runtime(e.to_string()))?;
    install_shutdown_handler(handle.commands.clone())
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    if !args.no_stdin {
        let commands = handle.commands.clone();
        std::thread::Builder::new()
            .name("arb-stdin".to_string())
            .spawn(move || {
                for line in io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<WireCommand>(trimmed)
                        .map_err(|e| CliError::User(e.to_string()))
                        .and_then(WireCommand::into_loop_command)
                    {
                        Ok(cmd) => {
                            if commands.send(cmd).is_err() {
                                break;
                            }
                        }
                        Err(e) => eprintln!("arb: rejected input: {e}"),
                    }
                }
            })
            .map_err(|e| CliError::Runtime(e.to_string()))?;
    }

    let mode = output_mode(cli);
    for event in handle.events.iter() {
        print_event(&event, mode)?;
    }

    handle
        .shutdown()
        .map_err(|e| CliError::Runtime(e.to_string()))
}

fn print_event(event: &UiEvent, mode: OutputMode) -> Result<(), CliError> {
    match mode {
        OutputMode::Json => println!("{}", serde_json::to_string(event)?),
        OutputMode::Human => match event {
            UiEvent::Prompt {
                requested_mode,
                message,
                timeout_seconds,
                ..
            } => {
                let deadline = timeout_seconds
                    .map_or_else(String::new, |t| format!(" [{t}s to respond]"));
                println!(
                    "{} {message} -> {requested_mode}{deadline}",
                    "CONFIRM".yellow().bold()
                );
            }
            UiEvent::Suggestion {
                suggested_mode,
                message,
                ..
            } => {
                println!("{} {message} -> {suggested_mode}", "SUGGEST".cyan());
            }
            UiEvent::Info { message, urgency } => {
                println!("{} [{urgency}] {message}", "INFO".blue());
            }
            UiEvent::ModeChanged {
                old_mode,
                new_mode,
                reason,
            } => {
                println!(
                    "{} {old_mode} -> {new_mode}: {reason}",
                    "MODE".green().bold()
                );
            }
            UiEvent::Status(snapshot) => {
                println!(
                    "{} mode={} phase={} pending={} changes={}",
                    "STATUS".dimmed(),
                    snapshot.current_mode,
                    snapshot.phase,
                    snapshot.pending_decision,
                    snapshot.mode_change_count
                );
            }
        },
    }
    Ok(())
}

// ──────────────────── evaluate ────────────────────

fn run_evaluate(cli: &Cli, args: &EvaluateArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let engine = AuthorityRuleEngine::new(config.engine.clone());

    let current: ControlMode = args.current_mode.parse()?;
    let recommended: ControlMode = args.recommended_mode.parse()?;
    let operator_override = args
        .operator_override
        .as_deref()
        .map(parse_override)
        .transpose()?;

    // Same validation surface the transport ingestion uses.
    FeedUpdate::confidence(args.confidence)?;
    FeedUpdate::human_reliability(args.human_reliability)?;
    FeedUpdate::autonomous_reliability(args.autonomous_reliability)?;
    if let Some(docking) = args.docking_reliability {
        FeedUpdate::docking_reliability(docking)?;
    }
    let elapsed = validate_elapsed(args.elapsed)?;

    let recommendation = ModeRecommendation {
        recommended_mode: recommended,
        confidence: args.confidence,
        human_reliability: args.human_reliability,
        autonomous_reliability: args.autonomous_reliability,
        docking_reliability: args.docking_reliability,
    };

    let decision = engine.evaluate(
        current,
        &recommendation,
        &args.phase,
        &args.criticality,
        elapsed,
        operator_override,
    );

    match output_mode(cli) {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&decision)?),
        OutputMode::Human => {
            println!(
                "{} {} -> {} [{}]",
                format!("{}", decision.action).to_uppercase().bold(),
                current,
                decision.target_mode,
                decision.urgency
            );
            println!("{}", decision.message.bold());
            if let Some(timeout) = decision.timeout_seconds {
                println!("responds within: {timeout}s (decline allowed: {})", decision.allow_decline);
            }
            if !decision.explanation.is_empty() {
                println!("\n{}", decision.explanation);
            }
        }
    }
    Ok(())
}

// ──────────────────── risk ────────────────────

fn run_risk(cli: &Cli, args: &RiskArgs) -> Result<(), CliError> {
    let level = risk_level(&args.phase, &args.criticality);
    let autonomous_allowed = is_autonomous_allowed(&args.phase, &args.criticality);

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "phase": args.phase,
                "criticality": args.criticality,
                "risk_level": level,
                "autonomous_allowed": autonomous_allowed,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputMode::Human => {
            let level_str = level.to_string();
            let colored_level = match level_str.as_str() {
                "critical" => level_str.red().bold(),
                "high" => level_str.red(),
                "medium" => level_str.yellow(),
                _ => level_str.green(),
            };
            println!("{} / {}: risk {colored_level}", args.phase, args.criticality);
            println!(
                "autonomous operation: {}",
                if autonomous_allowed {
                    "allowed".green()
                } else {
                    "prohibited".red().bold()
                }
            );
        }
    }
    Ok(())
}
