//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use wp_rescue::core::config::Config;
use wp_rescue::core::errors::WprError;
use wp_rescue::pipeline::lock::PipelineLock;
use wp_rescue::pipeline::orchestrator::{Pipeline, Stage, StageOutput, StageResult};
use wp_rescue::scanner::{FindingKind, ScanReport};

/// WP Rescue — reinstall a clean WordPress core and scan wp-content.
#[derive(Debug, Parser)]
#[command(
    name = "wprescue",
    author,
    version,
    about = "WP Rescue - clean core reinstall + malware heuristics",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Installation root to operate on.
    #[arg(long, global = true, value_name = "PATH", default_value = ".")]
    root: PathBuf,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Delete the replaceable core files (destructive, no undo).
    Cleanup(ConfirmArgs),
    /// Download the release archive into the root.
    Fetch(FetchArgs),
    /// Extract the downloaded archive and merge it into the root.
    Install(ConfirmArgs),
    /// Scan the content directory for suspicious artifacts.
    Scan(ScanArgs),
    /// Run all four stages in order: cleanup, fetch, install, scan.
    Run(ConfirmArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ConfirmArgs {
    /// Skip the interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct FetchArgs {
    /// Override the release archive URL.
    #[arg(long, value_name = "URL")]
    url: Option<String>,
    /// Expected SHA-256 of the archive (64 hex chars).
    #[arg(long, value_name = "HEX")]
    sha256: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    /// Print full paths instead of root-relative ones.
    #[arg(long)]
    full_paths: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
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
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Filesystem failure (cleanup, merge, lock).
    #[error("{0}")]
    Filesystem(String),
    /// Network failure (download).
    #[error("{0}")]
    Network(String),
    /// Archive failure (missing, corrupt, wrong layout).
    #[error("{0}")]
    Archive(String),
    /// Internal bug or serialization failure.
    #[error("{0}")]
    Internal(String),
}

impl CliError {
    /// Process exit code contract: one code per failure category.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Filesystem(_) => 2,
            Self::Network(_) => 3,
            Self::Archive(_) => 4,
            Self::Internal(_) => 5,
        }
    }
}

impl From<WprError> for CliError {
    fn from(value: WprError) -> Self {
        let message = value.to_string();
        match value {
            WprError::InvalidConfig { .. }
            | WprError::ConfigParse { .. }
            | WprError::MissingConfig { .. } => Self::User(message),
            WprError::Io { .. } | WprError::CleanupInterrupted { .. } | WprError::LockHeld { .. } => {
                Self::Filesystem(message)
            }
            WprError::HttpStatus { .. }
            | WprError::EmptyDownload { .. }
            | WprError::Transfer { .. }
            | WprError::ChecksumMismatch { .. }
            | WprError::Cancelled => Self::Network(message),
            WprError::Archive { .. } | WprError::MissingDistribution { .. } => {
                Self::Archive(message)
            }
            WprError::Serialization { .. } => Self::Internal(message),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(format!("failed to serialize output: {value}"))
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Cleanup(args) => run_destructive_stage(cli, Stage::Cleanup, args.yes),
        Command::Fetch(args) => run_fetch(cli, args),
        Command::Install(args) => run_destructive_stage(cli, Stage::Install, args.yes),
        Command::Scan(args) => run_scan(cli, args),
        Command::Run(args) => run_full(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── command bodies ────────────────────

fn run_destructive_stage(cli: &Cli, stage: Stage, yes: bool) -> Result<(), CliError> {
    confirm_destructive(cli, yes, stage.as_str())?;

    let config = load_config(cli)?;
    let _lock = PipelineLock::acquire(&cli.root).map_err(|e| emit_failure(cli, e))?;
    let mut pipeline = Pipeline::new(&cli.root, config);

    progress(cli, &format!("Running {stage} stage..."));
    let result = pipeline
        .run_stage(stage)
        .map_err(|e| emit_failure(cli, e))?;
    emit_stage_result(cli, &result)
}

fn run_fetch(cli: &Cli, args: &FetchArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(url) = &args.url {
        config.fetch.url.clone_from(url);
    }
    if let Some(digest) = &args.sha256 {
        config.fetch.expected_sha256 = Some(digest.clone());
    }
    config.validate().map_err(CliError::from)?;

    let _lock = PipelineLock::acquire(&cli.root).map_err(|e| emit_failure(cli, e))?;
    let mut pipeline = Pipeline::new(&cli.root, config);

    progress(cli, "Downloading release archive...");
    let result = pipeline
        .run_stage(Stage::Fetch)
        .map_err(|e| emit_failure(cli, e))?;
    emit_stage_result(cli, &result)
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let mut pipeline = Pipeline::new(&cli.root, config);

    progress(cli, "Scanning content directory...");
    let result = pipeline
        .run_stage(Stage::Scan)
        .map_err(|e| emit_failure(cli, e))?;

    match output_mode(cli) {
        OutputMode::Json => emit_stage_result(cli, &result),
        OutputMode::Human => {
            if !cli.quiet {
                println!("{}", result.message);
            }
            if let StageOutput::Scan(report) = &result.output {
                print_scan_report(cli, report, args.full_paths);
            }
            Ok(())
        }
    }
}

fn run_full(cli: &Cli, args: &ConfirmArgs) -> Result<(), CliError> {
    confirm_destructive(cli, args.yes, "run")?;

    let config = load_config(cli)?;
    let mut pipeline = Pipeline::new(&cli.root, config);

    progress(cli, "Starting recovery pipeline...");
    let report = pipeline.run_all().map_err(|e| emit_failure(cli, e))?;

    for result in &report.completed {
        emit_stage_result(cli, result)?;
        if output_mode(cli) == OutputMode::Human
            && let StageOutput::Scan(scan) = &result.output
        {
            print_scan_report(cli, scan, false);
        }
    }

    if let Some(failure) = report.failure {
        let stage = failure.stage;
        let error = CliError::from(failure.error);
        match output_mode(cli) {
            OutputMode::Human => {
                eprintln!("{} stage {} failed: {}", "error:".red().bold(), stage, error);
            }
            OutputMode::Json => {
                let payload = json!({
                    "success": false,
                    "message": format!("stage {stage} failed: {error}"),
                    "data": { "stage": stage.as_str() },
                });
                write_json_line(&payload)?;
            }
        }
        return Err(error);
    }

    if output_mode(cli) == OutputMode::Human && !cli.quiet {
        println!("{}", "Recovery process finished successfully.".green());
    }
    Ok(())
}

// ──────────────────── helpers ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(CliError::from)
}

fn output_mode(cli: &Cli) -> OutputMode {
    if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

/// Destructive stages need an explicit go-ahead: `--yes`, or an interactive
/// confirmation. Non-interactive invocations without `--yes` are refused.
fn confirm_destructive(cli: &Cli, yes: bool, what: &str) -> Result<(), CliError> {
    if yes {
        return Ok(());
    }
    if cli.json || !io::stdin().is_terminal() {
        return Err(CliError::User(format!(
            "`{what}` deletes core files; pass --yes to confirm"
        )));
    }

    print!(
        "{} `{what}` will DELETE core directories and root script files in {}. Continue? [y/N] ",
        "warning:".yellow().bold(),
        cli.root.display()
    );
    let _ = io::stdout().flush();
    let mut answer = String::new();
    io::stdin()
        .read_line(&mut answer)
        .map_err(|e| CliError::User(format!("cannot read confirmation: {e}")))?;
    if answer.trim().eq_ignore_ascii_case("y") {
        Ok(())
    } else {
        Err(CliError::User("aborted by user".to_string()))
    }
}

fn progress(cli: &Cli, message: &str) {
    if output_mode(cli) == OutputMode::Human && !cli.quiet {
        println!("{} {message}", "==>".blue().bold());
    }
}

/// Print one stage result in the selected output mode.
fn emit_stage_result(cli: &Cli, result: &StageResult) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            if !cli.quiet {
                println!("{} {}", "ok:".green().bold(), result.message);
                if cli.verbose {
                    println!("    stage={} elapsed={}ms", result.stage, result.elapsed_ms);
                }
            }
            Ok(())
        }
        OutputMode::Json => {
            let payload = json!({
                "success": true,
                "message": result.message,
                "data": {
                    "stage": result.stage.as_str(),
                    "elapsed_ms": result.elapsed_ms,
                    "payload": serde_json::to_value(&result.output)?,
                },
            });
            write_json_line(&payload)
        }
    }
}

/// Report a stage failure in the selected output mode, then hand back the
/// mapped error for exit-code purposes.
fn emit_failure(cli: &Cli, error: WprError) -> CliError {
    let code = error.code().to_string();
    let mapped = CliError::from(error);
    if output_mode(cli) == OutputMode::Json {
        let payload = json!({
            "success": false,
            "message": mapped.to_string(),
            "data": { "error_code": code },
        });
        if let Ok(line) = serde_json::to_string(&payload) {
            println!("{line}");
        }
    }
    mapped
}

fn print_scan_report(cli: &Cli, report: &ScanReport, full_paths: bool) {
    if cli.quiet {
        return;
    }
    if report.is_clean() {
        println!(
            "{}",
            "Scan finished clean. No obvious threats found.".green()
        );
        return;
    }

    println!("{}", "Scan report".bold());
    for finding in &report.findings {
        let kind = match finding.kind {
            FindingKind::Folder => "folder".cyan(),
            FindingKind::File => "file".red().bold(),
            FindingKind::Permission => "permission".yellow(),
            FindingKind::Code => "code".red(),
        };
        let shown = if full_paths {
            finding.path.clone()
        } else {
            finding
                .path
                .strip_prefix(&cli.root)
                .map_or_else(|_| finding.path.clone(), std::path::Path::to_path_buf)
        };
        println!("  {:<12} {}", kind, finding.reason);
        println!("               {}", shown.display().to_string().dimmed());
    }
    println!(
        "{} finding(s) across {} entries.",
        report.findings.len(),
        report.entries_scanned
    );
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let line = serde_json::to_string(payload)?;
    println!("{line}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_all_verbs() {
        for verb in ["cleanup", "fetch", "install", "scan", "run"] {
            Cli::try_parse_from(["wprescue", verb]).unwrap();
        }
    }

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let codes = [
            CliError::User(String::new()).exit_code(),
            CliError::Filesystem(String::new()).exit_code(),
            CliError::Network(String::new()).exit_code(),
            CliError::Archive(String::new()).exit_code(),
            CliError::Internal(String::new()).exit_code(),
        ];
        let unique: std::collections::HashSet<i32> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.iter().all(|c| *c != 0));
    }

    #[test]
    fn wpr_errors_map_to_their_category() {
        let fs_err: CliError = WprError::LockHeld {
            path: PathBuf::new(),
        }
        .into();
        assert_eq!(fs_err.exit_code(), 2);

        let net_err: CliError = WprError::HttpStatus {
            url: String::new(),
            status: 404,
        }
        .into();
        assert_eq!(net_err.exit_code(), 3);

        let archive_err: CliError = WprError::MissingDistribution {
            expected: "wordpress".to_string(),
        }
        .into();
        assert_eq!(archive_err.exit_code(), 4);
    }

    #[test]
    fn destructive_verbs_require_yes_when_not_interactive() {
        let cli = Cli::try_parse_from(["wprescue", "--json", "cleanup"]).unwrap();
        let err = confirm_destructive(&cli, false, "cleanup").unwrap_err();
        assert_eq!(err.exit_code(), 1);

        assert!(confirm_destructive(&cli, true, "cleanup").is_ok());
    }
}
