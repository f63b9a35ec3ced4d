//! git-sync CLI - reconcile the current branch with its remote

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser};
use gitsync::{Config, Error, GitRepository, Outcome, SyncOptions, SyncReport, Synchronizer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "git-sync", version)]
#[command(about = "Sync the current branch with its remote: push, pull, merge or rebase as needed", long_about = None)]
struct Cli {
    /// Force-push when only the local branch has new commits
    #[arg(short, long)]
    force: bool,

    /// Rebase instead of merging when the remote has new commits
    #[arg(short, long, overrides_with = "no_rebase")]
    rebase: bool,

    /// Merge even if .gitsync.yaml asks for rebase
    #[arg(long, overrides_with = "rebase")]
    no_rebase: bool,

    /// Show what would be done without stashing, pushing or pulling
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Working copy to sync (defaults to current directory)
    #[arg(short = 'C', long, value_name = "PATH", default_value = ".")]
    directory: PathBuf,

    /// Remote to sync with (default: from .gitsync.yaml, else origin)
    #[arg(long, value_name = "NAME")]
    remote: Option<String>,

    /// Give up on any single git command after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log every git command
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = usage_exit_code(&err);
            report_usage_error(&err)?;
            return Ok(ExitCode::from(code));
        }
    };

    init_logging(&cli);

    match sync(&cli).await {
        Ok(report) => {
            print_report(&cli, &report)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_error(&cli, &err);
            Ok(ExitCode::from(err.exit_code()))
        }
    }
}

/// Exit code for a command line that did not parse
fn usage_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        ErrorKind::UnknownArgument => unknown_option(err).exit_code(),
        _ => 1,
    }
}

fn unknown_option(err: &clap::Error) -> Error {
    let option = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(option)) => option.clone(),
        _ => String::from("?"),
    };
    Error::UnknownOption { option }
}

/// Print a parse failure; no git command has run yet
fn report_usage_error(err: &clap::Error) -> anyhow::Result<()> {
    if err.kind() == ErrorKind::UnknownArgument {
        eprintln!("error: {}", unknown_option(err));
        eprintln!();
        eprintln!("{}", Cli::command().render_help());
    } else {
        err.print()?;
    }
    Ok(())
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "gitsync=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn sync(cli: &Cli) -> gitsync::Result<SyncReport> {
    let repo = GitRepository::discover(&cli.directory)?;
    let config = match repo.workdir() {
        Some(workdir) => Config::load(workdir)?,
        None => Config::default(),
    };

    let timeout = cli.timeout.map(Duration::from_secs).or(config.timeout());
    let options = resolve_options(cli, &config);
    let remote = cli.remote.clone().unwrap_or(config.remote);

    Synchronizer::new(repo.with_timeout(timeout), options)
        .with_remote(remote)
        .with_stash_prefix(config.stash_prefix)
        .synchronize()
        .await
}

/// Per-run flags; command-line switches win over the config file
fn resolve_options(cli: &Cli, config: &Config) -> SyncOptions {
    let rebase = if cli.rebase {
        true
    } else if cli.no_rebase {
        false
    } else {
        config.rebase
    };

    SyncOptions {
        force: cli.force,
        rebase,
        dry_run: cli.dry_run,
    }
}

fn print_report(cli: &Cli, report: &SyncReport) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let target = report.context.remote_branch();
    let branch = &report.context.branch;

    if report.context.options.dry_run {
        println!("Would {} ('{}' vs '{}')", report.action, branch, target);
        if let Some(d) = report.divergence {
            println!("  ahead: {}, behind: {}", d.ahead, d.behind);
        }
        return Ok(());
    }

    match report.outcome {
        Outcome::UpToDate => println!("'{}' is up to date with '{}'.", branch, target),
        Outcome::Pushed if report.divergence.is_none() => {
            println!("Published '{}' to '{}' and set it as upstream.", branch, target)
        }
        Outcome::Pushed => println!("Pushed '{}' to '{}'.", branch, target),
        Outcome::Pulled => println!("Pulled '{}' into '{}'.", target, branch),
        Outcome::RebasedAndPushed => {
            println!("Rebased '{}' onto '{}' and pushed.", branch, target)
        }
        Outcome::MergedAndPushed => println!("Merged '{}' into '{}' and pushed.", target, branch),
        Outcome::ConflictDetected | Outcome::OperationFailed => {
            println!("Sync of '{}' ended: {}.", branch, report.outcome)
        }
    }

    if report.stashed {
        println!("Local changes were stashed and restored.");
    }
    Ok(())
}

fn print_error(cli: &Cli, err: &Error) {
    if cli.json {
        let value = serde_json::json!({
            "outcome": err.outcome(),
            "error": err.to_string(),
            "conflict": err.is_conflict(),
        });
        println!("{}", value);
        return;
    }

    eprintln!("error: {}", err);
    if let Some(hint) = err.primary().suggestion() {
        eprintln!("hint: {}", hint);
    }
    if let (Error::RestoreAfterFailure { .. }, Some(hint)) = (err, err.suggestion()) {
        eprintln!("hint: {}", hint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("git-sync").chain(args.iter().copied())).unwrap()
    }

    fn parse_err(args: &[&str]) -> clap::Error {
        match Cli::try_parse_from(std::iter::once("git-sync").chain(args.iter().copied())) {
            Ok(_) => panic!("expected {:?} to be rejected", args),
            Err(err) => err,
        }
    }

    fn config(rebase: bool) -> Config {
        Config {
            rebase,
            ..Default::default()
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_unknown_option_exits_one() {
        let err = parse_err(&["--bogus"]);
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert_eq!(usage_exit_code(&err), 1);

        match unknown_option(&err) {
            Error::UnknownOption { option } => assert_eq!(option, "--bogus"),
            other => panic!("expected UnknownOption, got {:?}", other),
        }
    }

    #[test]
    fn test_help_and_version_exit_zero() {
        let help = parse_err(&["-h"]);
        assert_eq!(help.kind(), ErrorKind::DisplayHelp);
        assert_eq!(usage_exit_code(&help), 0);

        let version = parse_err(&["--version"]);
        assert_eq!(version.kind(), ErrorKind::DisplayVersion);
        assert_eq!(usage_exit_code(&version), 0);
    }

    #[test]
    fn test_other_parse_errors_exit_one() {
        let err = parse_err(&["--timeout", "soon"]);
        assert_eq!(usage_exit_code(&err), 1);
    }

    #[test]
    fn test_short_flags() {
        let cli = parse(&["-f", "-r", "-n", "-C", "/tmp/work"]);
        assert!(cli.force);
        assert!(cli.rebase);
        assert!(cli.dry_run);
        assert_eq!(cli.directory, PathBuf::from("/tmp/work"));

        let cli = parse(&[]);
        assert!(!cli.force && !cli.rebase && !cli.dry_run);
        assert_eq!(cli.directory, PathBuf::from("."));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let err = parse_err(&["-v", "-q"]);
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_config_rebase_applies_without_flags() {
        assert!(resolve_options(&parse(&[]), &config(true)).rebase);
        assert!(!resolve_options(&parse(&[]), &config(false)).rebase);
    }

    #[test]
    fn test_no_rebase_overrides_config() {
        let options = resolve_options(&parse(&["--no-rebase"]), &config(true));
        assert!(!options.rebase);
    }

    #[test]
    fn test_last_rebase_flag_wins() {
        assert!(!resolve_options(&parse(&["-r", "--no-rebase"]), &config(false)).rebase);
        assert!(resolve_options(&parse(&["--no-rebase", "-r"]), &config(true)).rebase);
    }

    #[test]
    fn test_force_and_dry_run_come_from_cli_only() {
        let options = resolve_options(&parse(&["-f", "-n"]), &config(false));
        assert!(options.force);
        assert!(options.dry_run);
    }
}
