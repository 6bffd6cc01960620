use std::path::PathBuf;

use gitsage::{
    BranchOptions, CommitOptions, CommitStatus, Config, DiffScope, Error, GitCli, LintOptions,
    branch_describe, lint_suggestions, smart_commit,
};
use gitsage_ollama::CancellationToken;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    match run_cli().await {
        Ok(()) => {}
        Err(err) if err.is_cancelled() => {
            eprintln!("gitsage: cancelled");
            std::process::exit(130);
        }
        Err(err) => {
            eprintln!("gitsage error: {err}");
            std::process::exit(1);
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Lint(LintOptions),
    Commit(CommitOptions),
    Branch(BranchOptions),
}

#[derive(Debug, PartialEq)]
struct Cli {
    command: Command,
    config_path: Option<PathBuf>,
    host: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    verbose: bool,
}

async fn run_cli() -> Result<(), Error> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    if cli.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let mut config = Config::load(cli.config_path.as_deref())?;
    config.apply_env()?;
    if let Some(host) = cli.host {
        config.ollama.host = host;
    }
    if let Some(model) = cli.model {
        config.ollama.model = model;
    }
    if let Some(temperature) = cli.temperature {
        config.ollama.temperature = temperature;
    }
    config.verbose |= cli.verbose;
    config.validate()?;
    init_tracing(config.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted");
            on_interrupt.cancel();
        }
    });

    let client = config.client();
    let repo = GitCli::default();
    tracing::debug!(host = %config.base_url(), model = %config.ollama.model, "starting");

    match cli.command {
        Command::Help => Ok(()),
        Command::Lint(options) => {
            let report = lint_suggestions(&client, &repo, &config, &options, &cancel).await?;
            if report.suggestions.is_empty() {
                println!(
                    "No suggestions match severity '{}' ({} found in {} changes).",
                    options.severity, report.total_parsed, report.scope
                );
                return Ok(());
            }
            for suggestion in &report.suggestions {
                println!(
                    "{}. [{}] {}",
                    suggestion.number, suggestion.severity, suggestion.title
                );
                if !suggestion.description.is_empty() {
                    println!("   {}", suggestion.description);
                }
            }
            if report.suggestions.len() < report.total_parsed {
                println!(
                    "\nShowing {} of {} suggestions.",
                    report.suggestions.len(),
                    report.total_parsed
                );
            }
            Ok(())
        }
        Command::Commit(options) => {
            let outcome =
                smart_commit(&client, &repo, &config, &options, &cancel, |message| {
                    println!("Generated commit message:\n\n  {message}\n");
                    ask_confirmation()
                })
                .await?;
            if let Some(issue) = &outcome.issue {
                eprintln!("warning: {issue}");
            }
            match outcome.status {
                CommitStatus::DryRun => println!("{}\n\n(dry run, not committed)", outcome.message),
                CommitStatus::Declined => println!("Commit cancelled."),
                CommitStatus::Committed => println!("Committed: {}", outcome.message),
            }
            Ok(())
        }
        Command::Branch(options) => {
            let report = branch_describe(&client, &repo, &config, &options, &cancel).await?;
            let branch = if report.branch.is_empty() {
                "HEAD"
            } else {
                report.branch.as_str()
            };
            println!("Branch {branch} ({} commits):\n", report.commits);
            println!("{}", report.description);
            Ok(())
        }
    }
}

async fn ask_confirmation() -> Result<bool, Error> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Commit with this message? [y/N] ").await?;
    stdout.flush().await?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_args(args: Vec<String>) -> Result<Cli, Error> {
    let mut command: Option<Command> = None;
    let mut config_path = None;
    let mut host = None;
    let mut model = None;
    let mut temperature = None;
    let mut verbose = false;

    let mut remaining = args;
    while !remaining.is_empty() {
        let arg = remaining.remove(0);
        match arg.as_str() {
            "--help" | "-h" => command = Some(Command::Help),
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            "--ollama-host" => host = Some(take_arg("--ollama-host", &mut remaining)?),
            "--model" => model = Some(take_arg("--model", &mut remaining)?),
            "--temperature" => {
                let raw = take_arg("--temperature", &mut remaining)?;
                temperature = Some(
                    raw.parse()
                        .map_err(|_| Error::Config(format!("invalid --temperature: {raw}")))?,
                );
            }
            "--verbose" | "-v" => verbose = true,
            "lint-suggestions" if command.is_none() => {
                command = Some(Command::Lint(LintOptions::default()))
            }
            "smart-commit" if command.is_none() => {
                command = Some(Command::Commit(CommitOptions::default()))
            }
            "branch-describe" if command.is_none() => {
                command = Some(Command::Branch(BranchOptions::default()))
            }
            other => match command.as_mut() {
                Some(Command::Lint(options)) => parse_lint_flag(other, options, &mut remaining)?,
                Some(Command::Commit(options)) => {
                    parse_commit_flag(other, options, &mut remaining)?
                }
                Some(Command::Branch(options)) => {
                    parse_branch_flag(other, options, &mut remaining)?
                }
                Some(Command::Help) => {}
                None if other.starts_with('-') => {
                    return Err(Error::Config(format!("unknown flag: {other}")));
                }
                None => return Err(Error::Config(format!("unknown subcommand: {other}"))),
            },
        }
    }

    Ok(Cli {
        command: command.unwrap_or(Command::Help),
        config_path,
        host,
        model,
        temperature,
        verbose,
    })
}

fn parse_lint_flag(
    flag: &str,
    options: &mut LintOptions,
    remaining: &mut Vec<String>,
) -> Result<(), Error> {
    match flag {
        "--staged" => options.scope = DiffScope::Staged,
        "--unstaged" => options.scope = DiffScope::Unstaged,
        "--severity" => options.severity = take_arg(flag, remaining)?,
        "--max-suggestions" => options.max_suggestions = take_int(flag, remaining)?,
        other => return Err(Error::Config(format!("unknown flag: {other}"))),
    }
    Ok(())
}

fn parse_commit_flag(
    flag: &str,
    options: &mut CommitOptions,
    remaining: &mut Vec<String>,
) -> Result<(), Error> {
    match flag {
        "--dry-run" => options.dry_run = true,
        "--auto-commit" => options.auto_commit = true,
        "--max-diff-lines" => options.max_diff_lines = take_int(flag, remaining)?,
        other => return Err(Error::Config(format!("unknown flag: {other}"))),
    }
    Ok(())
}

fn parse_branch_flag(
    flag: &str,
    options: &mut BranchOptions,
    remaining: &mut Vec<String>,
) -> Result<(), Error> {
    match flag {
        "--commits" => {
            let count = take_int(flag, remaining)?;
            options.commits = usize::try_from(count)
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| Error::Config(format!("invalid value for {flag}: {count}")))?;
        }
        "--base-branch" => options.base_branch = take_arg(flag, remaining)?,
        "--max-diff-lines" => options.max_diff_lines = take_int(flag, remaining)?,
        other => return Err(Error::Config(format!("unknown flag: {other}"))),
    }
    Ok(())
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, Error> {
    if remaining.is_empty() {
        return Err(Error::Config(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

fn take_int(flag: &str, remaining: &mut Vec<String>) -> Result<i64, Error> {
    let raw = take_arg(flag, remaining)?;
    raw.parse()
        .map_err(|_| Error::Config(format!("invalid value for {flag}: {raw}")))
}

fn print_usage() {
    println!(
        "gitsage [--config PATH] [--ollama-host HOST] [--model NAME] [--temperature F] [--verbose] <command>

commands:
  lint-suggestions [--staged|--unstaged] [--severity all|high|medium|low] [--max-suggestions N]
  smart-commit [--dry-run] [--auto-commit] [--max-diff-lines N]
  branch-describe [--commits N] [--base-branch NAME] [--max-diff-lines N]"
    );
}
