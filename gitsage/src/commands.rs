//! The `lint-suggestions`, `smart-commit` and `branch-describe` pipelines.
//!
//! All follow the same shape: check the work tree, gather repository input,
//! build a prompt, ping the server, stream the answer, and post-process it.
//! Nothing is sent to `/api/chat` unless the ping succeeds.

use std::future::Future;

use gitsage_ollama::{CancellationToken, ChatMessage, Ollama, OllamaError};
use gitsage_suggest::{ALL_SEVERITIES, Suggestion, filter_by_severity, limit, parse_suggestions};

use crate::aggregate::{GenerateError, collect_response_with};
use crate::config::Config;
use crate::error::Error;
use crate::git::{DiffScope, Repository};
use crate::prompt::{self, CommitMessageIssue, PromptContext, PromptKind};

/// Settings for [`lint_suggestions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintOptions {
    /// Which diff to review.
    pub scope: DiffScope,
    /// Severity label to keep, or `"all"`.
    pub severity: String,
    /// Keep at most this many suggestions; `<= 0` keeps all.
    pub max_suggestions: i64,
}

impl Default for LintOptions {
    fn default() -> Self {
        Self {
            scope: DiffScope::Staged,
            severity: ALL_SEVERITIES.into(),
            max_suggestions: 10,
        }
    }
}

/// Result of [`lint_suggestions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    /// Suggestions left after filtering and limiting, in model order.
    pub suggestions: Vec<Suggestion>,
    /// How many suggestions the parser found before filtering.
    pub total_parsed: usize,
    /// The diff that was reviewed.
    pub scope: DiffScope,
}

/// Settings for [`smart_commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOptions {
    /// Generate and report the message without committing.
    pub dry_run: bool,
    /// Commit without asking for confirmation.
    pub auto_commit: bool,
    /// Diff lines included in the prompt; `<= 0` sends the whole diff.
    pub max_diff_lines: i64,
}

impl Default for CommitOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            auto_commit: false,
            max_diff_lines: 500,
        }
    }
}

/// What [`smart_commit`] did with the generated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitStatus {
    /// `dry_run` was set.
    DryRun,
    /// The confirmation was declined.
    Declined,
    /// `git commit` succeeded.
    Committed,
}

/// Result of [`smart_commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The sanitized commit message.
    pub message: String,
    /// A convention the message breaks, if any. Never blocks the commit.
    pub issue: Option<CommitMessageIssue>,
    /// What happened to the message.
    pub status: CommitStatus,
}

/// Settings for [`branch_describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchOptions {
    /// How many recent commits to summarize.
    pub commits: usize,
    /// Branch to diff against. Skipped when empty or equal to the current branch.
    pub base_branch: String,
    /// Diff lines included in the prompt; `<= 0` sends the whole diff.
    pub max_diff_lines: i64,
}

impl Default for BranchOptions {
    fn default() -> Self {
        Self {
            commits: 10,
            base_branch: "main".into(),
            max_diff_lines: 500,
        }
    }
}

/// Result of [`branch_describe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchReport {
    /// The described branch, empty when `HEAD` is detached.
    pub branch: String,
    /// The cleaned description.
    pub description: String,
    /// How many commits went into the prompt.
    pub commits: usize,
}

/// Review a diff and return severity-tagged suggestions.
pub async fn lint_suggestions<R>(
    client: &Ollama,
    repo: &R,
    config: &Config,
    options: &LintOptions,
    cancel: &CancellationToken,
) -> Result<LintReport, Error>
where
    R: Repository + ?Sized,
{
    let diff = read_diff(repo, options.scope).await?;
    tracing::debug!(
        scope = %options.scope,
        lines = diff.lines().count(),
        severity = %options.severity,
        "analyzing changes"
    );

    let ctx = PromptContext {
        diff,
        ..repo_context(repo).await
    };
    let response = generate(client, config, PromptKind::LintSuggestions, &ctx, cancel).await?;

    let parsed = parse_suggestions(&response);
    let total_parsed = parsed.len();
    let suggestions = limit(
        filter_by_severity(parsed, &options.severity),
        options.max_suggestions,
    );
    tracing::debug!(total_parsed, shown = suggestions.len(), "parsed suggestions");

    Ok(LintReport {
        suggestions,
        total_parsed,
        scope: options.scope,
    })
}

/// Generate a commit message for the staged diff and, unless told
/// otherwise, commit with it.
///
/// `confirm` is asked before committing when `auto_commit` is off; it is
/// never called for a dry run.
pub async fn smart_commit<R, F, Fut>(
    client: &Ollama,
    repo: &R,
    config: &Config,
    options: &CommitOptions,
    cancel: &CancellationToken,
    confirm: F,
) -> Result<CommitOutcome, Error>
where
    R: Repository + ?Sized,
    F: FnOnce(&str) -> Fut,
    Fut: Future<Output = Result<bool, Error>>,
{
    let diff = read_diff(repo, DiffScope::Staged).await?;
    let diff = prompt::truncate_diff(&diff, options.max_diff_lines);

    let ctx = PromptContext {
        diff,
        rules: vec![
            "Commit title max 72 chars".into(),
            "Use imperative mood".into(),
        ],
        ..repo_context(repo).await
    };
    let response = generate(client, config, PromptKind::SmartCommit, &ctx, cancel).await?;

    let message = prompt::sanitize_commit_message(&response);
    if message.is_empty() {
        return Err(GenerateError::EmptyOutput.into());
    }
    let issue = prompt::validate_commit_message(&message).err();
    if let Some(issue) = &issue {
        tracing::warn!(%issue, "generated commit message breaks convention");
    }

    let status = if options.dry_run {
        CommitStatus::DryRun
    } else if !options.auto_commit && !confirm(&message).await? {
        CommitStatus::Declined
    } else {
        if cancel.is_cancelled() {
            return Err(GenerateError::Cancelled.into());
        }
        repo.commit(&message).await?;
        CommitStatus::Committed
    };

    Ok(CommitOutcome {
        message,
        issue,
        status,
    })
}

/// Describe what the current branch does from its recent commits and its
/// diff against the base branch.
///
/// A base diff that cannot be read is left out of the prompt; a branch
/// without commits is an error.
pub async fn branch_describe<R>(
    client: &Ollama,
    repo: &R,
    config: &Config,
    options: &BranchOptions,
    cancel: &CancellationToken,
) -> Result<BranchReport, Error>
where
    R: Repository + ?Sized,
{
    if !repo.is_inside_work_tree().await? {
        return Err(Error::NotARepository);
    }
    let ctx = repo_context(repo).await;

    let commits = repo.recent_commits(options.commits).await?;
    if commits.is_empty() {
        return Err(Error::NoCommits(ctx.branch));
    }
    tracing::debug!(branch = %ctx.branch, commits = commits.len(), "describing branch");

    let base = options.base_branch.trim();
    let diff = if base.is_empty() || base == ctx.branch {
        String::new()
    } else {
        match repo.branch_diff(base).await {
            Ok(diff) => prompt::truncate_diff(&diff, options.max_diff_lines),
            Err(err) => {
                tracing::warn!(base, error = %err, "could not diff against base branch");
                String::new()
            }
        }
    };

    let ctx = PromptContext {
        diff,
        commits,
        ..ctx
    };
    let response = generate(client, config, PromptKind::BranchDescribe, &ctx, cancel).await?;

    let description = prompt::clean_branch_description(&response);
    if description.is_empty() {
        return Err(GenerateError::EmptyOutput.into());
    }

    Ok(BranchReport {
        branch: ctx.branch,
        description,
        commits: ctx.commits.len(),
    })
}

async fn read_diff<R>(repo: &R, scope: DiffScope) -> Result<String, Error>
where
    R: Repository + ?Sized,
{
    if !repo.is_inside_work_tree().await? {
        return Err(Error::NotARepository);
    }
    let diff = repo.diff(scope).await?;
    if diff.trim().is_empty() {
        return Err(Error::NoChanges(scope));
    }
    Ok(diff)
}

async fn repo_context<R>(repo: &R) -> PromptContext
where
    R: Repository + ?Sized,
{
    // Cosmetic context only; a missing remote or detached HEAD is fine.
    let repo_name = repo
        .repo_name()
        .await
        .unwrap_or_else(|_| "unknown".to_string());
    let branch = repo.current_branch().await.unwrap_or_default();
    PromptContext {
        repo: repo_name,
        branch,
        ..PromptContext::default()
    }
}

/// Ping, then stream one chat exchange and return the trimmed answer.
async fn generate(
    client: &Ollama,
    config: &Config,
    kind: PromptKind,
    ctx: &PromptContext,
    cancel: &CancellationToken,
) -> Result<String, Error> {
    client.ping(cancel).await.map_err(|source| match source {
        OllamaError::Cancelled => Error::Generate(GenerateError::Cancelled),
        source => Error::Unreachable {
            host: client.address().to_string(),
            source,
        },
    })?;

    let (system, user) = prompt::build(kind, ctx);
    let request = client.request(
        vec![ChatMessage::system(system), ChatMessage::user(user)],
        config.ollama.temperature,
    );
    tracing::debug!(model = %request.model, template = kind.name(), "sending request to ollama");

    let stream = client.chat(request, cancel.clone());
    let text = collect_response_with(stream, cancel, |unit| {
        if unit.done {
            tracing::debug!(
                done_reason = ?unit.done_reason,
                eval_count = ?unit.eval_count,
                total_duration_ns = ?unit.total_duration,
                "generation finished"
            );
        }
    })
    .await?;
    Ok(text)
}
