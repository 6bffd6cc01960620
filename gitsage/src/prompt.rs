//! Prompt templates and post-processing of generated commit messages.

use std::fmt::Write as _;

use crate::git::CommitInfo;

/// Longest first line a commit message should have.
pub const MAX_SUMMARY_CHARS: usize = 72;

/// The prompts this tool knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Review a diff and answer with `N. [SEVERITY] Title` suggestions.
    LintSuggestions,
    /// Write a one-line commit message for a staged diff.
    SmartCommit,
    /// Summarize what a branch does from its commits and diff.
    BranchDescribe,
}

impl PromptKind {
    /// Template name, matching the command that uses it.
    pub fn name(self) -> &'static str {
        match self {
            Self::LintSuggestions => "lint-suggestions",
            Self::SmartCommit => "smart-commit",
            Self::BranchDescribe => "branch-describe",
        }
    }

    fn system(self) -> &'static str {
        match self {
            Self::LintSuggestions => LINT_SYSTEM,
            Self::SmartCommit => COMMIT_SYSTEM,
            Self::BranchDescribe => BRANCH_SYSTEM,
        }
    }
}

/// Values substituted into the user prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    /// Repository name.
    pub repo: String,
    /// Current branch.
    pub branch: String,
    /// Unified diff under review.
    pub diff: String,
    /// Extra rules listed in the commit prompt.
    pub rules: Vec<String>,
    /// Recent commits, newest first.
    pub commits: Vec<CommitInfo>,
}

/// Render the `(system, user)` prompt pair for `kind`.
pub fn build(kind: PromptKind, ctx: &PromptContext) -> (String, String) {
    let mut user = format!("Repository: {}\nBranch: {}\n\n", ctx.repo, ctx.branch);

    match kind {
        PromptKind::LintSuggestions => {
            let _ = write!(
                user,
                "Changes to review:\n{}\n\nProvide ordered suggestions for improvement:",
                ctx.diff
            );
        }
        PromptKind::SmartCommit => {
            if !ctx.rules.is_empty() {
                user.push_str("Rules:\n");
                for rule in &ctx.rules {
                    let _ = writeln!(user, "- {rule}");
                }
                user.push('\n');
            }
            let _ = write!(user, "Diff:\n{}\n\nOutput the commit message only:", ctx.diff);
        }
        PromptKind::BranchDescribe => {
            user.push_str("Recent commits:\n");
            for commit in &ctx.commits {
                let _ = writeln!(user, "- {} ({})", commit.subject, commit.date);
            }
            user.push('\n');
            if !ctx.diff.trim().is_empty() {
                let _ = write!(user, "Recent changes:\n{}\n\n", ctx.diff);
            }
            user.push_str("Generate a concise description of what this branch accomplishes:");
        }
    }

    (kind.system().to_string(), user)
}

const COMMIT_PREAMBLES: &[&str] = &[
    "Here is the commit message:",
    "Commit message:",
    "The commit message is:",
    "Here's the commit message:",
    "```",
];

/// Strip assistant chatter from a generated commit message.
///
/// Known preambles and a leading code fence are removed, then surrounding
/// quotes and backticks, then whitespace.
pub fn sanitize_commit_message(text: &str) -> String {
    let mut cleaned = text.trim();
    for preamble in COMMIT_PREAMBLES {
        if let Some(rest) = cleaned.strip_prefix(preamble) {
            cleaned = rest.trim();
        }
    }
    cleaned
        .trim_matches(|c| matches!(c, '`' | '"' | '\''))
        .trim()
        .to_string()
}

const DESCRIPTION_PREAMBLES: &[&str] = &[
    "This branch",
    "The branch",
    "Branch description:",
    "Description:",
    "Here's a description:",
    "Here is a description:",
];

/// Strip assistant chatter from a generated branch description and
/// capitalize what is left.
pub fn clean_branch_description(text: &str) -> String {
    let mut cleaned = text.trim();
    for preamble in DESCRIPTION_PREAMBLES {
        if let Some(rest) = cleaned.strip_prefix(preamble) {
            cleaned = rest.trim_start();
            cleaned = cleaned.strip_prefix(':').unwrap_or(cleaned).trim();
        }
    }

    let mut chars = cleaned.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A problem with a generated commit message. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitMessageIssue {
    /// Nothing left after sanitizing.
    #[error("commit message is empty")]
    Empty,
    /// Summary line longer than [`MAX_SUMMARY_CHARS`].
    #[error("first line is too long ({length} chars, max 72)")]
    SummaryTooLong {
        /// Length of the first line in characters.
        length: usize,
    },
}

/// Check a commit message against basic Git conventions.
pub fn validate_commit_message(message: &str) -> Result<(), CommitMessageIssue> {
    let summary = message.lines().next().unwrap_or_default().trim();
    if summary.is_empty() {
        return Err(CommitMessageIssue::Empty);
    }
    let length = summary.chars().count();
    if length > MAX_SUMMARY_CHARS {
        return Err(CommitMessageIssue::SummaryTooLong { length });
    }
    Ok(())
}

/// Keep the first `max_lines` lines of `diff`, noting the cut.
///
/// `max_lines <= 0` keeps everything.
pub fn truncate_diff(diff: &str, max_lines: i64) -> String {
    let Ok(max) = usize::try_from(max_lines) else {
        return diff.to_string();
    };
    if max == 0 {
        return diff.to_string();
    }

    let lines: Vec<&str> = diff.split('\n').collect();
    if lines.len() <= max {
        return diff.to_string();
    }
    format!(
        "{}\n\n...(diff truncated after {max} lines)",
        lines[..max].join("\n")
    )
}

const COMMIT_SYSTEM: &str = "You are an expert software engineer skilled in writing clear, descriptive commit messages.

CRITICAL INSTRUCTIONS:
- Your response must be ONLY the commit message itself
- NO explanations, NO additional text, NO context
- NO phrases like \"Here is the commit message:\" or \"This commit message...\"
- NO quotes around the message unless they are part of the actual commit message
- Just the raw commit message and nothing else

Requirements for the commit message:
1. Start with an action verb in imperative mood (Add, Remove, Fix, Update, Refactor, etc.)
2. Include specific file names or components where changes were made
3. Keep the first line under 72 characters
4. Be descriptive but concise
5. Focus on what was changed and where it was changed

EXAMPLE OUTPUT FORMAT:
Add OAuth2 integration to AuthService and UserController
Fix null pointer error in user validation service
Update installation instructions in README

Output ONLY the commit message. No other text whatsoever.";

const LINT_SYSTEM: &str = "You are an expert code reviewer and software engineer. Analyze the provided code changes and suggest improvements focusing on:

1. Code quality and maintainability
2. Performance optimizations
3. Security considerations
4. Best practice adherence
5. Potential bugs or issues

Format your response as a numbered list. Start each suggestion on its own line as:
N. [SEVERITY] Title
where SEVERITY is one of HIGH, MEDIUM or LOW, followed by one or more lines with the specific recommendation.

Keep suggestions actionable and specific. Put the most impactful improvements first.";

const BRANCH_SYSTEM: &str = "You are an expert software engineer who creates clear, concise descriptions of code changes for documentation purposes.

Analyze the provided commits and changes to generate a brief description (2-3 sentences) that explains:
1. What the branch accomplishes
2. The main changes or features implemented
3. The overall impact or purpose

Write in present tense and focus on the \"what\" and \"why\" rather than implementation details.";
