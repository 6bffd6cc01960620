#![deny(missing_docs)]
//! Local-first Git assistant backed by a local Ollama server.
//!
//! - [`commands::lint_suggestions`] reviews a diff and returns
//!   severity-tagged suggestions.
//! - [`commands::smart_commit`] writes a commit message for the staged diff
//!   and optionally commits with it.
//! - [`commands::branch_describe`] summarizes the current branch from its
//!   recent commits.
//!
//! The transport lives in [`gitsage_ollama`]; parsing and filtering in
//! [`gitsage_suggest`].

pub mod aggregate;
pub mod commands;
pub mod config;
pub mod error;
pub mod git;
pub mod prompt;

pub use aggregate::{GenerateError, collect_response, collect_response_with};
pub use commands::{
    BranchOptions, BranchReport, CommitOptions, CommitOutcome, CommitStatus, LintOptions,
    LintReport, branch_describe, lint_suggestions, smart_commit,
};
pub use config::{Config, OllamaConfig};
pub use error::Error;
pub use git::{CommitInfo, DiffScope, GitCli, Repository};
pub use prompt::{PromptContext, PromptKind};
