//! Top-level error type for the `gitsage` commands.

use gitsage_ollama::OllamaError;

use crate::aggregate::GenerateError;
use crate::git::DiffScope;

/// Errors surfaced by [`crate::commands`] and the binary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration file, environment override, or flag.
    #[error("config error: {0}")]
    Config(String),

    /// A `git` invocation failed.
    #[error("git error: {0}")]
    Git(String),

    /// The working directory is not inside a Git work tree.
    #[error("not inside a git repository")]
    NotARepository,

    /// The selected diff is empty.
    #[error("no {0} changes found")]
    NoChanges(DiffScope),

    /// The liveness check against the Ollama server failed.
    #[error("failed to connect to ollama at {host}: {source}")]
    Unreachable {
        /// Base URL that was pinged.
        host: String,
        /// What the ping returned.
        #[source]
        source: OllamaError,
    },

    /// The branch has no commits to describe.
    #[error("no commits found on branch '{0}'")]
    NoCommits(String),

    /// Generation failed after the server was reached.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// Local I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the user interrupted the run.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Generate(GenerateError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::NotARepository.to_string(), "not inside a git repository");
        assert_eq!(
            Error::NoChanges(DiffScope::Staged).to_string(),
            "no staged changes found"
        );
        let err = Error::Unreachable {
            host: "http://127.0.0.1:11434".into(),
            source: OllamaError::Status {
                status: 500,
                body: "boom".into(),
            },
        };
        assert!(err.to_string().contains("http://127.0.0.1:11434"));
        assert!(err.to_string().contains("500"));
        assert_eq!(
            Error::NoCommits("feature".into()).to_string(),
            "no commits found on branch 'feature'"
        );
    }

    #[test]
    fn cancelled_classification() {
        assert!(Error::Generate(GenerateError::Cancelled).is_cancelled());
        assert!(
            !Error::Unreachable {
                host: "x".into(),
                source: OllamaError::Unreachable {
                    address: "x".into(),
                    source: "refused".into(),
                },
            }
            .is_cancelled()
        );
        assert!(!Error::Generate(GenerateError::EmptyOutput).is_cancelled());
    }
}
