//! Error taxonomy for the image build pipeline.
//!
//! Every fatal error carries enough context to attribute the failure:
//! external-tool failures keep the command line, exit code, and captured
//! output. Non-fatal conditions are `BuildWarning`s attached to the final
//! build outcome rather than errors.

use std::fmt;

/// Fatal pipeline errors. Any of these aborts the run immediately.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Malformed or incomplete mock configuration file.
    #[error("mock configuration error: {0}")]
    Config(String),

    /// Malformed modulemd document; names the missing key.
    #[error("modulemd schema error: '{key}' {detail}")]
    Schema { key: String, detail: String },

    /// External tool exited nonzero.
    #[error("command '{command}' returned exit status {code}; output:\n{output}")]
    Command {
        command: String,
        code: i32,
        output: String,
    },

    /// External tool could not be started at all.
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// External tool exceeded the configured deadline and was killed.
    #[error("command '{command}' timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    /// Pre-run artifact cleanup failed; the build must not start.
    #[error("artifact cleanup failed: {0}")]
    Cleanup(String),

    /// Filesystem-level failure outside external tools.
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wrap an IO error with a short description of what was being done.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        BuildError::Io {
            context: context.into(),
            source,
        }
    }

    /// Schema error naming the missing key.
    pub fn schema(key: impl Into<String>, detail: impl Into<String>) -> Self {
        BuildError::Schema {
            key: key.into(),
            detail: detail.into(),
        }
    }
}

/// Non-fatal conditions surfaced alongside a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The chroot_setup_cmd package list diverged from the profile and the
    /// configuration file was rewritten.
    SetupCommandRewritten { packages: Vec<String> },

    /// Privileged archiving was unavailable; the image was assembled from an
    /// unprivileged tar and may be missing root-owned content.
    IncompleteArchive { image: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::SetupCommandRewritten { packages } => write!(
                f,
                "list of packages to be installed by mock changed ({} packages)",
                packages.len()
            ),
            BuildWarning::IncompleteArchive { image } => write!(
                f,
                "no sudo rights to archive the chroot as root; image '{}' may be incomplete",
                image
            ),
        }
    }
}
