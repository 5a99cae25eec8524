//! Error types for cp-link.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for cp-link operations.
pub type Result<T> = std::result::Result<T, CpLinkError>;

/// Errors that can occur while resolving, building, or copying a package.
#[derive(Error, Debug)]
pub enum CpLinkError {
    /// No destination on the command line, in the environment, or in config.
    #[error(
        "no destination given: pass a path, set CP_LINK_DEST, or add `destination` to cp-link.toml"
    )]
    Usage,

    /// No package.json between the start directory and the repository root.
    #[error("no package.json found between {} and the repository root", .start.display())]
    ManifestNotFound { start: PathBuf },

    /// package.json exists but cannot be used.
    #[error("invalid manifest {}: {reason}", .path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    /// An enumerated package file is absent at copy time.
    #[error("expected \"{}\" to exist, but it was not found", .path.display())]
    SourceFileMissing { path: PathBuf },

    /// Build command exited unsuccessfully. `code` is `None` when killed by a signal.
    #[error("build command `{command}` failed with {}", describe_exit(.code))]
    BuildFailed { command: String, code: Option<i32> },

    /// Build command could not be started.
    #[error("failed to start build command `{command}`: {source}")]
    BuildSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Build command has an unterminated quote or a trailing backslash.
    #[error("cannot parse build command `{command}`: unbalanced quotes or trailing escape")]
    MalformedBuildCommand { command: String },

    /// Build command string is blank.
    #[error("build command is empty")]
    EmptyBuildCommand,

    /// I/O failure while copying a file.
    #[error("failed to copy {} to {}: {source}", .from.display(), .to.display())]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest entry that would resolve outside the package or install directory.
    #[error("\"{}\" must be a relative path inside the package", .path.display())]
    PathOutsidePackage { path: PathBuf },

    /// Invalid glob in the manifest `files` list.
    #[error("invalid file pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Notify error.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}
