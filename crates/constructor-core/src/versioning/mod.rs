//! Per-project version history.
//!
//! # Overview
//!
//! Each project's data directory is a git repository. Project and block
//! manifests live in the same repository, so a single commit captures the
//! whole project and block history is read by path.
//!
//! We drive the `git` command-line tool through `tokio::process`, the same
//! way workspace operations are handled elsewhere: no libgit2 binding, and
//! every call is a plain CLI invocation.
//!
//! # Modules
//!
//! - [`repository`] - initialize, commit, checkout, version existence
//! - [`history`] - commit records and log listing
//!
//! # Error Handling
//!
//! All operations return `Result<T, VersioningError>`.

pub mod history;
pub mod repository;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub use history::{get_commit, history, parse_log_output, CommitRecord};
pub use repository::{checkout, commit, initialize, version_exists};

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Error type for versioning operations.
#[derive(Debug)]
pub enum VersioningError {
    /// Command failed to execute (e.g., git not found)
    CommandFailed(std::io::Error),

    /// Git command returned non-zero exit code
    GitFailed {
        /// The stderr output from git
        stderr: String,
        /// The stdout output (sometimes contains useful info)
        stdout: String,
    },

    /// `initialize` called on an existing repository
    AlreadyInitialized(PathBuf),

    /// The directory is not a repository
    NotARepository(PathBuf),

    /// The requested commit (or path within it) does not exist
    UnknownVersion {
        sha: String,
        path: Option<String>,
    },

    /// Git output could not be understood
    Parse(String),
}

impl std::fmt::Display for VersioningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersioningError::CommandFailed(e) => write!(f, "Failed to run git: {e}"),
            VersioningError::GitFailed { stderr, .. } => write!(f, "Git error: {stderr}"),
            VersioningError::AlreadyInitialized(path) => {
                write!(f, "Repository already initialized: {}", path.display())
            }
            VersioningError::NotARepository(path) => {
                write!(f, "Not a repository: {}", path.display())
            }
            VersioningError::UnknownVersion { sha, path: None } => {
                write!(f, "Unknown version: {sha}")
            }
            VersioningError::UnknownVersion {
                sha,
                path: Some(path),
            } => write!(f, "Unknown version: {path} at {sha}"),
            VersioningError::Parse(msg) => write!(f, "Unexpected git output: {msg}"),
        }
    }
}

impl std::error::Error for VersioningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VersioningError::CommandFailed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for VersioningError {
    fn from(e: std::io::Error) -> Self {
        VersioningError::CommandFailed(e)
    }
}

// ============================================================================
// OUTPUT TYPE
// ============================================================================

/// Output from a git command.
#[derive(Debug)]
pub struct GitOutput {
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// The stdout output
    pub stdout: Vec<u8>,
    /// The stderr output
    pub stderr: Vec<u8>,
}

impl GitOutput {
    /// Get stdout as a string (lossy UTF-8 conversion)
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string (lossy UTF-8 conversion)
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    fn into_error(self) -> VersioningError {
        VersioningError::GitFailed {
            stderr: self.stderr_str().trim().to_string(),
            stdout: self.stdout_str().trim().to_string(),
        }
    }
}

// ============================================================================
// COMMON UTILITIES
// ============================================================================

/// Run a git command asynchronously and return the output.
///
/// # Arguments
///
/// * `args` - Git command arguments (e.g., `["status", "--porcelain"]`)
/// * `cwd` - Working directory to run the command in
pub async fn run_git(args: &[&str], cwd: &Path) -> Result<GitOutput, VersioningError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(VersioningError::CommandFailed)?;

    Ok(GitOutput {
        success: output.status.success(),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Run a git command and return its trimmed stdout, or an error with stderr.
pub async fn run_git_success(args: &[&str], cwd: &Path) -> Result<String, VersioningError> {
    let output = run_git(args, cwd).await?;

    if output.success {
        Ok(output.stdout_str().trim().to_string())
    } else {
        Err(output.into_error())
    }
}

/// Check if a git ref or object spec resolves (async).
///
/// Uses `git rev-parse --verify --quiet`.
pub async fn ref_exists(ref_name: &str, cwd: &Path) -> bool {
    let output = Command::new("git")
        .args(["rev-parse", "--verify", "--quiet", ref_name])
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    output.map(|s| s.success()).unwrap_or(false)
}

/// Check if a directory is the root of a git repository.
///
/// Synchronous since it's just a filesystem check.
pub fn is_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

fn require_repo(path: &Path) -> Result<(), VersioningError> {
    if is_git_repo(path) {
        Ok(())
    } else {
        Err(VersioningError::NotARepository(path.to_path_buf()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
