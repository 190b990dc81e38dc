//! Repository lifecycle and versioned reads.
//!
//! - [`initialize`] - Create an empty repository
//! - [`commit`] - Snapshot the working tree
//! - [`checkout`] - Read a file as of a commit
//! - [`version_exists`] - Check a commit (or a path in it) exists

use std::path::Path;

use super::{is_git_repo, require_repo, run_git, run_git_success, VersioningError};
use crate::config::CommitAuthor;
use crate::ids::Sha;

/// Create an empty repository at `repo_path`.
///
/// The directory must already exist.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if `repo_path` is already a repository.
pub async fn initialize(repo_path: &Path) -> Result<(), VersioningError> {
    if is_git_repo(repo_path) {
        return Err(VersioningError::AlreadyInitialized(repo_path.to_path_buf()));
    }

    run_git_success(&["init", "--quiet"], repo_path).await?;
    log::debug!("Initialized repository at {}", repo_path.display());
    Ok(())
}

/// Stage everything in the working tree and commit it.
///
/// Commits even when nothing changed, so every call yields a new sha.
/// The author is always `author`; the host's git identity is ignored.
pub async fn commit(
    repo_path: &Path,
    message: &str,
    author: &CommitAuthor,
) -> Result<Sha, VersioningError> {
    require_repo(repo_path)?;

    run_git_success(&["add", "--all"], repo_path).await?;

    let name = format!("user.name={}", author.name);
    let email = format!("user.email={}", author.email);
    run_git_success(
        &[
            "-c",
            &name,
            "-c",
            &email,
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "--no-verify",
            "--allow-empty",
            "-m",
            message,
        ],
        repo_path,
    )
    .await?;

    let head = run_git_success(&["rev-parse", "HEAD"], repo_path).await?;
    let sha = Sha::parse(head.clone())
        .map_err(|_| VersioningError::Parse(format!("HEAD resolved to `{head}`")))?;

    log::debug!("Committed {} in {}", sha, repo_path.display());
    Ok(sha)
}

/// Read `relative_path` as it was at commit `sha`.
///
/// # Errors
///
/// Returns `UnknownVersion` if the commit is unknown or the path did not
/// exist in it.
pub async fn checkout(
    repo_path: &Path,
    relative_path: &str,
    sha: &Sha,
) -> Result<String, VersioningError> {
    require_repo(repo_path)?;

    let spec = format!("{}:{}", sha.as_str(), relative_path);
    let output = run_git(&["show", &spec], repo_path).await?;

    if !output.success {
        return Err(VersioningError::UnknownVersion {
            sha: sha.to_string(),
            path: Some(relative_path.to_string()),
        });
    }

    Ok(output.stdout_str())
}

/// Check a commit exists, or with `relative_path`, that the path existed in it.
///
/// A directory that is not a repository has no versions.
pub async fn version_exists(
    repo_path: &Path,
    sha: &Sha,
    relative_path: Option<&str>,
) -> Result<bool, VersioningError> {
    if !is_git_repo(repo_path) {
        return Ok(false);
    }

    let spec = match relative_path {
        Some(path) => format!("{}:{}", sha.as_str(), path),
        None => format!("{}^{{commit}}", sha.as_str()),
    };

    let output = run_git(&["cat-file", "-e", &spec], repo_path).await?;
    Ok(output.success)
}
