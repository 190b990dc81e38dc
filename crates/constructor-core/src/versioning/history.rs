//! Commit records and history listing.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ref_exists, require_repo, run_git, VersioningError};
use crate::ids::Sha;

/// Field and record separators used in `--format`.
const FIELD_SEP: char = '\u{1f}';
const RECORD_SEP: char = '\u{1e}';
const LOG_FORMAT: &str = "--format=%H%x1f%P%x1f%ct%x1f%B%x1e";

/// A single commit in a project repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRecord {
    pub sha: Sha,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// First parent, `None` for the root commit.
    pub parent_sha: Option<Sha>,
}

/// Look up a single commit.
pub async fn get_commit(repo_path: &Path, sha: &Sha) -> Result<CommitRecord, VersioningError> {
    require_repo(repo_path)?;

    let spec = format!("{}^{{commit}}", sha.as_str());
    let output = run_git(&["show", "--no-patch", LOG_FORMAT, &spec], repo_path).await?;

    if !output.success {
        return Err(VersioningError::UnknownVersion {
            sha: sha.to_string(),
            path: None,
        });
    }

    parse_log_output(&output.stdout_str())?
        .into_iter()
        .next()
        .ok_or_else(|| VersioningError::Parse(format!("no record for {sha}")))
}

/// List commits, newest first.
///
/// With `relative_path`, only commits touching that path are listed.
/// A repository without commits has an empty history.
pub async fn history(
    repo_path: &Path,
    relative_path: Option<&str>,
) -> Result<Vec<CommitRecord>, VersioningError> {
    require_repo(repo_path)?;

    if !ref_exists("HEAD", repo_path).await {
        return Ok(Vec::new());
    }

    let mut args = vec!["log", LOG_FORMAT];
    if let Some(path) = relative_path {
        args.push("--");
        args.push(path);
    }

    let output = run_git(&args, repo_path).await?;
    if !output.success {
        return Err(output.into_error());
    }

    parse_log_output(&output.stdout_str())
}

/// Parse output produced with [`LOG_FORMAT`].
///
/// Each record is `sha US parents US unix-time US body RS`.
pub fn parse_log_output(output: &str) -> Result<Vec<CommitRecord>, VersioningError> {
    let mut records = Vec::new();

    for chunk in output.split(RECORD_SEP) {
        let chunk = chunk.trim_start_matches(['\n', '\r']);
        if chunk.trim().is_empty() {
            continue;
        }

        let mut fields = chunk.splitn(4, FIELD_SEP);
        let (Some(sha), Some(parents), Some(time), Some(body)) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(VersioningError::Parse(format!("malformed record `{chunk}`")));
        };

        let sha = Sha::parse(sha.trim())
            .map_err(|_| VersioningError::Parse(format!("bad sha `{sha}`")))?;

        let parent_sha = match parents.split_whitespace().next() {
            Some(parent) => Some(
                Sha::parse(parent)
                    .map_err(|_| VersioningError::Parse(format!("bad parent `{parent}`")))?,
            ),
            None => None,
        };

        let secs: i64 = time
            .trim()
            .parse()
            .map_err(|_| VersioningError::Parse(format!("bad timestamp `{time}`")))?;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| VersioningError::Parse(format!("timestamp out of range `{secs}`")))?;

        records.push(CommitRecord {
            sha,
            message: body.trim().to_string(),
            timestamp,
            parent_sha,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommitAuthor;
    use crate::versioning::{commit, initialize};
    use tempfile::tempdir;

    const SHA_A: &str = "1111111111111111111111111111111111111111";
    const SHA_B: &str = "2222222222222222222222222222222222222222";

    #[test]
    fn parse_log_output_basic() {
        let output = format!(
            "{SHA_B}\u{1f}{SHA_A}\u{1f}1700000100\u{1f}[SAVE] p1\n\u{1e}\n\
             {SHA_A}\u{1f}\u{1f}1700000000\u{1f}[SNAPSHOT] p1: first\n\u{1e}\n"
        );

        let records = parse_log_output(&output).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sha.as_str(), SHA_B);
        assert_eq!(records[0].parent_sha.as_ref().unwrap().as_str(), SHA_A);
        assert_eq!(records[0].message, "[SAVE] p1");
        assert_eq!(records[1].parent_sha, None);
        assert_eq!(records[1].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn parse_log_output_keeps_multiline_bodies() {
        let output = format!("{SHA_A}\u{1f}\u{1f}0\u{1f}subject\n\nbody line\n\u{1e}");

        let records = parse_log_output(&output).unwrap();
        assert_eq!(records[0].message, "subject\n\nbody line");
    }

    #[test]
    fn parse_log_output_empty() {
        assert!(parse_log_output("").unwrap().is_empty());
        assert!(parse_log_output("\n").unwrap().is_empty());
    }

    #[test]
    fn parse_log_output_rejects_garbage() {
        assert!(matches!(
            parse_log_output("not a record\u{1e}"),
            Err(VersioningError::Parse(_))
        ));
    }

    #[test]
    fn commit_record_serializes_camel_case() {
        let record = CommitRecord {
            sha: Sha::parse(SHA_A).unwrap(),
            message: "m".to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            parent_sha: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"parentSha\":null"));
    }

    #[tokio::test]
    async fn history_lists_newest_first_and_filters_by_path() {
        let dir = tempdir().unwrap();
        initialize(dir.path()).await.unwrap();
        assert!(history(dir.path(), None).await.unwrap().is_empty());

        let author = CommitAuthor::default();
        std::fs::write(dir.path().join("a.json"), "1").unwrap();
        let first = commit(dir.path(), "first", &author).await.unwrap();
        std::fs::write(dir.path().join("b.json"), "1").unwrap();
        let second = commit(dir.path(), "second", &author).await.unwrap();

        let all = history(dir.path(), None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].sha, second);
        assert_eq!(all[0].parent_sha.as_ref(), Some(&first));

        let only_a = history(dir.path(), Some("a.json")).await.unwrap();
        assert_eq!(only_a.len(), 1);
        assert_eq!(only_a[0].message, "first");

        let record = get_commit(dir.path(), &first).await.unwrap();
        assert_eq!(record.message, "first");
        assert_eq!(record.parent_sha, None);
    }
}
