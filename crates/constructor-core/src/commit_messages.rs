//! Canonical commit messages.
//!
//! Every message starts with `[<TAG>] <id>`, optionally followed by
//! `: <detail>`, so history can be filtered by entity with [`parse_message`].

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::ids::{BlockId, ProjectId, SequenceHash};

/// Detail recorded when a block's sequence is dropped.
pub const SEQUENCE_REMOVED: &str = "removed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitKind {
    Project,
    Block,
    Save,
    Snapshot,
    Sequence,
    CreateProject,
    CreateBlock,
    DeleteBlock,
}

impl CommitKind {
    pub fn tag(self) -> &'static str {
        match self {
            CommitKind::Project => "PROJECT",
            CommitKind::Block => "BLOCK",
            CommitKind::Save => "SAVE",
            CommitKind::Snapshot => "SNAPSHOT",
            CommitKind::Sequence => "SEQUENCE",
            CommitKind::CreateProject => "CREATE_PROJECT",
            CommitKind::CreateBlock => "CREATE_BLOCK",
            CommitKind::DeleteBlock => "DELETE_BLOCK",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "PROJECT" => CommitKind::Project,
            "BLOCK" => CommitKind::Block,
            "SAVE" => CommitKind::Save,
            "SNAPSHOT" => CommitKind::Snapshot,
            "SEQUENCE" => CommitKind::Sequence,
            "CREATE_PROJECT" => CommitKind::CreateProject,
            "CREATE_BLOCK" => CommitKind::CreateBlock,
            "DELETE_BLOCK" => CommitKind::DeleteBlock,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for CommitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn format_message(kind: CommitKind, id: &str, detail: Option<&str>) -> String {
    match detail.map(str::trim).filter(|d| !d.is_empty()) {
        Some(detail) => format!("[{}] {}: {}", kind.tag(), id, detail),
        None => format!("[{}] {}", kind.tag(), id),
    }
}

pub fn message_project(project_id: &ProjectId) -> String {
    format_message(CommitKind::Project, project_id.as_str(), None)
}

pub fn message_block(block_id: &BlockId) -> String {
    format_message(CommitKind::Block, block_id.as_str(), None)
}

/// Autosave.
pub fn message_save(project_id: &ProjectId, addition: Option<&str>) -> String {
    format_message(CommitKind::Save, project_id.as_str(), addition)
}

/// Explicit, user-requested save.
pub fn message_snapshot(project_id: &ProjectId, addition: Option<&str>) -> String {
    format_message(CommitKind::Snapshot, project_id.as_str(), addition)
}

/// A block's sequence changed; `None` means the sequence was removed.
pub fn message_sequence_update(block_id: &BlockId, sequence: Option<&SequenceHash>) -> String {
    let detail = sequence.map_or(SEQUENCE_REMOVED, SequenceHash::as_str);
    format_message(CommitKind::Sequence, block_id.as_str(), Some(detail))
}

pub fn message_create_project(project_id: &ProjectId) -> String {
    format_message(CommitKind::CreateProject, project_id.as_str(), None)
}

pub fn message_create_block(block_id: &BlockId) -> String {
    format_message(CommitKind::CreateBlock, block_id.as_str(), None)
}

pub fn message_delete_block(block_id: &BlockId) -> String {
    format_message(CommitKind::DeleteBlock, block_id.as_str(), None)
}

/// A commit message split back into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedMessage {
    pub kind: CommitKind,
    pub id: String,
    pub detail: Option<String>,
}

static MESSAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\[(?P<tag>[A-Z_]+)\] (?P<id>[A-Za-z0-9._-]+)(?:: (?P<detail>.*))?$").unwrap()
});

/// Parse a message produced by this module. `None` for anything else.
pub fn parse_message(message: &str) -> Option<ParsedMessage> {
    let caps = MESSAGE_RE.captures(message.trim())?;
    let kind = CommitKind::from_tag(caps.name("tag")?.as_str())?;

    Some(ParsedMessage {
        kind,
        id: caps.name("id")?.as_str().to_string(),
        detail: caps.name("detail").map(|d| d.as_str().to_string()),
    })
}
