use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{GitvendError, Result};

/// Snapshot of one commit, captured when the log was queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// Arguments that make `git` print the record [`parse_commit`] expects.
pub const LATEST_COMMIT_ARGS: &[&str] = &["log", "-n1", "--no-color", "--no-decorate"];

fn record_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A merge commit carries a `Merge:` line between the id and the author.
    RE.get_or_init(|| {
        Regex::new(
            r"\Acommit[ \t]+([^\n]+)\n(?:Merge:[^\n]*\n)?Author:[ \t]+([^\n]+)\nDate:[ \t]+([^\n]+)\n+[ \t]+([^\n]+)",
        )
        .unwrap()
    })
}

/// Parse the output of `git log -n1` into a [`CommitInfo`].
///
/// Expected shape:
/// ```text
/// commit <id>
/// Author: <author>
/// Date:   <date>
///
///     <first message line>
/// ```
///
/// Only the first message line is captured. The record must start at the
/// very beginning of `text`.
///
/// # Errors
/// Returns [`GitvendError::Parse`] when any part of the record is missing,
/// e.g. for an empty repository or a log without an `Author:` line.
pub fn parse_commit(text: &str) -> Result<CommitInfo> {
    let caps = record_regex()
        .captures(text)
        .ok_or_else(|| GitvendError::Parse {
            reason: "output is not a commit record".to_string(),
            output: text.to_string(),
        })?;

    let field = |i: usize| caps[i].trim().to_string();
    Ok(CommitInfo {
        id: field(1),
        author: field(2),
        date: field(3),
        message: field(4),
    })
}
