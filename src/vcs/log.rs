//! Log output parsing: turns `hg log` / `git log` template output into
//! [`CommitRecord`]s.
//!
//! Both backends print one JSON object per commit:
//!
//! ```text
//! {"hash":"…","author":"…","date":"…","message":"…"}
//! ```
//!
//! Mercurial escapes the values itself through the `json` template filter
//! and prints one object per line. Git has no escaping filter, so its
//! template carries a placeholder byte (U+001F, `%x1f` in git's format
//! language) wherever a quote belongs, and ends every record with U+001E
//! because the raw message body spans several lines. Each record is split on
//! the placeholder: odd segments are string contents and get JSON-escaped,
//! even segments are structure and are kept as-is. A record with an odd
//! number of placeholders cannot be split unambiguously and is rejected
//! instead of being guessed at.
//!
//! Only the first line of a message is kept, for both backends.

use serde::Deserialize;

use crate::vcs::VcsKind;
use crate::{CommitRecord, DepupError};

/// Stand-in for `"` in git templates. Never produced by `%h`, `%an`, `%aD`
/// or `%B` for sane repositories; collisions are detected, not mis-parsed.
pub const PLACEHOLDER: char = '\u{1f}';

/// Terminates every git record.
pub const RECORD_SEP: char = '\u{1e}';

/// Git's spelling of [`PLACEHOLDER`] inside `--pretty=format:`.
const GIT_PLACEHOLDER: &str = "%x1f";

// %s would fold a multi-line subject paragraph into one line.
const GIT_TEMPLATE: &str = r#"{"hash":"%h","author":"%an","date":"%aD","message":"%B"}%x1e"#;

const HG_TEMPLATE: &str = concat!(
    r#"\{"hash":{node|short|json},"author":{author|person|json},"#,
    r#""date":{date|rfc822date|json},"message":{desc|strip|firstline|json}}"#,
    "\n"
);

/// One parsed log line before it is bound to a backend kind.
#[derive(Deserialize, Debug)]
struct LogEntry {
    hash: String,
    author: String,
    date: String,
    message: String,
}

/// Template arguments for the `log` command of `kind`.
pub fn log_template_args(kind: VcsKind) -> Vec<String> {
    match kind {
        VcsKind::Mercurial => vec!["--template".to_string(), HG_TEMPLATE.to_string()],
        VcsKind::Git => vec![format!(
            "--pretty=format:{}",
            GIT_TEMPLATE.replace('"', GIT_PLACEHOLDER)
        )],
    }
}

/// Parse raw log output of `kind` into records, in output order.
///
/// Blank records are ignored; any other record that does not decode is a
/// [`DepupError::LogFormat`] carrying its 1-based position.
pub fn parse_log(kind: VcsKind, raw: &str) -> Result<Vec<CommitRecord>, DepupError> {
    let chunks: Vec<&str> = match kind {
        VcsKind::Mercurial => raw.lines().collect(),
        VcsKind::Git => raw.split(RECORD_SEP).collect(),
    };

    let mut records = Vec::new();
    for (idx, chunk) in chunks.into_iter().enumerate() {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }

        let json = match kind {
            VcsKind::Mercurial => chunk.to_string(),
            VcsKind::Git => placeholders_to_json(chunk).map_err(|message| DepupError::LogFormat {
                line: idx + 1,
                message,
            })?,
        };

        let entry: LogEntry = serde_json::from_str(&json).map_err(|e| DepupError::LogFormat {
            line: idx + 1,
            message: format!("{} in {:?}", e, chunk),
        })?;

        let message = first_line(&entry.message);
        records.push(CommitRecord::new(kind, entry.hash, entry.author, entry.date, message));
    }

    Ok(records)
}

/// First line of `message` after trimming surrounding whitespace.
fn first_line(message: &str) -> String {
    message.trim().lines().next().unwrap_or_default().to_string()
}

/// Rewrite one placeholder-delimited line into valid JSON.
pub(crate) fn placeholders_to_json(line: &str) -> Result<String, String> {
    let segments: Vec<&str> = line.split(PLACEHOLDER).collect();
    // n placeholders give n + 1 segments; quotes must pair up.
    if segments.len() % 2 == 0 {
        return Err(format!(
            "unbalanced field delimiters ({} placeholders) in {:?}",
            segments.len() - 1,
            line
        ));
    }

    let mut json = String::with_capacity(line.len() + 16);
    for (i, segment) in segments.iter().enumerate() {
        if i % 2 == 1 {
            // Serializing a &str cannot fail.
            json.push_str(&serde_json::to_string(segment).unwrap_or_default());
        } else {
            json.push_str(segment);
        }
    }
    Ok(json)
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
