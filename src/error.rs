//! Unified error type for depup.

use std::time::Duration;

use thiserror::Error;

use crate::vcs::VcsKind;

/// All errors that can occur while preparing a dependency update.
#[derive(Error, Debug)]
pub enum DepupError {
    /// I/O error (manifest read/write, scratch directories)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The VCS executable could not be started at all
    #[error("Failed to execute {program}: {source}. Is it installed and in PATH?")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The VCS tool exited with a non-zero status
    #[error("{program} {args} failed (exit code {}): {}", exit_code(.code), .stderr.trim())]
    Process {
        program: String,
        args: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The VCS tool produced output that is not valid UTF-8
    #[error("{program} output is not valid UTF-8")]
    NonUtf8Output { program: String },

    /// The VCS tool did not finish within the configured timeout
    #[error("{program} did not finish within {limit:?} and was killed")]
    Timeout { program: String, limit: Duration },

    /// The user interrupted the run while the VCS tool was executing
    #[error("Interrupted while running {program}")]
    Interrupted { program: String },

    /// Log output could not be turned into commit records
    #[error("Unexpected log output on line {line}: {message}")]
    LogFormat { line: usize, message: String },

    /// Zero or several VCS markers were found for a path
    #[error("{}", describe_detection(.path, .found))]
    AmbiguousOrUnknownVcs { path: String, found: Vec<VcsKind> },

    /// A mutating operation was requested on a working copy with local changes
    #[error("Working copy at {path} has uncommitted changes")]
    DirtyWorkingCopy { path: String },

    /// Neither the dependency nor `_root` names a mirror source
    #[error("No valid mirror was found for '{dependency}'")]
    NoMirror { dependency: String },

    /// The newest commit has no counterpart in the mirror
    #[error("Could not find the mirrored hash of {hash}")]
    MirrorNotFound { hash: String },

    /// The dependencies manifest is malformed or does not contain the entry
    #[error("Manifest {path}: {message}")]
    Manifest { path: String, message: String },

    /// The requested dependency is not listed in the manifest
    #[error("Dependency '{name}' is not listed in the dependencies file")]
    UnknownDependency { name: String },

    /// Invalid regex pattern
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Issue tracker request failed
    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

fn describe_detection(path: &str, found: &[VcsKind]) -> String {
    if found.is_empty() {
        format!("No valid VCS found for {}", path)
    } else {
        let names: Vec<&str> = found.iter().map(|k| k.executable()).collect();
        format!("Found multiple possible VCS' for {}: {}", path, names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = DepupError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(err.to_string().contains("I/O error"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_process_error_display() {
        let err = DepupError::Process {
            program: "hg".to_string(),
            args: "log -r tip".to_string(),
            code: Some(255),
            stderr: "abort: unknown revision 'nope'!\n".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("hg log -r tip"));
        assert!(msg.contains("255"));
        assert!(msg.ends_with("unknown revision 'nope'!"), "stderr should be trimmed: {}", msg);
    }

    #[test]
    fn test_process_error_without_code() {
        let err = DepupError::Process {
            program: "git".to_string(),
            args: "fetch".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("exit code none"));
    }

    #[test]
    fn test_unknown_vcs_display() {
        let err = DepupError::AmbiguousOrUnknownVcs {
            path: "/work/dep".to_string(),
            found: vec![],
        };
        assert_eq!(err.to_string(), "No valid VCS found for /work/dep");
    }

    #[test]
    fn test_ambiguous_vcs_display() {
        let err = DepupError::AmbiguousOrUnknownVcs {
            path: "/work/dep".to_string(),
            found: vec![VcsKind::Git, VcsKind::Mercurial],
        };
        let msg = err.to_string();
        assert!(msg.contains("multiple"));
        assert!(msg.contains("git, hg"));
    }

    #[test]
    fn test_timeout_display() {
        let err = DepupError::Timeout {
            program: "git".to_string(),
            limit: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_timeout_display_below_one_second() {
        let err = DepupError::Timeout {
            program: "git".to_string(),
            limit: Duration::from_millis(200),
        };
        assert!(err.to_string().contains("within 200ms"), "{}", err);
    }

    #[test]
    fn test_io_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: DepupError = io_err.into();
        assert!(matches!(err, DepupError::Io(_)));
    }

    #[test]
    fn test_invalid_regex_display() {
        let source = regex::Regex::new("[invalid").unwrap_err();
        let err = DepupError::InvalidRegex {
            pattern: "[invalid".to_string(),
            source,
        };
        assert!(err.to_string().contains("'[invalid'"));
    }
}
