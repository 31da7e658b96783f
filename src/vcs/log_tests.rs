//! Unit tests for log template parsing.

use super::*;
use crate::NO_MIRROR;

/// Build a git log record the way git renders the placeholder template.
fn git_line(hash: &str, author: &str, date: &str, message: &str) -> String {
    format!(
        "{{{p}hash{p}:{p}{hash}{p},{p}author{p}:{p}{author}{p},{p}date{p}:{p}{date}{p},{p}message{p}:{p}{message}{p}}}{r}",
        p = PLACEHOLDER,
        r = RECORD_SEP,
    )
}

// ─── Template arguments ─────────────────────────────────────────────

#[test]
fn test_git_template_has_no_literal_quotes() {
    let args = log_template_args(VcsKind::Git);
    assert_eq!(args.len(), 1);
    assert!(args[0].starts_with("--pretty=format:"));
    assert!(!args[0].contains('"'), "quotes must be replaced by the placeholder");
    assert_eq!(args[0].matches(GIT_PLACEHOLDER).count(), 16);
    assert!(args[0].contains("%B"), "raw body, not the folded subject");
    assert!(args[0].ends_with("%x1e"));
}

#[test]
fn test_hg_template_uses_json_filter() {
    let args = log_template_args(VcsKind::Mercurial);
    assert_eq!(args[0], "--template");
    assert_eq!(args[1].matches("|json}").count(), 4);
    assert!(args[1].starts_with("\\{"), "opening brace must be escaped for hg");
    assert!(args[1].ends_with("}\n"));
}

// ─── Git (placeholder) parsing ──────────────────────────────────────

#[test]
fn test_parse_git_lines() {
    let raw = format!(
        "{}\n{}",
        git_line("abc1234", "Jane Doe", "Tue, 14 Nov 2023 22:13:20 +0000", "Issue 1 - First"),
        git_line("def5678", "John Roe", "Wed, 15 Nov 2023 08:00:00 +0100", "Noissue - Second"),
    );
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].hash, "abc1234");
    assert_eq!(records[0].author, "Jane Doe");
    assert_eq!(records[0].date, "Tue, 14 Nov 2023 22:13:20 +0000");
    assert_eq!(records[1].message, "Noissue - Second");
    assert!(records.iter().all(|r| r.kind == VcsKind::Git && r.mirror_hash == NO_MIRROR));
}

#[test]
fn test_parse_git_message_with_quotes_and_backslashes() {
    let raw = git_line("abc1234", "O\"Neil", "Tue, 14 Nov 2023 22:13:20 +0000", r#"Fix "C:\temp" handling {x}"#);
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records[0].author, "O\"Neil");
    assert_eq!(records[0].message, r#"Fix "C:\temp" handling {x}"#);
}

#[test]
fn test_parse_git_multi_line_body_keeps_first_line() {
    // git prints %B with its trailing newline, and a newline between records.
    let raw = format!(
        "{}\n{}",
        git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "First line\nsecond line\n\nbody\n"),
        git_line("def5678", "Jane", "Tue, 14 Nov 2023 22:14:20 +0000", "Single\n"),
    );
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].message, "First line");
    assert_eq!(records[1].message, "Single");
}

#[test]
fn test_parse_git_crlf_body_keeps_first_line() {
    let raw = git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "Subject\r\n\r\nBody\r\n");
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records[0].message, "Subject");
}

#[test]
fn test_parse_git_message_with_tab_control_char() {
    let raw = git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "tab\there");
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records[0].message, "tab\there");
}

#[test]
fn test_parse_git_unbalanced_placeholder_is_error() {
    let raw = git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "sneaky \u{1f} byte");
    let err = parse_log(VcsKind::Git, &raw).unwrap_err();
    match err {
        DepupError::LogFormat { line, message } => {
            assert_eq!(line, 1);
            assert!(message.contains("unbalanced"));
        }
        other => panic!("expected LogFormat, got {:?}", other),
    }
}

#[test]
fn test_parse_git_missing_field_is_error() {
    let raw = "\u{1f}hash\u{1f}:\u{1f}abc\u{1f}".to_string();
    let raw = format!("{{{}}}", raw);
    assert!(matches!(parse_log(VcsKind::Git, &raw), Err(DepupError::LogFormat { .. })));
}

#[test]
fn test_parse_reports_failing_line_number() {
    let raw = format!(
        "{}\nnot json at all",
        git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "ok")
    );
    match parse_log(VcsKind::Git, &raw) {
        Err(DepupError::LogFormat { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected LogFormat on line 2, got {:?}", other),
    }
}

// ─── Mercurial (native JSON) parsing ────────────────────────────────

#[test]
fn test_parse_hg_lines() {
    let raw = concat!(
        r#"{"hash":"1a2b3c4d5e6f","author":"Jane Doe","date":"Tue, 14 Nov 2023 22:13:20 +0000","message":"Issue 7 - \"quoted\""}"#,
        "\n",
        r#"{"hash":"0f0f0f0f0f0f","author":"John Roe","date":"Wed, 15 Nov 2023 08:00:00 +0100","message":"Noissue - path C:\\temp"}"#,
        "\n",
    );
    let records = parse_log(VcsKind::Mercurial, raw).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, VcsKind::Mercurial);
    assert_eq!(records[0].message, "Issue 7 - \"quoted\"");
    assert_eq!(records[1].message, "Noissue - path C:\\temp");
}

#[test]
fn test_parse_hg_rejects_placeholder_format() {
    let raw = git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "msg");
    assert!(parse_log(VcsKind::Mercurial, &raw).is_err());
}

// ─── Edge cases ─────────────────────────────────────────────────────

#[test]
fn test_parse_empty_output() {
    assert!(parse_log(VcsKind::Git, "").unwrap().is_empty());
    assert!(parse_log(VcsKind::Mercurial, "\n\n").unwrap().is_empty());
}

#[test]
fn test_parse_crlf_line_endings() {
    let raw = format!(
        "{}\r\n",
        git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", "windows")
    );
    let records = parse_log(VcsKind::Git, &raw).unwrap();
    assert_eq!(records[0].message, "windows");
}

// ─── Property-based tests (proptest) ────────────────────────────────

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any author/message free of line breaks and the delimiter bytes
        /// survives the placeholder encoding unchanged (the message up to
        /// surrounding whitespace).
        #[test]
        fn placeholder_encoding_preserves_text(
            author in "[^\\r\\n\\u{1e}\\u{1f}]{0,40}",
            message in "[^\\r\\n\\u{1e}\\u{1f}]{0,120}",
        ) {
            let line = git_line("abc1234", &author, "Tue, 14 Nov 2023 22:13:20 +0000", &message);
            let records = parse_log(VcsKind::Git, &line).unwrap();
            prop_assert_eq!(records.len(), 1);
            prop_assert_eq!(&records[0].author, &author);
            prop_assert_eq!(records[0].message.as_str(), message.trim());
        }

        /// Whatever follows the first line of a body never reaches the record.
        #[test]
        fn only_first_body_line_is_kept(
            subject in "[A-Za-z0-9 ]{0,40}[A-Za-z0-9]",
            rest in "[^\\u{1e}\\u{1f}]{0,120}",
        ) {
            let body = format!("{}\n{}", subject, rest);
            let line = git_line("abc1234", "Jane", "Tue, 14 Nov 2023 22:13:20 +0000", &body);
            let records = parse_log(VcsKind::Git, &line).unwrap();
            prop_assert_eq!(records[0].message.as_str(), subject.trim());
        }

        /// The rewritten line is always valid JSON when placeholders pair up.
        #[test]
        fn balanced_lines_become_valid_json(content in "[^\\u{1f}]{0,80}") {
            let line = format!("{{{p}k{p}:{p}{c}{p}}}", p = PLACEHOLDER, c = content);
            let json = placeholders_to_json(&line).unwrap();
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(value["k"].as_str(), Some(content.as_str()));
        }
    }
}
