//! Prompt construction and reply parsing.
//!
//! Failure suggestions come back one per line as
//! `LINE:<n> TYPE:<TYPE> MSG:<message>`, or the single word `NONE`.

use std::sync::OnceLock;

use autoheal_core::{BugType, Failure, FixContext};
use regex::Regex;

static LINE_RE: OnceLock<Regex> = OnceLock::new();
static TYPE_RE: OnceLock<Regex> = OnceLock::new();
static MSG_RE: OnceLock<Regex> = OnceLock::new();

fn line_re() -> &'static Regex {
    LINE_RE.get_or_init(|| Regex::new(r"(?i)LINE:\s*(\d+)").expect("valid regex"))
}

fn type_re() -> &'static Regex {
    TYPE_RE.get_or_init(|| Regex::new(r"(?i)TYPE:\s*([A-Z_]+)").expect("valid regex"))
}

fn msg_re() -> &'static Regex {
    MSG_RE.get_or_init(|| Regex::new(r"(?i)MSG:(.+)").expect("valid regex"))
}

/// First `max_chars` characters of `content`.
fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

pub fn suggest_failures_prompt(file: &str, content: &str, max_chars: usize) -> String {
    format!(
        "You are a Python static analyzer. For the following file, list any issues that match \
these types only: LINTING (unused import), SYNTAX (missing colon), IMPORT (unused import other \
than os), INDENTATION (mixed tabs/spaces or wrong indent after colon), LOGIC (incorrect program \
logic), TYPE_ERROR (operation on incompatible types).
For each issue reply with exactly one line: LINE:<1-based line number> \
TYPE:<LINTING|SYNTAX|IMPORT|INDENTATION|LOGIC|TYPE_ERROR> MSG:<short message>
File path: {file}

```
{content}
```

If there are no issues, reply with only: NONE
Otherwise list one line per issue.",
        file = file,
        content = truncate_chars(content, max_chars),
    )
}

pub fn fix_description_prompt(context: &FixContext) -> String {
    let snippet = if context.snippet.is_empty() {
        "(none)"
    } else {
        context.snippet.as_str()
    };
    format!(
        "You are a code fix summarizer. In one short sentence (under 15 words), describe the fix applied.
File: {}, Line: {}, Bug type: {}
Code snippet:
{}
Reply with only the sentence, no quotes or prefix.",
        context.file, context.line, context.bug_type, snippet
    )
}

/// Parse a suggestion reply into failures for `file`. Malformed lines,
/// unknown types and line 0 are dropped.
pub fn parse_failures(file: &str, reply: &str) -> Vec<Failure> {
    let reply = reply.trim();
    if reply.is_empty() || reply.eq_ignore_ascii_case("NONE") {
        return Vec::new();
    }

    reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|l| {
            let line: usize = line_re().captures(l)?.get(1)?.as_str().parse().ok()?;
            if line == 0 {
                return None;
            }
            let bug_type = BugType::parse(type_re().captures(l)?.get(1)?.as_str())?;
            let message = msg_re()
                .captures(l)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| bug_type.to_string());
            Some(Failure::new(file, line, bug_type, message))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_lines() {
        let reply = "LINE:3 TYPE:SYNTAX MSG:Missing colon\nline:7 type:logic msg: Wrong operator\n";
        let failures = parse_failures("app.py", reply);
        assert_eq!(
            failures,
            vec![
                Failure::new("app.py", 3, BugType::Syntax, "Missing colon"),
                Failure::new("app.py", 7, BugType::Logic, "Wrong operator"),
            ]
        );
    }

    #[test]
    fn test_parse_none_and_garbage() {
        assert!(parse_failures("a.py", "NONE").is_empty());
        assert!(parse_failures("a.py", "  none \n").is_empty());
        assert!(parse_failures("a.py", "").is_empty());
        assert!(parse_failures("a.py", "Looks fine to me!").is_empty());
    }

    #[test]
    fn test_parse_drops_unknown_type_and_line_zero() {
        let reply = "LINE:0 TYPE:SYNTAX MSG:x\nLINE:2 TYPE:STYLE MSG:y\nLINE:4 TYPE:TYPE_ERROR";
        let failures = parse_failures("a.py", reply);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].line, 4);
        assert_eq!(failures[0].bug_type, BugType::TypeError);
        assert_eq!(failures[0].message, "TYPE_ERROR");
    }

    #[test]
    fn test_suggest_prompt_truncates_content() {
        let content = "é".repeat(20);
        let prompt = suggest_failures_prompt("a.py", &content, 5);
        assert!(prompt.contains("File path: a.py"));
        assert!(prompt.contains(&"é".repeat(5)));
        assert!(!prompt.contains(&"é".repeat(6)));
    }

    #[test]
    fn test_fix_prompt_marks_missing_snippet() {
        let context = FixContext {
            file: "a.py".to_string(),
            line: 2,
            bug_type: BugType::Linting,
            snippet: String::new(),
        };
        let prompt = fix_description_prompt(&context);
        assert!(prompt.contains("File: a.py, Line: 2, Bug type: LINTING"));
        assert!(prompt.contains("(none)"));
    }
}
