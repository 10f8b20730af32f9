//! Heuristic extraction of shell commands from assistant replies.
//!
//! Fenced code blocks and inline code spans are scanned for lines that look
//! like commands. A single-line fenced block is taken as a candidate
//! outright; everything else must start with an allow-listed program name.
//! Admittedly heuristic.
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::process::Command;

pub(crate) const COMMAND_ALLOW_LIST: &[&str] = &[
    "ls", "cd", "cat", "grep", "find", "echo", "mkdir", "touch", "cp", "mv", "pwd", "git",
    "cargo", "python", "pip", "npm", "node", "rustc", "make", "curl", "wget", "head", "tail",
    "wc", "sed", "awk",
];

static FENCED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[a-zA-Z0-9_-]*\n)?(.*?)```").unwrap());
static INLINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+)`").unwrap());

fn is_allow_listed(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|verb| COMMAND_ALLOW_LIST.contains(&verb))
}

/// Scans an assistant reply for shell command candidates, in order of
/// appearance with duplicates removed.
pub(crate) fn extract_commands(reply: &str) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !candidates.iter().any(|c| c == candidate) {
            candidates.push(candidate.to_string());
        }
    };

    for capture in FENCED_RE.captures_iter(reply) {
        let block = capture[1].trim();
        let lines: Vec<&str> = block.lines().collect();
        if lines.len() == 1 {
            push(lines[0]);
        } else {
            for line in lines {
                if is_allow_listed(line.trim()) {
                    push(line);
                }
            }
        }
    }

    // Inline spans, skipping anything inside a fenced block.
    let without_fences = FENCED_RE.replace_all(reply, "");
    for capture in INLINE_RE.captures_iter(&without_fences) {
        let span = capture[1].trim();
        if is_allow_listed(span) {
            push(span);
        }
    }

    candidates
}

/// Runs a confirmed command synchronously through `sh -c` in the workspace
/// directory, returning combined stdout and stderr.
pub(crate) fn run_command(command: &str, workspace: &Path) -> Result<String> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workspace)
        .output()
        .with_context(|| format!("Failed to run: {command}"))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }
    if !output.status.success() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&format!("(exit status: {})", output.status));
    }
    Ok(combined)
}

/// History entry for an executed command, framed as a user action so the
/// model sees the result on the next turn.
pub(crate) fn format_history_entry(command: &str, output: &str) -> String {
    format!("I ran `{command}` and got:\n```\n{output}\n```")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_single_line_fenced_block_is_a_candidate() {
        let reply = "Run this:\n```sh\nls -la\n```\nand check the output.";
        assert_eq!(extract_commands(reply), vec!["ls -la"]);
    }

    #[test]
    fn test_prose_yields_no_candidates() {
        let reply = "You should list the directory and look for large files.";
        assert!(extract_commands(reply).is_empty());
    }

    #[test]
    fn test_multi_line_block_filters_by_allow_list() {
        let reply = "```\n# count the lines\nwc -l src/main.rs\nsome prose here\ngit status\n```";
        assert_eq!(extract_commands(reply), vec!["wc -l src/main.rs", "git status"]);
    }

    #[test]
    fn test_inline_spans_filter_by_allow_list() {
        let reply = "Try `git log` first, then open `Cargo.toml` in an editor.";
        assert_eq!(extract_commands(reply), vec!["git log"]);
    }

    #[test]
    fn test_inline_spans_inside_fences_are_not_double_counted() {
        let reply = "```\ngit status\n```\nAs shown, `git status` is safe.";
        assert_eq!(extract_commands(reply), vec!["git status"]);
    }

    #[test]
    fn test_single_line_block_beats_allow_list() {
        // A one-line block is trusted even for a program we do not know.
        let reply = "```\n./scripts/build.sh --release\n```";
        assert_eq!(extract_commands(reply), vec!["./scripts/build.sh --release"]);
    }

    #[test]
    fn test_run_command_captures_output() {
        let dir = tempdir().unwrap();
        let output = run_command("echo hello", dir.path()).unwrap();
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_run_command_reports_failure_status() {
        let dir = tempdir().unwrap();
        let output = run_command("false", dir.path()).unwrap();
        assert!(output.contains("exit status"));
    }

    #[test]
    fn test_format_history_entry() {
        let entry = format_history_entry("ls", "a.txt\n");
        assert!(entry.starts_with("I ran `ls`"));
        assert!(entry.contains("a.txt"));
    }
}
