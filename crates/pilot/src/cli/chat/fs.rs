//! File operations for the `/read`, `/write` and `/ls` commands.
//!
//! Relative paths resolve against the configured workspace; each successful
//! operation returns a display string for the terminal plus a history entry
//! framed as something the user did.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) fn resolve_path(input: &str, workspace: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(input);
    let path = Path::new(expanded.as_ref());
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace.join(path)
    }
}

/// Reads a file and returns `(display, history_entry)`.
pub(crate) fn read_file(input: &str, workspace: &Path) -> Result<(String, String)> {
    let path = resolve_path(input, workspace);
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let history = format!(
        "I read the file `{}`:\n```\n{}\n```",
        path.display(),
        content
    );
    Ok((content, history))
}

/// Writes content to a file, creating parent directories, and returns the
/// history entry.
pub(crate) fn write_file(input: &str, content: &str, workspace: &Path) -> Result<String> {
    let path = resolve_path(input, workspace);
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(format!(
        "I wrote {} bytes to `{}`.",
        content.len(),
        path.display()
    ))
}

/// Lists a directory with `[DIR]`/`[FILE]` tags, directories first, and
/// returns `(display, history_entry)`.
pub(crate) fn list_dir(input: Option<&str>, workspace: &Path) -> Result<(String, String)> {
    let path = resolve_path(input.unwrap_or("."), workspace);
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in
        fs::read_dir(&path).with_context(|| format!("Failed to list {}", path.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() {
            dirs.push(name);
        } else {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();

    let mut lines = Vec::with_capacity(dirs.len() + files.len());
    lines.extend(dirs.into_iter().map(|name| format!("[DIR] {name}")));
    lines.extend(files.into_iter().map(|name| format!("[FILE] {name}")));
    let display = lines.join("\n");

    let history = format!(
        "I listed the directory `{}`:\n{}",
        path.display(),
        display
    );
    Ok((display, history))
}
