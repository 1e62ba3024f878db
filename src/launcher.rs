//! Launcher file rendering and writing

use crate::error::{Error, Result};
use crate::types::LauncherSpec;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Render a launcher specification as desktop-entry text
///
/// Key order is fixed and the output is byte-identical for equal input.
/// Catalog text (`Name`, `Keywords`) is escaped so it always stays on its
/// own line and inside its own list item.
#[must_use]
pub fn render(spec: &LauncherSpec) -> String {
    let keywords: Vec<String> = spec.keywords.iter().map(|k| escape_list_item(k)).collect();

    let mut out = String::with_capacity(256);
    out.push_str("[Desktop Entry]\n");
    out.push_str("Version=1.0\n");
    // writeln! into a String cannot fail
    let _ = writeln!(out, "Name={}", escape_value(&spec.name));
    let _ = writeln!(out, "Exec={}", spec.exec);
    let _ = writeln!(out, "Icon={}", escape_value(&spec.icon));
    out.push_str("Terminal=false\n");
    out.push_str("Type=Application\n");
    let _ = writeln!(out, "Categories={}", spec.categories.join(";"));
    let _ = writeln!(out, "Keywords={};", keywords.join(";"));
    out
}

/// Escape a desktop-entry string value (`\\`, `\n`, `\t`, `\r`)
///
/// Other control characters are dropped; they have no escape form.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Escape one item of a `;`-separated list value
fn escape_list_item(item: &str) -> String {
    escape_value(item).replace(';', "\\;")
}

/// Render `spec` and write it to `path`, replacing any existing file
///
/// Returns the path written.
pub async fn write_launcher(spec: &LauncherSpec, path: &Path) -> Result<PathBuf> {
    tokio::fs::write(path, render(spec))
        .await
        .map_err(|e| Error::file_write(path, e))?;

    tracing::debug!(descriptor = %spec.descriptor, path = %path.display(), "launcher written");
    Ok(path.to_path_buf())
}
