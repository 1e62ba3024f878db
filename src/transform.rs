//! Catalog record to launcher transformation
//!
//! Pure functions: no I/O, no logging. A record that cannot be turned into a
//! launcher yields a [`MalformedRecordError`] and the caller moves on.

use crate::config::LauncherConfig;
use crate::error::MalformedRecordError;
use crate::types::{LauncherSpec, RawChannelRecord};

/// Desktop entry categories for every channel launcher
pub const CATEGORIES: [&str; 2] = ["AudioVideo", "Video"];

/// Prefix of the icon reference written into launchers
pub const ICON_PREFIX: &str = "tv-";

/// Replace the first occurrence of `pattern` in `name` with `replacement`
///
/// Matching ignores ASCII case; later occurrences are kept.
///
/// ```
/// use tvdesk::transform::reformat_name;
///
/// assert_eq!(reformat_name("My channel channel", "channel", "tv"), "My tv channel");
/// assert_eq!(reformat_name("Channel One", "channel", "tv"), "tv One");
/// ```
#[must_use]
pub fn reformat_name(name: &str, pattern: &str, replacement: &str) -> String {
    if pattern.is_empty() {
        return name.to_string();
    }
    // ASCII lowercasing keeps byte offsets, so the match index is valid in `name`
    match name
        .to_ascii_lowercase()
        .find(&pattern.to_ascii_lowercase())
    {
        Some(start) => {
            let end = start + pattern.len();
            format!("{}{}{}", &name[..start], replacement, &name[end..])
        }
        None => name.to_string(),
    }
}

/// Stream URL for a channel: `<stream_base>/<descriptor>/live/playlist.m3u8`
#[must_use]
pub fn stream_url(stream_base_url: &str, descriptor: &str) -> String {
    format!(
        "{}/{}/live/playlist.m3u8",
        stream_base_url.trim_end_matches('/'),
        descriptor
    )
}

/// Map one catalog record to a launcher specification
///
/// Fails when the descriptor, image name or English name is absent or blank,
/// or when the descriptor cannot serve as a single file-name component.
pub fn transform(
    record: &RawChannelRecord,
    config: &LauncherConfig,
) -> Result<LauncherSpec, MalformedRecordError> {
    let descriptor = required(&record.descriptor, "descriptor")?;
    let image_name = required(&record.image_name, "image_name")?;
    let name_english = required(&record.name_english, "name_english")?;
    check_descriptor(descriptor)?;

    let name = reformat_name(name_english, &config.name_pattern, &config.name_replacement);
    let exec = format!(
        "{} {}",
        config.player_command,
        stream_url(&config.stream_base_url, descriptor)
    );

    let mut keywords = vec![name_english.to_string(), descriptor.to_string()];
    if let Some(localized) = record.name.as_deref().filter(|n| !n.trim().is_empty()) {
        keywords.push(localized.to_string());
    }

    Ok(LauncherSpec {
        descriptor: descriptor.to_string(),
        image_name: image_name.to_string(),
        name,
        exec,
        icon: format!("{}{}", ICON_PREFIX, descriptor),
        categories: CATEGORIES.iter().map(|c| c.to_string()).collect(),
        keywords,
    })
}

fn required<'a>(
    value: &'a Option<String>,
    field: &'static str,
) -> Result<&'a str, MalformedRecordError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MalformedRecordError::MissingField { field }),
    }
}

fn check_descriptor(descriptor: &str) -> Result<(), MalformedRecordError> {
    let reason = if descriptor == "." || descriptor == ".." {
        Some("relative path component")
    } else if descriptor.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if descriptor.chars().any(char::is_control) {
        Some("contains a control character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(MalformedRecordError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
