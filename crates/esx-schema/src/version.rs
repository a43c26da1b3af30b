//! Version parsing and catalog version selection.
//!
//! Bower packages frequently publish versions that are not strict semver
//! (`v1.2`, `=2.0.1`). Comparisons here go through [`parse_lenient`] so the
//! catalog can be keyed by whatever the upstream project tagged.

use crate::types::Version;

/// Parse a version string as semver, tolerating common registry quirks.
///
/// Accepts a leading `v` or `=`, surrounding whitespace, and one- or
/// two-component versions (`1` becomes `1.0.0`, `1.2` becomes `1.2.0`).
pub fn parse_lenient(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('='))
        .unwrap_or(trimmed)
        .trim();

    if let Ok(v) = semver::Version::parse(trimmed) {
        return Some(v);
    }

    let split_at = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split_at);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }

    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    semver::Version::parse(&padded).ok()
}

/// Pick the catalog version that applies to `requested`.
///
/// Returns the greatest entry of `available` that is not greater than
/// `requested`, exactly as it was written in the catalog. When nothing
/// qualifies (or `requested` does not parse) the `0.0.0` sentinel is
/// returned, which callers treat as "no patches".
pub fn select_best_version<'a, I>(requested: &str, available: I) -> Version
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(target) = parse_lenient(requested) else {
        return Version::none();
    };

    let mut best = semver::Version::new(0, 0, 0);
    let mut selected: Option<&str> = None;

    for key in available {
        let Some(candidate) = parse_lenient(key) else {
            continue;
        };
        if candidate > target {
            continue;
        }
        if candidate > best {
            best = candidate;
            selected = Some(key);
        }
    }

    selected.map_or_else(Version::none, Version::new)
}
