//! Forward-slash path helpers.
//!
//! Package file lists, module locations and import specifiers all end up in
//! JavaScript, so they are handled as `/`-separated strings regardless of the
//! host platform. Only the filesystem layer converts them to `PathBuf`.

/// Default installation directory when `.bowerrc` does not set one.
pub const DEFAULT_DIRECTORY: &str = "bower_components";

/// Default infix marking patched artifacts (`a.js` → `a.es6.js`).
pub const DEFAULT_MARKER: &str = "es6";

/// Normalize a path: collapse `.` and empty segments, resolve `..` where
/// possible. An empty relative result is `.`.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (absolute, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Join segments and normalize the result. Empty segments are ignored.
pub fn join(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, true) => ".".to_string(),
        (true, false) => normalize(rest),
        (false, true) => normalize(base),
        (false, false) => normalize(&format!("{base}/{rest}")),
    }
}

/// Everything before the last `/`, or `.` when there is none.
pub fn dirname(path: &str) -> String {
    let path = normalize(path);
    match path.rfind('/') {
        Some(0) => "/".to_string(),
        Some(i) => path[..i].to_string(),
        None => ".".to_string(),
    }
}

/// The last segment of a path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path of `to` relative to the directory `from`.
///
/// Returns an empty string when both name the same directory.
pub fn relative(from: &str, to: &str) -> String {
    let from = normalize(from);
    let to = normalize(to);
    let split = |p: &str| -> Vec<String> {
        p.split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .map(ToString::to_string)
            .collect()
    };
    let from_parts = split(&from);
    let to_parts = split(&to);

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = vec![".."; from_parts.len() - common];
    out.extend(to_parts[common..].iter().map(String::as_str));
    out.join("/")
}

/// Whether a file name has the `.js` suffix.
pub fn is_js(file: &str) -> bool {
    file.ends_with(".js")
}

/// Name of the patched artifact for `file`: `marker` goes in front of the
/// final extension of the last segment.
pub fn patched_name(file: &str, marker: &str) -> String {
    let name_start = file.rfind('/').map_or(0, |i| i + 1);
    match file[name_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = name_start + dot;
            format!("{}.{marker}{}", &file[..dot], &file[dot..])
        }
        _ => format!("{file}.{marker}"),
    }
}
