//! Source rewrite hooks, one per transform kind.
//!
//! Every hook is a pure function of (parameters, source). A file's transform
//! list is applied as a left fold: each hook consumes the previous output.

use regex::{Captures, Regex};
use thiserror::Error;

use esx_schema::transform::{ExportDefault, ModuleWrap, Replace};

use crate::ast::{AstError, Program};
use crate::paths;
use crate::types::Transform;

/// Module that `plugin-wrap` imports, relative to the vendor prefix.
pub const PLUGIN_HOST: &str = "jquery";

#[derive(Error, Debug)]
pub enum HookError {
    #[error(
        "Cannot compile regex '{pattern}' (Rust regex syntax, without lookaround or backreferences): {source}"
    )]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("AST rewrite failed: {0}")]
    Ast(#[from] AstError),

    #[error("Unknown transform type '{0}'")]
    Unsupported(String),
}

/// Applies transforms. Carries the vendor prefix used by `plugin-wrap`.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    vendor_prefix: String,
}

impl HookRegistry {
    pub fn new(vendor_prefix: impl Into<String>) -> Self {
        Self {
            vendor_prefix: vendor_prefix.into(),
        }
    }

    pub fn vendor_prefix(&self) -> &str {
        &self.vendor_prefix
    }

    /// Apply a single transform.
    ///
    /// # Errors
    ///
    /// Fails on an invalid `replace` regex, a failed `ast-mutate` step, or a
    /// transform kind this registry does not know.
    pub fn apply(&self, transform: &Transform, source: &str) -> Result<String, HookError> {
        match transform {
            Transform::ModuleWrap(params) => Ok(module_wrap(params, source)),
            Transform::Prepend(text) => Ok(format!("{text}\n{source}")),
            Transform::Append(text) => Ok(format!("{source}\n{text}")),
            Transform::Replace(params) => replace(params, source),
            Transform::PluginWrap => Ok(self.plugin_wrap(source)),
            Transform::ExportDefault(ExportDefault { binding }) => {
                Ok(format!("{source}\nexport default {binding}"))
            }
            Transform::AstMutate(steps) => {
                let mut program = Program::parse(source)?;
                for step in steps {
                    program.apply(step)?;
                }
                Ok(program.print())
            }
            Transform::Unsupported { kind } => Err(HookError::Unsupported(kind.clone())),
        }
    }

    /// Fold `transforms` over `source` in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the error of the first transform that fails.
    pub fn apply_all(&self, transforms: &[Transform], source: String) -> Result<String, HookError> {
        transforms
            .iter()
            .try_fold(source, |acc, transform| self.apply(transform, &acc))
    }

    fn plugin_wrap(&self, source: &str) -> String {
        let host = paths::join(&self.vendor_prefix, PLUGIN_HOST);
        format!("import $ from \"{host}\";\nvar jQuery = $, jquery = $;\n{source}\nexport default 0;")
    }
}

fn module_wrap(params: &ModuleWrap, source: &str) -> String {
    let mut out = String::new();
    for import in &params.imports {
        out.push_str(&format!(
            "import {} from \"{}\";\n",
            import.binding, import.module
        ));
    }
    out.push_str(source);
    out.push('\n');
    for export in &params.exports {
        out.push_str(&format!("export {} {};\n", export.name, export.binding));
    }
    out
}

/// Replace the first match, expanding JavaScript-style `$` tokens.
fn replace(params: &Replace, source: &str) -> Result<String, HookError> {
    let regex = Regex::new(&params.regex).map_err(|source| HookError::Regex {
        pattern: params.regex.clone(),
        source,
    })?;
    Ok(regex
        .replace(source, |caps: &Captures<'_>| {
            expand_replacement(&params.replace, caps, source)
        })
        .into_owned())
}

/// Expand `$$`, `$&`, `` $` ``, `$'`, `$n`, `$nn` and `$<name>` the way
/// `String.prototype.replace` does. Anything else is literal.
fn expand_replacement(template: &str, caps: &Captures<'_>, haystack: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let consumed = expand_token(after, caps, haystack, &mut out);
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

/// Expand the token following a `$`; returns how many bytes it used.
fn expand_token(after: &str, caps: &Captures<'_>, haystack: &str, out: &mut String) -> usize {
    let bytes = after.as_bytes();
    let whole = caps.get(0);
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    match bytes.first() {
        Some(b'$') => {
            out.push('$');
            1
        }
        Some(b'&') => {
            out.push_str(whole.map_or("", |m| m.as_str()));
            1
        }
        Some(b'`') => {
            out.push_str(whole.map_or("", |m| &haystack[..m.start()]));
            1
        }
        Some(b'\'') => {
            out.push_str(whole.map_or("", |m| &haystack[m.end()..]));
            1
        }
        Some(d) if d.is_ascii_digit() => {
            let groups = 1..caps.len();
            let one = usize::from(*d - b'0');
            let two = bytes
                .get(1)
                .filter(|b| b.is_ascii_digit())
                .map(|b| one * 10 + usize::from(*b - b'0'));

            if let Some(n) = two.filter(|n| groups.contains(n)) {
                out.push_str(group(n));
                2
            } else if groups.contains(&one) {
                out.push_str(group(one));
                1
            } else {
                out.push('$');
                0
            }
        }
        Some(b'<') => {
            if let Some(end) = after.find('>') {
                out.push_str(caps.name(&after[1..end]).map_or("", |m| m.as_str()));
                end + 1
            } else {
                out.push('$');
                0
            }
        }
        _ => {
            out.push('$');
            0
        }
    }
}
