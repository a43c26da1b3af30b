//! Transform definitions as they appear in the patch catalog.
//!
//! Each transform is a JSON object `{"type": <kind>, "parameters": ...}`.
//! Kinds form a closed set; the older catalog spellings (`es6-modules`,
//! `jquery-plugin`, `export`, `munge-ast`) are accepted as aliases. A kind
//! outside the set still loads, as [`Transform::Unsupported`], so that only
//! the files using it fail when patches are applied.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One rewrite step applied to a source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Transform {
    /// Surround the source with ES module `import` and `export` statements.
    ModuleWrap(ModuleWrap),
    /// Insert text and a newline before the source.
    Prepend(String),
    /// Append a newline and text after the source.
    Append(String),
    /// Replace the first match of a regular expression.
    Replace(Replace),
    /// Wrap a jQuery plugin so it imports jQuery and exports a default.
    PluginWrap,
    /// Append a default export of a variable.
    ExportDefault(ExportDefault),
    /// Structural edits on the parsed statement tree.
    AstMutate(Vec<AstStep>),
    /// A kind this build does not know how to apply.
    Unsupported {
        /// The `type` string found in the catalog.
        kind: String,
    },
}

impl Transform {
    /// Build a transform from its kind string and raw parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when the parameters of a known kind do not have the
    /// expected shape. Unknown kinds are not an error here.
    pub fn from_parts(kind: &str, parameters: Value) -> Result<Self, serde_json::Error> {
        let transform = match kind {
            "module-wrap" | "es6-modules" => Self::ModuleWrap(serde_json::from_value(parameters)?),
            "prepend" => Self::Prepend(serde_json::from_value(parameters)?),
            "append" => Self::Append(serde_json::from_value(parameters)?),
            "replace" => Self::Replace(serde_json::from_value(parameters)?),
            "plugin-wrap" | "jquery-plugin" => Self::PluginWrap,
            "export-default" | "export" => {
                Self::ExportDefault(serde_json::from_value(parameters)?)
            }
            "ast-mutate" | "munge-ast" => Self::AstMutate(serde_json::from_value(parameters)?),
            other => Self::Unsupported {
                kind: other.to_string(),
            },
        };
        Ok(transform)
    }

    /// The canonical kind string.
    pub fn kind(&self) -> &str {
        match self {
            Self::ModuleWrap(_) => "module-wrap",
            Self::Prepend(_) => "prepend",
            Self::Append(_) => "append",
            Self::Replace(_) => "replace",
            Self::PluginWrap => "plugin-wrap",
            Self::ExportDefault(_) => "export-default",
            Self::AstMutate(_) => "ast-mutate",
            Self::Unsupported { kind } => kind,
        }
    }
}

#[derive(Deserialize)]
struct RawTransform {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    parameters: Value,
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawTransform::deserialize(deserializer)?;
        Transform::from_parts(&raw.kind, raw.parameters).map_err(|e| {
            serde::de::Error::custom(format!("invalid parameters for '{}': {e}", raw.kind))
        })
    }
}

/// Parameters of [`Transform::ModuleWrap`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleWrap {
    /// Modules imported ahead of the source.
    #[serde(default, rename = "import")]
    pub imports: Vec<ImportBinding>,
    /// Bindings exported after the source.
    #[serde(default, rename = "export")]
    pub exports: Vec<ExportBinding>,
}

/// `import <binding> from "<module>";`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportBinding {
    /// Local variable the module's default export binds to.
    #[serde(rename = "var")]
    pub binding: String,
    /// Module specifier.
    pub module: String,
}

/// `export <name> <binding>;`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportBinding {
    /// Export form, e.g. `default`.
    pub name: String,
    /// Exported variable.
    #[serde(rename = "var")]
    pub binding: String,
}

/// Parameters of [`Transform::Replace`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Replace {
    /// Regular expression to search for, in Rust `regex` syntax. Patterns
    /// written for JavaScript `RegExp` work unless they use lookaround or
    /// backreferences.
    pub regex: String,
    /// Replacement text, in JavaScript `String.prototype.replace` syntax.
    pub replace: String,
}

/// Parameters of [`Transform::ExportDefault`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExportDefault {
    /// Variable exported as the module default.
    #[serde(rename = "var")]
    pub binding: String,
}

/// Address of a node in a parsed program.
///
/// Indices alternate between a statement within a list and a nested block
/// within that statement. An even number of indices names a statement list
/// (the empty path is the program body); an odd number names one statement.
///
/// `[0, 0, 2]` is the third statement inside the first block of the
/// program's first statement, e.g. inside an IIFE wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    /// Whether this path names a single statement rather than a list.
    pub fn is_statement(&self) -> bool {
        self.0.len() % 2 == 1
    }

    /// The indices of this path.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(v: Vec<usize>) -> Self {
        Self(v)
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, idx) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{idx}")?;
        }
        write!(f, "]")
    }
}

/// One structural edit of [`Transform::AstMutate`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AstStep {
    /// Insert the first statement of `value` at the front of the list `key`.
    Unshift {
        /// Target statement list.
        #[serde(default)]
        key: NodePath,
        /// JavaScript snippet.
        value: String,
    },
    /// Append every statement of `value` to the program body.
    Push {
        /// JavaScript snippet.
        value: String,
    },
    /// Replace the statement at `left` with the first statement of `right`.
    Assign {
        /// Target statement.
        left: NodePath,
        /// JavaScript snippet.
        right: String,
        /// Nodes copied from the program into the snippet before assigning.
        #[serde(default, rename = "rightReplace")]
        right_replace: Vec<Substitution>,
    },
}

/// Copy the program node at `right` into the snippet slot at `left`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Substitution {
    /// Slot in the snippet's statement list.
    pub left: NodePath,
    /// Source node in the program being patched.
    pub right: NodePath,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Transform {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn test_legacy_kind_aliases() {
        let t = parse(json!({"type": "es6-modules", "parameters": {
            "import": [{"var": "$", "module": "jquery"}],
            "export": [{"name": "default", "var": "Plugin"}]
        }}));
        let Transform::ModuleWrap(wrap) = t else {
            panic!("expected module-wrap");
        };
        assert_eq!(wrap.imports[0].binding, "$");
        assert_eq!(wrap.exports[0].name, "default");

        assert_eq!(parse(json!({"type": "jquery-plugin"})), Transform::PluginWrap);
        assert_eq!(
            parse(json!({"type": "export", "parameters": {"var": "x"}})).kind(),
            "export-default"
        );
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let t = parse(json!({"type": "minify", "parameters": {}}));
        assert_eq!(
            t,
            Transform::Unsupported {
                kind: "minify".into()
            }
        );
    }

    #[test]
    fn test_malformed_parameters_are_rejected() {
        let res: Result<Transform, _> =
            serde_json::from_value(json!({"type": "replace", "parameters": "foo"}));
        let err = res.unwrap_err().to_string();
        assert!(err.contains("invalid parameters for 'replace'"), "{err}");
    }

    #[test]
    fn test_ast_steps() {
        let t = parse(json!({"type": "munge-ast", "parameters": [
            {"type": "unshift", "key": [0, 0], "value": "var a = 1;"},
            {"type": "push", "key": "ignored", "value": "export default a;"},
            {"type": "assign", "left": [1], "right": "x = function () {};",
             "rightReplace": [{"left": [0, 0], "right": [2, 0]}]}
        ]}));
        let Transform::AstMutate(steps) = t else {
            panic!("expected ast-mutate");
        };
        assert_eq!(steps.len(), 3);
        assert!(matches!(&steps[0], AstStep::Unshift { key, .. } if key.indices() == [0, 0]));
        assert!(matches!(&steps[1], AstStep::Push { .. }));
        let AstStep::Assign { left, right_replace, .. } = &steps[2] else {
            panic!("expected assign");
        };
        assert!(left.is_statement());
        assert!(!right_replace[0].left.is_statement());
    }

    #[test]
    fn test_node_path_display() {
        assert_eq!(NodePath::from(vec![0, 1, 2]).to_string(), "[0, 1, 2]");
        assert_eq!(NodePath::default().to_string(), "[]");
    }
}
