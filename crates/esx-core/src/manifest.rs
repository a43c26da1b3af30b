//! Project-level inputs: the resolver config (`.bowerrc`) and the
//! dependency manifest (`bower.json`).
//!
//! Both are optional on disk. A missing or unreadable `.bowerrc` yields the
//! default config; a missing `bower.json` is treated as `{}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::paths::DEFAULT_DIRECTORY;
use crate::types::PackageName;

/// Resolver configuration file name.
pub const RESOLVER_CONFIG_FILE: &str = ".bowerrc";

/// Dependency manifest file name.
pub const MANIFEST_FILE: &str = "bower.json";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Malformed bower.json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Contents of `.bowerrc`. Only `directory` is interpreted; every other key
/// is kept and forwarded to the resolver untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResolverConfig {
    /// Install directory, relative to the project root.
    pub fn directory(&self) -> &str {
        self.directory
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DIRECTORY)
    }

    /// Load `.bowerrc` from `root`, falling back to the default config.
    pub async fn load(root: &Path) -> Self {
        let path = root.join(RESOLVER_CONFIG_FILE);
        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no resolver config");
                return Self::default();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "ignoring unparseable resolver config");
            Self::default()
        })
    }
}

#[derive(Debug, Deserialize)]
struct ManifestDependencies {
    #[serde(default)]
    dependencies: Map<String, Value>,
}

/// The raw text of `bower.json`, kept verbatim so its hash can detect edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    text: String,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::from_text("{}")
    }
}

impl Manifest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Load `bower.json` from `root`. Read errors yield an empty manifest.
    pub async fn load(root: &Path) -> Self {
        let path = root.join(MANIFEST_FILE);
        match fs::read_to_string(&path).await {
            Ok(text) => Self::from_text(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no manifest, using {{}}");
                Self::default()
            }
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Hex SHA-256 of the manifest text.
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }

    /// Names declared under `dependencies`, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::Parse`] if the text is not a JSON object.
    pub fn dependency_names(&self) -> Result<Vec<PackageName>, ManifestError> {
        let parsed: ManifestDependencies = serde_json::from_str(&self.text)?;
        Ok(parsed
            .dependencies
            .keys()
            .map(|k| PackageName::new(k))
            .collect())
    }
}
