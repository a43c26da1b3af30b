//! Settings file (`esx.toml`) and its merge with command-line flags.
//!
//! ```toml
//! patches = "patches/patch.json"
//! base_dir = "app"
//! vendor_prefix = "vendor"
//! offline = false
//! marker = "es6"
//! bower = "node_modules/.bin/bower"
//! ```
//!
//! Flags (and `ESX_PATCHES`) win over the file; the file wins over defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use esx_core::SessionOptions;

use crate::GlobalArgs;

/// Settings file name looked up in the project root.
pub const CONFIG_FILE: &str = "esx.toml";

/// Default package manager executable.
pub const DEFAULT_BOWER: &str = "bower";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub patches: Option<String>,
    pub base_dir: Option<String>,
    pub vendor_prefix: Option<String>,
    pub offline: Option<bool>,
    pub marker: Option<String>,
    pub bower: Option<String>,
}

impl FileConfig {
    /// Parse a settings document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from `path`. A missing file is only an error when
    /// `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content)
                .with_context(|| format!("Failed to parse {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

/// Everything a command needs to open a session.
#[derive(Debug, Clone)]
pub struct Settings {
    pub session: SessionOptions,
    pub bower: String,
}

impl Settings {
    /// Read the settings file named by `args` (or the default one) and apply
    /// the flags on top.
    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let (path, required) = match &args.config {
            Some(path) => (path.clone(), true),
            None => (args.root.join(CONFIG_FILE), false),
        };
        let file = FileConfig::load(&path, required)?;
        Ok(Self::merge(args, file))
    }

    pub fn merge(args: &GlobalArgs, file: FileConfig) -> Self {
        let mut session = SessionOptions::new(root_of(args));
        if let Some(patches) = args.patches.clone().or(file.patches) {
            session.patches = patches;
        }
        if let Some(base_dir) = args.base_dir.clone().or(file.base_dir) {
            session.base_dir = base_dir;
        }
        if let Some(prefix) = args.vendor_prefix.clone().or(file.vendor_prefix) {
            session.vendor_prefix = prefix;
        }
        if let Some(marker) = file.marker {
            session.marker = marker;
        }
        session.offline = args.offline || file.offline.unwrap_or(false);

        Self {
            session,
            bower: file.bower.unwrap_or_else(|| DEFAULT_BOWER.to_string()),
        }
    }
}

fn root_of(args: &GlobalArgs) -> PathBuf {
    if args.root.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        args.root.clone()
    }
}
