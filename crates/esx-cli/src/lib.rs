//! esx - patch legacy front-end packages into ES modules
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Reads the packages installed by bower, looks every installed version up
//! in a patch catalog and rewrites the listed files into ES modules next to
//! the originals (`index.js` → `index.es6.js`).
//!
//! # Layout
//!
//! ```text
//! project/
//! ├── bower.json          # dependency manifest
//! ├── .bowerrc            # resolver config (install directory, ...)
//! ├── esx.toml            # optional settings for this tool
//! └── bower_components/
//!     └── widget/
//!         ├── index.js
//!         └── index.es6.js  # patched artifact
//! ```

pub mod cmd;
pub mod config;
pub mod context;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "esx")]
#[command(author, version, about = "esx - patch legacy front-end packages into ES modules")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Project root containing bower.json
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings file (defaults to <root>/esx.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Patch catalog path or URL
    #[arg(long, global = true, env = "ESX_PATCHES")]
    pub patches: Option<String>,

    /// Directory module locations are relative to
    #[arg(long, global = true)]
    pub base_dir: Option<String>,

    /// Prefix for generated module names
    #[arg(long, global = true)]
    pub vendor_prefix: Option<String>,

    /// Resolve packages from the local cache only
    #[arg(long, global = true)]
    pub offline: bool,

    /// Show debug logging and up-to-date artifacts
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install missing packages and rebuild stale patched files
    Patch,
    /// List resolved packages and their patched files
    List,
    /// Print module loader configs as JSON
    Modules,
    /// Print every resolved file, one per line
    Files,
    /// Print the JavaScript files of a package
    Js {
        /// Package name
        package: String,
        /// Files to select instead of the package's own list
        files: Vec<String>,
    },
    /// Delete patched artifacts from the install directory
    Clean {
        /// Only print what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
