//! Command modules - one file per CLI command

pub mod clean;
pub mod completions;
pub mod files;
pub mod js;
pub mod list;
pub mod modules;
pub mod patch;
