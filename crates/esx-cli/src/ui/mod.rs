//! Console output.
//!
//! [`Output`] is the terminal-facing [`Reporter`]. Progress events go to
//! stderr so that stdout carries only command results (file lists, JSON).

use crossterm::style::Stylize;
use std::path::{Path, PathBuf};

use esx_core::Reporter;
use esx_schema::{PackageName, Version};

#[derive(Debug, Clone)]
pub struct Output {
    root: PathBuf,
    verbose: bool,
}

impl Output {
    pub fn new(root: PathBuf, verbose: bool) -> Self {
        Self { root, verbose }
    }

    /// `path` relative to the project root when it lies inside it.
    pub fn display<'a>(&self, path: &'a Path) -> std::path::Display<'a> {
        path.strip_prefix(&self.root).unwrap_or(path).display()
    }

    pub fn success(&self, msg: &str) {
        println!("{} {msg}", "✓".green());
    }

    pub fn info(&self, msg: &str) {
        println!("  {msg}");
    }
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        eprintln!("{}", title.bold());
    }

    fn installed(&self, name: &PackageName, version: &Version) {
        eprintln!("  {} {name} {}", "+".green(), version.as_str().dim());
    }

    fn patched(&self, artifact: &Path) {
        eprintln!("  {} {}", "patched".green(), self.display(artifact));
    }

    fn up_to_date(&self, artifact: &Path) {
        if self.verbose {
            eprintln!("  {} {}", "fresh".dim(), self.display(artifact));
        }
    }

    fn failed(&self, original: &Path, reason: &str) {
        eprintln!("  {} {}: {reason}", "failed".red(), self.display(original));
    }

    fn warning(&self, msg: &str) {
        eprintln!("{} {msg}", "warning:".yellow());
    }
}
