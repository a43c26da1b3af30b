//! Incremental rewriting of patched files.
//!
//! For every file a package's patch set rewrites, the orchestrator decides
//! whether the artifact next to it is stale and, if so, regenerates it by
//! folding the file's transforms over the original source.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use futures::future::join_all;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::Reporter;
use crate::hooks::{HookError, HookRegistry};
use crate::paths;
use crate::types::{PackageMap, Transform};

/// Why a single file could not be patched.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("Failed to read original: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write artifact: {0}")]
    Write(#[source] std::io::Error),

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// A file that failed, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub original: PathBuf,
    pub error: FileError,
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("{}", describe_failures(.0))]
    Failed(Vec<FileFailure>),
}

impl PatchError {
    pub fn failures(&self) -> &[FileFailure] {
        match self {
            Self::Failed(failures) => failures,
        }
    }
}

fn describe_failures(failures: &[FileFailure]) -> String {
    let mut out = format!("{} patched file(s) failed:", failures.len());
    for failure in failures {
        let _ = write!(out, "\n  {}: {}", failure.original.display(), failure.error);
    }
    out
}

/// Inputs that stay fixed across one patch pass.
#[derive(Debug, Clone)]
pub struct PatchOptions {
    /// Infix of artifact names (`es6` → `a.es6.js`).
    pub marker: String,
    /// Modification time of a local catalog file. Artifacts older than it
    /// are rebuilt.
    pub catalog_modified: Option<SystemTime>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            marker: paths::DEFAULT_MARKER.to_string(),
            catalog_modified: None,
        }
    }
}

/// Artifacts touched by one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub rebuilt: Vec<PathBuf>,
    pub up_to_date: Vec<PathBuf>,
}

impl PatchReport {
    pub fn total(&self) -> usize {
        self.rebuilt.len() + self.up_to_date.len()
    }
}

/// One unit of work: an original file, its artifact and transform list.
#[derive(Debug, Clone, Copy)]
pub struct PatchJob<'a> {
    pub original: &'a Path,
    pub artifact: &'a Path,
    pub transforms: &'a [Transform],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rebuilt,
    UpToDate,
}

/// Whether `artifact` must be regenerated from `original`.
///
/// Stale when the artifact is not strictly newer than the original, when a
/// known catalog time is not older than the artifact, or when either file
/// cannot be probed.
pub async fn needs_rebuild(
    original: &Path,
    artifact: &Path,
    catalog_modified: Option<SystemTime>,
) -> bool {
    let probe = async {
        let artifact_time = fs::metadata(artifact).await?.modified()?;
        let original_time = fs::metadata(original).await?.modified()?;
        Ok::<_, std::io::Error>((artifact_time, original_time))
    };

    match probe.await {
        Ok((artifact_time, original_time)) => {
            artifact_time <= original_time
                || catalog_modified.is_some_and(|catalog| catalog >= artifact_time)
        }
        Err(e) => {
            debug!(artifact = %artifact.display(), error = %e, "metadata probe failed, rebuilding");
            true
        }
    }
}

/// Rebuild one artifact if it is stale.
///
/// # Errors
///
/// Fails if the original cannot be read, a transform fails, or the artifact
/// cannot be written. An up-to-date artifact never reads the original.
pub async fn patch_file(
    hooks: &HookRegistry,
    job: PatchJob<'_>,
    catalog_modified: Option<SystemTime>,
) -> Result<Outcome, FileError> {
    if !needs_rebuild(job.original, job.artifact, catalog_modified).await {
        return Ok(Outcome::UpToDate);
    }

    let bytes = fs::read(job.original).await.map_err(FileError::Read)?;
    let source = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                path = %job.original.display(),
                "original is not valid UTF-8, decoding lossily"
            );
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    let output = hooks.apply_all(job.transforms, source)?;
    fs::write(job.artifact, output)
        .await
        .map_err(FileError::Write)?;

    Ok(Outcome::Rebuilt)
}

/// Locations of every patched file in `packages`, as (original, artifact,
/// transforms) under `root/directory/<name>/`.
pub fn collect_jobs<'a>(
    packages: &'a PackageMap,
    root: &Path,
    directory: &str,
    marker: &str,
) -> Vec<(PathBuf, PathBuf, &'a [Transform])> {
    packages
        .iter()
        .flat_map(|(name, record)| {
            record.patched_files().map(move |(file, transforms)| {
                let relative = paths::join(&paths::join(directory, name), file);
                let original = root.join(&relative);
                let artifact = root.join(paths::patched_name(&relative, marker));
                (original, artifact, transforms)
            })
        })
        .collect()
}

/// Patch every stale file of every package concurrently.
///
/// All files are attempted; the pass fails afterwards if any of them did.
///
/// # Errors
///
/// Returns [`PatchError::Failed`] listing each file that could not be
/// patched. Files that succeeded are still written.
pub async fn patch_packages<R: Reporter + ?Sized>(
    packages: &PackageMap,
    root: &Path,
    directory: &str,
    hooks: &HookRegistry,
    options: &PatchOptions,
    reporter: &R,
) -> Result<PatchReport, PatchError> {
    let jobs = collect_jobs(packages, root, directory, &options.marker);
    info!(files = jobs.len(), "patching");

    let results = join_all(jobs.iter().map(|(original, artifact, transforms)| async move {
        let job = PatchJob {
            original,
            artifact,
            transforms,
        };
        let result = patch_file(hooks, job, options.catalog_modified).await;
        (original, artifact, result)
    }))
    .await;

    let mut report = PatchReport::default();
    let mut failures = Vec::new();

    for (original, artifact, result) in results {
        match result {
            Ok(Outcome::Rebuilt) => {
                reporter.patched(artifact);
                report.rebuilt.push(artifact.clone());
            }
            Ok(Outcome::UpToDate) => {
                debug!(artifact = %artifact.display(), "up to date");
                reporter.up_to_date(artifact);
                report.up_to_date.push(artifact.clone());
            }
            Err(error) => {
                reporter.failed(original, &error.to_string());
                failures.push(FileFailure {
                    original: original.clone(),
                    error,
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(report)
    } else {
        Err(PatchError::Failed(failures))
    }
}

/// Patched artifacts under `dir`: files named like the patched version of a
/// sibling file that still exists.
pub fn find_artifacts(dir: &Path, marker: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let Some(name) = entry.file_name().to_str() else {
                return false;
            };
            original_name(name, marker).is_some_and(|original| {
                entry
                    .path()
                    .parent()
                    .is_some_and(|parent| parent.join(original).is_file())
            })
        })
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Inverse of [`paths::patched_name`] for a bare file name.
fn original_name(file_name: &str, marker: &str) -> Option<String> {
    let infix = format!(".{marker}");
    let candidate = match file_name.strip_suffix(&infix) {
        Some(stem) => stem.to_string(),
        None => {
            let dot = file_name.rfind('.')?;
            let (head, ext) = file_name.split_at(dot);
            format!("{}{ext}", head.strip_suffix(&infix)?)
        }
    };
    (!candidate.is_empty() && paths::patched_name(&candidate, marker) == file_name)
        .then_some(candidate)
}
