use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use esx_core::manifest::ResolverConfig;
use esx_core::types::{Dependencies, DependencyDescription, PackageName, Version};
use esx_core::{PackageResolver, Reporter, ResolveOptions, Session, SessionError, SessionOptions};

const WIDGET_CATALOG: &str =
    r#"{"widget": {"1.0.0": {"index.js": [{"type": "append", "parameters": "// patched"}]}}}"#;

/// Serves a fixed installed tree and a fixed update result.
#[derive(Default)]
struct StubResolver {
    installed: Dependencies,
    updated: Dependencies,
    updates: AtomicUsize,
}

#[async_trait]
impl PackageResolver for StubResolver {
    async fn list(
        &self,
        _options: &ResolveOptions,
        _config: &ResolverConfig,
    ) -> Result<DependencyDescription> {
        Ok(DependencyDescription {
            dependencies: self.installed.clone(),
            ..DependencyDescription::default()
        })
    }

    async fn update(
        &self,
        _packages: &[PackageName],
        _options: &ResolveOptions,
        _config: &ResolverConfig,
    ) -> Result<Dependencies> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(self.updated.clone())
    }
}

#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, _: &str) {}
    fn installed(&self, name: &PackageName, version: &Version) {
        self.push(format!("installed {name}@{version}"));
    }
    fn patched(&self, artifact: &Path) {
        self.push(format!("patched {}", artifact.display()));
    }
    fn up_to_date(&self, artifact: &Path) {
        self.push(format!("up-to-date {}", artifact.display()));
    }
    fn failed(&self, original: &Path, _: &str) {
        self.push(format!("failed {}", original.display()));
    }
    fn warning(&self, _: &str) {}
}

struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    fn new(manifest: &str, catalog: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bower.json"), manifest).unwrap();
        std::fs::write(dir.path().join("patch.json"), catalog).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, text: &str) -> PathBuf {
        let path = self.root().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    fn options(&self) -> SessionOptions {
        SessionOptions {
            patches: "patch.json".to_string(),
            ..SessionOptions::new(self.root())
        }
    }
}

fn widget_installed() -> Dependencies {
    let mut deps = Dependencies::new();
    deps.insert(
        "widget".into(),
        DependencyDescription::installed("1.0.0", &["index.js"]),
    );
    deps
}

#[tokio::test]
async fn test_end_to_end_patch() {
    let project = Project::new(r#"{"dependencies": {"widget": "~1.0"}}"#, WIDGET_CATALOG);
    project.write("bower_components/widget/index.js", "var x=1;");

    let resolver = StubResolver {
        installed: widget_installed(),
        ..StubResolver::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let mut session = Session::new(project.options(), resolver, reporter.clone());

    let report = session.run().await.unwrap();

    let artifact = project.root().join("bower_components/widget/index.es6.js");
    assert_eq!(report.rebuilt, vec![artifact.clone()]);
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "var x=1;\n// patched");
    assert_eq!(session.resolver().updates.load(Ordering::SeqCst), 0);
    assert_eq!(reporter.events(), vec![format!("patched {}", artifact.display())]);
}

#[tokio::test]
async fn test_missing_dependency_triggers_update_once() {
    let project = Project::new(
        r#"{"dependencies": {"widget": "~1.0", "ghost": "*"}}"#,
        WIDGET_CATALOG,
    );
    project.write("bower_components/widget/index.js", "var x=1;");

    // The update never installs `ghost`, so it stays missing on every run.
    let resolver = StubResolver {
        installed: widget_installed(),
        ..StubResolver::default()
    };
    let mut session = Session::new(project.options(), resolver, esx_core::NullReporter);

    session.run().await.unwrap();
    session.run().await.unwrap();
    assert_eq!(session.resolver().updates.load(Ordering::SeqCst), 1);
    assert!(session.state().manifest_hash.is_some());

    // Editing the manifest invalidates the memo.
    std::fs::write(
        project.root().join("bower.json"),
        r#"{"dependencies": {"widget": "~1.0", "ghost": "~2"}}"#,
    )
    .unwrap();
    session.run().await.unwrap();
    assert_eq!(session.resolver().updates.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_emits_installed_and_flattens() {
    let project = Project::new(
        r#"{"dependencies": {"widget": "~1.0", "extra": "^2"}}"#,
        WIDGET_CATALOG,
    );
    project.write("bower_components/widget/index.js", "var x=1;");
    project.write("bower_components/extra/extra.js", "");

    let mut updated = Dependencies::new();
    updated.insert(
        "extra".into(),
        DependencyDescription::installed("2.0.0", &["extra.js"]),
    );
    let resolver = StubResolver {
        installed: widget_installed(),
        updated,
        ..StubResolver::default()
    };
    let reporter = Arc::new(RecordingReporter::default());
    let mut session = Session::new(project.options(), resolver, reporter.clone());

    session.resolve().await.unwrap();

    assert!(reporter.events().contains(&"installed extra@2.0.0".to_string()));
    assert!(session.state().packages.contains("extra"));
    assert_eq!(
        session.projection().filenames(),
        vec![
            "bower_components/widget/index.es6.js",
            "bower_components/extra/extra.js",
        ]
    );
}

#[tokio::test]
async fn test_unknown_transform_fails_after_other_files_are_written() {
    let catalog = r#"{"widget": {"1.0.0": {
        "a.js": [{"type": "minify"}],
        "b.js": [{"type": "prepend", "parameters": "// b"}]
    }}}"#;
    let project = Project::new(r#"{"dependencies": {"widget": "*"}}"#, catalog);
    project.write("bower_components/widget/a.js", "A");
    project.write("bower_components/widget/b.js", "B");

    let mut installed = Dependencies::new();
    installed.insert(
        "widget".into(),
        DependencyDescription::installed("1.0.0", &["a.js", "b.js"]),
    );
    let resolver = StubResolver {
        installed,
        ..StubResolver::default()
    };
    let mut session = Session::new(project.options(), resolver, esx_core::NullReporter);

    let err = session.run().await.unwrap_err();
    match &err {
        SessionError::Patch(patch) => assert_eq!(patch.failures().len(), 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("minify"));

    let widget = project.root().join("bower_components/widget");
    assert_eq!(std::fs::read_to_string(widget.join("b.es6.js")).unwrap(), "// b\nB");
    assert!(!widget.join("a.es6.js").exists());
}

#[tokio::test]
async fn test_missing_catalog_is_fatal() {
    let project = Project::new("{}", WIDGET_CATALOG);
    let options = SessionOptions {
        patches: "missing.json".to_string(),
        ..project.options()
    };
    let mut session = Session::new(options, StubResolver::default(), esx_core::NullReporter);

    let err = session.run().await.unwrap_err();
    assert!(matches!(err, SessionError::Catalog { .. }));
}

#[tokio::test]
async fn test_malformed_manifest_is_fatal() {
    let project = Project::new("{not json", WIDGET_CATALOG);
    let mut session = Session::new(project.options(), StubResolver::default(), esx_core::NullReporter);

    let err = session.run().await.unwrap_err();
    assert!(matches!(err, SessionError::Manifest(_)));
}

#[tokio::test]
async fn test_bowerrc_directory_and_module_configs() {
    let project = Project::new(r#"{"dependencies": {"widget": "~1.0"}}"#, WIDGET_CATALOG);
    project.write(".bowerrc", r#"{"directory": "vendor"}"#);
    project.write("vendor/widget/index.js", "var x=1;");

    let resolver = StubResolver {
        installed: widget_installed(),
        ..StubResolver::default()
    };
    let options = SessionOptions {
        vendor_prefix: "lib".to_string(),
        ..project.options()
    };
    let mut session = Session::new(options, resolver, esx_core::NullReporter);
    session.run().await.unwrap();

    assert!(project.root().join("vendor/widget/index.es6.js").exists());
    let configs = session.projection().module_configs();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].name, "lib/widget");
    assert_eq!(configs[0].main, "index.es6");
    assert_eq!(configs[0].location, "../vendor/widget");
}
