//! Patch catalog loading from a local file or an HTTP(S) URL.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::types::{CatalogError, PatchCatalog};

#[derive(Error, Debug)]
pub enum FetchError {
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Could not download patch catalog from {url}: HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to read patch catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Remote catalog {0} requires the `network` feature")]
    NetworkDisabled(String),
}

/// Where the catalog comes from. Anything starting with `http` is a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Local(PathBuf),
    Remote(String),
}

impl CatalogSource {
    /// Classify `location`, resolving local paths against `root`.
    pub fn parse(location: &str, root: &Path) -> Self {
        if location.starts_with("http") {
            Self::Remote(location.to_string())
        } else {
            Self::Local(root.join(location))
        }
    }
}

impl std::fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// A parsed catalog and, for local files, the file's modification time.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub catalog: PatchCatalog,
    pub modified: Option<SystemTime>,
}

/// Read and parse the catalog.
///
/// # Errors
///
/// Fails on I/O errors, a non-success HTTP status, or malformed JSON.
pub async fn load_catalog(source: &CatalogSource) -> Result<LoadedCatalog, FetchError> {
    let (text, modified) = match source {
        CatalogSource::Local(path) => {
            let io = |source| FetchError::Io {
                path: path.clone(),
                source,
            };
            let text = fs::read_to_string(path).await.map_err(io)?;
            let modified = fs::metadata(path)
                .await
                .and_then(|m| m.modified())
                .ok();
            (text, modified)
        }
        CatalogSource::Remote(url) => (fetch_remote(url).await?, None),
    };

    let catalog = PatchCatalog::from_json(&text)?;
    info!(source = %source, packages = catalog.len(), "loaded patch catalog");
    Ok(LoadedCatalog { catalog, modified })
}

#[cfg(feature = "network")]
async fn fetch_remote(url: &str) -> Result<String, FetchError> {
    let client = reqwest::Client::builder()
        .user_agent(crate::USER_AGENT)
        .build()?;
    fetch_text(&client, url).await
}

#[cfg(not(feature = "network"))]
async fn fetch_remote(url: &str) -> Result<String, FetchError> {
    Err(FetchError::NetworkDisabled(url.to_string()))
}

/// GET `url` and return the body. Any non-2xx status is an error.
///
/// # Errors
///
/// Fails on transport errors or a non-success status.
#[cfg(feature = "network")]
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    debug!(url, "fetching");
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{"widget": {"1.0.0": {"index.js": [{"type": "append", "parameters": "// patched"}]}}}"#;

    #[test]
    fn test_source_classification() {
        let root = Path::new("/project");
        assert_eq!(
            CatalogSource::parse("https://example.com/patch.json", root),
            CatalogSource::Remote("https://example.com/patch.json".into())
        );
        assert_eq!(
            CatalogSource::parse("patches/patch.json", root),
            CatalogSource::Local(PathBuf::from("/project/patches/patch.json"))
        );
    }

    #[tokio::test]
    async fn test_local_catalog_records_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");
        std::fs::write(&path, CATALOG).unwrap();

        let loaded = load_catalog(&CatalogSource::Local(path)).await.unwrap();
        assert!(loaded.catalog.patches_for("widget", "1.0.0").is_some());
        assert!(loaded.modified.is_some());
    }

    #[tokio::test]
    async fn test_missing_local_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_catalog(&CatalogSource::Local(dir.path().join("nope.json")))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }

    #[tokio::test]
    async fn test_malformed_local_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patch.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_catalog(&CatalogSource::Local(path)).await.unwrap_err();
        assert!(matches!(err, FetchError::Catalog(_)));
    }

    #[cfg(feature = "network")]
    #[tokio::test]
    async fn test_remote_catalog() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/patch.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(CATALOG)
            .create_async()
            .await;

        let source = CatalogSource::Remote(format!("{}/patch.json", server.url()));
        let loaded = load_catalog(&source).await.unwrap();
        assert_eq!(loaded.catalog.len(), 1);
        assert!(loaded.modified.is_none());
    }

    #[cfg(feature = "network")]
    #[tokio::test]
    async fn test_remote_error_status_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/patch.json")
            .with_status(404)
            .create_async()
            .await;

        let url = format!("{}/patch.json", server.url());
        let err = load_catalog(&CatalogSource::Remote(url.clone()))
            .await
            .unwrap_err();
        match err {
            FetchError::Status { url: failed, status } => {
                assert_eq!(status, 404);
                assert_eq!(failed, url);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
