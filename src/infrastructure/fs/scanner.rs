//! Content Fingerprinter
//!
//! Walks the source root, applies exclude patterns and hashes every regular
//! file. Symlinks are followed; a link that points back into one of its own
//! ancestors aborts the scan instead of looping.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use ignore::WalkBuilder;

use crate::domain::entities::LocalAsset;
use crate::domain::ports::{AssetSource, ScanError, ScanFuture, ScanRequest};
use crate::domain::value_objects::{ExcludePatterns, Fingerprint, ObjectKey};

/// Asset source backed by the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAssetSource;

impl LocalAssetSource {
    pub fn new() -> Self {
        Self
    }
}

impl AssetSource for LocalAssetSource {
    fn scan<'a>(&'a self, request: &'a ScanRequest) -> ScanFuture<'a, Vec<LocalAsset>> {
        Box::pin(async move {
            let root = request.root.clone();
            let exclude = request.exclude.clone();
            let files = tokio::task::spawn_blocking(move || walk(&root, &exclude))
                .await
                .map_err(|e| ScanError::Walk(e.to_string()))??;

            tracing::debug!(files = files.len(), root = %request.root.display(), "walk finished");

            let mut assets: Vec<LocalAsset> = futures::stream::iter(files)
                .map(|(key, path)| async move {
                    tokio::task::spawn_blocking(move || fingerprint_file(key, path))
                        .await
                        .map_err(|e| ScanError::Walk(e.to_string()))?
                })
                .buffer_unordered(request.concurrency.max(1))
                .try_collect()
                .await?;

            assets.sort_by(|a, b| a.key().cmp(b.key()));
            Ok(assets)
        })
    }

    fn read<'a>(&'a self, asset: &'a LocalAsset) -> ScanFuture<'a, Bytes> {
        Box::pin(async move {
            tokio::fs::read(asset.path())
                .await
                .map(Bytes::from)
                .map_err(|source| ScanError::Unreadable {
                    path: asset.path().to_path_buf(),
                    source,
                })
        })
    }
}

/// Collect `(key, absolute path)` for every regular file under `root`.
fn walk(root: &Path, exclude: &[String]) -> Result<Vec<(ObjectKey, PathBuf)>, ScanError> {
    if !root.exists() {
        return Err(ScanError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let patterns = Arc::new(ExcludePatterns::for_source(root, exclude)?);
    let filter_root = root.to_path_buf();
    let filter_patterns = Arc::clone(&patterns);

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(true)
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Ok(rel) = entry.path().strip_prefix(&filter_root) else {
                return true;
            };
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !filter_patterns.is_excluded(rel, is_dir)
        })
        .build();

    let mut files = Vec::new();
    for result in walker {
        let entry = result.map_err(|e| classify(e, None))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ScanError::Walk(e.to_string()))?;
        files.push((ObjectKey::from_relative_path(rel)?, entry.path().to_path_buf()));
    }

    tracing::debug!(
        patterns = patterns.pattern_count(),
        files = files.len(),
        "source walked"
    );
    Ok(files)
}

fn fingerprint_file(key: ObjectKey, path: PathBuf) -> Result<LocalAsset, ScanError> {
    let unreadable = |source| ScanError::Unreadable {
        path: path.clone(),
        source,
    };
    let file = File::open(&path).map_err(unreadable)?;
    let (fingerprint, size) = Fingerprint::from_reader(file).map_err(unreadable)?;
    Ok(LocalAsset::new(key, path, size, fingerprint))
}

/// Unwrap walker errors down to the cause.
fn classify(err: ignore::Error, path: Option<PathBuf>) -> ScanError {
    match err {
        ignore::Error::Loop { ancestor, child } => ScanError::SymlinkCycle {
            path: child,
            ancestor,
        },
        ignore::Error::WithPath { path, err } => classify(*err, Some(path)),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            classify(*err, path)
        }
        ignore::Error::Io(source) => ScanError::Unreadable {
            path: path.unwrap_or_default(),
            source,
        },
        ignore::Error::Partial(mut errs) if errs.len() == 1 => {
            classify(errs.remove(0), path)
        }
        other => ScanError::Walk(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    async fn scan(root: &Path, exclude: &[&str]) -> Result<Vec<LocalAsset>, ScanError> {
        let request = ScanRequest::new(root)
            .with_exclude(exclude.iter().map(|s| s.to_string()).collect())
            .with_concurrency(4);
        LocalAssetSource::new().scan(&request).await
    }

    fn keys(assets: &[LocalAsset]) -> Vec<&str> {
        assets.iter().map(|a| a.key().as_str()).collect()
    }

    #[tokio::test]
    async fn scan_is_sorted_by_key() {
        let dir = tempdir().unwrap();
        write(dir.path(), "b.txt", "b");
        write(dir.path(), "a/z.txt", "z");
        write(dir.path(), "a.txt", "a");
        write(dir.path(), "B.txt", "B");

        let assets = scan(dir.path(), &[]).await.unwrap();
        assert_eq!(keys(&assets), vec!["B.txt", "a.txt", "a/z.txt", "b.txt"]);
    }

    #[tokio::test]
    async fn fingerprints_size_and_mime_are_recorded() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", "<h1>hi</h1>");

        let assets = scan(dir.path(), &[]).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].size(), 11);
        assert_eq!(
            assets[0].fingerprint(),
            &Fingerprint::from_bytes(b"<h1>hi</h1>")
        );
        assert_eq!(assets[0].mime_type().essence(), "text/html");
    }

    #[tokio::test]
    async fn excluded_paths_are_skipped() {
        let dir = tempdir().unwrap();
        write(dir.path(), "index.html", "x");
        write(dir.path(), "README.md", "docs");
        write(dir.path(), "node_modules/pkg/index.js", "js");
        write(dir.path(), ".edgepush/state.json", "{}");

        let assets = scan(dir.path(), &["node_modules/**", "*.md"]).await.unwrap();
        assert_eq!(keys(&assets), vec!["index.html"]);
    }

    #[tokio::test]
    async fn hidden_files_are_included() {
        let dir = tempdir().unwrap();
        write(dir.path(), ".well-known/security.txt", "contact");

        let assets = scan(dir.path(), &[]).await.unwrap();
        assert_eq!(keys(&assets), vec![".well-known/security.txt"]);
    }

    #[tokio::test]
    async fn same_content_different_paths() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/logo.svg", "<svg/>");
        write(dir.path(), "b/logo.svg", "<svg/>");

        let assets = scan(dir.path(), &[]).await.unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].fingerprint(), assets[1].fingerprint());
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let err = scan(&dir.path().join("nope"), &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn file_root_is_an_error() {
        let dir = tempdir().unwrap();
        write(dir.path(), "file.txt", "x");
        let err = scan(&dir.path().join("file.txt"), &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_cycle_is_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), "docs/page.html", "x");
        std::os::unix::fs::symlink(dir.path().join("docs"), dir.path().join("docs/loop")).unwrap();

        let err = scan(dir.path(), &[]).await.unwrap_err();
        assert!(matches!(err, ScanError::SymlinkCycle { .. }), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinked_files_are_followed() {
        let dir = tempdir().unwrap();
        let outside = tempdir().unwrap();
        write(outside.path(), "shared.css", "body{}");
        std::os::unix::fs::symlink(outside.path().join("shared.css"), dir.path().join("site.css"))
            .unwrap();

        let assets = scan(dir.path(), &[]).await.unwrap();
        assert_eq!(keys(&assets), vec!["site.css"]);
        assert_eq!(assets[0].size(), 6);
    }

    #[tokio::test]
    async fn read_returns_content() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.txt", "hello");
        let assets = scan(dir.path(), &[]).await.unwrap();

        let content = LocalAssetSource::new().read(&assets[0]).await.unwrap();
        assert_eq!(&content[..], b"hello");
    }
}
