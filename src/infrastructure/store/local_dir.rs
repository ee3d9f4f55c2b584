//! Directory-backed object store
//!
//! Layout under the configured root:
//!
//! ```text
//! <root>/<namespace>/<key>                      object content
//! <root>/.edgepush-meta/<namespace>/<key>.json  fingerprint + content type
//! <root>/.edgepush-meta/.staging/               temp files awaiting rename
//! ```
//!
//! Metadata and staging live outside every namespace, so any relative key a
//! site can contain is a plain object and lists back as itself. The reserved
//! name only applies to namespaces.
//!
//! Publishing order keeps a stale fingerprint from ever describing new
//! content: the old sidecar is removed, content is renamed into place, then
//! the new sidecar is renamed into place. A crash in between leaves an
//! object without metadata, which reads as an empty fingerprint and is
//! re-uploaded on the next run.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;

use crate::domain::entities::{ObjectMetadata, RemoteObject};
use crate::domain::ports::{ListPage, ObjectStore, StoreError, StoreFuture};
use crate::domain::value_objects::{Fingerprint, ObjectKey};

use super::memory::DEFAULT_PAGE_SIZE;

/// Directory under the root holding metadata sidecars of every namespace
pub const META_DIR: &str = ".edgepush-meta";

/// Staging directory for temp files, inside [`META_DIR`]
const STAGING_DIR: &str = ".staging";

/// Prefix of temp files while they are written
const TMP_PREFIX: &str = ".edgepush-tmp-";

/// Where one namespace keeps its content, sidecars and temp files
#[derive(Debug, Clone)]
struct NamespacePaths {
    content: PathBuf,
    meta: PathBuf,
    staging: PathBuf,
}

impl NamespacePaths {
    fn content_path(&self, key: &ObjectKey) -> PathBuf {
        self.content.join(key.as_str())
    }

    fn sidecar_path(&self, key: &ObjectKey) -> PathBuf {
        self.meta.join(format!("{}.json", key.as_str()))
    }
}

/// Object store that keeps each namespace in a directory
#[derive(Debug, Clone)]
pub struct LocalDirObjectStore {
    root: Arc<PathBuf>,
    page_size: usize,
}

impl LocalDirObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a namespace; rejects names that would escape the root
    /// or land in the metadata directory.
    pub fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, StoreError> {
        let validated = Self::validate_namespace(namespace)?;
        Ok(self.root.join(validated.as_str()))
    }

    fn validate_namespace(namespace: &str) -> Result<ObjectKey, StoreError> {
        let validated = ObjectKey::parse(namespace)
            .map_err(|e| StoreError::NamespaceNotFound(format!("{}: {}", namespace, e)))?;
        if validated.as_str().split('/').next() == Some(META_DIR) {
            return Err(StoreError::NamespaceNotFound(format!(
                "{}: '{}' is reserved for object metadata",
                namespace, META_DIR
            )));
        }
        Ok(validated)
    }

    fn paths(&self, namespace: &str) -> Result<NamespacePaths, StoreError> {
        let validated = Self::validate_namespace(namespace)?;
        let meta_root = self.root.join(META_DIR);
        Ok(NamespacePaths {
            content: self.root.join(validated.as_str()),
            meta: meta_root.join(validated.as_str()),
            staging: meta_root.join(STAGING_DIR),
        })
    }

    fn run_blocking<T, F>(&self, op: F) -> StoreFuture<'static, T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        Box::pin(async move {
            tokio::task::spawn_blocking(op)
                .await
                .map_err(|e| StoreError::Io(e.to_string()))?
        })
    }
}

fn read_object(
    paths: &NamespacePaths,
    key: &ObjectKey,
) -> Result<Option<RemoteObject>, StoreError> {
    let content_path = paths.content_path(key);
    let meta = match fs::metadata(&content_path) {
        Ok(meta) if meta.is_file() => meta,
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::from_io(e, &content_path.display().to_string())),
    };

    let fingerprint = read_sidecar(&paths.sidecar_path(key))
        .map(|m| m.fingerprint)
        .unwrap_or_else(Fingerprint::empty);

    let mut object = RemoteObject::new(key.clone(), fingerprint).with_size(meta.len());
    if let Ok(modified) = meta.modified() {
        object = object.with_last_modified(DateTime::<Utc>::from(modified));
    }
    Ok(Some(object))
}

/// Sidecar metadata; absent or unreadable sidecars yield `None`.
fn read_sidecar(path: &Path) -> Option<ObjectMetadata> {
    let content = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt metadata sidecar");
            None
        }
    }
}

fn list_keys(dir: &Path) -> Result<Vec<ObjectKey>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut keys = Vec::new();
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| StoreError::Io(e.to_string()))?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        let key = ObjectKey::from_relative_path(rel)
            .map_err(|_| StoreError::InvalidKey(rel.display().to_string()))?;
        keys.push(key);
    }

    keys.sort();
    Ok(keys)
}

/// Write `content` to `target` through a temp file in `staging`.
///
/// `staging` must be on the same filesystem as `target` for the final
/// rename; both live under the store root.
fn publish(target: &Path, content: &[u8], staging: &Path) -> Result<(), StoreError> {
    let context = target.display().to_string();
    let parent = target
        .parent()
        .ok_or_else(|| StoreError::Io(format!("{} has no parent", context)))?;
    fs::create_dir_all(parent).map_err(|e| StoreError::from_io(e, &context))?;
    fs::create_dir_all(staging).map_err(|e| StoreError::from_io(e, &context))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TMP_PREFIX)
        .tempfile_in(staging)
        .map_err(|e| StoreError::from_io(e, &context))?;
    tmp.write_all(content)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| StoreError::from_io(e, &context))?;
    tmp.persist(target)
        .map_err(|e| StoreError::from_io(e.error, &context))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::from_io(e, &path.display().to_string())),
    }
}

/// Remove now-empty directories between `path` and `stop` (exclusive).
fn prune_empty_parents(path: &Path, stop: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

impl ObjectStore for LocalDirObjectStore {
    fn describe(&self) -> String {
        format!("local:{}", self.root.display())
    }

    fn list_page<'a>(
        &'a self,
        namespace: &'a str,
        token: Option<&'a str>,
    ) -> StoreFuture<'a, ListPage> {
        let paths = match self.paths(namespace) {
            Ok(paths) => paths,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let after = token.map(str::to_string);
        let page_size = self.page_size;

        self.run_blocking(move || {
            let keys = list_keys(&paths.content)?;
            let start = match &after {
                Some(after) => keys.partition_point(|k| k.as_str() <= after.as_str()),
                None => 0,
            };

            let mut objects = Vec::new();
            for key in keys.iter().skip(start).take(page_size) {
                if let Some(object) = read_object(&paths, key)? {
                    objects.push(object);
                }
            }
            let next_token = if start + page_size < keys.len() {
                keys.get(start + page_size - 1).map(|k| k.to_string())
            } else {
                None
            };

            Ok(ListPage {
                objects,
                next_token,
            })
        })
    }

    fn head<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
    ) -> StoreFuture<'a, Option<RemoteObject>> {
        let paths = match self.paths(namespace) {
            Ok(paths) => paths,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let key = key.clone();
        self.run_blocking(move || read_object(&paths, &key))
    }

    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
        content: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> StoreFuture<'a, ()> {
        let paths = match self.paths(namespace) {
            Ok(paths) => paths,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let key = key.clone();
        let metadata = metadata.clone();

        self.run_blocking(move || {
            let sidecar = paths.sidecar_path(&key);
            let sidecar_json =
                serde_json::to_vec_pretty(&metadata).map_err(|e| StoreError::Io(e.to_string()))?;

            remove_if_present(&sidecar)?;
            publish(&paths.content_path(&key), &content, &paths.staging)?;
            publish(&sidecar, &sidecar_json, &paths.staging)?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a ObjectKey) -> StoreFuture<'a, ()> {
        let paths = match self.paths(namespace) {
            Ok(paths) => paths,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let key = key.clone();

        self.run_blocking(move || {
            let content = paths.content_path(&key);
            let sidecar = paths.sidecar_path(&key);

            if !remove_if_present(&content)? {
                return Err(StoreError::NotFound(key.to_string()));
            }
            remove_if_present(&sidecar)?;
            prune_empty_parents(&content, &paths.content);
            prune_empty_parents(&sidecar, &paths.meta);
            Ok(())
        })
    }
}
