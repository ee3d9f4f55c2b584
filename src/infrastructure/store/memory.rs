//! In-memory object store
//!
//! Keeps every namespace in a map. Listing is paginated with a configurable
//! page size so pagination paths get exercised in tests.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::entities::{ObjectMetadata, RemoteObject};
use crate::domain::ports::{ListPage, ObjectStore, StoreError, StoreFuture};
use crate::domain::value_objects::{Fingerprint, ObjectKey};

/// Default page size, matching common cloud listing limits
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    content: Bytes,
    metadata: Option<ObjectMetadata>,
    last_modified: DateTime<Utc>,
}

impl StoredObject {
    fn to_remote(&self, key: &ObjectKey) -> RemoteObject {
        let fingerprint = self
            .metadata
            .as_ref()
            .map(|m| m.fingerprint.clone())
            .unwrap_or_else(Fingerprint::empty);
        RemoteObject::new(key.clone(), fingerprint)
            .with_last_modified(self.last_modified)
            .with_size(self.content.len() as u64)
    }
}

type Namespace = BTreeMap<ObjectKey, StoredObject>;

/// In-memory object store for unit tests
#[derive(Debug)]
pub struct MemoryObjectStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
    page_size: usize,
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Store an object without fingerprint metadata, as a foreign writer would.
    pub fn insert_foreign(&self, namespace: &str, key: &ObjectKey, content: impl Into<Bytes>) {
        self.namespaces
            .write()
            .entry(namespace.to_string())
            .or_default()
            .insert(
                key.clone(),
                StoredObject {
                    content: content.into(),
                    metadata: None,
                    last_modified: Utc::now(),
                },
            );
    }

    /// Stored content of an object.
    pub fn content(&self, namespace: &str, key: &str) -> Option<Bytes> {
        let key = ObjectKey::parse(key).ok()?;
        self.namespaces
            .read()
            .get(namespace)?
            .get(&key)
            .map(|o| o.content.clone())
    }

    /// Stored metadata of an object.
    pub fn metadata(&self, namespace: &str, key: &str) -> Option<ObjectMetadata> {
        let key = ObjectKey::parse(key).ok()?;
        self.namespaces
            .read()
            .get(namespace)?
            .get(&key)
            .and_then(|o| o.metadata.clone())
    }

    /// Keys in a namespace, ordered.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .read()
            .get(namespace)
            .map(|ns| ns.keys().map(|k| k.to_string()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, |ns| ns.len())
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }
}

impl ObjectStore for MemoryObjectStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn list_page<'a>(
        &'a self,
        namespace: &'a str,
        token: Option<&'a str>,
    ) -> StoreFuture<'a, ListPage> {
        Box::pin(async move {
            let namespaces = self.namespaces.read();
            let Some(objects) = namespaces.get(namespace) else {
                return Ok(ListPage::default());
            };

            let start = match token {
                Some(token) => {
                    let after = ObjectKey::parse(token)
                        .map_err(|_| StoreError::InvalidKey(token.to_string()))?;
                    objects
                        .range((Bound::Excluded(after), Bound::Unbounded))
                        .collect::<Vec<_>>()
                }
                None => objects.iter().collect(),
            };

            let page: Vec<RemoteObject> = start
                .iter()
                .take(self.page_size)
                .map(|(key, object)| object.to_remote(key))
                .collect();
            let next_token = if start.len() > self.page_size {
                page.last().map(|o| o.key.to_string())
            } else {
                None
            };

            Ok(ListPage {
                objects: page,
                next_token,
            })
        })
    }

    fn head<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
    ) -> StoreFuture<'a, Option<RemoteObject>> {
        Box::pin(async move {
            Ok(self
                .namespaces
                .read()
                .get(namespace)
                .and_then(|ns| ns.get(key))
                .map(|object| object.to_remote(key)))
        })
    }

    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
        content: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.namespaces
                .write()
                .entry(namespace.to_string())
                .or_default()
                .insert(
                    key.clone(),
                    StoredObject {
                        content,
                        metadata: Some(metadata.clone()),
                        last_modified: Utc::now(),
                    },
                );
            Ok(())
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a ObjectKey) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.namespaces
                .write()
                .get_mut(namespace)
                .and_then(|ns| ns.remove(key))
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(key.to_string()))
        })
    }
}
