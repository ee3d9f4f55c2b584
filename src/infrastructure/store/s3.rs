//! S3 object store adapter (feature `s3`)
//!
//! Namespaces are written `bucket` or `bucket/prefix`. Credentials come from
//! the standard `AWS_*` environment variables.
//!
//! The fingerprint is stored as user metadata (`x-amz-meta-fingerprint`) in
//! the same PUT as the content, so an object and its fingerprint are never
//! observed out of step. Listing does not return user metadata, so every
//! listed object is followed by a HEAD request.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore as _, PutOptions,
    PutPayload,
};
use parking_lot::Mutex;

use crate::domain::entities::{ObjectMetadata, RemoteObject};
use crate::domain::ports::{ListPage, ObjectStore, StoreError, StoreFuture};
use crate::domain::value_objects::{Fingerprint, ObjectKey};

use super::memory::DEFAULT_PAGE_SIZE;

/// User metadata field carrying the fingerprint
const FINGERPRINT_ATTRIBUTE: &str = "fingerprint";

/// Concurrent HEAD requests issued while listing one page
const HEAD_CONCURRENCY: usize = 16;

/// Connection settings shared by every bucket
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services
    pub endpoint: Option<String>,
    pub allow_http: bool,
}

/// `bucket[/prefix]` split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
struct Namespace {
    bucket: String,
    prefix: Option<String>,
}

impl Namespace {
    fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        let (bucket, prefix) = match trimmed.split_once('/') {
            Some((bucket, prefix)) => (bucket, Some(prefix.trim_matches('/').to_string())),
            None => (trimmed, None),
        };
        if bucket.is_empty() {
            return Err(StoreError::NamespaceNotFound(format!(
                "'{}' does not name a bucket",
                raw
            )));
        }
        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()),
        })
    }

    fn location(&self, key: &str) -> StorePath {
        match &self.prefix {
            Some(prefix) => StorePath::from(format!("{}/{}", prefix, key)),
            None => StorePath::from(key),
        }
    }

    fn prefix_path(&self) -> Option<StorePath> {
        self.prefix.as_deref().map(StorePath::from)
    }

    /// Key relative to the namespace prefix.
    fn key_of(&self, location: &StorePath) -> Result<ObjectKey, StoreError> {
        let full = location.as_ref();
        let relative = match &self.prefix {
            Some(prefix) => full
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(full),
            None => full,
        };
        ObjectKey::parse(relative).map_err(|_| StoreError::InvalidKey(full.to_string()))
    }
}

/// S3 and S3-compatible object storage
pub struct S3ObjectStore {
    settings: S3Settings,
    clients: Mutex<HashMap<String, Arc<AmazonS3>>>,
    page_size: usize,
}

impl S3ObjectStore {
    pub fn new(settings: S3Settings) -> Self {
        Self {
            settings,
            clients: Mutex::new(HashMap::new()),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    fn client(&self, bucket: &str) -> Result<Arc<AmazonS3>, StoreError> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(bucket) {
            return Ok(client.clone());
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_allow_http(self.settings.allow_http);
        if let Some(region) = &self.settings.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &self.settings.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        let client = Arc::new(builder.build().map_err(map_error)?);
        clients.insert(bucket.to_string(), client.clone());
        Ok(client)
    }

    async fn fetch_remote(
        client: &AmazonS3,
        ns: &Namespace,
        meta: ObjectMeta,
    ) -> Result<RemoteObject, StoreError> {
        let key = ns.key_of(&meta.location)?;
        let head = client
            .get_opts(
                &meta.location,
                GetOptions {
                    head: true,
                    ..Default::default()
                },
            )
            .await
            .map_err(map_error)?;

        Ok(RemoteObject::new(key, fingerprint_of(&head.attributes))
            .with_size(meta.size as u64)
            .with_last_modified(meta.last_modified))
    }
}

fn fingerprint_of(attributes: &Attributes) -> Fingerprint {
    attributes
        .get(&Attribute::Metadata(FINGERPRINT_ATTRIBUTE.into()))
        .map(|value| Fingerprint::parse(value.as_ref()))
        .unwrap_or_else(Fingerprint::empty)
}

fn map_error(err: object_store::Error) -> StoreError {
    use object_store::Error;

    match err {
        Error::NotFound { path, .. } => StoreError::NotFound(path),
        Error::PermissionDenied { path, source } | Error::Unauthenticated { path, source } => {
            StoreError::PermissionDenied(format!("{}: {}", path, source))
        }
        Error::Generic { store, source } => {
            StoreError::Transient(format!("{}: {}", store, source))
        }
        other => StoreError::Io(other.to_string()),
    }
}

impl ObjectStore for S3ObjectStore {
    fn describe(&self) -> String {
        match &self.settings.endpoint {
            Some(endpoint) => format!("s3:{}", endpoint),
            None => "s3".to_string(),
        }
    }

    fn list_page<'a>(
        &'a self,
        namespace: &'a str,
        token: Option<&'a str>,
    ) -> StoreFuture<'a, ListPage> {
        Box::pin(async move {
            let ns = Namespace::parse(namespace)?;
            let client = self.client(&ns.bucket)?;
            let prefix = ns.prefix_path();

            let listing = match token {
                Some(after) => client.list_with_offset(prefix.as_ref(), &ns.location(after)),
                None => client.list(prefix.as_ref()),
            };
            let metas: Vec<ObjectMeta> = listing
                .take(self.page_size)
                .try_collect()
                .await
                .map_err(map_error)?;

            let next_token = if metas.len() == self.page_size {
                match metas.last() {
                    Some(last) => Some(ns.key_of(&last.location)?.to_string()),
                    None => None,
                }
            } else {
                None
            };

            let objects = futures::stream::iter(metas)
                .map(|meta| Self::fetch_remote(&client, &ns, meta))
                .buffered(HEAD_CONCURRENCY)
                .try_collect()
                .await?;

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
        Box::pin(async move {
            let ns = Namespace::parse(namespace)?;
            let client = self.client(&ns.bucket)?;
            let location = ns.location(key.as_str());

            let head = match client
                .get_opts(
                    &location,
                    GetOptions {
                        head: true,
                        ..Default::default()
                    },
                )
                .await
            {
                Ok(head) => head,
                Err(object_store::Error::NotFound { .. }) => return Ok(None),
                Err(e) => return Err(map_error(e)),
            };

            Ok(Some(
                RemoteObject::new(key.clone(), fingerprint_of(&head.attributes))
                    .with_size(head.meta.size as u64)
                    .with_last_modified(head.meta.last_modified),
            ))
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
            let ns = Namespace::parse(namespace)?;
            let client = self.client(&ns.bucket)?;

            let mut attributes = Attributes::new();
            attributes.insert(
                Attribute::ContentType,
                AttributeValue::from(metadata.mime_type.as_str().to_string()),
            );
            attributes.insert(
                Attribute::Metadata(FINGERPRINT_ATTRIBUTE.into()),
                AttributeValue::from(metadata.fingerprint.as_str().to_string()),
            );

            client
                .put_opts(
                    &ns.location(key.as_str()),
                    PutPayload::from(content),
                    PutOptions {
                        attributes,
                        ..Default::default()
                    },
                )
                .await
                .map_err(map_error)?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a ObjectKey) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let ns = Namespace::parse(namespace)?;
            let client = self.client(&ns.bucket)?;
            client
                .delete(&ns.location(key.as_str()))
                .await
                .map_err(map_error)
        })
    }
}
