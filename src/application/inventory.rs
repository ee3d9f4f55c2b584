//! Remote Inventory Reader
//!
//! Lists the destination namespace page by page so callers see one logical
//! sequence. Each page request is retried independently.

use std::sync::Arc;

use futures::{Stream, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::application::retry::RetryPolicy;
use crate::domain::entities::RemoteObject;
use crate::domain::ports::{ListPage, ObjectStore, StoreError};

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Reads the full inventory of a namespace
#[derive(Clone)]
pub struct InventoryReader {
    store: Arc<dyn ObjectStore>,
    retry: RetryPolicy,
}

impl InventoryReader {
    pub fn new(store: Arc<dyn ObjectStore>, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Stream of listing pages, following continuation tokens.
    pub fn pages<'a>(
        &'a self,
        namespace: &'a str,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<ListPage, StoreError>> + 'a {
        futures::stream::try_unfold(Cursor::Start, move |cursor| async move {
            let token = match cursor {
                Cursor::Done => return Ok(None),
                Cursor::Start => None,
                Cursor::Next(token) => Some(token),
            };

            let attempted = self
                .retry
                .run("list", namespace, cancel, || {
                    self.store.list_page(namespace, token.as_deref())
                })
                .await;
            let page = attempted.outcome?;

            tracing::debug!(
                namespace,
                objects = page.objects.len(),
                more = page.next_token.is_some(),
                "listed inventory page"
            );

            let next = match &page.next_token {
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(StoreError::Io(format!(
                        "store repeated continuation token '{}'",
                        next
                    )));
                }
                Some(next) => Cursor::Next(next.clone()),
                None => Cursor::Done,
            };
            Ok(Some((page, next)))
        })
    }

    /// Stream of objects across all pages.
    pub fn objects<'a>(
        &'a self,
        namespace: &'a str,
        cancel: &'a CancellationToken,
    ) -> impl Stream<Item = Result<RemoteObject, StoreError>> + 'a {
        self.pages(namespace, cancel)
            .map_ok(|page| futures::stream::iter(page.objects.into_iter().map(Ok)))
            .try_flatten()
    }

    /// Collect the whole inventory, ordered by key.
    pub async fn read_all(
        &self,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<RemoteObject>, StoreError> {
        let mut objects: Vec<RemoteObject> = self.objects(namespace, cancel).try_collect().await?;
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        objects.dedup_by(|a, b| a.key == b.key);

        let foreign = objects.iter().filter(|o| o.is_foreign()).count();
        if foreign > 0 {
            tracing::info!(
                namespace,
                foreign,
                "objects without fingerprint metadata will be re-uploaded"
            );
        }
        Ok(objects)
    }
}
