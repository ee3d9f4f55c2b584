//! Fault-injecting store wrapper
//!
//! Wraps another `ObjectStore` and fails selected calls, so retry and
//! partial-failure paths can be exercised without a misbehaving backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::domain::entities::{ObjectMetadata, RemoteObject};
use crate::domain::ports::{ListPage, ObjectStore, StoreError, StoreFuture};
use crate::domain::value_objects::ObjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Fail with a transient error this many more times
    Transient(u32),
    /// Always fail with a transient error
    AlwaysTransient,
    /// Always fail with permission denied
    Denied,
}

impl Fault {
    /// Consume one failure; returns the error to raise, if any.
    fn trip(&mut self, what: &str) -> Option<StoreError> {
        match self {
            Fault::Transient(0) => None,
            Fault::Transient(n) => {
                *n -= 1;
                Some(StoreError::Transient(format!("injected failure: {}", what)))
            }
            Fault::AlwaysTransient => {
                Some(StoreError::Transient(format!("injected failure: {}", what)))
            }
            Fault::Denied => Some(StoreError::PermissionDenied(format!(
                "injected denial: {}",
                what
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct FaultTable {
    listing: Option<Fault>,
    puts: HashMap<String, Fault>,
    deletes: HashMap<String, Fault>,
    put_attempts: HashMap<String, u32>,
}

/// Store wrapper that injects failures into selected calls
pub struct FlakyObjectStore {
    inner: Arc<dyn ObjectStore>,
    faults: Mutex<FaultTable>,
    put_delay: Option<Duration>,
}

impl FlakyObjectStore {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(FaultTable::default()),
            put_delay: None,
        }
    }

    /// Fail the next `times` listing calls with a transient error.
    pub fn fail_listing(self, times: u32) -> Self {
        self.faults.lock().listing = Some(Fault::Transient(times));
        self
    }

    /// Deny every listing call.
    pub fn deny_listing(self) -> Self {
        self.faults.lock().listing = Some(Fault::Denied);
        self
    }

    /// Fail the next `times` uploads of `key` with a transient error.
    pub fn fail_put(self, key: &str, times: u32) -> Self {
        self.faults
            .lock()
            .puts
            .insert(key.to_string(), Fault::Transient(times));
        self
    }

    /// Fail every upload of `key` with a transient error.
    pub fn fail_put_always(self, key: &str) -> Self {
        self.faults
            .lock()
            .puts
            .insert(key.to_string(), Fault::AlwaysTransient);
        self
    }

    /// Deny every upload of `key`.
    pub fn deny_put(self, key: &str) -> Self {
        self.faults
            .lock()
            .puts
            .insert(key.to_string(), Fault::Denied);
        self
    }

    /// Fail the next `times` deletes of `key` with a transient error.
    pub fn fail_delete(self, key: &str, times: u32) -> Self {
        self.faults
            .lock()
            .deletes
            .insert(key.to_string(), Fault::Transient(times));
        self
    }

    /// Sleep before every upload; lets tests cancel mid-sync.
    pub fn with_put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = Some(delay);
        self
    }

    /// Number of upload attempts seen for `key`, failed ones included.
    pub fn put_attempts(&self, key: &str) -> u32 {
        self.faults
            .lock()
            .put_attempts
            .get(key)
            .copied()
            .unwrap_or(0)
    }
}

impl ObjectStore for FlakyObjectStore {
    fn describe(&self) -> String {
        format!("flaky({})", self.inner.describe())
    }

    fn list_page<'a>(
        &'a self,
        namespace: &'a str,
        token: Option<&'a str>,
    ) -> StoreFuture<'a, ListPage> {
        let injected = self
            .faults
            .lock()
            .listing
            .as_mut()
            .and_then(|f| f.trip("list"));
        match injected {
            Some(err) => Box::pin(async move { Err(err) }),
            None => self.inner.list_page(namespace, token),
        }
    }

    fn head<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
    ) -> StoreFuture<'a, Option<RemoteObject>> {
        self.inner.head(namespace, key)
    }

    fn put<'a>(
        &'a self,
        namespace: &'a str,
        key: &'a ObjectKey,
        content: Bytes,
        metadata: &'a ObjectMetadata,
    ) -> StoreFuture<'a, ()> {
        let injected = {
            let mut faults = self.faults.lock();
            *faults
                .put_attempts
                .entry(key.as_str().to_string())
                .or_insert(0) += 1;
            faults
                .puts
                .get_mut(key.as_str())
                .and_then(|f| f.trip(key.as_str()))
        };
        let delay = self.put_delay;

        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match injected {
                Some(err) => Err(err),
                None => self.inner.put(namespace, key, content, metadata).await,
            }
        })
    }

    fn delete<'a>(&'a self, namespace: &'a str, key: &'a ObjectKey) -> StoreFuture<'a, ()> {
        let injected = self
            .faults
            .lock()
            .deletes
            .get_mut(key.as_str())
            .and_then(|f| f.trip(key.as_str()));
        match injected {
            Some(err) => Box::pin(async move { Err(err) }),
            None => self.inner.delete(namespace, key),
        }
    }
}
