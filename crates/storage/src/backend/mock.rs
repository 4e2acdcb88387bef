//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::object::{PutOptions, StoredObject, join_url};
use crate::path::validate as validate_key;
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

type FailurePredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. On top of
/// storage it can:
///
/// - reject uploads whose key matches a predicate ([`fail_when`](Self::fail_when)),
///   simulating an endpoint refusing the request,
/// - hold every upload open for a fixed delay ([`with_delay`](Self::with_delay)),
/// - record how many uploads were in flight at once ([`peak_in_flight`](Self::peak_in_flight)).
///
/// # Examples
///
/// ```
/// use brick_storage::backend::MockBackend;
/// use brick_storage::{PutOptions, StorageBackend};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::default();
/// backend.fail_when(|key| key.ends_with("-1.jpg"));
///
/// assert!(backend.put("p/gallery/1-0.jpg", b"ok", &PutOptions::default()).await.is_ok());
/// assert!(backend.put("p/gallery/1-1.jpg", b"no", &PutOptions::default()).await.is_err());
///
/// backend.succeed_all();
/// assert!(backend.put("p/gallery/1-1.jpg", b"ok", &PutOptions::default()).await.is_ok());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    base_url: String,
    storage: RwLock<HashMap<String, (PutOptions, Vec<u8>)>>,
    fail: Mutex<Option<FailurePredicate>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    attempts: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                // Test-only type; a bad fixture should fail loudly.
                panic!("MockBackend::with_objects: invalid key {key}");
            };
            map.insert(validated, (PutOptions::default(), data.into()));
        }
        Self {
            name: "mock".to_string(),
            base_url: "https://blob.test".to_string(),
            storage: RwLock::new(map),
            fail: Mutex::new(None),
            delay: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Change the URL prefix of returned objects.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Hold every upload open for `delay` before completing it.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject every upload whose (validated) key matches `predicate`.
    pub fn fail_when(&self, predicate: impl Fn(&str) -> bool + Send + Sync + 'static) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = Some(Box::new(predicate));
    }

    /// Stop rejecting uploads.
    pub fn succeed_all(&self) {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Highest number of uploads that were in flight simultaneously.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Total number of upload attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Options the object at `key` was stored with.
    pub async fn options(&self, key: &str) -> Option<PutOptions> {
        let key = validate_key(key).ok()?;
        self.storage.read().await.get(&key).map(|(options, _)| options.clone())
    }

    fn should_fail(&self, key: &str) -> bool {
        self.fail.lock().unwrap_or_else(|e| e.into_inner()).as_ref().is_some_and(|predicate| predicate(key))
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &str); 0] = [];
        Self::with_objects(objects)
    }
}

/// Decrements the in-flight counter however the upload future ends.
struct InFlight<'a>(&'a AtomicUsize);
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> Result<StoredObject> {
        let key = validate_key(key)?;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            // Always yield at least once so sibling uploads get polled while
            // this one is "on the wire".
            None => tokio::task::yield_now().await,
        }
        if self.should_fail(&key) {
            exn::bail!(ErrorKind::Rejected(500));
        }
        self.storage.write().await.insert(key.clone(), (options.clone(), data.to_vec()));
        Ok(StoredObject {
            url: join_url(&self.base_url, &key),
            size: data.len() as u64,
            key,
        })
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        let (_options, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        self.storage.write().await.remove(&key).map(|_| ()).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))
    }
}
