//! Storage types

use async_trait::async_trait;

use crate::error::StorageError;

/// Object storage the pipeline downloads source documents from
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full contents of an object
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Store an object, replacing any existing one
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;
}

/// In-memory object store for tests
#[cfg(test)]
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    pub fail_downloads: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryObjectStore {
    pub fn with_object(path: &str, data: Vec<u8>) -> Self {
        let store = Self::default();
        store.objects.lock().unwrap().insert(path.to_string(), data);
        store
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

#[cfg(test)]
#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        if self.fail_downloads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(StorageError::ConnectionFailed("simulated outage".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::ObjectNotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, data: Vec<u8>, _content_type: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().insert(path.to_string(), data);
        Ok(())
    }
}
