use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Computes the replacement for a stored value. `None` leaves it untouched.
pub type Edit<'a> = dyn FnMut(Option<Vec<u8>>) -> anyhow::Result<Option<Vec<u8>>> + 'a;

/// Raw byte-level key/value storage. Each call is atomic for its key; there
/// are no multi-key transactions.
pub trait Backend: Send + Sync {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// Read-modify-write of one key with no other writer in between. `edit`
    /// must not call back into the store.
    fn update(&self, key: &str, edit: &mut Edit<'_>) -> anyhow::Result<()>;
}

/// JSON document store shared by every handler.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Backend>,
}

impl Store {
    pub fn new(backend: impl Backend + 'static) -> Self {
        Store { backend: Arc::new(backend) }
    }

    pub fn memory() -> Self {
        Store::new(MemoryBackend::default())
    }

    #[cfg(target_arch = "wasm32")]
    pub fn spin_default() -> Self {
        Store::new(SpinBackend)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.backend.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.backend.set(key, &serde_json::to_vec(value)?)
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.backend.delete(key)
    }

    /// Reads a JSON id list, treating a missing key as empty.
    pub fn get_list(&self, key: &str) -> anyhow::Result<Vec<String>> {
        self.get_list_of(key)
    }

    pub fn get_list_of<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Vec<T>> {
        Ok(self.get_json(key)?.unwrap_or_default())
    }

    /// Atomically edits the document at `key`, starting from `T::default()`
    /// when it is missing. Nothing is written when `f` fails.
    pub fn update_json<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned + Default,
        E: From<anyhow::Error>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        let mut f = Some(f);
        let mut outcome = None;
        self.backend.update(key, &mut |current: Option<Vec<u8>>| -> anyhow::Result<Option<Vec<u8>>> {
            let Some(f) = f.take() else {
                return Ok(None);
            };
            let mut value: T = match current {
                Some(bytes) => serde_json::from_slice(&bytes)?,
                None => T::default(),
            };
            match f(&mut value) {
                Ok(r) => {
                    outcome = Some(Ok(r));
                    Ok(Some(serde_json::to_vec(&value)?))
                }
                Err(e) => {
                    outcome = Some(Err(e));
                    Ok(None)
                }
            }
        })?;
        outcome.unwrap_or_else(|| Err(anyhow::anyhow!("update of {} did not run", key).into()))
    }

    /// Atomically edits an existing document. `missing` is returned when the
    /// key is absent.
    pub fn update_existing<T, R, E, F>(&self, key: &str, missing: impl FnOnce() -> E, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<anyhow::Error>,
        F: FnOnce(&mut T) -> Result<R, E>,
    {
        self.update_json(key, |doc: &mut Option<T>| match doc.as_mut() {
            Some(doc) => f(doc),
            None => Err(missing()),
        })
    }

    /// Atomically edits an id list, treating a missing key as empty.
    pub fn update_list(&self, key: &str, f: impl FnOnce(&mut Vec<String>)) -> anyhow::Result<()> {
        self.update_list_of(key, f)
    }

    pub fn update_list_of<T>(&self, key: &str, f: impl FnOnce(&mut Vec<T>)) -> anyhow::Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        self.update_json(key, |items: &mut Vec<T>| {
            f(items);
            Ok(())
        })
    }

    /// Stores `owner` at `key` unless another owner already holds it.
    /// Returns whether `owner` holds the key afterwards.
    pub fn claim(&self, key: &str, owner: &str) -> anyhow::Result<bool> {
        self.update_json(key, |current: &mut Option<String>| {
            if let Some(existing) = current.as_deref() {
                return Ok(existing == owner);
            }
            *current = Some(owner.to_string());
            Ok(true)
        })
    }

    /// Deletes `key` if `owner` holds it.
    pub fn release(&self, key: &str, owner: &str) -> anyhow::Result<()> {
        if self.get_json::<String>(key)?.as_deref() == Some(owner) {
            self.delete(key)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl Backend for MemoryBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, edit: &mut Edit<'_>) -> anyhow::Result<()> {
        let mut entries = self.entries()?;
        if let Some(value) = edit(entries.get(key).cloned())? {
            entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

/// Spin's default key/value store, opened per call like the component host expects.
#[cfg(target_arch = "wasm32")]
pub struct SpinBackend;

#[cfg(target_arch = "wasm32")]
impl SpinBackend {
    fn open() -> anyhow::Result<spin_sdk::key_value::Store> {
        spin_sdk::key_value::Store::open_default()
            .map_err(|e| anyhow::anyhow!("failed to open key/value store: {}", e))
    }
}

#[cfg(target_arch = "wasm32")]
impl Backend for SpinBackend {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Self::open()?
            .get(key)
            .map_err(|e| anyhow::anyhow!("key/value get failed: {}", e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Self::open()?
            .set(key, value)
            .map_err(|e| anyhow::anyhow!("key/value set failed: {}", e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        Self::open()?
            .delete(key)
            .map_err(|e| anyhow::anyhow!("key/value delete failed: {}", e))
    }

    // Spin key/value has no compare-and-swap; each component instance serves
    // a single request, so the read and write are not interleaved in-process.
    fn update(&self, key: &str, edit: &mut Edit<'_>) -> anyhow::Result<()> {
        let store = Self::open()?;
        let current = store
            .get(key)
            .map_err(|e| anyhow::anyhow!("key/value get failed: {}", e))?;
        if let Some(value) = edit(current)? {
            store
                .set(key, &value)
                .map_err(|e| anyhow::anyhow!("key/value set failed: {}", e))?;
        }
        Ok(())
    }
}
