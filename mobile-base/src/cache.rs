use parking_lot::Mutex;

use crate::error::Result;

/// Local mirror of a value whose authoritative copy lives on the remote base.
///
/// Writers pick one of two updates explicitly:
/// - [`RemoteCache::assume`] stores a value optimistically after a successful
///   remote write, without reading it back.
/// - [`RemoteCache::refresh`] replaces the value with a fresh remote read.
///
/// A failed refresh empties the cache.
#[derive(Debug)]
pub struct RemoteCache<T> {
    value: Mutex<Option<T>>,
}

impl<T: Clone> RemoteCache<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }

    /// Returns the cached value, `None` if nothing was read yet or the last
    /// refresh failed.
    pub fn get(&self) -> Option<T> {
        self.value.lock().clone()
    }

    pub fn assume(&self, value: T) {
        *self.value.lock() = Some(value);
    }

    pub fn refresh<F>(&self, read: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        match read() {
            Ok(value) => {
                *self.value.lock() = Some(value.clone());
                Ok(value)
            }
            Err(e) => {
                self.invalidate();
                Err(e)
            }
        }
    }

    /// Returns the cached value, reading it first if the cache is empty.
    pub fn get_or_refresh<F>(&self, read: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        match self.get() {
            Some(value) => Ok(value),
            None => self.refresh(read),
        }
    }

    pub fn invalidate(&self) {
        *self.value.lock() = None;
    }
}

impl<T: Clone> Default for RemoteCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
