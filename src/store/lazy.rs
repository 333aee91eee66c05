/*
 * Copyright 2019-2021 Wren Powell
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::any::type_name;
use std::fmt;

use tracing::{info, warn};

use crate::codec::Codec;

use super::entry::Value;
use super::key::Key;
use super::metadata::VERSION_FIELD;
use super::object_store::ObjectStore;

impl<K: Key, C: Codec> ObjectStore<K, C> {
    /// Return the version stamped on the value at `key`, defaulting to 0.
    fn stored_version(&mut self, key: &K) -> i64 {
        self.get_meta(key, VERSION_FIELD)
            .and_then(|value| value.as_int())
            .unwrap_or(0)
    }

    fn compute<V, F>(&mut self, key: K, version: u32, thunk: F) -> crate::Result<V>
    where
        V: Value,
        F: FnOnce() -> V,
    {
        let value = thunk();
        self.insert(key.clone(), value.clone())?;
        self.set_meta(key, VERSION_FIELD, version)?;
        Ok(value)
    }

    /// Return the value at `key`, computing and storing it with `thunk` if necessary.
    ///
    /// The stored value is returned if it exists and was stamped with `version`. Otherwise, or if
    /// the stored value can't be loaded, `thunk` is called and its result is stored, stamped with
    /// `version`, and returned.
    ///
    /// Stored values are never invalidated automatically. If the code in `thunk` changes in a way
    /// that changes its result, bump `version`.
    ///
    /// # Errors
    /// - `Error::Unsupported`: `version` is not 0 and metadata is disabled, so it can't be stored.
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Serialize`: The computed value could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn get_lazy<V, F>(&mut self, key: K, version: u32, thunk: F) -> crate::Result<V>
    where
        V: Value,
        F: FnOnce() -> V,
    {
        if version != 0 && !self.config().metadata {
            return Err(crate::Error::Unsupported);
        }

        if self.contains(&key) && self.stored_version(&key) == i64::from(version) {
            match self.get::<V>(&key) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    if self.config().logging {
                        warn!("Error loading {:?}; recomputing: {}", key, error);
                    }
                }
            }
        }

        if self.config().logging {
            info!("Computing {:?}", key);
        }
        self.compute(key, version, thunk)
    }

    /// Return the nested store at `key`, filling it with the pairs returned by `thunk` if it
    /// doesn't exist.
    ///
    /// # Errors
    /// - `Error::NotDirectory`: The key refers to a value rather than a nested store.
    /// - `Error::InvalidKey`: A key is reserved or can't be used in a store.
    /// - `Error::Serialize`: A computed value could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn get_lazy_dir<V, I, F>(&mut self, key: K, thunk: F) -> crate::Result<&mut Self>
    where
        V: Value,
        I: IntoIterator<Item = (K, V)>,
        F: FnOnce() -> I,
    {
        if self.contains(&key) {
            return self.get_store(&key);
        }

        if self.config().logging {
            info!("Computing {:?}", key);
        }
        let items = thunk();
        let store = self.subdirectory(key)?;
        for (item_key, item_value) in items {
            store.insert(item_key, item_value)?;
        }

        Ok(store)
    }
}

/// Return the name a function was declared with.
fn declared_name<F>() -> String {
    let mut name = type_name::<F>();
    while let Some(outer) = name.strip_suffix("::{{closure}}") {
        name = outer;
    }
    name.rsplit("::").next().unwrap_or(name).to_owned()
}

/// A computation bound to a key and version in an [`ObjectStore`].
///
/// Calling [`get`] returns the stored result if there is one with the right version and otherwise
/// calls the function and stores its result. See [`ObjectStore::get_lazy`] for details.
///
/// # Examples
/// ```no_run
/// use dirstore::store::{Lazy, ObjectStore};
///
/// fn answer() -> u64 {
///     // Something expensive.
///     42
/// }
///
/// let mut store: ObjectStore = ObjectStore::open("/tmp/cache").unwrap();
///
/// // The key is "answer", the name of the function.
/// let lazy_answer = Lazy::from_fn(answer);
/// assert_eq!(lazy_answer.get(&mut store).unwrap(), 42);
///
/// // If `answer` changes, bump the version to recompute it.
/// let lazy_answer = Lazy::from_fn(answer).version(1);
/// ```
///
/// [`ObjectStore`]: crate::store::ObjectStore
/// [`get`]: crate::store::Lazy::get
/// [`ObjectStore::get_lazy`]: crate::store::ObjectStore::get_lazy
#[derive(Clone)]
pub struct Lazy<K, F> {
    key: K,
    version: u32,
    thunk: F,
}

impl<K: Key, F> Lazy<K, F> {
    /// Bind `thunk` to `key` with version 0.
    pub fn new(key: K, thunk: F) -> Self {
        Self {
            key,
            version: 0,
            thunk,
        }
    }

    /// Use `version` instead of 0.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// The key the result is stored under.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Return the stored result, computing it if it's missing or has a different version.
    ///
    /// # Errors
    /// See [`ObjectStore::get_lazy`].
    ///
    /// [`ObjectStore::get_lazy`]: crate::store::ObjectStore::get_lazy
    pub fn get<V, C>(&self, store: &mut ObjectStore<K, C>) -> crate::Result<V>
    where
        V: Value,
        C: Codec,
        F: Fn() -> V,
    {
        store.get_lazy(self.key.clone(), self.version, &self.thunk)
    }

    /// Call the function unconditionally and store its result.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Serialize`: The computed value could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn recompute<V, C>(&self, store: &mut ObjectStore<K, C>) -> crate::Result<V>
    where
        V: Value,
        C: Codec,
        F: Fn() -> V,
    {
        if store.config().logging {
            info!("Recomputing {:?}", self.key);
        }
        store.compute(self.key.clone(), self.version, &self.thunk)
    }

    /// Remove the stored result so that the next call to [`get`] computes it.
    ///
    /// This returns `true` if there was a stored result.
    ///
    /// # Errors
    /// - `Error::Io`: An I/O error occurred.
    ///
    /// [`get`]: crate::store::Lazy::get
    pub fn invalidate<C: Codec>(&self, store: &mut ObjectStore<K, C>) -> crate::Result<bool> {
        if !store.contains(&self.key) {
            return Ok(false);
        }
        store.remove(&self.key)?;
        Ok(true)
    }
}

impl<F> Lazy<String, F> {
    /// Bind `thunk` to a key equal to its declared name.
    ///
    /// The name is taken from [`std::any::type_name`], so this is only meaningful for named
    /// functions. For closures, the name of the enclosing function is used.
    pub fn from_fn(thunk: F) -> Self {
        Self::new(declared_name::<F>(), thunk)
    }

    /// Bind `thunk` to `name`, or to its declared name if `name` is `None`.
    ///
    /// The `version` defaults to 0.
    pub fn bind(name: Option<&str>, version: Option<u32>, thunk: F) -> Self {
        let key = match name {
            Some(name) => name.to_owned(),
            None => declared_name::<F>(),
        };
        Self::new(key, thunk).version(version.unwrap_or(0))
    }
}

/// A load-only counterpart of [`Lazy`] for values which are stored by other code.
///
/// [`Lazy`]: crate::store::Lazy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loader<K> {
    key: K,
}

impl<K: Key> Loader<K> {
    /// Load the value stored at `key`.
    pub fn new(key: K) -> Self {
        Self { key }
    }

    /// The key the value is loaded from.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Return the stored value.
    ///
    /// # Errors
    /// See [`ObjectStore::get`].
    ///
    /// [`ObjectStore::get`]: crate::store::ObjectStore::get
    pub fn get<V: Value, C: Codec>(&self, store: &mut ObjectStore<K, C>) -> crate::Result<V> {
        store.get(&self.key)
    }
}

impl<K: fmt::Debug, F> fmt::Debug for Lazy<K, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("key", &self.key)
            .field("version", &self.version)
            .finish()
    }
}
