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
use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::iter;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use tracing::{info, warn};

use crate::codec::{Codec, MessagePack};
use crate::file::{self, TEMP_PREFIX};

use super::config::{OpenOptions, StoreConfig};
use super::entry::{Entry, EntryKind, Value};
use super::key::{self, Key, META_NAME};
use super::metadata::{MetaStore, MetaValue, Metadata, TYPE_FIELD};

/// A persistent map which stores each value in its own file in a directory.
///
/// An `ObjectStore` maps keys of type `K` to values of any type implementing [`Value`]. Each value
/// is serialized with the codec `C` and written atomically to a file in the store's directory.
/// Values are also kept in an in-memory cache, so repeated reads of the same key don't touch the
/// disk. The files are the durable copy; opening a new `ObjectStore` on the same directory sees
/// every value written by the old one.
///
/// Keys can also refer to nested stores, which live in subdirectories. Nested stores share the
/// configuration and codec of the store they were opened from. See [`make_subdirectory`],
/// [`subdirectory`], and [`get_store`].
///
/// If metadata is enabled, each write also records the type of the value in a [`MetaStore`] which
/// lives in the `_meta` subdirectory. Metadata is advisory; it is written separately from the value
/// and the two can disagree if the process is interrupted between writes.
///
/// Two `ObjectStore` instances opened on the same directory don't share a cache, and nothing
/// prevents two processes from racing on the same directory.
///
/// [`Value`]: crate::store::Value
/// [`make_subdirectory`]: crate::store::ObjectStore::make_subdirectory
/// [`subdirectory`]: crate::store::ObjectStore::subdirectory
/// [`get_store`]: crate::store::ObjectStore::get_store
/// [`MetaStore`]: crate::store::MetaStore
pub struct ObjectStore<K: Key = String, C: Codec = MessagePack> {
    /// The absolute path of the store's directory.
    path: PathBuf,
    config: StoreConfig,
    codec: C,
    cache: HashMap<K, Entry<K, C>>,
    meta: Option<Box<MetaStore<K, C>>>,
}

impl<K: Key> ObjectStore<K, MessagePack> {
    /// Open the store in the directory at `path` with the default configuration.
    ///
    /// See [`OpenOptions::open`] for details.
    ///
    /// [`OpenOptions::open`]: crate::store::OpenOptions::open
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        OpenOptions::new().open(path)
    }
}

impl<K: Key, C: Codec> ObjectStore<K, C> {
    pub(crate) fn open_with(path: &Path, config: StoreConfig, codec: C) -> crate::Result<Self> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir()?.join(path)
        };
        fs::create_dir_all(&path)?;

        let mut store = Self {
            path,
            config,
            codec,
            cache: HashMap::new(),
            meta: None,
        };

        if store.config.metadata {
            let mut meta = MetaStore::open(&store.path.join(META_NAME), store.codec.clone())?;
            let live_keys = store.keys()?.into_iter().collect::<HashSet<_>>();
            meta.prune(&live_keys)?;
            store.meta = Some(Box::new(meta));
        }

        Ok(store)
    }

    /// The absolute path of this store's directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The codec used to serialize values.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Lazily list the file names in this store's directory.
    fn file_names(&self) -> impl Iterator<Item = String> + '_ {
        iter::once(&self.path)
            .filter_map(|path| fs::read_dir(path).ok())
            .flatten()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
    }

    /// Return the file name stem for `key`.
    fn stem(&self, key: &K) -> crate::Result<String> {
        key::encode(key, self.file_names(), &self.config.extension)
    }

    /// Return the path of the file which holds the value with the given `stem`.
    fn leaf_path(&self, stem: &str) -> PathBuf {
        self.path.join(format!("{}{}", stem, self.config.extension))
    }

    /// Return the stem of `key` and what it refers to on disk, if anything.
    fn resolve(&self, key: &K) -> crate::Result<(String, Option<EntryKind>)> {
        let stem = self.stem(key)?;
        let kind = if self.path.join(&stem).is_dir() {
            Some(EntryKind::Nested)
        } else if self.leaf_path(&stem).is_file() {
            Some(EntryKind::Leaf)
        } else {
            None
        };
        Ok((stem, kind))
    }

    fn open_child(&self, stem: &str) -> crate::Result<Self> {
        Self::open_with(&self.path.join(stem), self.config.clone(), self.codec.clone())
    }

    /// Return whether the given `key` exists in this store.
    ///
    /// The empty string is never in a store. The reserved `_meta` key is reported present exactly
    /// when metadata is enabled.
    pub fn contains(&self, key: &K) -> bool {
        match self.stem(key) {
            Ok(stem) if stem == META_NAME => self.meta.is_some(),
            Ok(stem) => self.path.join(&stem).exists() || self.leaf_path(&stem).exists(),
            Err(_) => false,
        }
    }

    /// Return what the given `key` refers to.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no value or nested store at `key`.
    /// - `Error::InvalidKey`: The key can't be used in a store.
    pub fn kind(&self, key: &K) -> crate::Result<EntryKind> {
        if let Some(entry) = self.cache.get(key) {
            return Ok(entry.kind());
        }
        let (stem, kind) = self.resolve(key)?;
        if stem == META_NAME && self.meta.is_some() {
            return Ok(EntryKind::Nested);
        }
        kind.ok_or(crate::Error::NotFound)
    }

    /// Load the value at `key` from disk, bypassing the cache.
    fn load<V: Value>(&self, key: &K) -> crate::Result<V> {
        let (stem, kind) = self.resolve(key)?;
        if stem == META_NAME {
            return Err(crate::Error::NotFile);
        }
        match kind {
            Some(EntryKind::Leaf) => {
                if self.config.logging {
                    info!("Loading {:?}...", key);
                }
                let value = file::load(&self.leaf_path(&stem), &self.codec)?;
                if self.config.logging {
                    info!("Loaded {:?} ({})", key, type_name::<V>());
                }
                Ok(value)
            }
            Some(EntryKind::Nested) => Err(crate::Error::NotFile),
            None => Err(crate::Error::NotFound),
        }
    }

    /// Return a copy of the value associated with `key`.
    ///
    /// If the value is cached as a `V`, this doesn't touch the disk. If it is cached as another
    /// type, the cached value is converted to a `V` through the codec, so changes which haven't
    /// been passed to [`mark_changed`] yet are kept. Otherwise, the value is read from disk,
    /// deserialized as a `V`, and cached.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no value associated with `key`.
    /// - `Error::NotFile`: The key refers to a nested store.
    /// - `Error::Deserialize`: The value could not be deserialized as a `V`.
    /// - `Error::InvalidKey`: The key can't be used in a store.
    /// - `Error::Io`: An I/O error occurred.
    ///
    /// [`mark_changed`]: crate::store::ObjectStore::mark_changed
    pub fn get<V: Value>(&mut self, key: &K) -> crate::Result<V> {
        self.get_mut::<V>(key).map(|value| value.clone())
    }

    /// Return a mutable reference to the cached value associated with `key`.
    ///
    /// Changes made through this reference are not written to disk until [`mark_changed`] is
    /// called.
    ///
    /// # Errors
    /// See [`get`].
    ///
    /// [`mark_changed`]: crate::store::ObjectStore::mark_changed
    /// [`get`]: crate::store::ObjectStore::get
    pub fn get_mut<V: Value>(&mut self, key: &K) -> crate::Result<&mut V> {
        let replacement = match self.cache.get(key) {
            Some(Entry::Nested(_)) => return Err(crate::Error::NotFile),
            Some(entry) if entry.is_leaf_of::<V>() => None,
            Some(Entry::Leaf(value)) => {
                let data = (**value).encode(&self.codec)?;
                Some(self.codec.decode::<V>(&data)?)
            }
            None => Some(self.load::<V>(key)?),
        };

        if let Some(value) = replacement {
            self.cache.insert(key.clone(), Entry::Leaf(Box::new(value)));
        }

        match self.cache.get_mut(key) {
            Some(Entry::Leaf(value)) => (**value)
                .as_any_mut()
                .downcast_mut::<V>()
                .ok_or(crate::Error::Deserialize),
            _ => Err(crate::Error::NotFound),
        }
    }

    /// Return the nested store at `key`.
    ///
    /// Nested stores are cached, so their caches persist across calls. If metadata is enabled, the
    /// reserved `_meta` key returns the store which holds this store's metadata.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is nothing at `key`.
    /// - `Error::NotDirectory`: The key refers to a value rather than a nested store.
    /// - `Error::InvalidKey`: The key can't be used in a store.
    /// - `Error::Io`: An I/O error occurred.
    pub fn get_store(&mut self, key: &K) -> crate::Result<&mut ObjectStore<K, C>> {
        match self.cache.get(key).map(Entry::kind) {
            Some(EntryKind::Leaf) => return Err(crate::Error::NotDirectory),
            Some(EntryKind::Nested) => {}
            None => {
                let (stem, kind) = self.resolve(key)?;
                if stem == META_NAME {
                    return match self.meta.as_deref_mut() {
                        Some(meta) => Ok(meta.store_mut()),
                        None => Err(crate::Error::NotFound),
                    };
                }
                match kind {
                    Some(EntryKind::Nested) => {
                        let child = self.open_child(&stem)?;
                        self.cache.insert(key.clone(), Entry::Nested(child));
                    }
                    Some(EntryKind::Leaf) => return Err(crate::Error::NotDirectory),
                    None => return Err(crate::Error::NotFound),
                }
            }
        }

        match self.cache.get_mut(key) {
            Some(Entry::Nested(store)) => Ok(store),
            _ => Err(crate::Error::NotFound),
        }
    }

    /// Atomically write the serialized value `data` for `key` to the file for `stem`.
    fn write_leaf(
        &self,
        key: &K,
        stem: &str,
        data: &[u8],
        type_name: &'static str,
    ) -> crate::Result<()> {
        if self.config.logging {
            info!("Saving {:?}... ({})", key, type_name);
        }
        let size = file::write_atomic(&self.leaf_path(stem), data)?;
        if self.config.logging {
            info!("Saved {:?} ({})", key, ByteSize(size));
        }
        Ok(())
    }

    /// Insert a new key-value pair.
    ///
    /// The value is written to disk before this returns. If `key` already has a value, it is
    /// replaced. If metadata is enabled, the key's metadata is replaced with a record of the type
    /// of `value`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Serialize`: The `value` could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn insert<V: Value>(&mut self, key: K, value: V) -> crate::Result<()> {
        let stem = self.stem(&key)?;
        if stem == META_NAME {
            return Err(crate::Error::InvalidKey);
        }

        let data = self.codec.encode(&value)?;
        self.write_leaf(&key, &stem, &data, type_name::<V>())?;
        self.cache.insert(key.clone(), Entry::Leaf(Box::new(value)));

        if let Some(meta) = self.meta.as_deref_mut() {
            let mut metadata = Metadata::new();
            metadata.insert(TYPE_FIELD.to_owned(), MetaValue::from(type_name::<V>()));
            meta.insert(key, metadata)?;
        }

        Ok(())
    }

    /// Remove the value or nested store at `key`.
    ///
    /// The cache entry is evicted first. A nested store is cleared recursively and then its
    /// directory is removed. If metadata is enabled, the key's metadata is removed as well; a
    /// failure to remove it is logged rather than returned.
    ///
    /// # Errors
    /// - `Error::NotEmpty`: A nested store still had files in it after being cleared.
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Io`: An I/O error occurred. This includes the case where nothing exists at `key`.
    pub fn remove(&mut self, key: &K) -> crate::Result<()> {
        let stem = self.stem(key)?;
        if stem == META_NAME {
            return Err(crate::Error::InvalidKey);
        }

        let cached = self.cache.remove(key);
        let directory = self.path.join(&stem);

        if directory.is_dir() {
            let mut child = match cached {
                Some(Entry::Nested(child)) => child,
                _ => self.open_child(&stem)?,
            };
            child.clear_all()?;
            drop(child);

            if fs::read_dir(&directory)?.next().is_some() {
                return Err(crate::Error::NotEmpty);
            }
            fs::remove_dir(&directory)?;
        } else {
            fs::remove_file(self.leaf_path(&stem))?;
        }

        if let Some(meta) = self.meta.as_deref_mut() {
            if let Err(error) = meta.remove(key) {
                warn!("Could not remove the metadata for {:?}: {}", key, error);
            }
        }

        if self.config.logging {
            info!("Removed {:?}", key);
        }

        Ok(())
    }

    /// Return a list of all the keys in this store.
    ///
    /// This includes keys of nested stores but not the reserved `_meta` key. The order is the
    /// order in which the file system lists the directory.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name can't be decoded as a key of type `K`.
    /// - `Error::Io`: An I/O error occurred.
    pub fn keys(&self) -> crate::Result<Vec<K>> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let file_name = entry
                .file_name()
                .into_string()
                .map_err(|_| crate::Error::KeyType)?;

            if file_name == META_NAME || file_name.starts_with(TEMP_PREFIX) {
                continue;
            }

            let extension = if entry.file_type()?.is_dir() {
                ""
            } else {
                self.config.extension.as_str()
            };
            keys.push(key::decode(&file_name, extension)?);
        }

        Ok(keys)
    }

    /// Move the value or nested store at `old` to `new`.
    ///
    /// A cached value moves to the new key. A cached nested store is dropped from the cache and
    /// reopened the next time it's accessed. Metadata moves with the key.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: Either key is reserved or can't be used in a store.
    /// - `Error::Io`: An I/O error occurred. This includes the case where nothing exists at `old`.
    pub fn rename(&mut self, old: &K, new: K) -> crate::Result<()> {
        let old_stem = self.stem(old)?;
        let new_stem = self.stem(&new)?;
        if old_stem == META_NAME || new_stem == META_NAME {
            return Err(crate::Error::InvalidKey);
        }

        let old_directory = self.path.join(&old_stem);
        if old_directory.is_dir() {
            fs::rename(&old_directory, self.path.join(&new_stem))?;
        } else {
            fs::rename(self.leaf_path(&old_stem), self.leaf_path(&new_stem))?;
        }

        self.cache.remove(&new);
        if let Some(entry @ Entry::Leaf(_)) = self.cache.remove(old) {
            self.cache.insert(new.clone(), entry);
        }

        if let Some(meta) = self.meta.as_deref_mut() {
            if meta.contains(old) {
                meta.rename(old, new)?;
            } else {
                meta.remove(&new)?;
            }
        }

        Ok(())
    }

    /// Create a new nested store at `name` and return it.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Io`: An I/O error occurred. This includes the case where `name` already exists.
    pub fn make_subdirectory(&mut self, name: K) -> crate::Result<&mut ObjectStore<K, C>> {
        let stem = self.stem(&name)?;
        if stem == META_NAME {
            return Err(crate::Error::InvalidKey);
        }
        fs::create_dir(self.path.join(&stem))?;
        self.cache.remove(&name);
        self.get_store(&name)
    }

    /// Return the nested store at `name`, creating it if it doesn't exist.
    ///
    /// # Errors
    /// - `Error::NotDirectory`: The key refers to a value rather than a nested store.
    /// - `Error::InvalidKey`: The key is reserved or can't be used in a store.
    /// - `Error::Io`: An I/O error occurred.
    pub fn subdirectory(&mut self, name: K) -> crate::Result<&mut ObjectStore<K, C>> {
        if !self.contains(&name) {
            return self.make_subdirectory(name);
        }
        self.get_store(&name)
    }

    /// Remove every value and nested store, recursively, along with all metadata.
    ///
    /// This leaves the store's directory empty. A `_meta` directory is removed even if metadata is
    /// disabled for this store.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name can't be decoded as a key of type `K`.
    /// - `Error::NotEmpty`: A nested store still had files in it after being cleared.
    /// - `Error::Io`: An I/O error occurred.
    pub fn clear_all(&mut self) -> crate::Result<()> {
        for key in self.keys()? {
            self.remove(&key)?;
        }
        self.cache.clear();

        match self.meta.as_deref_mut() {
            Some(meta) => meta.clear_all()?,
            None => {
                // Metadata left behind by a run which had metadata enabled.
                let meta_path = self.path.join(META_NAME);
                if meta_path.is_dir() {
                    MetaStore::<K, C>::open(&meta_path, self.codec.clone())?.clear_all()?;
                }
            }
        }

        Ok(())
    }

    /// This always returns `Error::Unsupported`.
    ///
    /// Removing everything in a store is destructive and can't be undone, so it must be done
    /// explicitly with [`clear_all`].
    ///
    /// [`clear_all`]: crate::store::ObjectStore::clear_all
    pub fn clear(&mut self) -> crate::Result<()> {
        Err(crate::Error::Unsupported)
    }

    /// Drop every entry in the in-memory cache.
    ///
    /// Subsequent reads go to disk.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Write the cached value for `key` back to disk.
    fn persist(&mut self, key: &K) -> crate::Result<()> {
        let (data, type_name) = match self.cache.get(key) {
            Some(Entry::Leaf(value)) => ((**value).encode(&self.codec)?, (**value).type_name()),
            Some(Entry::Nested(_)) => return Err(crate::Error::NotFile),
            None => return Err(crate::Error::NotFound),
        };

        let stem = self.stem(key)?;
        self.write_leaf(key, &stem, &data, type_name)?;

        if let Some(meta) = self.meta.as_deref_mut() {
            meta.set_field(key.clone(), TYPE_FIELD, type_name)?;
        }

        Ok(())
    }

    /// Write cached values back to disk after they were changed in memory.
    ///
    /// Changes made through [`get_mut`] are invisible to the store until this is called. If `key`
    /// is `None`, every cached value is written. Unlike [`insert`], this keeps any metadata fields
    /// other than the type, so lazily computed values keep their version.
    ///
    /// # Errors
    /// - `Error::NotFound`: The given `key` is not cached.
    /// - `Error::NotFile`: The given `key` refers to a nested store.
    /// - `Error::Serialize`: A value could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    ///
    /// [`get_mut`]: crate::store::ObjectStore::get_mut
    /// [`insert`]: crate::store::ObjectStore::insert
    pub fn mark_changed(&mut self, key: Option<&K>) -> crate::Result<()> {
        let keys = match key {
            Some(key) => vec![key.clone()],
            None => self
                .cache
                .iter()
                .filter(|(_, entry)| entry.kind() == EntryKind::Leaf)
                .map(|(key, _)| key.clone())
                .collect::<Vec<_>>(),
        };

        for key in keys {
            self.persist(&key)?;
        }

        Ok(())
    }

    /// Return this store's metadata, or `None` if metadata is disabled.
    pub fn meta(&mut self) -> Option<&mut MetaStore<K, C>> {
        self.meta.as_deref_mut()
    }

    /// Return the metadata `field` for `key`.
    ///
    /// This returns `None` if metadata is disabled or if there is no such field for `key`.
    pub fn get_meta(&mut self, key: &K, field: &str) -> Option<MetaValue> {
        self.meta.as_deref_mut()?.get_field(key, field)
    }

    /// Set the metadata `field` for `key` to `value`.
    ///
    /// This does nothing if metadata is disabled.
    ///
    /// # Errors
    /// - `Error::Deserialize`: The existing metadata for `key` could not be deserialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn set_meta(
        &mut self,
        key: K,
        field: impl Into<String>,
        value: impl Into<MetaValue>,
    ) -> crate::Result<()> {
        match self.meta.as_deref_mut() {
            Some(meta) => meta.set_field(key, field, value),
            None => Ok(()),
        }
    }
}

impl<K: Key, C: Codec> fmt::Debug for ObjectStore<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStore")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("cached", &self.cache.len())
            .finish()
    }
}
