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

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::codec::Codec;

use super::config::StoreConfig;
use super::key::Key;
use super::object_store::ObjectStore;

/// The metadata field which holds the name of the type of a value.
pub const TYPE_FIELD: &str = "type";

/// The metadata field which holds the version of a lazily computed value.
pub const VERSION_FIELD: &str = "version";

/// The metadata for a single key.
pub type Metadata = BTreeMap<String, MetaValue>;

/// A scalar value in a [`Metadata`] record.
///
/// [`Metadata`]: crate::store::Metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    /// Return the value as an integer if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the value as a string if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Return the value as a boolean if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Return the value as a float if it is one.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            MetaValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Int(value)
    }
}

impl From<i32> for MetaValue {
    fn from(value: i32) -> Self {
        MetaValue::Int(i64::from(value))
    }
}

impl From<u32> for MetaValue {
    fn from(value: u32) -> Self {
        MetaValue::Int(i64::from(value))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Str(value)
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Str(value.to_owned())
    }
}

/// The metadata of the keys in an [`ObjectStore`].
///
/// This is a store in the `_meta` subdirectory of its parent which maps each key in the parent to a
/// flat [`Metadata`] record. It never tracks metadata of its own and never logs. Reads through a
/// `MetaStore` treat any failure as a missing record, since metadata is advisory.
///
/// [`ObjectStore`]: crate::store::ObjectStore
/// [`Metadata`]: crate::store::Metadata
#[derive(Debug)]
pub struct MetaStore<K: Key, C: Codec> {
    store: ObjectStore<K, C>,
}

impl<K: Key, C: Codec> MetaStore<K, C> {
    pub(super) fn open(path: &Path, codec: C) -> crate::Result<Self> {
        let config = StoreConfig {
            metadata: false,
            logging: false,
            extension: String::new(),
        };
        Ok(Self {
            store: ObjectStore::open_with(path, config, codec)?,
        })
    }

    pub(super) fn store_mut(&mut self) -> &mut ObjectStore<K, C> {
        &mut self.store
    }

    /// The path of the directory which holds the metadata.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Return whether there is a metadata record for `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.store.path().is_dir() && self.store.contains(key)
    }

    /// Return the keys which have metadata records.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name can't be decoded as a key of type `K`.
    /// - `Error::Io`: An I/O error occurred.
    pub fn keys(&self) -> crate::Result<Vec<K>> {
        if !self.store.path().is_dir() {
            return Ok(Vec::new());
        }
        self.store.keys()
    }

    /// Return the metadata record for `key`.
    ///
    /// # Errors
    /// - `Error::NotFound`: There is no metadata record for `key`.
    /// - `Error::Deserialize`: The record could not be deserialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn get(&mut self, key: &K) -> crate::Result<Metadata> {
        self.store.get(key)
    }

    /// Replace the metadata record for `key`.
    ///
    /// # Errors
    /// - `Error::Serialize`: The record could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn insert(&mut self, key: K, metadata: Metadata) -> crate::Result<()> {
        // The directory is gone after `clear_all`.
        fs::create_dir_all(self.store.path())?;
        self.store.insert(key, metadata)
    }

    /// Remove the metadata record for `key`.
    ///
    /// This returns `true` if there was a record to remove.
    ///
    /// # Errors
    /// - `Error::Io`: An I/O error occurred.
    pub fn remove(&mut self, key: &K) -> crate::Result<bool> {
        if !self.contains(key) {
            return Ok(false);
        }
        self.store.remove(key)?;
        Ok(true)
    }

    /// Move the metadata record for `old` to `new`.
    ///
    /// # Errors
    /// - `Error::Io`: An I/O error occurred. This includes the case where `old` has no record.
    pub fn rename(&mut self, old: &K, new: K) -> crate::Result<()> {
        self.store.rename(old, new)
    }

    /// Return the metadata `field` for `key`.
    ///
    /// This returns `None` if there is no record for `key`, if the record has no such field, or if
    /// the record can't be read.
    pub fn get_field(&mut self, key: &K, field: &str) -> Option<MetaValue> {
        if !self.contains(key) {
            return None;
        }
        self.store.get_mut::<Metadata>(key).ok()?.get(field).cloned()
    }

    /// Set the metadata `field` for `key` to `value`, creating a record if there isn't one.
    ///
    /// # Errors
    /// - `Error::Deserialize`: The existing record could not be deserialized.
    /// - `Error::Serialize`: The record could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn set_field(
        &mut self,
        key: K,
        field: impl Into<String>,
        value: impl Into<MetaValue>,
    ) -> crate::Result<()> {
        let mut metadata = if self.contains(&key) {
            self.store.get::<Metadata>(&key)?
        } else {
            Metadata::new()
        };
        metadata.insert(field.into(), value.into());
        self.insert(key, metadata)
    }

    /// Remove the records of keys which are not in `live_keys`.
    ///
    /// This reconciles the metadata with its store after files were removed behind the store's
    /// back. This returns the keys whose records were removed.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name can't be decoded as a key of type `K`.
    /// - `Error::Io`: An I/O error occurred.
    pub fn prune(&mut self, live_keys: &HashSet<K>) -> crate::Result<Vec<K>> {
        let mut pruned = Vec::new();

        for key in self.keys()? {
            if !live_keys.contains(&key) {
                info!("Removing orphan metadata for {:?}", key);
                self.store.remove(&key)?;
                pruned.push(key);
            }
        }

        Ok(pruned)
    }

    /// Remove every record along with the metadata directory itself.
    pub(super) fn clear_all(&mut self) -> crate::Result<()> {
        if !self.store.path().is_dir() {
            return Ok(());
        }
        self.store.clear_all()?;
        fs::remove_dir(self.store.path())?;
        Ok(())
    }
}
