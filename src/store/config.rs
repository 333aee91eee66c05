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

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::{Codec, MessagePack};

use super::key::Key;
use super::object_store::ObjectStore;

/// The configuration for a store.
///
/// Nested stores inherit the configuration of the store they were opened from. This type
/// implements `Default` to provide a reasonable default configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Whether to track the type and version of each value in a `_meta` directory.
    ///
    /// The default value is `true`.
    pub metadata: bool,

    /// Whether to log loads, saves, and lazy computations.
    ///
    /// The default value is `true`.
    pub logging: bool,

    /// A suffix appended to the file name of every value.
    ///
    /// This does not apply to nested stores. The default value is the empty string.
    pub extension: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            metadata: true,
            logging: true,
            extension: String::new(),
        }
    }
}

/// Open or create a store.
///
/// This type is a builder used to open stores. Typically, when using `OpenOptions`, you'll first
/// call [`new`], then chain method calls to configure how the store will be opened, and then
/// finally call [`open`].
///
/// # Examples
/// ```no_run
/// use dirstore::store::{ObjectStore, OpenOptions};
///
/// let mut store: ObjectStore<String> = OpenOptions::new()
///     .extension(".dat")
///     .logging(false)
///     .open("/tmp/cache")
///     .unwrap();
/// ```
///
/// [`new`]: crate::store::OpenOptions::new
/// [`open`]: crate::store::OpenOptions::open
#[derive(Debug, Clone)]
pub struct OpenOptions<C: Codec = MessagePack> {
    config: StoreConfig,
    codec: C,
}

impl Default for OpenOptions<MessagePack> {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions<MessagePack> {
    /// Create a new `OpenOptions` with the default config and the MessagePack codec.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            codec: MessagePack,
        }
    }
}

impl<C: Codec> OpenOptions<C> {
    /// Use the given `config` instead of the default `StoreConfig`.
    pub fn config(&mut self, config: StoreConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Overwrite [`StoreConfig::metadata`].
    ///
    /// [`StoreConfig::metadata`]: crate::store::StoreConfig::metadata
    pub fn metadata(&mut self, metadata: bool) -> &mut Self {
        self.config.metadata = metadata;
        self
    }

    /// Overwrite [`StoreConfig::logging`].
    ///
    /// [`StoreConfig::logging`]: crate::store::StoreConfig::logging
    pub fn logging(&mut self, logging: bool) -> &mut Self {
        self.config.logging = logging;
        self
    }

    /// Overwrite [`StoreConfig::extension`].
    ///
    /// [`StoreConfig::extension`]: crate::store::StoreConfig::extension
    pub fn extension(&mut self, extension: impl Into<String>) -> &mut Self {
        self.config.extension = extension.into();
        self
    }

    /// Use `codec` to serialize values instead of the current one.
    pub fn codec<D: Codec>(&self, codec: D) -> OpenOptions<D> {
        OpenOptions {
            config: self.config.clone(),
            codec,
        }
    }

    /// Open the store in the directory at `path`, creating the directory if it doesn't exist.
    ///
    /// If metadata is enabled, metadata for keys which no longer exist in the store is removed.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name in the store can't be decoded as a key of type `K`.
    /// - `Error::Io`: An I/O error occurred.
    pub fn open<K: Key>(&self, path: impl AsRef<Path>) -> crate::Result<ObjectStore<K, C>> {
        ObjectStore::open_with(path.as_ref(), self.config.clone(), self.codec.clone())
    }
}
