/*
 * Copyright 2019-2020 Wren Powell
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

use std::any::{type_name, Any};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use static_assertions::assert_obj_safe;

use crate::codec::{Codec, MessagePack};

use super::key::Key;
use super::object_store::ObjectStore;

/// A type which can be stored as a value in an [`ObjectStore`].
///
/// [`ObjectStore`]: crate::store::ObjectStore
pub trait Value: Serialize + DeserializeOwned + Clone + 'static {}

impl<T> Value for T where T: Serialize + DeserializeOwned + Clone + 'static {}

/// What a key in an [`ObjectStore`] refers to.
///
/// [`ObjectStore`]: crate::store::ObjectStore
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A serialized value stored in a file.
    Leaf,

    /// A nested store stored in a subdirectory.
    Nested,
}

/// A type-erased value in the cache which knows how to serialize itself.
pub(super) trait CachedValue<C: Codec> {
    fn encode(&self, codec: &C) -> crate::Result<Vec<u8>>;

    fn type_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

assert_obj_safe!(CachedValue<MessagePack>);

impl<C: Codec, T: Value> CachedValue<C> for T {
    fn encode(&self, codec: &C) -> crate::Result<Vec<u8>> {
        codec.encode(self)
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An entry in the cache of an [`ObjectStore`].
///
/// Nested stores are cached as live stores so that their own caches survive repeated lookups.
///
/// [`ObjectStore`]: crate::store::ObjectStore
pub(super) enum Entry<K: Key, C: Codec> {
    Leaf(Box<dyn CachedValue<C>>),
    Nested(ObjectStore<K, C>),
}

impl<K: Key, C: Codec> Entry<K, C> {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Leaf(_) => EntryKind::Leaf,
            Entry::Nested(_) => EntryKind::Nested,
        }
    }

    /// Return whether this is a leaf holding a value of type `V`.
    pub fn is_leaf_of<V: Value>(&self) -> bool {
        match self {
            Entry::Leaf(value) => (**value).as_any().is::<V>(),
            Entry::Nested(_) => false,
        }
    }
}

impl<K: Key, C: Codec> fmt::Debug for Entry<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Leaf(value) => f.debug_tuple("Leaf").field(&(**value).type_name()).finish(),
            Entry::Nested(store) => f.debug_tuple("Nested").field(store).finish(),
        }
    }
}
