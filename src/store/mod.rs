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

//! Directory-backed object stores.
//!
//! An [`ObjectStore`] maps keys to values, storing each value in its own file in a directory and
//! caching it in memory. Keys can also refer to nested stores, which live in subdirectories.
//!
//! If metadata is enabled, each store keeps a [`MetaStore`] in a reserved `_meta` subdirectory
//! which records the type of each value and, for lazily computed values, their version. Lazily
//! computed values are read and written with [`ObjectStore::get_lazy`] or a [`Lazy`] binding.
//!
//! Stores are opened with [`OpenOptions`], or with [`ObjectStore::open`] for the default
//! configuration.
//!
//! [`ObjectStore`]: crate::store::ObjectStore
//! [`MetaStore`]: crate::store::MetaStore
//! [`ObjectStore::get_lazy`]: crate::store::ObjectStore::get_lazy
//! [`Lazy`]: crate::store::Lazy
//! [`OpenOptions`]: crate::store::OpenOptions
//! [`ObjectStore::open`]: crate::store::ObjectStore::open

pub use self::attrs::{Attrs, RESERVED_NAMES};
pub use self::config::{OpenOptions, StoreConfig};
pub use self::entry::{EntryKind, Value};
pub use self::key::{Key, ESCAPE_PREFIX, META_NAME};
pub use self::lazy::{Lazy, Loader};
pub use self::metadata::{MetaStore, MetaValue, Metadata, TYPE_FIELD, VERSION_FIELD};
pub use self::object_store::ObjectStore;

mod attrs;
mod config;
mod entry;
pub mod key;
mod lazy;
mod metadata;
mod object_store;
