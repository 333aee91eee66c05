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

//! `dirstore` is a library for persistent, lazily computed values stored in plain directories.
//!
//! A store is a directory on the local file system. Each value is serialized into its own file,
//! named after its key, and written atomically so that an interrupted write never leaves a
//! truncated value behind. Values are cached in memory after they are first read.
//!
//! This library provides the following:
//! - `ObjectStore` is a persistent, heterogeneous, map-like collection backed by a directory.
//! - `MetaStore` records the type and version of each value in a store.
//! - `Lazy` binds an expensive computation to a key so its result is computed at most once.
//! - The `file` module provides atomic writes and single-file persistence.
//!
//! # Examples
//! ```
//! use dirstore::store::{Lazy, ObjectStore};
//!
//! fn main() -> dirstore::Result<()> {
//!     let directory = tempfile::tempdir()?;
//!     let mut store: ObjectStore = ObjectStore::open(directory.path())?;
//!
//!     // Insert a value and read it back.
//!     store.insert(String::from("numbers"), vec![1u32, 2, 3])?;
//!     assert_eq!(store.get::<Vec<u32>>(&String::from("numbers"))?, vec![1, 2, 3]);
//!
//!     // The value persists in the directory.
//!     drop(store);
//!     let mut store: ObjectStore = ObjectStore::open(directory.path())?;
//!     assert_eq!(store.get::<Vec<u32>>(&String::from("numbers"))?, vec![1, 2, 3]);
//!
//!     // Compute a value only if it isn't already stored.
//!     let total = Lazy::new(String::from("total"), || 6u32);
//!     assert_eq!(total.get(&mut store)?, 6);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Features
//! Some functionality is gated behind cargo features:
//!
//! Type | Cargo Feature
//! --- | ---
//! `codec::Json` | `codec-json`
//!
//! To use one of these types, you must enable the corresponding feature in your `Cargo.toml`.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use error::{Error, Result};

pub mod codec;
mod error;
pub mod file;
pub mod store;
