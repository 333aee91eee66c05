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

use std::ops::{Deref, DerefMut};
use std::path::Path;

use rstest::*;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use dirstore::store::{ObjectStore, OpenOptions};

/// A key type which mixes plain strings and tuples in one store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestKey {
    Name(String),
    Coords(i32, i32),
}

/// A value which is tied to the lifetime of a temporary directory.
pub struct WithTempDir<T> {
    directory: TempDir,
    value: T,
}

impl<T> WithTempDir<T> {
    /// The temporary directory which holds the value.
    pub fn directory(&self) -> &Path {
        self.directory.path()
    }
}

impl<T> Deref for WithTempDir<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for WithTempDir<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}

/// Return the path of the store directory inside `directory`.
pub fn store_path(directory: &Path) -> std::path::PathBuf {
    directory.join("store")
}

/// Open the test store in `directory` again, as a new process would.
pub fn reopen<K: dirstore::store::Key>(directory: &Path) -> anyhow::Result<ObjectStore<K>> {
    Ok(OpenOptions::new().logging(false).open(store_path(directory))?)
}

#[fixture]
pub fn store() -> WithTempDir<ObjectStore> {
    let directory = tempfile::tempdir().unwrap();
    let store = OpenOptions::new()
        .logging(false)
        .open(store_path(directory.path()))
        .unwrap();
    WithTempDir {
        directory,
        value: store,
    }
}

#[fixture]
pub fn mixed_store() -> WithTempDir<ObjectStore<TestKey>> {
    let directory = tempfile::tempdir().unwrap();
    let store = OpenOptions::new()
        .logging(false)
        .open(store_path(directory.path()))
        .unwrap();
    WithTempDir {
        directory,
        value: store,
    }
}

#[fixture]
pub fn bare_store() -> WithTempDir<ObjectStore> {
    let directory = tempfile::tempdir().unwrap();
    let store = OpenOptions::new()
        .metadata(false)
        .logging(false)
        .open(store_path(directory.path()))
        .unwrap();
    WithTempDir {
        directory,
        value: store,
    }
}
