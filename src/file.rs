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

//! Atomic whole-file writes and single-file persistence.
//!
//! Every write goes to a staging file next to its destination and is then renamed over the
//! destination. Because the rename happens within one directory, a reader opening the destination
//! path sees either the old contents or the new contents, never a partially-written file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::codec::Codec;

/// The prefix of the names of staging files.
///
/// No key ever encodes to a file name with this prefix, so staging files left behind by an
/// interrupted process can be told apart from keys.
pub(crate) const TEMP_PREFIX: &str = "+~";

/// Return a new staging path in the same directory as `path`.
fn staging_path(path: &Path) -> PathBuf {
    let file_name = format!("{}{}", TEMP_PREFIX, Uuid::new_v4().as_hyphenated());
    match path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Atomically replace the contents of the file at `path` with the output of `write`.
///
/// `write` is handed a new staging file. If it returns `Ok`, the staging file is flushed, synced,
/// and renamed onto `path`. If it returns `Err`, or any step before the rename fails, the staging
/// file is removed, the error is returned, and `path` is left untouched.
///
/// This returns the number of bytes in the new file.
///
/// # Errors
/// - `Error::Io`: An I/O error occurred.
/// - Any error returned by `write`.
pub fn write_atomic_with<F>(path: &Path, write: F) -> crate::Result<u64>
where
    F: FnOnce(&mut File) -> crate::Result<()>,
{
    let staging_path = staging_path(path);
    let mut staging_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&staging_path)?;

    let result = write(&mut staging_file).and_then(|()| {
        staging_file.flush()?;
        staging_file.sync_all()?;
        Ok(staging_file.metadata()?.len())
    });
    drop(staging_file);

    let size = match result {
        Ok(size) => size,
        Err(error) => {
            // The original error is more useful than a failure to clean up.
            let _ = fs::remove_file(&staging_path);
            return Err(error);
        }
    };

    if let Err(error) = fs::rename(&staging_path, path) {
        let _ = fs::remove_file(&staging_path);
        return Err(error.into());
    }

    Ok(size)
}

/// Atomically replace the contents of the file at `path` with `data`.
///
/// See [`write_atomic_with`] for details.
///
/// [`write_atomic_with`]: crate::file::write_atomic_with
pub fn write_atomic(path: &Path, data: &[u8]) -> crate::Result<u64> {
    write_atomic_with(path, |file| Ok(file.write_all(data)?))
}

/// Read the whole file at `path`, mapping a missing file to `Error::NotFound`.
pub(crate) fn read(path: &Path) -> crate::Result<Vec<u8>> {
    fs::read(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => crate::Error::NotFound,
        _ => crate::Error::Io(error),
    })
}

/// Serialize `value` with `codec` and atomically write it to `path`.
///
/// This returns the number of bytes written.
///
/// # Errors
/// - `Error::Serialize`: The `value` could not be serialized.
/// - `Error::Io`: An I/O error occurred.
pub fn save<V: Serialize, C: Codec>(path: &Path, value: &V, codec: &C) -> crate::Result<u64> {
    let data = codec.encode(value)?;
    write_atomic(path, &data)
}

/// Read and deserialize the value stored at `path` with `codec`.
///
/// # Errors
/// - `Error::NotFound`: There is no file at `path`.
/// - `Error::Deserialize`: The file does not contain a valid value of type `V`.
/// - `Error::Io`: An I/O error occurred.
pub fn load<V: DeserializeOwned, C: Codec>(path: &Path, codec: &C) -> crate::Result<V> {
    codec.decode(&read(path)?)
}

/// Load the value stored at `path`, or compute it with `thunk` and save it if there is none.
///
/// This is the single-file counterpart of [`ObjectStore::get_lazy`]. Only a missing file causes
/// the value to be computed; a file which exists but can't be read or deserialized is an error.
///
/// [`ObjectStore::get_lazy`]: crate::store::ObjectStore::get_lazy
pub fn load_or_compute<V, C, F>(path: &Path, codec: &C, thunk: F) -> crate::Result<V>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
    F: FnOnce() -> V,
{
    match load(path, codec) {
        Ok(value) => {
            info!("Loaded {}", path.display());
            Ok(value)
        }
        Err(crate::Error::NotFound) => {
            info!("Computing {}", path.display());
            let value = thunk();
            let size = save(path, &value, codec)?;
            info!("Saved {} ({})", path.display(), ByteSize(size));
            Ok(value)
        }
        Err(error) => Err(error),
    }
}
