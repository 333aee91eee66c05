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

//! Mapping keys to file names and back.
//!
//! A key which serializes to a plain string is stored under a file with that name. Any other key
//! is serialized with MessagePack, encoded with the URL-safe base64 alphabet, and prefixed with
//! [`ESCAPE_PREFIX`]. This encoding is independent of the store's value codec.
//!
//! The encoded form of a key is not guaranteed to be canonical, so [`encode`] looks for an
//! existing file name which decodes to the same key before minting a new one.
//!
//! [`ESCAPE_PREFIX`]: crate::store::key::ESCAPE_PREFIX
//! [`encode`]: crate::store::key::encode

use std::fmt::Debug;
use std::hash::Hash;
use std::path::is_separator;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::file::TEMP_PREFIX;

/// A type which can be used as a key in an [`ObjectStore`].
///
/// [`ObjectStore`]: crate::store::ObjectStore
pub trait Key: Eq + Hash + Clone + Debug + Serialize + DeserializeOwned {}

impl<T> Key for T where T: Eq + Hash + Clone + Debug + Serialize + DeserializeOwned {}

/// The character which marks a file name as an encoded key.
pub const ESCAPE_PREFIX: char = '+';

/// The name of the directory which holds a store's metadata.
pub const META_NAME: &str = "_meta";

/// Return the string `key` serializes to, if it serializes to a string.
fn as_string<K: Key>(key: &K) -> crate::Result<Option<String>> {
    let serialized = rmp_serde::to_vec(key).map_err(|_| crate::Error::InvalidKey)?;
    Ok(rmp_serde::from_read::<_, String>(serialized.as_slice()).ok())
}

/// Return whether `name` can be used as a file name verbatim.
fn is_plain(name: &str) -> bool {
    !name.starts_with(ESCAPE_PREFIX)
        && !name.contains(is_separator)
        && name != "."
        && name != ".."
}

/// Strip the `extension` from `file_name` if it has one.
pub(crate) fn strip_extension<'a>(file_name: &'a str, extension: &str) -> &'a str {
    if extension.is_empty() {
        file_name
    } else {
        file_name.strip_suffix(extension).unwrap_or(file_name)
    }
}

/// Return the file name stem for `key`.
///
/// If `key` is a plain string, it is returned unchanged. Otherwise, `existing` is scanned for an
/// escaped file name which decodes to `key`, and if there isn't one, a new escaped name is minted.
/// Names in `existing` may carry `extension`; the returned name never does.
///
/// # Errors
/// - `Error::InvalidKey`: The key is the empty string or could not be serialized.
pub fn encode<K, I, S>(key: &K, existing: I, extension: &str) -> crate::Result<String>
where
    K: Key,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if let Some(name) = as_string(key)? {
        if name.is_empty() {
            return Err(crate::Error::InvalidKey);
        }
        if is_plain(&name) {
            return Ok(name);
        }
    }

    for file_name in existing {
        let file_name = file_name.as_ref();
        if !file_name.starts_with(ESCAPE_PREFIX) || file_name.starts_with(TEMP_PREFIX) {
            continue;
        }
        let stem = strip_extension(file_name, extension);
        if let Ok(existing_key) = decode::<K>(stem, "") {
            if existing_key == *key {
                return Ok(stem.to_owned());
            }
        }
    }

    let serialized = rmp_serde::to_vec(key).map_err(|_| crate::Error::InvalidKey)?;
    Ok(format!("{}{}", ESCAPE_PREFIX, URL_SAFE.encode(serialized)))
}

/// Return the key stored under `file_name`.
///
/// The `extension` is stripped from `file_name` first if present.
///
/// # Errors
/// - `Error::KeyType`: The file name can not be decoded as a key of type `K`.
pub fn decode<K: Key>(file_name: &str, extension: &str) -> crate::Result<K> {
    let stem = strip_extension(file_name, extension);
    let serialized = match stem.strip_prefix(ESCAPE_PREFIX) {
        Some(encoded) => URL_SAFE
            .decode(encoded)
            .map_err(|_| crate::Error::KeyType)?,
        None => rmp_serde::to_vec(&stem).map_err(|_| crate::Error::KeyType)?,
    };
    rmp_serde::from_read(serialized.as_slice()).map_err(|_| crate::Error::KeyType)
}
