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

use crate::codec::Codec;

use super::entry::Value;
use super::object_store::ObjectStore;

/// Names which are operations on [`Attrs`] and can never be used as attribute names.
///
/// [`Attrs`]: crate::store::Attrs
pub const RESERVED_NAMES: &[&str] = &["rename", "make_subdirectory"];

fn check_name(name: &str) -> crate::Result<()> {
    if name.starts_with('_') || RESERVED_NAMES.contains(&name) {
        Err(crate::Error::InvalidKey)
    } else {
        Ok(())
    }
}

/// Named access to the values in a string-keyed [`ObjectStore`].
///
/// Each attribute is a key in the underlying store. Names starting with `_` are private and names
/// in [`RESERVED_NAMES`] belong to the adaptor, so neither can be read or written through it.
///
/// # Examples
/// ```no_run
/// use dirstore::store::ObjectStore;
///
/// let mut store: ObjectStore = ObjectStore::open("/tmp/settings").unwrap();
/// let mut attrs = store.attrs();
///
/// attrs.set("threshold", 0.5f64).unwrap();
/// let threshold: f64 = attrs.get("threshold").unwrap();
/// ```
///
/// [`ObjectStore`]: crate::store::ObjectStore
/// [`RESERVED_NAMES`]: crate::store::RESERVED_NAMES
#[derive(Debug)]
pub struct Attrs<'a, C: Codec> {
    store: &'a mut ObjectStore<String, C>,
}

impl<'a, C: Codec> Attrs<'a, C> {
    /// Return a copy of the value of the attribute `name`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The name is private or reserved.
    /// - `Error::NotFound`: There is no attribute `name`.
    /// - `Error::NotFile`: The attribute is a nested store. Use [`dir`] instead.
    /// - `Error::Deserialize`: The value could not be deserialized as a `V`.
    /// - `Error::Io`: An I/O error occurred.
    ///
    /// [`dir`]: crate::store::Attrs::dir
    pub fn get<V: Value>(&mut self, name: &str) -> crate::Result<V> {
        check_name(name)?;
        self.store.get(&name.to_owned())
    }

    /// Set the attribute `name` to `value`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The name is private or reserved.
    /// - `Error::Serialize`: The value could not be serialized.
    /// - `Error::Io`: An I/O error occurred.
    pub fn set<V: Value>(&mut self, name: &str, value: V) -> crate::Result<()> {
        check_name(name)?;
        self.store.insert(name.to_owned(), value)
    }

    /// Remove the attribute `name`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The name is private or reserved.
    /// - `Error::Io`: An I/O error occurred.
    pub fn remove(&mut self, name: &str) -> crate::Result<()> {
        check_name(name)?;
        self.store.remove(&name.to_owned())
    }

    /// Return the attributes of the nested store `name`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The name is private or reserved.
    /// - `Error::NotFound`: There is no attribute `name`.
    /// - `Error::NotDirectory`: The attribute is a value rather than a nested store.
    /// - `Error::Io`: An I/O error occurred.
    pub fn dir(&mut self, name: &str) -> crate::Result<Attrs<'_, C>> {
        check_name(name)?;
        let store = self.store.get_store(&name.to_owned())?;
        Ok(Attrs { store })
    }

    /// Return the names of the public attributes.
    ///
    /// # Errors
    /// - `Error::KeyType`: A file name in the store is not a string key.
    /// - `Error::Io`: An I/O error occurred.
    pub fn names(&self) -> crate::Result<Vec<String>> {
        let mut names = self.store.keys()?;
        names.retain(|name| !name.starts_with('_'));
        Ok(names)
    }

    /// Rename the attribute `old` to `new`.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: Either name is private or reserved.
    /// - `Error::Io`: An I/O error occurred.
    pub fn rename(&mut self, old: &str, new: &str) -> crate::Result<()> {
        check_name(old)?;
        check_name(new)?;
        self.store.rename(&old.to_owned(), new.to_owned())
    }

    /// Create the nested store `name` and return its attributes.
    ///
    /// # Errors
    /// - `Error::InvalidKey`: The name is private or reserved.
    /// - `Error::Io`: An I/O error occurred. This includes the case where `name` already exists.
    pub fn make_subdirectory(&mut self, name: &str) -> crate::Result<Attrs<'_, C>> {
        check_name(name)?;
        let store = self.store.make_subdirectory(name.to_owned())?;
        Ok(Attrs { store })
    }

    /// Return the underlying store.
    pub fn into_inner(self) -> &'a mut ObjectStore<String, C> {
        self.store
    }
}

impl<C: Codec> ObjectStore<String, C> {
    /// Return named access to the values in this store.
    pub fn attrs(&mut self) -> Attrs<'_, C> {
        Attrs { store: self }
    }
}
