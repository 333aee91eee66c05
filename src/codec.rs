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

//! Serialization backends for values in a store.
//!
//! A store doesn't care how values are represented on disk; it hands each value to a [`Codec`]
//! and writes whatever bytes come back. [`MessagePack`] is the default and is a space-efficient
//! binary format. [`Json`] is available with the `codec-json` feature and produces files which
//! are easier to inspect by hand.
//!
//! [`Codec`]: crate::codec::Codec
//! [`MessagePack`]: crate::codec::MessagePack
//! [`Json`]: crate::codec::Json

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A pair of functions for converting values to bytes and back.
///
/// Implementations must report failures as [`Error::Serialize`] or [`Error::Deserialize`] rather
/// than panicking, since stores may contain data written by other versions of a program.
///
/// [`Error::Serialize`]: crate::Error::Serialize
/// [`Error::Deserialize`]: crate::Error::Deserialize
pub trait Codec: Debug + Clone {
    /// Serialize `value` to a new buffer.
    ///
    /// # Errors
    /// - `Error::Serialize`: The `value` could not be serialized.
    fn encode<V: Serialize>(&self, value: &V) -> crate::Result<Vec<u8>>;

    /// Deserialize a value of type `V` from `data`.
    ///
    /// # Errors
    /// - `Error::Deserialize`: The `data` is not a valid value of type `V`.
    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> crate::Result<V>;
}

/// A [`Codec`] which uses the MessagePack binary format.
///
/// [`Codec`]: crate::codec::Codec
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessagePack;

impl Codec for MessagePack {
    fn encode<V: Serialize>(&self, value: &V) -> crate::Result<Vec<u8>> {
        rmp_serde::to_vec(value).map_err(|_| crate::Error::Serialize)
    }

    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> crate::Result<V> {
        rmp_serde::from_read(data).map_err(|_| crate::Error::Deserialize)
    }
}

/// A [`Codec`] which uses JSON.
///
/// [`Codec`]: crate::codec::Codec
#[cfg(feature = "codec-json")]
#[cfg_attr(docsrs, doc(cfg(feature = "codec-json")))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Json;

#[cfg(feature = "codec-json")]
impl Codec for Json {
    fn encode<V: Serialize>(&self, value: &V) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|_| crate::Error::Serialize)
    }

    fn decode<V: DeserializeOwned>(&self, data: &[u8]) -> crate::Result<V> {
        serde_json::from_slice(data).map_err(|_| crate::Error::Deserialize)
    }
}
