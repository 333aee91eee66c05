/*
 * Copyright 2019 Garrett Powell
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
use std::io;
use std::result;

use thiserror::Error as DeriveError;

/// The error type for operations with a store.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// There is no value associated with the key.
    #[error("There is no value associated with the key.")]
    NotFound,

    /// The key can not be used in a store.
    #[error("The key can not be used in a store.")]
    InvalidKey,

    /// A file name in the store could not be decoded as the store's key type.
    #[error("A file name in the store could not be decoded as the store's key type.")]
    KeyType,

    /// The directory is not empty.
    #[error("The directory is not empty.")]
    NotEmpty,

    /// The key refers to a value rather than a nested store.
    #[error("The key refers to a value rather than a nested store.")]
    NotDirectory,

    /// The key refers to a nested store rather than a value.
    #[error("The key refers to a nested store rather than a value.")]
    NotFile,

    /// This operation is not supported.
    #[error("This operation is not supported.")]
    Unsupported,

    /// A value could not be serialized.
    #[error("A value could not be serialized.")]
    Serialize,

    /// A value could not be deserialized.
    #[error("A value could not be deserialized.")]
    Deserialize,

    /// An I/O error occurred.
    #[error("{0}")]
    Io(#[from] io::Error),
}

/// The result type for operations with a store.
pub type Result<T> = result::Result<T, Error>;
