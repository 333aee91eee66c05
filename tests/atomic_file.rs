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

use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::tempdir;

use common::*;
use dirstore::codec::MessagePack;
use dirstore::file::{load, load_or_compute, save, write_atomic, write_atomic_with};

mod common;

/// Return the names of the files in `directory`.
fn file_names(directory: &Path) -> anyhow::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(directory)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}

#[rstest]
fn write_creates_file(buffer: Vec<u8>) -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("data");

    let size = write_atomic(&path, &buffer)?;

    assert_that!(size).is_equal_to(&(buffer.len() as u64));
    assert_that!(fs::read(&path)?).is_equal_to(&buffer);
    assert_that!(file_names(directory.path())?).is_equal_to(&vec!["data".to_string()]);

    Ok(())
}

#[rstest]
fn write_replaces_file(buffer: Vec<u8>) -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("data");
    fs::write(&path, b"old contents")?;

    write_atomic(&path, &buffer)?;

    assert_that!(fs::read(&path)?).is_equal_to(&buffer);

    Ok(())
}

#[test]
fn interrupted_write_leaves_old_contents() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("data");
    fs::write(&path, b"old contents")?;

    let result = write_atomic_with(&path, |file| {
        file.write_all(b"new cont")?;
        Err(dirstore::Error::Serialize)
    });

    assert_that!(result).is_err_variant(dirstore::Error::Serialize);
    assert_that!(fs::read(&path)?).is_equal_to(&b"old contents".to_vec());
    assert_that!(file_names(directory.path())?).is_equal_to(&vec!["data".to_string()]);

    Ok(())
}

#[test]
fn interrupted_write_does_not_create_file() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("data");

    let result = write_atomic_with(&path, |_| Err(dirstore::Error::Serialize));

    assert_that!(result).is_err_variant(dirstore::Error::Serialize);
    assert_that!(path.exists()).is_false();
    assert_that!(file_names(directory.path())?).is_equal_to(&Vec::<String>::new());

    Ok(())
}

#[test]
fn write_to_missing_directory_errs() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("missing").join("data");

    assert_that!(write_atomic(&path, b"data")).is_err_variant(dirstore::Error::Io(
        std::io::Error::from(std::io::ErrorKind::NotFound),
    ));

    Ok(())
}

#[test]
fn saved_value_can_be_loaded() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("value");
    let value = (String::from("text"), vec![1.5f64, 2.5]);

    save(&path, &value, &MessagePack)?;

    assert_that!(load::<(String, Vec<f64>), _>(&path, &MessagePack)?).is_equal_to(&value);

    Ok(())
}

#[test]
fn load_missing_file_errs() -> anyhow::Result<()> {
    let directory = tempdir()?;

    assert_that!(load::<u32, _>(&directory.path().join("missing"), &MessagePack))
        .is_err_variant(dirstore::Error::NotFound);

    Ok(())
}

#[test]
fn load_or_compute_computes_once() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("value");
    let calls = Cell::new(0);
    let thunk = || {
        calls.set(calls.get() + 1);
        vec![3u32, 2, 1]
    };

    let first: Vec<u32> = load_or_compute(&path, &MessagePack, thunk)?;
    let second: Vec<u32> = load_or_compute(&path, &MessagePack, thunk)?;

    assert_that!(first).is_equal_to(&vec![3, 2, 1]);
    assert_that!(second).is_equal_to(&vec![3, 2, 1]);
    assert_that!(calls.get()).is_equal_to(&1);

    Ok(())
}

#[test]
fn load_or_compute_does_not_overwrite_corrupt_file() -> anyhow::Result<()> {
    let directory = tempdir()?;
    let path = directory.path().join("value");
    fs::write(&path, [0xc1u8])?;

    let result = load_or_compute(&path, &MessagePack, || 1u32);

    assert_that!(result).is_err_variant(dirstore::Error::Deserialize);
    assert_that!(fs::read(&path)?).is_equal_to(&vec![0xc1u8]);

    Ok(())
}
