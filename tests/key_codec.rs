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

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;

use dirstore::store::key::{decode, encode};
use dirstore::store::ESCAPE_PREFIX;

use common::*;

mod common;

const NO_FILES: [&str; 0] = [];

#[test]
fn plain_string_is_its_own_name() -> anyhow::Result<()> {
    let name = encode(&"results".to_string(), NO_FILES, "")?;

    assert_that!(name).is_equal_to(&"results".to_string());
    assert_that!(decode::<String>(&name, "")?).is_equal_to(&"results".to_string());

    Ok(())
}

#[test]
fn empty_string_is_invalid() {
    assert_that!(encode(&String::new(), NO_FILES, "")).is_err_variant(dirstore::Error::InvalidKey);
}

#[rstest]
#[case::leading_escape("+plus")]
#[case::separator("dir/file")]
#[case::current_dir(".")]
#[case::parent_dir("..")]
fn unsafe_string_is_escaped(#[case] key: &str) -> anyhow::Result<()> {
    let key = key.to_string();
    let name = encode(&key, NO_FILES, "")?;

    assert_that!(name.starts_with(ESCAPE_PREFIX)).is_true();
    assert_that!(name.contains('/')).is_false();
    assert_that!(decode::<String>(&name, "")?).is_equal_to(&key);

    Ok(())
}

#[test]
fn tuple_key_round_trips() -> anyhow::Result<()> {
    let key = (1i32, "two".to_string(), false);
    let name = encode(&key, NO_FILES, "")?;

    assert_that!(name.starts_with(ESCAPE_PREFIX)).is_true();
    assert_that!(decode::<(i32, String, bool)>(&name, "")?).is_equal_to(&key);

    Ok(())
}

#[test]
fn integer_key_round_trips() -> anyhow::Result<()> {
    let name = encode(&-17i64, NO_FILES, "")?;

    assert_that!(decode::<i64>(&name, "")?).is_equal_to(&-17);

    Ok(())
}

#[test]
fn existing_name_is_reused() -> anyhow::Result<()> {
    let key = (4u8, 2u8);

    // The same tuple with each element stored as a 32-bit int, which is not how it would be
    // encoded today but still decodes to an equal key.
    let mut serialized = vec![0x92, 0xce];
    serialized.extend_from_slice(&4u32.to_be_bytes());
    serialized.push(0xce);
    serialized.extend_from_slice(&2u32.to_be_bytes());
    assert_that!(serialized == rmp_serde::to_vec(&key)?).is_false();

    let existing = format!("{}{}.bin", ESCAPE_PREFIX, URL_SAFE.encode(&serialized));
    let files = vec!["other".to_string(), existing.clone()];

    let name = encode(&key, &files, ".bin")?;

    assert_that!(format!("{}.bin", name)).is_equal_to(&existing);
    assert_that!(decode::<(u8, u8)>(&existing, ".bin")?).is_equal_to(&key);

    Ok(())
}

#[test]
fn staging_files_are_never_matched() -> anyhow::Result<()> {
    let key = (1u8, 1u8);
    let fresh = encode(&key, NO_FILES, "")?;
    let staging = format!("+~{}", &fresh[1..]);

    let name = encode(&key, vec![staging], "")?;

    assert_that!(name).is_equal_to(&fresh);

    Ok(())
}

#[test]
fn extension_is_stripped_on_decode() -> anyhow::Result<()> {
    assert_that!(decode::<String>("abc.dat", ".dat")?).is_equal_to(&"abc".to_string());
    assert_that!(decode::<String>("abc", ".dat")?).is_equal_to(&"abc".to_string());

    Ok(())
}

#[test]
fn undecodable_name_is_key_type_error() {
    assert_that!(decode::<(i32, i32)>("plain", "")).is_err_variant(dirstore::Error::KeyType);
    assert_that!(decode::<String>("+!!!not-base64", "")).is_err_variant(dirstore::Error::KeyType);
}
