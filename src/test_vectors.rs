//! Loaders for the byte-exact reference vectors under `testdata/`.
//!
//! Byte strings in the JSON files are base64 encoded.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DoubleHashVector {
    pub input: String,
    pub expected: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockRead {
    pub len: usize,
    pub expected: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneratorVector {
    pub input: String,
    pub expected: Vec<BlockRead>,
}

pub fn load_double_hash() -> Vec<DoubleHashVector> {
    load("double_hash.json")
}

pub fn load_generator() -> Vec<GeneratorVector> {
    load("generator.json")
}

pub fn b64(data: &str) -> Vec<u8> {
    STANDARD.decode(data).expect("invalid base64 in test vector")
}

fn load<T: DeserializeOwned>(name: &str) -> Vec<T> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_str(&content).expect("malformed test vector file")
}
