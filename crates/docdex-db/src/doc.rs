// Copyright 2025 Docdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The parsed package document consumed from the fetcher, and its blob codec.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An exported const or var block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueDoc {
    pub decl: String,
    pub url: String,
    pub doc: String,
}

/// An exported function or method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FuncDoc {
    pub decl: String,
    pub url: String,
    pub doc: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recv: String,
}

/// An exported type with its factories and methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDoc {
    pub doc: String,
    pub name: String,
    pub decl: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factories: Vec<FuncDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<FuncDoc>,
}

/// A runnable example attached to a declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExampleDoc {
    pub name: String,
    pub doc: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub output: String,
}

/// A fully parsed package document as produced by the fetcher.
///
/// The store never inspects source code; it only persists, indexes and
/// returns documents of this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDoc {
    pub import_path: String,
    #[serde(default)]
    pub project_root: String,
    #[serde(default)]
    pub project_name: String,
    /// Package name. Empty means the path is a directory without sources.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub is_cmd: bool,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub test_imports: Vec<String>,
    #[serde(default)]
    pub xtest_imports: Vec<String>,
    /// Subdirectory names relative to the import path.
    #[serde(default)]
    pub subdirectories: Vec<String>,
    #[serde(default)]
    pub etag: String,
    pub updated: DateTime<Utc>,
    /// Set when the stored blob had its sections dropped for size.
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub consts: Vec<ValueDoc>,
    #[serde(default)]
    pub vars: Vec<ValueDoc>,
    #[serde(default)]
    pub funcs: Vec<FuncDoc>,
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    #[serde(default)]
    pub examples: Vec<ExampleDoc>,
}

impl PackageDoc {
    /// True when the document exports nothing and carries no examples.
    pub fn is_empty(&self) -> bool {
        self.consts.is_empty()
            && self.vars.is_empty()
            && self.funcs.is_empty()
            && self.types.is_empty()
            && self.examples.is_empty()
    }

    /// A copy with all body sections dropped and `truncated` set. Used when
    /// the encoded blob exceeds the storage limit.
    pub fn truncated_copy(&self) -> PackageDoc {
        let mut doc = self.clone();
        doc.truncated = true;
        doc.consts = Vec::new();
        doc.vars = Vec::new();
        doc.funcs = Vec::new();
        doc.types = Vec::new();
        doc.examples = Vec::new();
        doc
    }
}

/// Serialize a document to its uncompressed JSON form.
pub fn encode_doc(doc: &PackageDoc) -> Result<Vec<u8>> {
    serde_json::to_vec(doc).with_context(|| format!("encoding {}", doc.import_path))
}

/// Snappy-compress an encoded document for storage.
pub fn compress(encoded: &[u8]) -> Result<Vec<u8>> {
    snap::raw::Encoder::new()
        .compress_vec(encoded)
        .context("snappy encoding")
}

/// Decode a stored blob back into a document. `path` is only used for error
/// context; absent paths are handled before decoding.
pub fn decode_doc(blob: &[u8], path: &str) -> Result<PackageDoc> {
    let raw = snap::raw::Decoder::new()
        .decompress_vec(blob)
        .with_context(|| format!("snappy decoding {}", path))?;
    serde_json::from_slice(&raw).with_context(|| format!("decoding {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(path: &str) -> PackageDoc {
        PackageDoc {
            import_path: path.to_string(),
            project_root: String::new(),
            project_name: String::new(),
            name: "bytes".to_string(),
            synopsis: "Package bytes implements functions for byte slices.".to_string(),
            doc: String::new(),
            is_cmd: false,
            imports: vec!["unicode".to_string()],
            test_imports: Vec::new(),
            xtest_imports: Vec::new(),
            subdirectories: Vec::new(),
            etag: "v1".to_string(),
            updated: Utc::now(),
            truncated: false,
            errors: Vec::new(),
            consts: Vec::new(),
            vars: Vec::new(),
            funcs: vec![FuncDoc {
                decl: "func Compare(a, b []byte) int".to_string(),
                name: "Compare".to_string(),
                ..Default::default()
            }],
            types: Vec::new(),
            examples: Vec::new(),
        }
    }

    #[test]
    fn blob_round_trip_keeps_document() {
        let d = doc("bytes");
        let blob = compress(&encode_doc(&d).unwrap()).unwrap();
        let got = decode_doc(&blob, "bytes").unwrap();
        assert_eq!(got, d);
    }

    #[test]
    fn truncated_copy_drops_sections() {
        let d = doc("bytes");
        let t = d.truncated_copy();
        assert!(t.truncated);
        assert!(t.is_empty());
        // non-section fields survive
        assert_eq!(t.import_path, d.import_path);
        assert_eq!(t.synopsis, d.synopsis);
        assert!(!d.is_empty());
    }

    #[test]
    fn decode_error_names_the_path() {
        let err = decode_doc(b"not snappy", "example.com/x").unwrap_err();
        assert!(format!("{err:#}").contains("example.com/x"));
    }
}
