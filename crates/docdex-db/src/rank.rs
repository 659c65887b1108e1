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

//! Per-document rank and search-term extraction.

use crate::doc::PackageDoc;
use crate::path;
use crate::tokenize::{is_stop_word, is_term_sep, parse_query, stem, suggest_prefix};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Subrepo packages of the legacy standard-library mirror rank between the
/// standard library and ordinary packages.
const LEGACY_SUBREPO_PREFIX: &str = "code.google.com/p/go.";

static HTTP_PAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());

/// A standard package has no host element anywhere in its path.
pub fn is_standard_package(path: &str) -> bool {
    !path.contains('.')
}

/// Standard packages have an empty project root; the index reserves the
/// literal `go` for them.
pub fn normalize_project_root(project_root: &str) -> &str {
    if project_root.is_empty() {
        "go"
    } else {
        project_root
    }
}

/// Compute the document search rank. Zero means the document is excluded
/// from keyword search entirely.
pub fn document_rank(doc: &PackageDoc) -> f64 {
    if doc.name.is_empty()
        || doc.is_cmd
        || !doc.errors.is_empty()
        || doc.import_path.ends_with(".go")
    {
        return 0.0;
    }

    if doc.imports.iter().any(|p| p.ends_with(".go")) {
        return 0.0;
    }

    if !doc.truncated && doc.is_empty() {
        return 0.0;
    }

    let mut r = if is_standard_package(&doc.import_path) {
        1000.0
    } else if doc.import_path.starts_with(LEGACY_SUBREPO_PREFIX) {
        500.0
    } else if doc.synopsis.starts_with(&format!("Package {} ", doc.name)) {
        100.0
    } else if !doc.synopsis.is_empty() {
        10.0
    } else {
        1.0
    };

    let below_root = &doc.import_path[doc.project_root.len().min(doc.import_path.len())..];
    if below_root.find("/src/").map_or(false, |i| i > 0) {
        r *= 0.85;
    }

    if path::base(&doc.import_path) != doc.name {
        r *= 0.9;
    }

    r
}

/// Extract the terms persisted for a document. `project:` and `import:`
/// cross-reference terms are always present; search terms only when the
/// document ranks above zero.
pub fn document_terms(doc: &PackageDoc, rank: f64) -> Vec<String> {
    let mut terms = BTreeSet::new();

    terms.insert(format!(
        "project:{}",
        normalize_project_root(&doc.project_root)
    ));

    for p in &doc.imports {
        if path::is_valid_path(p) {
            terms.insert(format!("import:{}", p));
        }
    }

    if rank > 0.0 {
        if is_standard_package(&doc.import_path) {
            terms.extend(parse_query(&doc.import_path));
        } else {
            terms.insert("all:".to_string());
            terms.extend(parse_query(&doc.project_name));
            terms.extend(parse_query(&doc.name));
        }

        // Synopsis tokens, with URLs stripped. The token "package" is noise
        // in the leading boilerplate but meaningful later in the sentence.
        let synopsis = HTTP_PAT.replace_all(&doc.synopsis, "");
        for (i, s) in synopsis.split(is_term_sep).filter(|s| !s.is_empty()).enumerate() {
            let s = s.to_lowercase();
            if !is_stop_word(&s) && (i > 3 || s != "package") {
                terms.insert(stem(&s));
            }
        }

        let prefix = suggest_prefix(path::base(&doc.import_path));
        if !prefix.is_empty() {
            terms.insert(format!("suggest:{}", prefix));
        }
    }

    terms.into_iter().collect()
}
