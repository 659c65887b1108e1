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

//! Syntactic validation of URL-like import paths.

const MAX_PATH_LEN: usize = 140;

fn valid_element(s: &str) -> bool {
    if s.is_empty() || s == "." || s == ".." {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '~' | '+'))
}

/// True for any syntactically valid import path, including standard
/// packages without a host element.
pub fn is_valid_path(path: &str) -> bool {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return false;
    }
    path.split('/').all(valid_element)
}

/// True for import paths rooted at a host, the only paths the crawler will
/// fetch. The first element must look like a domain name.
pub fn is_valid_remote_path(path: &str) -> bool {
    if !is_valid_path(path) {
        return false;
    }
    let host = path.split('/').next().unwrap_or("");
    host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with('.')
        && !host.starts_with('-')
        && !host.contains("..")
}

/// The last `/`-separated component of an import path.
pub fn base(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
