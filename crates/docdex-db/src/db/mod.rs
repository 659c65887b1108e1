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

//! The Redis-backed store: connection handling, atomic mutators, queries,
//! crawl scheduling and popularity counters.

mod connection;
mod crawl;
mod graph;
mod popularity;
mod queries;
mod scripts;
#[cfg(test)]
mod tests;
mod writer;

pub use connection::Database;
pub use queries::PackageInfo;

use serde::{Deserialize, Serialize};

/// Record kind stored in the `kind` field of the package hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// A package with sources.
    #[serde(rename = "p")]
    Package,
    /// A command.
    #[serde(rename = "c")]
    Command,
    /// A directory without sources.
    #[serde(rename = "d")]
    Directory,
    /// Unknown or absent.
    #[serde(rename = "u")]
    Unknown,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Package => "p",
            Kind::Command => "c",
            Kind::Directory => "d",
            Kind::Unknown => "u",
        }
    }

    /// Anything unrecognized reads as `Unknown`.
    pub fn parse(s: &str) -> Kind {
        match s {
            "p" => Kind::Package,
            "c" => Kind::Command,
            "d" => Kind::Directory,
            _ => Kind::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Kind::Unknown)
    }
}

/// A package summary as returned by listings and queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub synopsis: String,
    #[serde(default = "unknown_kind", skip_serializing_if = "Kind::is_unknown")]
    pub kind: Kind,
}

fn unknown_kind() -> Kind {
    Kind::Unknown
}

impl Package {
    pub fn new(path: impl Into<String>) -> Package {
        Package {
            path: path.into(),
            synopsis: String::new(),
            kind: Kind::Unknown,
        }
    }
}
