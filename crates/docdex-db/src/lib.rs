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

//! Storage and index core for the docdex documentation service.
//!
//! Package documents arrive fully parsed from an external fetcher and are
//! persisted to Redis together with the inverted indexes that back keyword
//! search, importer lookups and project listings. Every multi-step mutation
//! runs as a server-side Lua script so concurrent writers never observe a
//! half-updated index.
//!
//! Redis keys and types:
//!
//! - `maxPackageId` string: next package id to assign
//! - `ids` hash: import path -> package id
//! - `pkg:<id>` hash:
//!     - `terms`: space separated search terms
//!     - `path`: import path
//!     - `synopsis`: synopsis
//!     - `blob`: snappy compressed JSON encoded package document
//!     - `score`: document search score
//!     - `etag`: opaque version tag from the fetcher
//!     - `kind`: p=package, c=command, d=directory with no sources
//!     - `crawl`: Unix time of the next scheduled crawl
//! - `index:<term>` set: package ids for the given search term
//! - `index:import:<path>` set: packages importing `<path>`
//! - `index:project:<root>` set: packages in the project with that root
//! - `block` set: path prefixes that must not be indexed
//! - `popular` zset: package id scored by decayed usage
//! - `popular:0` string: scaled base time for popular scores
//! - `nextCrawl` zset: package id scored by next-crawl Unix time
//! - `newCrawl` set: new paths queued for a first crawl
//! - `badCrawl` set: paths whose crawl failed
//! - `counter:<key>` string: decayed named counter, JSON `{n, t}`
//! - `blob:<key>` string: typed blob cache

pub mod config;
pub mod db;
pub mod doc;
pub mod path;
pub mod rank;
pub mod tokenize;

pub use config::{load_db_config, DbConfig, MergeOpts};
pub use db::{Database, Kind, Package, PackageInfo};
pub use doc::PackageDoc;
