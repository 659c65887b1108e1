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

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use deadpool_redis::redis;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;

use super::{scripts, Database, Kind};
use crate::doc::{compress, encode_doc, PackageDoc};
use crate::path::is_valid_remote_path;
use crate::rank::{document_rank, document_terms};

/// Documents whose encoded form exceeds this are stored without their body
/// sections.
const MAX_BLOB_LEN: usize = 200_000;

impl Database {
    /// Persist a package document: compute rank and terms, encode and
    /// compress the blob, and run the atomic put script. `next_crawl`
    /// of `None` persists the record without touching the crawl schedule
    /// and skips the related-path enqueue (not a full save).
    ///
    /// The secondary enqueue of related paths runs as a second round trip;
    /// the record itself is already durable if it fails.
    pub async fn put(&self, doc: &PackageDoc, next_crawl: Option<DateTime<Utc>>) -> Result<()> {
        self.log_op("put", &doc.import_path);
        let mut conn = self.conn().await?;

        let score = document_rank(doc);
        let terms = document_terms(doc, score);

        let mut encoded = encode_doc(doc)?;
        if encoded.len() > MAX_BLOB_LEN {
            encoded = encode_doc(&doc.truncated_copy())?;
        }
        let blob = compress(&encoded)?;

        let kind = if doc.name.is_empty() {
            Kind::Directory
        } else if doc.is_cmd {
            Kind::Command
        } else {
            Kind::Package
        };

        let t = next_crawl.map(|t| t.timestamp()).unwrap_or(0);

        let _: () = scripts::PUT
            .arg(&doc.import_path)
            .arg(&doc.synopsis)
            .arg(score)
            .arg(blob.as_slice())
            .arg(terms.join(" "))
            .arg(&doc.etag)
            .arg(kind.as_str())
            .arg(t)
            .invoke_async(&mut conn)
            .await
            .with_context(|| format!("putting {}", doc.import_path))?;

        if next_crawl.is_none() {
            return Ok(());
        }

        let mut related: BTreeSet<&str> = BTreeSet::new();
        for p in doc
            .imports
            .iter()
            .chain(&doc.test_imports)
            .chain(&doc.xtest_imports)
        {
            if is_valid_remote_path(p) {
                related.insert(p);
            }
        }
        if !doc.project_root.is_empty() && doc.import_path != doc.project_root {
            related.insert(&doc.project_root);
        }
        let subdir_paths: Vec<String> = doc
            .subdirectories
            .iter()
            .map(|s| format!("{}/{}", doc.import_path, s))
            .collect();

        let mut inv = scripts::ADD_CRAWL.prepare_invoke();
        for p in &related {
            inv.arg(*p);
        }
        for p in &subdir_paths {
            inv.arg(p.as_str());
        }
        let _: () = inv
            .invoke_async(&mut conn)
            .await
            .with_context(|| format!("queueing crawls for {}", doc.import_path))?;
        Ok(())
    }

    /// Remove a record and every cross-reference to it in one atomic unit.
    /// Deleting an unknown path is a no-op.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.log_op("delete", path);
        let mut conn = self.conn().await?;
        let _: () = scripts::DELETE.arg(path).invoke_async(&mut conn).await?;
        Ok(())
    }

    /// Block a path prefix and delete every indexed package at or below it.
    pub async fn block(&self, root: &str) -> Result<()> {
        self.log_op("block", root);
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SADD")
            .arg("block")
            .arg(root)
            .query_async(&mut conn)
            .await?;
        let paths: Vec<String> = redis::cmd("HKEYS")
            .arg("ids")
            .query_async(&mut conn)
            .await?;
        let prefix = format!("{}/", root);
        for path in paths {
            if path == root || path.starts_with(&prefix) {
                let _: () = scripts::DELETE.arg(&path).invoke_async(&mut conn).await?;
            }
        }
        Ok(())
    }

    /// True when any `/`-separated prefix of the path has been blocked.
    pub async fn is_blocked(&self, path: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let blocked: i64 = scripts::IS_BLOCKED.arg(path).invoke_async(&mut conn).await?;
        Ok(blocked == 1)
    }

    /// Store a typed value in the blob cache.
    pub async fn put_blob<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let encoded = serde_json::to_vec(value).with_context(|| format!("encoding blob {}", key))?;
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SET")
            .arg(format!("blob:{}", key))
            .arg(encoded)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Fetch a typed value from the blob cache. Absent keys are `None`.
    pub async fn get_blob<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.conn().await?;
        let raw: Option<Vec<u8>> = redis::cmd("GET")
            .arg(format!("blob:{}", key))
            .query_async(&mut conn)
            .await?;
        match raw {
            None => Ok(None),
            Some(raw) => Ok(Some(
                serde_json::from_slice(&raw).with_context(|| format!("decoding blob {}", key))?,
            )),
        }
    }
}
