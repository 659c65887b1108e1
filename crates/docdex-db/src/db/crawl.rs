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

//! Crawl-queue state: new paths, failed paths, and rescheduling.

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use deadpool_redis::redis;

use super::{scripts, Database, Package};
use crate::path::is_valid_remote_path;
use crate::rank::normalize_project_root;

impl Database {
    /// Queue a path for a first crawl. Paths already indexed or known bad
    /// are silently skipped; syntactically invalid paths are an error.
    pub async fn add_new_crawl(&self, import_path: &str) -> Result<()> {
        if !is_valid_remote_path(import_path) {
            bail!("bad path: {}", import_path);
        }
        self.log_op("add_new_crawl", import_path);
        let mut conn = self.conn().await?;
        let _: () = scripts::ADD_CRAWL
            .arg(import_path)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Pop an arbitrary queued path, with a hint whether the store already
    /// knows subdirectories under it. Empty queue is `None`.
    pub async fn pop_new_crawl(&self) -> Result<Option<(String, bool)>> {
        let mut conn = self.conn().await?;
        let path: Option<String> = redis::cmd("SPOP")
            .arg("newCrawl")
            .query_async(&mut conn)
            .await?;
        let Some(path) = path else {
            return Ok(None);
        };
        let subdirs: Vec<Package> = self.subdirs_on(&mut conn, &path, None).await?;
        Ok(Some((path, !subdirs.is_empty())))
    }

    /// Record a path whose crawl failed so it is never re-queued.
    pub async fn add_bad_crawl(&self, path: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = redis::cmd("SADD")
            .arg("badCrawl")
            .arg(path)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Pull a project's crawl schedule forward after a push notification:
    /// each package becomes due now, and the `nextCrawl` scores are packed
    /// into a short window an hour out.
    pub async fn bump_crawl(&self, project_root: &str) -> Result<()> {
        self.log_op("bump_crawl", project_root);
        let mut conn = self.conn().await?;
        let _: () = scripts::BUMP_CRAWL
            .arg(normalize_project_root(project_root))
            .arg(Utc::now().timestamp())
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Set the next crawl time for all packages in the project whose stored
    /// etag matches.
    pub async fn set_next_crawl_etag(
        &self,
        project_root: &str,
        etag: &str,
        t: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = scripts::SET_NEXT_CRAWL_ETAG
            .arg(normalize_project_root(project_root))
            .arg(etag)
            .arg(t.timestamp())
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }
}
