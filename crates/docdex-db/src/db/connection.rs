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

use anyhow::{anyhow, Context, Result};
use deadpool_redis::redis;
use deadpool_redis::{Config as RedisConfig, Connection, Pool, PoolConfig, Runtime};

use crate::config::DbConfig;

/// Pooled connections kept around for request handlers.
const MAX_POOL_SIZE: usize = 10;

/// Handle to the Redis-backed store. Cheap to clone; all operations borrow
/// a pooled connection for the duration of one logical operation and return
/// it on every exit path.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
    log_commands: bool,
}

impl Database {
    /// Build the connection pool and verify the server is reachable.
    /// A password in the URL's user-info component is used for AUTH.
    pub async fn connect(config: &DbConfig) -> Result<Database> {
        let mut cfg = RedisConfig::from_url(&config.url);
        let mut pool_cfg = PoolConfig::new(MAX_POOL_SIZE);
        pool_cfg.timeouts.wait = Some(config.idle_timeout);
        cfg.pool = Some(pool_cfg);

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .with_context(|| format!("creating redis pool for {}", config.url))?;

        let db = Database {
            pool,
            log_commands: config.log_commands,
        };

        let mut conn = db.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("pinging redis")?;

        Ok(db)
    }

    pub(crate) async fn conn(&self) -> Result<Connection> {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow!("redis pool: {}", e))
    }

    pub(crate) fn log_op(&self, op: &str, arg: &str) {
        if self.log_commands {
            tracing::debug!(op, arg, "store command");
        }
    }
}
