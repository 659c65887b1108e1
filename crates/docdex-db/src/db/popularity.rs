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

//! Exponentially decayed popularity scores and named counters.
//!
//! Events are recorded in "scaled time" tau = ln2 * (t - epoch) / half_life,
//! so a raw increment of n at time t weighs n * exp(tau). Relative weights
//! then decay by half per half-life without ever rewriting old entries; a
//! periodic rescale divides the whole zset down to keep the numbers in a
//! bounded range.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{scripts, Database, Package};

/// Popularity halves every week.
const POPULAR_HALF_LIFE_SECS: i64 = 7 * 24 * 3600;

/// Named counters halve every hour.
const COUNTER_HALF_LIFE_SECS: i64 = 3600;

/// Fixed reference point for scaled time, Unix seconds.
const EPOCH_SECS: i64 = 1_257_894_000;

pub(crate) fn scaled_time(t: DateTime<Utc>, half_life_secs: i64) -> f64 {
    let dt = (t.timestamp_millis() - EPOCH_SECS * 1000) as f64 / 1000.0;
    std::f64::consts::LN_2 * dt / half_life_secs as f64
}

impl Database {
    /// Record one usage event for a path. Unknown paths are dropped
    /// silently.
    pub async fn increment_popular_score(&self, path: &str) -> Result<()> {
        self.increment_popular_score_at(path, 1.0, Utc::now()).await
    }

    /// Record a weighted usage event at an explicit wall time.
    pub async fn increment_popular_score_at(
        &self,
        path: &str,
        delta: f64,
        t: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = scripts::INCREMENT_POPULAR
            .arg(path)
            .arg(delta)
            .arg(scaled_time(t, POPULAR_HALF_LIFE_SECS))
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    /// The `count` most popular packages by decayed score.
    pub async fn popular(&self, count: usize) -> Result<Vec<Package>> {
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = scripts::POPULAR
            .arg(count as i64 - 1)
            .invoke_async(&mut conn)
            .await?;
        Ok(super::queries::packages_from_triples(values, false))
    }

    /// The full popularity listing with raw stored scores. The score is
    /// returned in the synopsis slot of each summary.
    pub async fn popular_with_scores(&self) -> Result<Vec<Package>> {
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = scripts::POPULAR_WITH_SCORES
            .prepare_invoke()
            .invoke_async(&mut conn)
            .await?;
        Ok(super::queries::packages_from_triples(values, false))
    }

    /// Add `delta` to a decayed named counter and return its new value.
    pub async fn increment_counter(&self, key: &str, delta: f64) -> Result<f64> {
        self.increment_counter_at(key, delta, Utc::now()).await
    }

    /// Counter increment at an explicit wall time.
    pub async fn increment_counter_at(
        &self,
        key: &str,
        delta: f64,
        t: DateTime<Utc>,
    ) -> Result<f64> {
        let mut conn = self.conn().await?;
        let n: f64 = scripts::INCREMENT_COUNTER
            .arg(key)
            .arg(delta)
            .arg(scaled_time(t, COUNTER_HALF_LIFE_SECS))
            .arg(4 * COUNTER_HALF_LIFE_SECS)
            .invoke_async(&mut conn)
            .await?;
        Ok(n)
    }
}
