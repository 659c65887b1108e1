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

use anyhow::Result;
use deadpool_redis::redis;
use std::collections::HashMap;

use super::{scripts, Database, Package};
use crate::doc::PackageDoc;
use crate::rank::is_standard_package;

impl Database {
    /// Expand the import graph reachable from a root document.
    ///
    /// Breadth-first: node 0 is the root, its direct imports seed the
    /// queue, and each visited node contributes edges for the `import:`
    /// terms of its stored record. Lookups for one frontier run as a single
    /// pipeline of the node script; responses are consumed in FIFO order.
    /// The path-to-index map both deduplicates nodes and terminates cycles.
    /// With `hide_std_deps`, standard-package nodes are not expanded.
    pub async fn import_graph(
        &self,
        doc: &PackageDoc,
        hide_std_deps: bool,
    ) -> Result<(Vec<Package>, Vec<(usize, usize)>)> {
        let mut conn = self.conn().await?;
        scripts::IMPORT_GRAPH_NODE
            .prepare_invoke()
            .load_async(&mut conn)
            .await?;

        let mut nodes = vec![Package {
            path: doc.import_path.clone(),
            synopsis: doc.synopsis.clone(),
            kind: super::Kind::Unknown,
        }];
        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        index.insert(doc.import_path.clone(), 0);

        // Links to packages with invalid import paths are only included for
        // the root package.
        for path in &doc.imports {
            let j = nodes.len();
            index.insert(path.clone(), j);
            edges.push((0, j));
            nodes.push(Package::new(path.clone()));
        }

        let mut cursor = 1;
        while cursor < nodes.len() {
            let frontier: Vec<String> =
                nodes[cursor..].iter().map(|n| n.path.clone()).collect();

            let invocations: Vec<_> = frontier
                .iter()
                .map(|p| {
                    let mut inv = scripts::IMPORT_GRAPH_NODE.prepare_invoke();
                    inv.arg(p.as_str());
                    inv
                })
                .collect();
            let mut pipe = redis::pipe();
            for inv in &invocations {
                pipe.invoke_script(inv);
            }
            let replies: Vec<Option<(Option<String>, Option<String>)>> =
                pipe.query_async(&mut conn).await?;

            for (k, reply) in replies.into_iter().enumerate() {
                let i = cursor + k;
                let Some((synopsis, terms)) = reply else {
                    continue;
                };
                nodes[i].synopsis = synopsis.unwrap_or_default();
                if hide_std_deps && is_standard_package(&nodes[i].path) {
                    continue;
                }
                for term in terms.unwrap_or_default().split_whitespace() {
                    if let Some(path) = term.strip_prefix("import:") {
                        let j = match index.get(path) {
                            Some(&j) => j,
                            None => {
                                let j = nodes.len();
                                index.insert(path.to_string(), j);
                                nodes.push(Package::new(path.to_string()));
                                j
                            }
                        };
                        edges.push((i, j));
                    }
                }
            }
            cursor += frontier.len();
        }

        Ok((nodes, edges))
    }
}
