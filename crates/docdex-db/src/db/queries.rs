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
use deadpool_redis::Connection;

use super::{scripts, Database, Kind, Package};
use crate::doc::{decode_doc, PackageDoc};
use crate::rank::{is_standard_package, normalize_project_root};
use crate::tokenize::parse_query;

const C_SYNOPSIS: &str =
    "Package C is a \"pseudo-package\" used to access the C namespace from a cgo source file.";

/// One record visited by [`Database::for_each`].
#[derive(Debug)]
pub struct PackageInfo {
    pub doc: PackageDoc,
    pub subdirs: Vec<Package>,
    pub score: f64,
    pub kind: Kind,
    /// Stored footprint of the record's main hash fields, in bytes.
    pub size: usize,
}

/// Turn a flat (path, synopsis, kind) reply into package summaries.
/// Directory entries are dropped unless `all` is set.
pub(crate) fn packages_from_triples(values: Vec<Option<String>>, all: bool) -> Vec<Package> {
    let mut result = Vec::with_capacity(values.len() / 3);
    for chunk in values.chunks(3) {
        let Some(path) = chunk.first().cloned().flatten() else {
            continue;
        };
        let synopsis = chunk.get(1).cloned().flatten().unwrap_or_default();
        let kind = Kind::parse(chunk.get(2).and_then(|v| v.as_deref()).unwrap_or("u"));
        if !all && kind == Kind::Directory {
            continue;
        }
        let synopsis = if path == "C" {
            C_SYNOPSIS.to_string()
        } else {
            synopsis
        };
        result.push(Package {
            path,
            synopsis,
            kind,
        });
    }
    result
}

impl Database {
    /// True if a package with the import path exists.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let exists: bool = redis::cmd("HEXISTS")
            .arg("ids")
            .arg(path)
            .query_async(&mut conn)
            .await?;
        Ok(exists)
    }

    pub(crate) async fn get_doc_on(
        &self,
        conn: &mut Connection,
        path: &str,
    ) -> Result<Option<(PackageDoc, DateTime<Utc>)>> {
        let reply: Option<(Vec<u8>, i64)> =
            scripts::GET_DOC.arg(path).invoke_async(conn).await?;
        let Some((blob, t)) = reply else {
            return Ok(None);
        };
        let doc = decode_doc(&blob, path)?;
        let next_crawl = DateTime::from_timestamp(t, 0)
            .filter(|_| t != 0)
            .unwrap_or(doc.updated);
        Ok(Some((doc, next_crawl)))
    }

    /// Fetch the document and next-crawl time for a path. Absent paths are
    /// `None`, not an error. `-` returns the most overdue document, the
    /// driver signal for background refresh.
    pub async fn get_doc(&self, path: &str) -> Result<Option<(PackageDoc, DateTime<Utc>)>> {
        let mut conn = self.conn().await?;
        self.get_doc_on(&mut conn, path).await
    }

    pub(crate) async fn subdirs_on(
        &self,
        conn: &mut Connection,
        path: &str,
        doc: Option<&PackageDoc>,
    ) -> Result<Vec<Package>> {
        let mut inv = scripts::SUBDIRS.prepare_invoke();
        if is_standard_package(path) {
            inv.arg("go");
        } else if let Some(doc) = doc {
            inv.arg(&doc.project_root);
        } else {
            // No document to tell us the project root: probe the path and
            // up to four ancestors.
            for root in ancestor_roots(path) {
                inv.arg(root);
            }
        }
        let values: Vec<Option<String>> = inv.invoke_async(conn).await?;

        let prefix = format!("{}/", path);
        Ok(packages_from_triples(values, true)
            .into_iter()
            .filter(|p| {
                (p.kind == Kind::Package || p.kind == Kind::Command)
                    && p.path.starts_with(&prefix)
            })
            .collect())
    }

    /// Fetch a document together with its subdirectory listing. The listing
    /// is produced even when the path itself has no document.
    pub async fn get(
        &self,
        path: &str,
    ) -> Result<(Option<PackageDoc>, Vec<Package>, Option<DateTime<Utc>>)> {
        let mut conn = self.conn().await?;
        let found = self.get_doc_on(&mut conn, path).await?;

        // Resolve the special "-" path to the document's real import path
        // before listing subdirectories.
        let effective = found
            .as_ref()
            .map(|(d, _)| d.import_path.clone())
            .unwrap_or_else(|| path.to_string());

        let subdirs = self
            .subdirs_on(&mut conn, &effective, found.as_ref().map(|(d, _)| d))
            .await?;

        match found {
            Some((doc, next_crawl)) => Ok((Some(doc), subdirs, Some(next_crawl))),
            None => Ok((None, subdirs, None)),
        }
    }

    /// Keyword query: intersect the inverted-index sets for the parsed
    /// terms and rank-sort the result. An empty parsed query yields no
    /// results. Standard packages whose path ends in the raw query move to
    /// the front.
    pub async fn query(&self, q: &str) -> Result<Vec<Package>> {
        self.log_op("query", q);
        let terms = parse_query(q);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn().await?;
        let n: i64 = redis::cmd("INCR")
            .arg("maxQueryId")
            .query_async(&mut conn)
            .await?;
        let tmp = format!("tmp:query-{}", n);

        let mut pipe = redis::pipe();
        pipe.cmd("SINTERSTORE").arg(&tmp);
        for term in &terms {
            pipe.arg(format!("index:{}", term));
        }
        pipe.ignore();
        pipe.cmd("SORT")
            .arg(&tmp)
            .arg("DESC")
            .arg("BY")
            .arg("pkg:*->score")
            .arg("GET")
            .arg("pkg:*->path")
            .arg("GET")
            .arg("pkg:*->synopsis")
            .arg("GET")
            .arg("pkg:*->kind");
        pipe.cmd("DEL").arg(&tmp).ignore();

        let (values,): (Vec<Option<String>>,) = pipe.query_async(&mut conn).await?;
        let mut pkgs = packages_from_triples(values, false);

        // Move an exact match on a standard package to the top of the list.
        for i in 0..pkgs.len() {
            if !is_standard_package(&pkgs[i].path) {
                break;
            }
            if pkgs[i].path.ends_with(q) {
                pkgs.swap(0, i);
                break;
            }
        }
        Ok(pkgs)
    }

    async fn sorted_packages(&self, key: &str, all: bool) -> Result<Vec<Package>> {
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("SORT")
            .arg(key)
            .arg("ALPHA")
            .arg("BY")
            .arg("pkg:*->path")
            .arg("GET")
            .arg("pkg:*->path")
            .arg("GET")
            .arg("pkg:*->synopsis")
            .arg("GET")
            .arg("pkg:*->kind")
            .query_async(&mut conn)
            .await?;
        Ok(packages_from_triples(values, all))
    }

    /// Packages importing the given path.
    pub async fn importers(&self, path: &str) -> Result<Vec<Package>> {
        self.sorted_packages(&format!("index:import:{}", path), false).await
    }

    /// Number of packages importing the given path.
    pub async fn importer_count(&self, path: &str) -> Result<usize> {
        let mut conn = self.conn().await?;
        let n: usize = redis::cmd("SCARD")
            .arg(format!("index:import:{}", path))
            .query_async(&mut conn)
            .await?;
        Ok(n)
    }

    /// Every package in a project, including bare directories.
    pub async fn project(&self, project_root: &str) -> Result<Vec<Package>> {
        self.sorted_packages(
            &format!("index:project:{}", normalize_project_root(project_root)),
            true,
        )
        .await
    }

    /// The standard library listing.
    pub async fn go_index(&self) -> Result<Vec<Package>> {
        self.sorted_packages("index:project:go", false).await
    }

    /// The legacy subrepo listing.
    pub async fn go_subrepo_index(&self) -> Result<Vec<Package>> {
        self.sorted_packages("index:project:subrepo", false).await
    }

    /// All packages with rank above zero.
    pub async fn index(&self) -> Result<Vec<Package>> {
        self.sorted_packages("index:all:", false).await
    }

    /// Every crawled package ordered by descending score. Paths only; the
    /// synopsis is not fetched.
    pub async fn all_packages(&self) -> Result<Vec<Package>> {
        let mut conn = self.conn().await?;
        let values: Vec<Option<String>> = redis::cmd("SORT")
            .arg("nextCrawl")
            .arg("DESC")
            .arg("BY")
            .arg("pkg:*->score")
            .arg("GET")
            .arg("pkg:*->path")
            .arg("GET")
            .arg("pkg:*->kind")
            .query_async(&mut conn)
            .await?;
        let mut result = Vec::with_capacity(values.len() / 2);
        for chunk in values.chunks(2) {
            let Some(path) = chunk.first().cloned().flatten() else {
                continue;
            };
            let kind = Kind::parse(chunk.get(1).and_then(|v| v.as_deref()).unwrap_or("u"));
            if kind == Kind::Directory {
                continue;
            }
            let mut pkg = Package::new(path);
            pkg.kind = kind;
            result.push(pkg);
        }
        Ok(result)
    }

    /// Existence-qualified lookup of several paths, sorted by path. Unknown
    /// paths come back with kind `u`.
    pub async fn packages(&self, paths: &[String]) -> Result<Vec<Package>> {
        let mut conn = self.conn().await?;
        let mut inv = scripts::PACKAGES.prepare_invoke();
        for p in paths {
            inv.arg(p.as_str());
        }
        let values: Vec<Option<String>> = inv.invoke_async(&mut conn).await?;
        let mut pkgs = packages_from_triples(values, false);
        pkgs.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(pkgs)
    }

    /// Visit every stored record. The callback error aborts the iteration
    /// with the record's path attached; corrupt blobs do the same.
    pub async fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&PackageInfo) -> Result<()>,
    {
        let mut conn = self.conn().await?;
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg("pkg:*")
            .query_async(&mut conn)
            .await?;
        for key in keys {
            // "synopis" is a historical field-name typo: the field never
            // exists, so the synopsis reads empty and adds nothing to the
            // size metric.
            let (blob, score, kind, path, terms, synopsis): (
                Option<Vec<u8>>,
                Option<f64>,
                Option<String>,
                Option<String>,
                Option<String>,
                Option<String>,
            ) = redis::cmd("HMGET")
                .arg(&key)
                .arg("blob")
                .arg("score")
                .arg("kind")
                .arg("path")
                .arg("terms")
                .arg("synopis")
                .query_async(&mut conn)
                .await?;

            let Some(blob) = blob else {
                continue;
            };
            let path = path.unwrap_or_default();
            let terms = terms.unwrap_or_default();
            let synopsis = synopsis.unwrap_or_default();

            let size = path.len() + blob.len() + terms.len() + synopsis.len();
            let doc = decode_doc(&blob, &path)?;
            let import_path = doc.import_path.clone();
            let subdirs = self.subdirs_on(&mut conn, &import_path, Some(&doc)).await?;

            let info = PackageInfo {
                doc,
                subdirs,
                score: score.unwrap_or(0.0),
                kind: Kind::parse(kind.as_deref().unwrap_or("u")),
                size,
            };
            f(&info).with_context(|| format!("visiting {}", path))?;
        }
        Ok(())
    }
}

/// The path itself plus up to four ancestors, for project-root probing.
pub(crate) fn ancestor_roots(path: &str) -> Vec<&str> {
    let mut roots = Vec::with_capacity(5);
    let mut root = path;
    for _ in 0..5 {
        roots.push(root);
        match root.rfind('/') {
            Some(i) => root = &root[..i],
            None => break,
        }
    }
    roots
}
