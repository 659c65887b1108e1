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

//! Server-side Lua scripts. Each script is one atomic unit against the
//! store; clients never drive multi-step mutations command by command.

use deadpool_redis::redis::Script;
use once_cell::sync::Lazy;

/// Insert or update a package record and its inverted-index deltas.
///
/// Allocates an id on first insert, diffs the stored term list against the
/// incoming one, schedules the next crawl, and clears the path from the
/// crawl queues. When the incoming etag matches the stored `clone` field the
/// record is persisted with empty terms and zero score.
pub static PUT: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ARGV[1]
    local synopsis = ARGV[2]
    local score = ARGV[3]
    local blob = ARGV[4]
    local terms = ARGV[5]
    local etag = ARGV[6]
    local kind = ARGV[7]
    local nextCrawl = ARGV[8]

    local id = redis.call('HGET', 'ids', path)
    if not id then
        id = redis.call('INCR', 'maxPackageId')
        redis.call('HSET', 'ids', path, id)
    end

    if etag ~= '' and etag == redis.call('HGET', 'pkg:' .. id, 'clone') then
        terms = ''
        score = 0
    end

    local update = {}
    for term in string.gmatch(redis.call('HGET', 'pkg:' .. id, 'terms') or '', '([^ ]+)') do
        update[term] = 1
    end

    for term in string.gmatch(terms, '([^ ]+)') do
        update[term] = (update[term] or 0) + 2
    end

    for term, x in pairs(update) do
        if x == 1 then
            redis.call('SREM', 'index:' .. term, id)
        elseif x == 2 then
            redis.call('SADD', 'index:' .. term, id)
        end
    end

    redis.call('SREM', 'badCrawl', path)
    redis.call('SREM', 'newCrawl', path)

    if nextCrawl ~= '0' then
        redis.call('ZADD', 'nextCrawl', nextCrawl, id)
        redis.call('HSET', 'pkg:' .. id, 'crawl', nextCrawl)
    end

    return redis.call('HMSET', 'pkg:' .. id, 'path', path, 'synopsis', synopsis, 'score', score, 'blob', blob, 'terms', terms, 'etag', etag, 'kind', kind)
"#,
    )
});

/// Queue paths for a first crawl, skipping anything already indexed or
/// known bad.
pub static ADD_CRAWL: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    for i=1,#ARGV do
        local pkg = ARGV[i]
        if redis.call('HEXISTS', 'ids', pkg) == 0 and redis.call('SISMEMBER', 'badCrawl', pkg) == 0 then
            redis.call('SADD', 'newCrawl', pkg)
        end
    end
"#,
    )
});

/// Set the next crawl time for every package in a project whose stored etag
/// matches, in a single round trip.
pub static SET_NEXT_CRAWL_ETAG: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local root = ARGV[1]
    local etag = ARGV[2]
    local nextCrawl = ARGV[3]

    local pkgs = redis.call('SORT', 'index:project:' .. root, 'GET', '#', 'GET', 'pkg:*->etag')

    for i=1,#pkgs,2 do
        if pkgs[i+1] == etag then
            redis.call('ZADD', 'nextCrawl', nextCrawl, pkgs[i])
            redis.call('HSET', 'pkg:' .. pkgs[i], 'crawl', nextCrawl)
        end
    end
"#,
    )
});

/// Pull a project's crawl times forward: clamp each package's `crawl` field
/// down to now, and pack the `nextCrawl` scores into a short window just
/// over an hour out, 120 seconds apart.
pub static BUMP_CRAWL: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local root = ARGV[1]
    local now = tonumber(ARGV[2])
    local nextCrawl = now + 3600
    local pkgs = redis.call('SORT', 'index:project:' .. root, 'GET', '#')

    for i=1,#pkgs do
        local t = tonumber(redis.call('HGET', 'pkg:' .. pkgs[i], 'crawl') or 0)
        if t == 0 or now < t then
            redis.call('HSET', 'pkg:' .. pkgs[i], 'crawl', now)
        end
        t = tonumber(redis.call('ZSCORE', 'nextCrawl', pkgs[i]) or 0)
        if t == 0 or nextCrawl < t then
            redis.call('ZADD', 'nextCrawl', nextCrawl, pkgs[i])
            nextCrawl = nextCrawl + 120
        end
    end
"#,
    )
});

/// Fetch the blob and next-crawl time for a path. `-` selects the most
/// overdue package. Returns nil when the path is unknown.
pub static GET_DOC: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ARGV[1]

    local id
    if path == '-' then
        local r = redis.call('ZRANGE', 'nextCrawl', 0, 0)
        if not r or #r == 0 then
            return false
        end
        id = r[1]
    else
        id = redis.call('HGET', 'ids', path)
        if not id then
            return false
        end
    end

    local blob = redis.call('HGET', 'pkg:' .. id, 'blob')
    if not blob then
        return false
    end

    local nextCrawl = redis.call('HGET', 'pkg:' .. id, 'crawl')
    if not nextCrawl then
        nextCrawl = redis.call('ZSCORE', 'nextCrawl', id)
        if not nextCrawl then
            nextCrawl = 0
        end
    end

    return {blob, nextCrawl}
"#,
    )
});

/// Alphabetical project listing for the first of the candidate roots that
/// has any members. Returns flat (path, synopsis, kind) triples.
pub static SUBDIRS: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local reply
    for i = 1,#ARGV do
        reply = redis.call('SORT', 'index:project:' .. ARGV[i], 'ALPHA', 'BY', 'pkg:*->path', 'GET', 'pkg:*->path', 'GET', 'pkg:*->synopsis', 'GET', 'pkg:*->kind')
        if #reply > 0 then
            break
        end
    end
    return reply
"#,
    )
});

/// Tear down a record: every inverted-index membership, the crawl and
/// popularity entries, the primary hash and the id mapping.
pub static DELETE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ARGV[1]

    local id = redis.call('HGET', 'ids', path)
    if not id then
        return false
    end

    for term in string.gmatch(redis.call('HGET', 'pkg:' .. id, 'terms') or '', '([^ ]+)') do
        redis.call('SREM', 'index:' .. term, id)
    end

    redis.call('ZREM', 'nextCrawl', id)
    redis.call('SREM', 'newCrawl', path)
    redis.call('ZREM', 'popular', id)
    redis.call('DEL', 'pkg:' .. id)
    return redis.call('HDEL', 'ids', path)
"#,
    )
});

/// Existence-qualified lookup of several paths at once. Unknown paths come
/// back with kind `u`.
pub static PACKAGES: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local result = {}
    for i = 1,#ARGV do
        local path = ARGV[i]
        local synopsis = ''
        local kind = 'u'
        local id = redis.call('HGET', 'ids', path)
        if id then
            synopsis = redis.call('HGET', 'pkg:' .. id, 'synopsis')
            kind = redis.call('HGET', 'pkg:' .. id, 'kind')
        end
        result[#result+1] = path
        result[#result+1] = synopsis
        result[#result+1] = kind
    end
    return result
"#,
    )
});

/// Test every `/`-separated prefix of a path against the block set.
pub static IS_BLOCKED: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ''
    for s in string.gmatch(ARGV[1], '[^/]+') do
        path = path .. s
        if redis.call('SISMEMBER', 'block', path) == 1 then
            return 1
        end
        path = path .. '/'
    end
    return 0
"#,
    )
});

/// One import-graph node lookup: synopsis and terms for a path, nil when
/// unknown.
pub static IMPORT_GRAPH_NODE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ARGV[1]

    local id = redis.call('HGET', 'ids', path)
    if not id then
        return false
    end

    return redis.call('HMGET', 'pkg:' .. id, 'synopsis', 'terms')
"#,
    )
});

/// Add a decayed usage event to the popularity zset. Scores live in a
/// multiplicatively drifting coordinate system anchored at `popular:0`;
/// when the drift factor grows past 10 the whole zset is rescaled back
/// toward 1 and entries below 0.05 are dropped.
pub static INCREMENT_POPULAR: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local path = ARGV[1]
    local n = ARGV[2]
    local t = ARGV[3]

    local id = redis.call('HGET', 'ids', path)
    if not id then
        return
    end

    local t0 = redis.call('GET', 'popular:0') or '0'
    local f = math.exp(tonumber(t) - tonumber(t0))
    redis.call('ZINCRBY', 'popular', tonumber(n) * f, id)
    if f > 10 then
        redis.call('SET', 'popular:0', t)
        redis.call('ZUNIONSTORE', 'popular', 1, 'popular', 'WEIGHTS', 1.0 / f)
        redis.call('ZREMRANGEBYSCORE', 'popular', '-inf', 0.05)
    end
"#,
    )
});

/// Top of the popularity zset resolved to (path, synopsis, kind) triples.
pub static POPULAR: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local stop = ARGV[1]
    local ids = redis.call('ZREVRANGE', 'popular', '0', stop)
    local result = {}
    for i=1,#ids do
        local values = redis.call('HMGET', 'pkg:' .. ids[i], 'path', 'synopsis', 'kind')
        result[#result+1] = values[1]
        result[#result+1] = values[2]
        result[#result+1] = values[3]
    end
    return result
"#,
    )
});

/// Full popularity listing with raw scores in the synopsis slot.
pub static POPULAR_WITH_SCORES: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local ids = redis.call('ZREVRANGE', 'popular', '0', -1, 'WITHSCORES')
    local result = {}
    for i=1,#ids,2 do
        result[#result+1] = redis.call('HGET', 'pkg:' .. ids[i], 'path')
        result[#result+1] = ids[i+1]
        result[#result+1] = 'p'
    end
    return result
"#,
    )
});

/// Fold a decayed increment into a named counter and refresh its TTL.
/// Counters are stored as JSON `{n, t}` in scaled time.
pub static INCREMENT_COUNTER: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
    local key = 'counter:' .. ARGV[1]
    local n = tonumber(ARGV[2])
    local t = tonumber(ARGV[3])
    local exp = tonumber(ARGV[4])

    local counter = redis.call('GET', key)
    if counter then
        counter = cjson.decode(counter)
        n = n + counter.n * math.exp(counter.t - t)
    end

    redis.call('SET', key, cjson.encode({n = n; t = t}))
    redis.call('EXPIRE', key, exp)
    return tostring(n)
"#,
    )
});
