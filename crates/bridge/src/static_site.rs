// Copyright 2025 arbiter contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory static handler (spec.md section 4.3.3). The entire root is
//! read into memory at start and swapped wholesale by a background
//! [`arbiter_worker`] reloader, matching the supervisor's own
//! per-descriptor filesystem-permission refresher pattern (spec.md
//! section 5, section 10.7).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha512};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct StaticFile {
    pub bytes:         bytes::Bytes,
    pub content_type:  &'static str,
    pub last_modified:  String,
    pub etag:          String,
}

/// Fixed extension table with a MIME-sniff fallback (spec.md section
/// 4.3.3), supplemented from `yajudge_grpcwebserver/static_handler.go`
/// (SPEC_FULL.md section 10.8).
fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("wasm") => "application/wasm",
        Some("txt") => "text/plain; charset=utf-8",
        _ => sniff(path),
    }
}

/// Best-effort MIME sniff when the extension isn't in the fixed table:
/// valid UTF-8 content reads as text, anything else falls back to the
/// same `application/binary` sentinel the retrieved Go source used.
fn sniff(path: &Path) -> &'static str {
    match std::fs::read(path) {
        Ok(bytes) if std::str::from_utf8(&bytes).is_ok() => "text/plain; charset=utf-8",
        _ => "application/binary",
    }
}

fn etag_for(bytes: &[u8]) -> String {
    let digest = Sha512::digest(bytes);
    format!("\"{}\"", hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        use std::fmt::Write;
        let _ = write!(s, "{b:02x}");
        s
    })
}

fn http_date(modified: SystemTime) -> String { httpdate(modified) }

/// Minimal RFC 7231 `Last-Modified` formatter; avoids pulling in a date
/// crate solely for this one format (`chrono`/`time` are both already in
/// the workspace for other purposes, but this needs no calendar math
/// beyond civil-from-days, which is cheap to get right once).
fn httpdate(time: SystemTime) -> String {
    let secs = time.duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = secs / 86400;
    let time_of_day = secs % 86400;
    let (h, m, s) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);
    let weekday = ["Thu", "Fri", "Sat", "Sun", "Mon", "Tue", "Wed"][(days % 7) as usize];
    let (year, month, day) = civil_from_days(days as i64);
    const MONTHS: [&str; 12] =
        ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
    format!("{weekday}, {day:02} {} {year} {h:02}:{m:02}:{s:02} GMT", MONTHS[(month - 1) as usize])
}

/// Howard Hinnant's civil_from_days algorithm, days-since-epoch -> (y, m, d).
fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as i64;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as i64;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

pub struct StaticSite {
    root:           PathBuf,
    files:          RwLock<Arc<HashMap<String, StaticFile>>>,
    spa_fallback:   bool,
    cache_max_age:  u64,
}

impl StaticSite {
    #[must_use]
    pub fn new(root: PathBuf, spa_fallback: bool, cache_max_age: u64) -> Self {
        let files = load_all(&root);
        Self { root, files: RwLock::new(Arc::new(files)), spa_fallback, cache_max_age }
    }

    async fn snapshot(&self) -> Arc<HashMap<String, StaticFile>> { self.files.read().await.clone() }

    async fn reload(&self) {
        let files = load_all(&self.root);
        *self.files.write().await = Arc::new(files);
    }
}

/// Recursively reads `root` into a path-keyed map, anchoring every key at
/// `/` (spec.md section 3 `StaticEntry` invariant).
fn load_all(root: &Path) -> HashMap<String, StaticFile> {
    let mut out = HashMap::new();
    visit(root, root, &mut out);
    out
}

fn visit(root: &Path, dir: &Path, out: &mut HashMap<String, StaticFile>) {
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            visit(root, &path, out);
            continue;
        }
        let Ok(bytes) = std::fs::read(&path) else { continue };
        let Ok(relative) = path.strip_prefix(root) else { continue };
        let key = format!("/{}", relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
        let last_modified = entry.metadata().and_then(|m| m.modified()).unwrap_or(SystemTime::UNIX_EPOCH);
        let file = StaticFile {
            content_type: content_type_for(&path),
            etag:         etag_for(&bytes),
            last_modified: http_date(last_modified),
            bytes:        bytes::Bytes::from(bytes),
        };
        out.insert(key, file);
    }
}

/// spec.md section 4.3.3 background reload loop, wired via
/// `Manager::worker(..).interval(reload_interval)` (SPEC_FULL.md section
/// 10.7).
pub struct ReloadWorker {
    pub site: Arc<StaticSite>,
}

#[async_trait]
impl arbiter_worker::Worker for ReloadWorker {
    async fn work<S: Clone + Send + Sync>(&mut self, _ctx: arbiter_worker::WorkerContext<S>) {
        self.site.reload().await;
        debug!(root = %self.site.root.display(), "static map reloaded");
    }
}

/// spec.md section 4.3.3 full serving logic for one request path.
pub async fn serve(State(site): State<Arc<StaticSite>>, request: Request) -> Response {
    let raw_path = request.uri().path();
    let files = site.snapshot().await;

    let lookup_path = if raw_path == "/" { "/index.html" } else { raw_path };

    if let Some(file) = files.get(lookup_path) {
        return respond(file, &site, request.headers());
    }

    if raw_path.starts_with("/favicon.") {
        return StatusCode::NOT_FOUND.into_response();
    }

    if site.spa_fallback {
        if let Some(index) = files.get("/index.html") {
            return respond(index, &site, request.headers());
        }
    }

    StatusCode::NOT_FOUND.into_response()
}

fn respond(file: &StaticFile, site: &StaticSite, headers: &axum::http::HeaderMap) -> Response {
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH) {
        if if_none_match.as_bytes() == file.etag.as_bytes() {
            return StatusCode::NOT_MODIFIED.into_response();
        }
    }

    let mut response = Response::new(Body::from(file.bytes.clone()));
    let headers_mut = response.headers_mut();
    headers_mut.insert(header::CONTENT_TYPE, HeaderValue::from_static(file.content_type));
    headers_mut.insert(header::CONTENT_LENGTH, HeaderValue::from(file.bytes.len() as u64));
    if let Ok(value) = HeaderValue::from_str(&file.last_modified) {
        headers_mut.insert(header::LAST_MODIFIED, value);
    }
    if let Ok(value) = HeaderValue::from_str(&file.etag) {
        headers_mut.insert(header::ETAG, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", site.cache_max_age)) {
        headers_mut.insert(header::CACHE_CONTROL, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_table_covers_the_documented_extensions() {
        assert_eq!(content_type_for(Path::new("a/index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("a/app.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("a/font.ttf")), "font/ttf");
        assert_eq!(content_type_for(Path::new("a/blob.wasm")), "application/wasm");
    }

    #[test]
    fn sha512_etag_is_deterministic_and_quoted() {
        let a = etag_for(b"hello");
        let b = etag_for(b"hello");
        let c = etag_for(b"world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with('"') && a.ends_with('"'));
    }

    #[test]
    fn loads_nested_files_anchored_at_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();
        std::fs::write(dir.path().join("assets").join("app.js"), b"console.log(1)").unwrap();

        let files = load_all(dir.path());
        assert!(files.contains_key("/index.html"));
        assert!(files.contains_key("/assets/app.js"));
    }

    #[tokio::test]
    async fn reload_swaps_the_map_atomically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"v1").unwrap();
        let site = StaticSite::new(dir.path().to_path_buf(), true, 60);
        assert_eq!(site.snapshot().await.get("/index.html").unwrap().bytes.as_ref(), b"v1");

        std::fs::write(dir.path().join("index.html"), b"v2").unwrap();
        site.reload().await;
        assert_eq!(site.snapshot().await.get("/index.html").unwrap().bytes.as_ref(), b"v2");
    }
}
