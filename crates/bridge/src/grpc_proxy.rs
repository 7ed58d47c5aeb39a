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

//! Transparent gRPC/gRPC-Web proxy (spec.md section 4.3.2): a
//! byte-passthrough forward onto the matching upstream with no schema
//! awareness, built on [`arbiter_server::grpc::connect_uds`] (already the
//! documented seam for this use) so the "client" is just a
//! [`tonic::transport::Channel`] driven as a generic
//! `tower::Service<http::Request<Body>>`.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{
    body::Body,
    http::{HeaderName, Request, Response, StatusCode},
    response::IntoResponse,
};
use tokio::sync::RwLock;
use tonic::transport::Channel;
use tower::Service;
use tracing::warn;

/// Lazily-dialled, cached per-backend channel (spec.md section 4.3.2 "the
/// client connection is lazily created on first use and cached;
/// concurrent readers see a consistent pointer via a reader-writer
/// lock"). `invalidate` implements the supervisor's "invalidate" signal by
/// dropping the cached entry so the next dispatch redials.
#[derive(Default)]
pub struct BackendDialer {
    channels: RwLock<HashMap<PathBuf, Channel>>,
}

impl BackendDialer {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    async fn channel(&self, socket: &PathBuf) -> Result<Channel, tonic::transport::Error> {
        if let Some(channel) = self.channels.read().await.get(socket) {
            return Ok(channel.clone());
        }
        let channel = arbiter_server::grpc::connect_uds(socket.clone()).await?;
        self.channels.write().await.insert(socket.clone(), channel.clone());
        Ok(channel)
    }

    pub async fn invalidate(&self, socket: &PathBuf) { self.channels.write().await.remove(socket); }
}

const STRIPPED_HEADERS: [HeaderName; 2] = [axum::http::header::USER_AGENT, axum::http::header::CONNECTION];

/// Forwards `request` verbatim to `socket`, after stripping `User-Agent`
/// and `Connection` and re-attaching the remaining headers as outgoing
/// metadata (spec.md section 4.3.2 "copy incoming headers, strip
/// `User-Agent` and `Connection`, re-attach as outgoing metadata" — here
/// "metadata" is just the forwarded HTTP/2 headers, since the proxy
/// never decodes far enough to build a typed `tonic::metadata::MetadataMap`).
pub async fn proxy(dialer: &Arc<BackendDialer>, socket: &PathBuf, mut request: Request<Body>) -> Response<Body> {
    for header in STRIPPED_HEADERS {
        request.headers_mut().remove(header);
    }

    let mut channel = match dialer.channel(socket).await {
        Ok(channel) => channel,
        Err(err) => {
            warn!(socket = %socket.display(), %err, "failed to dial grpc backend");
            return (StatusCode::BAD_GATEWAY, "backend unavailable").into_response();
        }
    };

    let upstream_request = request.map(tonic::body::Body::new);
    match channel.call(upstream_request).await {
        Ok(response) => response.map(axum::body::Body::new),
        Err(err) => {
            warn!(socket = %socket.display(), %err, "grpc backend call failed");
            (StatusCode::BAD_GATEWAY, "backend call failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dialer_starts_with_no_cached_channels() {
        let dialer = BackendDialer::new();
        dialer.invalidate(&PathBuf::from("/tmp/does-not-matter.sock")).await;
        assert!(dialer.channels.read().await.is_empty());
    }
}
