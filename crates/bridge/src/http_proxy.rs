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

//! Reverse HTTP proxy (spec.md section 4.3.4): clone the request's path
//! and query onto the configured `proxy_pass` target, copy
//! method/headers/body, and mirror the upstream response back verbatim.

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
};
use tracing::warn;

pub async fn proxy(client: &reqwest::Client, target_base: &str, request: Request<Body>) -> Response<Body> {
    let path_and_query = request.uri().path_and_query().map_or("", |pq| pq.as_str());
    let target_url = format!("{}{path_and_query}", target_base.trim_end_matches('/'));

    let method = request.method().clone();
    let headers = request.headers().clone();
    let body_bytes = match axum::body::to_bytes(request.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, "failed to buffer request body for reverse proxy");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let reqwest_method = match reqwest::Method::from_bytes(method.as_str().as_bytes()) {
        Ok(method) => method,
        Err(_) => return StatusCode::BAD_GATEWAY.into_response(),
    };

    let mut outbound = client.request(reqwest_method, &target_url);
    for (name, value) in &headers {
        if name == axum::http::header::HOST {
            continue;
        }
        if let Ok(value) = reqwest::header::HeaderValue::from_bytes(value.as_bytes()) {
            outbound = outbound.header(name.as_str(), value);
        }
    }
    outbound = outbound.body(body_bytes);

    let upstream = match outbound.send().await {
        Ok(response) => response,
        Err(err) => {
            warn!(target = %target_url, %err, "reverse proxy upstream call failed");
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let status = upstream.status();
    let mut response_headers = axum::http::HeaderMap::new();
    for (name, value) in upstream.headers() {
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::from_bytes(name.as_str().as_bytes()),
            axum::http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            response_headers.insert(name, value);
        }
    }

    let body_stream = upstream.bytes_stream();
    let mut response = Response::new(Body::from_stream(body_stream));
    *response.status_mut() = StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    *response.headers_mut() = response_headers;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn proxies_a_get_request_to_a_local_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let app = axum::Router::new().route("/echo", axum::routing::get(|| async { "ok from upstream" }));
            axum::serve(listener, app).await.unwrap();
        });

        let client = reqwest::Client::new();
        let request = Request::builder().method("GET").uri("/echo").body(Body::empty()).unwrap();
        let response = proxy(&client, &format!("http://{addr}"), request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok from upstream");

        server.abort();
    }
}
