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

//! Pure per-request classification (spec.md section 4.3.1), kept free of
//! axum/tonic types so the dispatch order is unit-testable without a
//! running server.

use crate::config::{BridgeConfig, SiteConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Grpc,
    GrpcWeb,
    Http,
}

/// spec.md section 4.3.1 step 2: classify by `Content-Type` prefix.
#[must_use]
pub fn classify_protocol(content_type: Option<&str>) -> Protocol {
    match content_type {
        Some(ct) if ct.starts_with("application/grpc-web") => Protocol::GrpcWeb,
        Some(ct) if ct.starts_with("application/grpc") => Protocol::Grpc,
        _ => Protocol::Http,
    }
}

/// spec.md section 4.3.1 step 1: strip the port from `Host`, then apply
/// the `localhost`-via-`Origin` proxied-dev affordance.
#[must_use]
pub fn resolve_host<'a>(host_header: Option<&'a str>, origin_header: Option<&'a str>) -> Option<String> {
    let host = host_header?;
    let host = host.split(':').next().unwrap_or(host);
    if host == "localhost" {
        if let Some(origin) = origin_header {
            let without_scheme = origin.split("://").nth(1).unwrap_or(origin);
            let origin_host = without_scheme.split(':').next().unwrap_or(without_scheme);
            if !origin_host.is_empty() {
                return Some(origin_host.to_string());
            }
        }
    }
    Some(host.to_string())
}

#[must_use]
pub fn site_for_host<'a>(config: &'a BridgeConfig, host: &str) -> Option<&'a SiteConfig> {
    config.sites.iter().find(|site| site.host == host)
}

/// spec.md section 4.3.1 step 3: plain HTTP, cert configured, non-gRPC.
#[must_use]
pub fn needs_https_upgrade(site: &SiteConfig, protocol: Protocol, request_is_tls: bool) -> bool {
    !request_is_tls && site.tls_configured && protocol != Protocol::Grpc && protocol != Protocol::GrpcWeb
}

#[must_use]
pub fn https_redirect_url(https_port: u16, host: &str, path_and_query: &str) -> String {
    if https_port == 443 {
        format!("https://{host}{path_and_query}")
    } else {
        format!("https://{host}:{https_port}{path_and_query}")
    }
}

/// spec.md section 4.3.1 step 4: first `/`-separated path segment.
#[must_use]
pub fn service_key(path: &str) -> &str { path.trim_start_matches('/').split('/').next().unwrap_or("") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_grpc_web_before_grpc() {
        assert_eq!(classify_protocol(Some("application/grpc-web+proto")), Protocol::GrpcWeb);
        assert_eq!(classify_protocol(Some("application/grpc+proto")), Protocol::Grpc);
        assert_eq!(classify_protocol(Some("text/html")), Protocol::Http);
        assert_eq!(classify_protocol(None), Protocol::Http);
    }

    #[test]
    fn localhost_resolves_via_origin() {
        assert_eq!(resolve_host(Some("localhost:3000"), Some("http://judge.example.com:5173")).unwrap(), "judge.example.com");
        assert_eq!(resolve_host(Some("judge.example.com"), None).unwrap(), "judge.example.com");
        assert_eq!(resolve_host(Some("localhost"), None).unwrap(), "localhost");
        assert!(resolve_host(None, None).is_none());
    }

    #[test]
    fn https_upgrade_skips_grpc_dialects() {
        let mut site = SiteConfig { host: "x".into(), tls_configured: true, ..Default::default() };
        assert!(needs_https_upgrade(&site, Protocol::Http, false));
        assert!(!needs_https_upgrade(&site, Protocol::Grpc, false));
        assert!(!needs_https_upgrade(&site, Protocol::Http, true));
        site.tls_configured = false;
        assert!(!needs_https_upgrade(&site, Protocol::Http, false));
    }

    #[test]
    fn redirect_url_omits_default_port() {
        assert_eq!(https_redirect_url(443, "judge.example.com", "/a?b=1"), "https://judge.example.com/a?b=1");
        assert_eq!(https_redirect_url(8443, "judge.example.com", "/a"), "https://judge.example.com:8443/a");
    }

    #[test]
    fn service_key_is_first_segment() {
        assert_eq!(service_key("/arbiter.v1.GraderService/Submit"), "arbiter.v1.GraderService");
        assert_eq!(service_key("/"), "");
    }
}
