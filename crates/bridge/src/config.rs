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

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Top-level bridge config (spec.md section 4.3): one process, many sites,
/// selected per-request by `Host` (spec.md section 4.3.1 step 1).
#[derive(Clone, Debug, Serialize, Deserialize, SmartDefault)]
pub struct BridgeConfig {
    #[default = "0.0.0.0:8080"]
    pub listen_address: String,
    /// Port the HTTPS-upgrade redirect (spec.md section 4.3.1 step 3) is
    /// built against. The bridge itself does not terminate TLS; a
    /// TLS-terminating proxy in front of it is assumed to forward to
    /// `listen_address` on this port's plaintext sibling.
    #[default(443)]
    pub https_port: u16,
    /// How often the static handler's in-memory file map is rebuilt from
    /// disk (spec.md section 4.3.3).
    #[default(Duration::from_secs(30))]
    #[serde(with = "humantime_serde_secs")]
    pub reload_interval: Duration,
    pub sites: Vec<SiteConfig>,
}

/// One virtual host (spec.md section 4.3.1 step 1 `Host` match target).
#[derive(Clone, Debug, Serialize, Deserialize, SmartDefault)]
pub struct SiteConfig {
    /// `Host` header value this site answers to (port already stripped).
    pub host: String,
    /// Directory served by the static handler, when this site has one.
    pub static_root: Option<PathBuf>,
    /// Whether an unknown path falls back to `/index.html` (spec.md
    /// section 4.3.3 "unless the site disables SPA navigation").
    #[default = true]
    pub spa_fallback: bool,
    /// `Cache-Control: public, max-age=<seconds>` on served static assets.
    #[default(3600)]
    pub cache_max_age_secs: u64,
    /// Unix-domain socket of the backend this site's gRPC/gRPC-Web traffic
    /// is proxied to (spec.md section 4.3.2). First path segment after
    /// this is matched against `endpoints` to find the concrete backend;
    /// a site with a single backend just lists it once under any key.
    pub endpoints: Vec<EndpointBinding>,
    /// Plain-HTTP reverse proxy target (spec.md section 4.3.4), checked
    /// when the request matched no gRPC endpoint and isn't a static GET.
    pub proxy_pass: Option<String>,
    /// Path hosting the JSON/WebSocket RPC bridge (spec.md section
    /// 4.3.5), e.g. `/ws`. `None` disables the bridge for this site.
    pub websocket_path: Option<String>,
    /// Shared token attached to every bridged RPC call's outgoing
    /// metadata (spec.md section 4.3.5 "the configured shared auth
    /// token").
    pub auth_token: Option<String>,
    /// Whether this site has a certificate configured, making it eligible
    /// for the HTTPS upgrade redirect (spec.md section 4.3.1 step 3).
    #[default = false]
    pub tls_configured: bool,
}

/// Maps a gRPC/gRPC-Web service key (the request path's first segment) to
/// the backend socket that serves it (spec.md section 4.3.1 step 4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointBinding {
    pub service_key:     String,
    pub backend_socket:  PathBuf,
}

mod humantime_serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

impl SiteConfig {
    #[must_use]
    pub fn endpoint_for(&self, service_key: &str) -> Option<&EndpointBinding> {
        self.endpoints.iter().find(|e| e.service_key == service_key)
    }
}
