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

//! Edge bridge (C4, spec.md section 4.3): single HTTP/2 front door across
//! many sites, dispatching bare gRPC, gRPC-Web, a JSON/WebSocket RPC
//! dialect, a reverse HTTP proxy, and an in-memory static handler onto the
//! same set of backends.

pub mod classify;
pub mod config;
pub mod grpc_proxy;
pub mod http_proxy;
pub mod service;
pub mod static_site;
pub mod ws_bridge;

pub use config::{BridgeConfig, EndpointBinding, SiteConfig};
pub use service::{BridgeState, SiteRuntime, router};
