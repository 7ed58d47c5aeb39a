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

//! Edge bridge daemon entry point (spec.md section 4.1/4.3): a C1
//! backend service whose surface is HTTP rather than gRPC.

use std::{process::ExitCode, time::Duration};

use arbiter_bridge::{BridgeConfig, BridgeState};
use arbiter_server::http::RestServerConfig;
use arbiter_service::{ServiceArgs, ServiceSkeleton};
use clap::Parser;
use tracing::error;

const DRAIN_WINDOW: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    arbiter_telemetry::init_default_ut_logging();

    let args = ServiceArgs::parse();
    let skeleton = match ServiceSkeleton::bootstrap(args, DRAIN_WINDOW) {
        Ok(skeleton) => skeleton,
        Err(err) => {
            error!(%err, "failed to bootstrap bridge");
            return ExitCode::from(1);
        }
    };

    let config = match load_config(skeleton.config_path()) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load bridge config");
            return ExitCode::from(1);
        }
    };

    let listen_address = config.listen_address.clone();

    // The submission-intake RPC is the one stub a browser client actually
    // needs wired into the WebSocket bridge's dispatch table today (spec.md
    // section 4.3.5; see DESIGN.md for the rest of the registry). It dials
    // the first configured endpoint's backend eagerly here, since the
    // registration closure below is synchronous.
    let first_endpoint_socket = config.sites.iter().flat_map(|s| s.endpoints.first()).next().map(|e| e.backend_socket.clone());
    let submission_intake_channel = match first_endpoint_socket {
        Some(socket) => arbiter_server::grpc::connect_uds(socket).await.ok(),
        None => None,
    };

    let state = BridgeState::bootstrap(config, |table| {
        if let Some(channel) = submission_intake_channel.clone() {
            arbiter_bridge::service::register_submission_intake(table, channel);
        }
    });

    let rest_config = RestServerConfig::builder().bind_address(listen_address).build();

    if let Err(err) = skeleton.serve_http(rest_config, vec![arbiter_bridge::router(state)]).await {
        error!(%err, "bridge exited");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

fn load_config(path: &std::path::Path) -> std::io::Result<BridgeConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}
