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

//! Supervisor (C2): spawns and lifecycle-manages the fleet of backend
//! microservices and the edge bridge, exposing a control-plane RPC over a
//! Unix-domain socket (spec.md section 4.2).

mod actor;
mod bridge_notify;
pub mod config;
mod control;
mod descriptor;
mod event;
mod instance;
mod supervisor;

pub use config::{InstanceConfig, RestartPolicy, ServiceConfig, SupervisorConfig};
pub use control::ControlService;
pub use descriptor::{ServiceSnapshot, ServiceStatus};
pub use supervisor::Supervisor;

use std::os::unix::fs::PermissionsExt;

use arbiter_api::supervisor_server::SupervisorServer;
use arbiter_server::{ApiResult, InternalSnafu};
use snafu::ResultExt;
use tokio::net::{UnixListener, UnixStream};
use tokio_stream::{StreamExt, wrappers::UnixListenerStream};
use tonic::transport::Server;
use tracing::{info, warn};

/// Binds the control socket and serves the `Supervisor` RPC, filtering
/// connections to `control_uid` when set. This bypasses
/// `arbiter_server::grpc::start_grpc_server` because that helper has no
/// peer-credential hook; the control socket is the one place in the system
/// that needs one (spec.md section 4.2 control RPC surface).
pub async fn serve_control_plane(config: &SupervisorConfig, supervisor: Supervisor) -> ApiResult<()> {
    let _ = std::fs::remove_file(&config.control_socket);
    if let Some(parent) = config.control_socket.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|_| InternalSnafu { reason: format!("creating {}", parent.display()) })?;
    }
    let listener = UnixListener::bind(&config.control_socket)
        .with_context(|_| InternalSnafu { reason: format!("binding {}", config.control_socket.display()) })?;
    let _ = std::fs::set_permissions(&config.control_socket, std::fs::Permissions::from_mode(0o600));

    let control_uid = config.control_uid;
    let incoming = UnixListenerStream::new(listener).filter_map(move |conn| match conn {
        Ok(stream) if authorize_peer(&stream, control_uid) => Some(Ok::<_, std::io::Error>(stream)),
        Ok(_) => {
            warn!("rejecting control connection from unauthorized peer");
            None
        }
        Err(err) => {
            warn!(%err, "control socket accept error");
            None
        }
    });

    info!(socket = %config.control_socket.display(), "control plane listening");
    Server::builder()
        .add_service(SupervisorServer::new(ControlService::new(supervisor)))
        .serve_with_incoming(incoming)
        .await
        .with_context(|_| InternalSnafu { reason: "serving control plane".to_string() })
}

fn authorize_peer(stream: &UnixStream, control_uid: Option<u32>) -> bool {
    let Some(required_uid) = control_uid else { return true };
    match stream.peer_cred() {
        Ok(cred) => cred.uid() == required_uid,
        Err(err) => {
            warn!(%err, "failed to read control socket peer credentials");
            false
        }
    }
}
