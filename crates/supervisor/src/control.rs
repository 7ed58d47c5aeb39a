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

use arbiter_api::{
    Empty, StartRequest, StatusRequest, StatusResponse, StopRequest, SupervisorStatusResponse,
    supervisor_server::Supervisor as SupervisorRpc,
};
use async_trait::async_trait;
use tonic::{Request, Response, Status};

use crate::supervisor::Supervisor;

/// Implements the control RPC surface (spec.md section 4.2/6). UID-based
/// auth happens one layer down, filtering which peers ever reach this
/// handler (see `serve_control_plane`); every request here is already
/// trusted.
pub struct ControlService {
    supervisor: Supervisor,
}

impl ControlService {
    #[must_use]
    pub const fn new(supervisor: Supervisor) -> Self { Self { supervisor } }
}

#[async_trait]
impl SupervisorRpc for ControlService {
    async fn get_supervisor_status(&self, _req: Request<Empty>) -> Result<Response<SupervisorStatusResponse>, Status> {
        Ok(Response::new(SupervisorStatusResponse {
            supervisor_pid: std::process::id() as i32,
            instance_names: self.supervisor.instance_names().await,
        }))
    }

    async fn get_status(&self, req: Request<StatusRequest>) -> Result<Response<StatusResponse>, Status> {
        let instance_name = req.into_inner().instance_name;
        let response = self
            .supervisor
            .status(&instance_name)
            .await
            .ok_or_else(|| Status::not_found(format!("no instance named {instance_name}")))?;
        Ok(Response::new(response))
    }

    async fn start(&self, req: Request<StartRequest>) -> Result<Response<StatusResponse>, Status> {
        let req = req.into_inner();
        let response = self
            .supervisor
            .start(&req.instance_name, &req.service_names)
            .await
            .ok_or_else(|| Status::not_found(format!("no instance named {}", req.instance_name)))?;
        Ok(Response::new(response))
    }

    async fn stop(&self, req: Request<StopRequest>) -> Result<Response<StatusResponse>, Status> {
        let req = req.into_inner();
        let response = self
            .supervisor
            .stop(&req.instance_name, &req.service_names)
            .await
            .ok_or_else(|| Status::not_found(format!("no instance named {}", req.instance_name)))?;
        Ok(Response::new(response))
    }
}
