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

//! spec.md section 4.4.1: the attach/reconnect loop, run as a single
//! `arbiter_worker::Worker` with a `.once()` trigger — the worker's `work()`
//! owns the whole "connect, stream, on error sleep and retry" loop for the
//! life of the process (see DESIGN.md and SPEC_FULL.md §10.7 for why this
//! uses `Once` rather than a `Notify`-driven trigger).

use std::sync::Arc;

use arbiter_api::{ReceiveSubmissionsRequest, grader_service_client::GraderServiceClient};
use arbiter_worker::WorkerContext;
use async_trait::async_trait;
use tokio_stream::StreamExt;
use tonic::Code;
use tracing::{error, info, warn};

use crate::{config::GraderConfig, course_cache::CourseCache, pipeline};

pub struct AttachWorker {
    pub config:       Arc<GraderConfig>,
    pub course_cache: Arc<CourseCache>,
}

#[async_trait]
impl arbiter_worker::Worker for AttachWorker {
    async fn work<S: Clone + Send + Sync>(&mut self, ctx: WorkerContext<S>) {
        while !ctx.is_cancelled() {
            if let Err(fatal) = self.attach_once().await {
                error!(%fatal, "grader token rejected by broker, exiting");
                std::process::exit(1);
            }
            if ctx.is_cancelled() {
                return;
            }
            warn!(backoff = ?self.config.reconnect_backoff, "attach stream ended, reconnecting");
            tokio::time::sleep(self.config.reconnect_backoff).await;
        }
    }
}

impl AttachWorker {
    /// Runs one attach attempt to completion (stream end or transport
    /// failure). Returns `Err` only for `UNAUTHENTICATED`, which spec.md
    /// section 4.4.1 says is fatal for the grader worker.
    async fn attach_once(&self) -> Result<(), tonic::Status> {
        let channel = match arbiter_server::grpc::connect_uds(self.config.broker_socket.clone()).await {
            Ok(channel) => channel,
            Err(err) => {
                warn!(%err, "failed to dial broker");
                return Ok(());
            }
        };

        let mut client = GraderServiceClient::new(channel.clone());
        let request = ReceiveSubmissionsRequest { properties: Some(self.config.properties()) };
        let mut stream = match client.receive_submissions_to_grade(request).await {
            Ok(response) => response.into_inner(),
            Err(status) if status.code() == Code::Unauthenticated => return Err(status),
            Err(status) => {
                warn!(%status, "attach RPC failed");
                return Ok(());
            }
        };

        info!(grader = %self.config.name, "attached to broker");
        let mut report_client = GraderServiceClient::new(channel);

        loop {
            match stream.next().await {
                Some(Ok(submission)) => {
                    let submission_id = submission.id;
                    let mut graded = pipeline::run(&self.config, &self.course_cache, submission).await;
                    graded.grader_name = self.config.name.clone();
                    if let Err(status) = report_client.update_grader_output(graded).await {
                        warn!(%status, submission_id, "failed to report grader output");
                    }
                }
                Some(Err(status)) if status.code() == Code::Unauthenticated => return Err(status),
                Some(Err(status)) => {
                    warn!(%status, "attach stream error");
                    return Ok(());
                }
                None => return Ok(()),
            }
        }
    }
}
