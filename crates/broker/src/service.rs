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

use std::{pin::Pin, sync::Arc, time::{SystemTime, UNIX_EPOCH}};

use arbiter_api::{
    ReceiveSubmissionsRequest, SolutionStatus, SubmitRequest, SubmitResponse, Submission,
    grader_service_server::{self, GraderService as GraderServiceRpc},
    submission_intake_server::{self, SubmissionIntake as SubmissionIntakeRpc},
};
use arbiter_server::grpc::GrpcServiceHandler;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_stream::{Stream, StreamExt, wrappers::ReceiverStream};
use tonic::{Request, Response, Status, service::RoutesBuilder};
use tracing::{info, warn};

use crate::{catalog::ProblemCatalog, ratelimit, registry::Registry, store::SubmissionStore};

fn now_unix() -> i64 { SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64 }

/// Wires the grader-attach/dispatch RPCs and the submission-intake RPC to
/// the `Registry`/`SubmissionStore`/`ProblemCatalog` (spec.md sections 4.4.1,
/// 4.4.3, 4.5, 6).
pub struct BrokerService {
    registry:     Arc<Mutex<Registry>>,
    store:        Arc<dyn SubmissionStore>,
    catalog:      Arc<dyn ProblemCatalog>,
    max_per_hour: u32,
}

impl BrokerService {
    #[must_use]
    pub fn new(store: Arc<dyn SubmissionStore>, catalog: Arc<dyn ProblemCatalog>, max_per_hour: u32) -> Self {
        Self { registry: Arc::new(Mutex::new(Registry::default())), store, catalog, max_per_hour }
    }

    /// Sweeps `SUBMITTED` submissions and tries to dispatch each, run on
    /// every new grader registration (spec.md section 4.5 "Dispatch").
    async fn dispatch_pending(&self) {
        for submission in self.store.fetch_submitted().await {
            self.try_dispatch(submission).await;
        }
    }

    async fn try_dispatch(&self, submission: Submission) {
        let requirement = self.catalog.requirements(&submission.problem_id);
        let id = submission.id;
        let mut registry = self.registry.lock().await;
        if let Some(grader_name) = registry.dispatch(submission, &requirement) {
            drop(registry);
            if let Some(mut assigned) = self.store.get(id).await {
                assigned.status = SolutionStatus::GraderAssigned.into();
                assigned.grader_name = grader_name;
                self.store.update(assigned).await;
            }
        }
    }
}

#[async_trait]
impl GraderServiceRpc for BrokerService {
    type ReceiveSubmissionsToGradeStream = Pin<Box<dyn Stream<Item = Result<Submission, Status>> + Send + 'static>>;

    async fn receive_submissions_to_grade(
        &self,
        request: Request<ReceiveSubmissionsRequest>,
    ) -> Result<Response<Self::ReceiveSubmissionsToGradeStream>, Status> {
        let properties = request
            .into_inner()
            .properties
            .ok_or_else(|| Status::invalid_argument("missing grader properties"))?;
        let name = properties.name.clone();

        let (id, rx, watch_handle) = self.registry.lock().await.register(properties);
        info!(grader = %name, "grader attached");
        self.dispatch_pending().await;

        let registry = Arc::clone(&self.registry);
        let store = Arc::clone(&self.store);
        let grader_name = name.clone();
        tokio::spawn(async move {
            // Resolves once every clone of this sender is dropped, i.e. the
            // attach RPC's stream handler went away (spec.md section 4.5
            // "Deregistration"): roll in-flight submissions back to
            // SUBMITTED so a later registration can pick them up again.
            watch_handle.closed().await;
            registry.lock().await.deregister(id);
            let rolled_back = store.rollback_in_flight_for_grader(&grader_name).await;
            for submission in rolled_back {
                let mut resubmitted = submission;
                resubmitted.grader_name.clear();
                store.update(resubmitted).await;
            }
            warn!(grader = %grader_name, "grader detached, in-flight submissions rolled back");
        });

        let stream = ReceiverStream::new(rx).map(Ok);
        Ok(Response::new(Box::pin(stream)))
    }

    async fn update_grader_output(&self, request: Request<Submission>) -> Result<Response<Submission>, Status> {
        let submission = request.into_inner();
        let persisted = self.store.update(submission).await;
        Ok(Response::new(persisted))
    }
}

#[async_trait]
impl SubmissionIntakeRpc for BrokerService {
    async fn submit(&self, request: Request<SubmitRequest>) -> Result<Response<SubmitResponse>, Status> {
        let req = request.into_inner();
        let now = now_unix();
        let recent = self.store.recent_timestamps(req.user_id, req.course_id, &req.problem_id, now - 3600).await;
        let decision = ratelimit::evaluate(&recent, self.max_per_hour, now);
        if !decision.allowed {
            warn!(user_id = req.user_id, problem = %req.problem_id, "submission rate limit exceeded");
            return Ok(Response::new(SubmitResponse { submission: None, rate_limit: Some(decision.info) }));
        }

        let submission = Submission {
            id: 0,
            user_id: req.user_id,
            course_id: req.course_id,
            problem_id: req.problem_id,
            solution_files: req.solution_files,
            timestamp: now,
            status: SolutionStatus::Submitted.into(),
            grader_name: String::new(),
            build_report: String::new(),
            style_failed_file: String::new(),
            test_results: vec![],
        };
        let persisted = self.store.insert_submitted(submission).await;
        self.try_dispatch(persisted.clone()).await;
        let persisted = self.store.get(persisted.id).await.unwrap_or(persisted);

        Ok(Response::new(SubmitResponse { submission: Some(persisted), rate_limit: Some(decision.info) }))
    }
}

#[async_trait]
impl GrpcServiceHandler for BrokerService {
    fn service_name(&self) -> &'static str { "Broker" }

    fn file_descriptor_set(&self) -> &'static [u8] { arbiter_api::pb::GRPC_DESC }

    fn register_service(self: &Arc<Self>, builder: &mut RoutesBuilder) {
        builder
            .add_service(grader_service_server::GraderServiceServer::from_arc(self.clone()))
            .add_service(submission_intake_server::SubmissionIntakeServer::from_arc(self.clone()));
    }
}
