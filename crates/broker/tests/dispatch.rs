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

//! Exercises capability-matched dispatch and redelivery on grader
//! disconnect against the real in-process store and registry (spec.md
//! section 8, scenarios 6-7), not mocks.

use std::{sync::Arc, time::Duration};

use arbiter_api::{
    Arch, GraderProperties, Os, Platform, ReceiveSubmissionsRequest, SolutionStatus, SubmitRequest,
    grader_service_server::GraderService as GraderServiceRpc, submission_intake_server::SubmissionIntake as SubmissionIntakeRpc,
};
use arbiter_broker::{BrokerService, CapabilityRequirement, InMemoryCatalog, InMemoryStore, SubmissionStore};
use tokio_stream::StreamExt;
use tonic::Request;

fn platform(arch: Arch, os: Os, runtimes: &[&str]) -> Platform {
    Platform { arch: arch.into(), os: os.into(), runtimes: runtimes.iter().map(|r| r.to_string()).collect() }
}

fn broker_with_problem(problem_id: &str, requirement: CapabilityRequirement) -> (Arc<BrokerService>, Arc<InMemoryStore>) {
    let mut catalog = InMemoryCatalog::new();
    catalog.insert(problem_id, requirement);
    let store = Arc::new(InMemoryStore::new());
    let broker = Arc::new(BrokerService::new(store.clone(), Arc::new(catalog), 20));
    (broker, store)
}

#[tokio::test]
async fn submission_is_dispatched_only_to_a_capable_grader() {
    let requirement = CapabilityRequirement {
        required_arch:     Some(Arch::X86),
        required_os:       Some(Os::Posix),
        required_runtimes: vec!["cpp17".to_string()],
    };
    let (broker, _store) = broker_with_problem("p1", requirement);

    // Incapable grader: wrong runtime.
    let incapable = GraderProperties { name: "incapable".to_string(), platform: Some(platform(Arch::X86, Os::Linux, &["py3"])) };
    let mut incapable_stream = broker
        .receive_submissions_to_grade(Request::new(ReceiveSubmissionsRequest { properties: Some(incapable) }))
        .await
        .expect("attach incapable")
        .into_inner();

    // Capable grader: has the required runtime.
    let capable = GraderProperties { name: "capable".to_string(), platform: Some(platform(Arch::X86, Os::Linux, &["cpp17"])) };
    let mut capable_stream = broker
        .receive_submissions_to_grade(Request::new(ReceiveSubmissionsRequest { properties: Some(capable) }))
        .await
        .expect("attach capable")
        .into_inner();

    let submit = SubmitRequest { user_id: 1, course_id: 1, problem_id: "p1".to_string(), solution_files: vec![] };
    let response = broker.submit(Request::new(submit)).await.expect("submit").into_inner();
    let submitted = response.submission.expect("submission present");
    assert_eq!(submitted.status(), SolutionStatus::GraderAssigned);
    assert_eq!(submitted.grader_name, "capable");

    let delivered = tokio::time::timeout(Duration::from_millis(200), capable_stream.next())
        .await
        .expect("capable stream not starved")
        .expect("capable stream item")
        .expect("no transport error");
    assert_eq!(delivered.id, submitted.id);

    let nothing_for_incapable = tokio::time::timeout(Duration::from_millis(50), incapable_stream.next()).await;
    assert!(nothing_for_incapable.is_err(), "incapable grader must not receive a submission it can't run");
}

#[tokio::test]
async fn grader_disconnect_rolls_in_flight_submissions_back_to_submitted() {
    let (broker, store) = broker_with_problem("p1", CapabilityRequirement::default());

    let properties = GraderProperties { name: "solo".to_string(), platform: Some(platform(Arch::Any, Os::Any, &[])) };
    let stream = broker
        .receive_submissions_to_grade(Request::new(ReceiveSubmissionsRequest { properties: Some(properties) }))
        .await
        .expect("attach")
        .into_inner();

    let submit = SubmitRequest { user_id: 1, course_id: 1, problem_id: "p1".to_string(), solution_files: vec![] };
    let response = broker.submit(Request::new(submit)).await.expect("submit").into_inner();
    let submitted = response.submission.expect("submission present");
    assert_eq!(submitted.status(), SolutionStatus::GraderAssigned);

    // Dropping the stream drops the registry's sender clone, which wakes
    // the cleanup task spawned by receive_submissions_to_grade.
    drop(stream);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let rolled_back = store.get(submitted.id).await.expect("submission still exists");
    assert_eq!(rolled_back.status(), SolutionStatus::Submitted);
    assert!(rolled_back.grader_name.is_empty());
}
