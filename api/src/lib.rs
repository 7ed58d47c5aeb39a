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

//! Generated protobuf/gRPC types shared by every arbiter component.

pub mod pb {
    pub mod arbiter {
        pub mod v1 {
            tonic::include_proto!("arbiter.v1");
        }
    }

    pub use arbiter::v1;

    /// Encoded `FileDescriptorSet` for every message/service declared under
    /// `proto/arbiter`. Used by gRPC reflection and by the edge bridge's
    /// dispatch-table builder (spec.md section 9 design note on reflection).
    pub const GRPC_DESC: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/arbiter_descriptor.bin"));
}

pub use pb::v1::{
    Arch, BuildTarget, Checker, CheckerKind, CourseContentBundle, CourseContentRequest,
    CourseContentResponse, Empty, GraderProperties, GradingLimits, Os, Platform,
    ProblemGradingOptions, RateLimitInfo, ReceiveSubmissionsRequest, ServiceState,
    ServiceStatusResponse, SolutionFile, SolutionStatus, StartRequest, StatusRequest,
    StatusResponse, StopRequest, Submission, SubmitRequest, SubmitResponse,
    SupervisorStatusResponse, TestCase, TestResult, course_content_client, course_content_server,
    grader_service_client, grader_service_server, submission_intake_client,
    submission_intake_server, supervisor_client, supervisor_server,
};
