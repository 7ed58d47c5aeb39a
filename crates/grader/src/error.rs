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

use std::path::PathBuf;

use snafu::Snafu;

/// Failures internal to one submission's pipeline (spec.md section 4.4.2).
/// These never reach the broker directly — every pipeline stage maps its
/// own failures to a terminal `SolutionStatus` instead — but process
/// spawning and workspace I/O can fail in ways no status code covers, so
/// the pipeline surfaces those as `PipelineError` and the caller decides
/// whether to report `VERY_BAD` or skip reporting and retry on reconnect.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    #[snafu(display("failed to materialise {path}: {source}"))]
    Workspace {
        path: PathBuf,
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("failed to spawn {command}: {source}"))]
    Spawn {
        command: String,
        #[snafu(source)]
        source: std::io::Error,
    },

    #[snafu(display("course content unavailable for {course_data_id}"))]
    CourseContentUnavailable { course_data_id: String },

    #[snafu(display("failed to dial course content service: {source}"))]
    CourseContentDial {
        #[snafu(source)]
        source: tonic::transport::Error,
    },

    #[snafu(display("course content RPC failed: {source}"))]
    CourseContentRpc {
        #[snafu(source)]
        source: tonic::Status,
    },

    #[snafu(display("decoding cached course content bundle failed: {source}"))]
    Decode {
        #[snafu(source)]
        source: prost::DecodeError,
    },
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
