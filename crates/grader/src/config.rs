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

use arbiter_api::{Arch, GraderProperties, Os, Platform};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// spec.md section 4.4.1 attach protocol config: what this grader
/// declares about itself, and where the broker and workspace live.
#[derive(Clone, Debug, Serialize, Deserialize, SmartDefault)]
pub struct GraderConfig {
    /// Broker's gRPC Unix-domain socket (spec.md section 4.4.1).
    pub broker_socket: PathBuf,
    /// `CourseContent`'s Unix-domain socket (spec.md section 4.4.2 "Course
    /// data caching"). Course-content ingestion itself is out of core scope
    /// (see `course.proto`'s own comment); a deployment that never
    /// configures this simply never resolves `ProblemGradingOptions` and
    /// every submission fails fast in the build stage.
    pub course_content_socket: Option<PathBuf>,
    /// This grader's name, reported in `GraderProperties` (spec.md
    /// section 3 `GraderRegistration`).
    pub name: String,
    #[default(Arch::Any)]
    pub arch: Arch,
    #[default(Os::Any)]
    pub os: Os,
    pub runtimes: Vec<String>,
    /// Root directory each submission gets materialised under, at
    /// `<working_dir>/<submission-id>/` (spec.md section 4.4.2 step 1).
    pub working_dir: PathBuf,
    /// Fixed reconnect backoff after a stream ends or fails (spec.md
    /// section 4.4.1 "reconnect after a fixed backoff (e.g., 5 s)").
    #[default(Duration::from_secs(5))]
    #[serde(with = "secs")]
    pub reconnect_backoff: Duration,
    /// Name of the style-check tool invoked for files matching a
    /// problem's `code_style_suffix` (spec.md section 4.4.2 step 2).
    #[default = "cpplint"]
    pub style_tool: String,
}

impl GraderConfig {
    /// Builds the `GraderProperties` sent on every attach attempt.
    #[must_use]
    pub fn properties(&self) -> GraderProperties {
        GraderProperties {
            name:     self.name.clone(),
            platform: Some(Platform { arch: self.arch as i32, os: self.os as i32, runtimes: self.runtimes.clone() }),
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
