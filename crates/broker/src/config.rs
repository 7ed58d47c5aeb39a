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

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Broker-owned config (spec.md section 4.1: the config path named by
/// `ServiceArgs::config` is each service's own business).
#[derive(Clone, Debug, Serialize, Deserialize, SmartDefault)]
pub struct BrokerConfig {
    /// Unix-domain socket this broker serves `GraderService` and
    /// `SubmissionIntake` on.
    pub socket: PathBuf,
    /// Rolling-1-hour-window cap applied per `(user, course, problem)`
    /// (spec.md section 4.5 "Throttling").
    #[default(20)]
    pub max_submissions_per_hour: u32,
}
