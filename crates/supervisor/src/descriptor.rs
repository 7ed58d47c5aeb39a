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

use arbiter_api::ServiceState;

/// Mirrors spec.md section 3's `ServiceStatus` tagged enum, the only
/// mutable-at-runtime half of a `ServiceDescriptor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceStatus {
    Disabled,
    Stopped,
    Running,
    Respawning,
    Shutdown,
    Failed,
    Dead,
}

impl ServiceStatus {
    #[must_use]
    pub const fn as_proto(self) -> ServiceState {
        match self {
            Self::Disabled => ServiceState::Disabled,
            Self::Stopped => ServiceState::Stopped,
            Self::Running => ServiceState::Running,
            Self::Respawning => ServiceState::Respawning,
            Self::Shutdown => ServiceState::Shutdown,
            Self::Failed => ServiceState::Failed,
            Self::Dead => ServiceState::Dead,
        }
    }
}

/// A point-in-time, cheaply cloneable view of a `ServiceDescriptor`,
/// published over a `tokio::sync::watch` channel so the control RPC's
/// readers never block the owner task (spec.md section 5: "readers ... use
/// a reader-writer discipline to take a consistent snapshot").
#[derive(Clone, Debug)]
pub struct ServiceSnapshot {
    pub name: String,
    pub status: ServiceStatus,
    pub pid: i32,
    pub started_at: Option<std::time::Instant>,
    pub crashes_since_start: u32,
    pub fail_reason: String,
}

impl ServiceSnapshot {
    #[must_use]
    pub fn new(name: String) -> Self {
        Self {
            name,
            status: ServiceStatus::Stopped,
            pid: 0,
            started_at: None,
            crashes_since_start: 0,
            fail_reason: String::new(),
        }
    }

    #[must_use]
    pub fn uptime_seconds(&self) -> i64 {
        self.started_at.map_or(0, |t| t.elapsed().as_secs() as i64)
    }

    #[must_use]
    pub fn to_proto(&self) -> arbiter_api::ServiceStatusResponse {
        arbiter_api::ServiceStatusResponse {
            name: self.name.clone(),
            status: self.status.as_proto().into(),
            pid: self.pid,
            uptime_seconds: self.uptime_seconds(),
            crashes_since_start: self.crashes_since_start,
            fail_reason: self.fail_reason.clone(),
        }
    }
}
